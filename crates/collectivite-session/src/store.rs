//! Session store: identity, persisted credential and real-time channel.

use std::sync::{Arc, Mutex, PoisonError};

use collectivite_api::{ApiClient, ApiError, AuthGrant, Registration};
use collectivite_core::{CredentialStore, EventBus, RealtimeEvent, User};
use collectivite_realtime::{ChannelState, RealtimeChannel, RealtimeTransport, Reconnection};
use tokio::sync::{Mutex as AsyncMutex, RwLock, broadcast, watch};

/// Authentication status of a [`SessionStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// The persisted credential has not been validated yet.
    Loading,
    /// A user is signed in.
    Authenticated,
    /// No user is signed in.
    Unauthenticated,
}

/// Application context for one signed-in (or signed-out) user.
///
/// Owns the API client, the persisted credential, the event bus and the
/// real-time channel. The channel exists exactly while a credential is held
/// and always authenticates with the current credential: a new login replaces
/// it instead of re-keying it.
///
/// Every operation fails closed: an error while validating or obtaining a
/// credential leaves the session signed out with nothing persisted.
///
/// Transitions (bootstrap, login, register, logout, refresh) run one at a
/// time, in call order.
pub struct SessionStore<C, T>
where
    C: CredentialStore,
    T: RealtimeTransport,
{
    api: ApiClient,
    credentials: C,
    transport: Arc<T>,
    bus: EventBus,
    reconnection: Reconnection,
    user: RwLock<Option<User>>,
    status: watch::Sender<SessionStatus>,
    channel: Mutex<Option<RealtimeChannel>>,
    transition: AsyncMutex<()>,
}

impl<C, T> SessionStore<C, T>
where
    C: CredentialStore,
    T: RealtimeTransport,
{
    /// Create a store in the [`SessionStatus::Loading`] state.
    ///
    /// Call [`SessionStore::bootstrap`] to resolve it.
    #[must_use]
    pub fn new(api: ApiClient, credentials: C, transport: T) -> Self {
        let (status, _) = watch::channel(SessionStatus::Loading);
        Self {
            api,
            credentials,
            transport: Arc::new(transport),
            bus: EventBus::new(),
            reconnection: Reconnection::default(),
            user: RwLock::new(None),
            status,
            channel: Mutex::new(None),
            transition: AsyncMutex::new(()),
        }
    }

    /// Override the channel's reconnection delays.
    #[must_use]
    pub fn with_reconnection(mut self, reconnection: Reconnection) -> Self {
        self.reconnection = reconnection;
        self
    }

    /// Validate the persisted credential, if any, and resume the session.
    ///
    /// Never fails: any error removes the persisted credential and leaves the
    /// session unauthenticated.
    pub async fn bootstrap(&self) -> SessionStatus {
        let _transition = self.transition.lock().await;
        let token = match self.credentials.load().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::debug!("no persisted credential");
                self.sign_out().await;
                return SessionStatus::Unauthenticated;
            }
            Err(e) => {
                tracing::warn!("unreadable credential store: {e}");
                self.discard_credential().await;
                self.sign_out().await;
                return SessionStatus::Unauthenticated;
            }
        };

        self.api.set_token(token.clone());
        match self.api.profile().await {
            Ok(user) => {
                tracing::info!(user = %user.id, "session resumed");
                self.establish(user, token).await;
                SessionStatus::Authenticated
            }
            Err(e) => {
                tracing::warn!("persisted credential rejected: {e}");
                self.discard_credential().await;
                self.sign_out().await;
                SessionStatus::Unauthenticated
            }
        }
    }

    /// Sign in with an identifier and secret.
    ///
    /// Returns false on any failure; nothing is persisted in that case and
    /// the current session is left as it was.
    pub async fn login(&self, identifier: &str, secret: &str) -> bool {
        let _transition = self.transition.lock().await;
        match self.api.login(identifier, secret).await {
            Ok(grant) => self.accept_grant(grant).await,
            Err(e) => {
                tracing::warn!("login failed: {e}");
                false
            }
        }
    }

    /// Create an account and sign in with it.
    ///
    /// Same failure semantics as [`SessionStore::login`].
    pub async fn register(&self, registration: &Registration) -> bool {
        let _transition = self.transition.lock().await;
        match self.api.register(registration).await {
            Ok(grant) => self.accept_grant(grant).await,
            Err(e) => {
                tracing::warn!("registration failed: {e}");
                false
            }
        }
    }

    /// Sign out. Always clears identity and credential.
    ///
    /// Waits for a transition already in flight, then undoes it.
    pub async fn logout(&self) {
        let _transition = self.transition.lock().await;
        self.discard_and_sign_out().await;
    }

    /// Re-fetch the current user's profile and replace the identity.
    ///
    /// # Errors
    /// Returns the API error. A 401/403 also signs the session out.
    pub async fn refresh_profile(&self) -> Result<User, ApiError> {
        let _transition = self.transition.lock().await;
        match self.api.profile().await {
            Ok(user) => {
                *self.user.write().await = Some(user.clone());
                Ok(user)
            }
            Err(e) => {
                if e.is_auth_rejection() {
                    tracing::warn!("credential no longer accepted: {e}");
                    self.discard_and_sign_out().await;
                }
                Err(e)
            }
        }
    }

    /// Signed-in user.
    pub async fn user(&self) -> Option<User> {
        self.user.read().await.clone()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Whether a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    /// Watch status changes.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Wait until the status has left [`SessionStatus::Loading`].
    pub async fn wait_until_resolved(&self) -> SessionStatus {
        let mut rx = self.status.subscribe();
        let resolved = rx
            .wait_for(|s| *s != SessionStatus::Loading)
            .await
            .map(|s| *s);
        resolved.unwrap_or_else(|_| self.status())
    }

    /// Backing credential store.
    #[must_use]
    pub const fn credentials(&self) -> &C {
        &self.credentials
    }

    /// API client carrying the session credential.
    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Bus the real-time channel publishes on.
    #[must_use]
    pub const fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Subscribe to real-time events.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.bus.subscribe()
    }

    /// State of the real-time channel; disconnected when signed out.
    #[must_use]
    pub fn channel_state(&self) -> ChannelState {
        self.with_channel(RealtimeChannel::state)
            .unwrap_or(ChannelState::Disconnected)
    }

    /// Whether the real-time channel is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.channel_state() == ChannelState::Connected
    }

    /// Join a server-side room. No-op unless connected.
    pub fn join_room(&self, room: &str) -> bool {
        self.with_channel(|c| c.join_room(room)).unwrap_or(false)
    }

    /// Leave a server-side room. No-op unless connected.
    pub fn leave_room(&self, room: &str) -> bool {
        self.with_channel(|c| c.leave_room(room)).unwrap_or(false)
    }

    async fn accept_grant(&self, grant: AuthGrant) -> bool {
        let AuthGrant { user, token } = grant;
        if let Err(e) = self.credentials.save(&token).await {
            tracing::warn!("could not persist credential: {e}");
            return false;
        }
        tracing::info!(user = %user.id, "signed in");
        self.establish(user, token).await;
        true
    }

    async fn establish(&self, user: User, token: String) {
        self.api.set_token(token.clone());
        *self.user.write().await = Some(user);

        let channel = RealtimeChannel::open(
            Arc::clone(&self.transport),
            token,
            self.bus.clone(),
            self.reconnection,
        );
        let previous = self.replace_channel(Some(channel));
        self.set_status(SessionStatus::Authenticated);

        if let Some(previous) = previous {
            previous.shutdown().await;
        }
    }

    async fn sign_out(&self) {
        self.api.clear_token();
        *self.user.write().await = None;
        let previous = self.replace_channel(None);
        self.set_status(SessionStatus::Unauthenticated);

        if let Some(previous) = previous {
            previous.shutdown().await;
        }
    }

    async fn discard_and_sign_out(&self) {
        self.discard_credential().await;
        self.sign_out().await;
        tracing::info!("signed out");
    }

    async fn discard_credential(&self) {
        if let Err(e) = self.credentials.clear().await {
            tracing::warn!("could not remove persisted credential: {e}");
        }
    }

    fn replace_channel(&self, channel: Option<RealtimeChannel>) -> Option<RealtimeChannel> {
        let mut guard = self.channel.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, channel)
    }

    fn with_channel<R>(&self, f: impl FnOnce(&RealtimeChannel) -> R) -> Option<R> {
        self.channel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(f)
    }

    fn set_status(&self, status: SessionStatus) {
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

impl<C, T> std::fmt::Debug for SessionStore<C, T>
where
    C: CredentialStore,
    T: RealtimeTransport,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("status", &self.status())
            .field("channel", &self.channel_state())
            .finish_non_exhaustive()
    }
}
