//! Session lifecycle against a mock backend and the in-memory transport.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use collectivite_api::{ApiClient, ApiConfig, ApiError, Registration};
use collectivite_core::{CredentialError, CredentialStore, RealtimeEventKind, Role, User};
use collectivite_realtime::{MemoryServer, MemoryTransport, Outbound, Reconnection};
use collectivite_session::{MemoryCredentialStore, SessionStatus, SessionStore};
use serde_json::{Value, json};

const WAIT: Duration = Duration::from_secs(2);
const SLOW_PROFILE: Duration = Duration::from_millis(300);

fn user_json(id: &str, name: &str, role: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "entity": "Communauté Urbaine de Douala",
        "role": role,
        "certificateInfo": {
            "issuer": "AC-CAMEROUN",
            "expiryDate": "2025-12-31",
            "serialNumber": "CUD2024001",
            "status": "valid"
        }
    })
}

fn ctd_user() -> Value {
    user_json("1", "Marie Ngono", "ctd")
}

fn minfi_user() -> Value {
    user_json("3", "Paul Biya Mbarga", "minfi")
}

fn rejected(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "success": false, "message": message })))
}

fn granted(user: Value, token: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "success": true, "data": { "user": user, "token": token } })),
    )
}

async fn login(Json(body): Json<Value>) -> impl IntoResponse {
    match (body["email"].as_str(), body["password"].as_str()) {
        (Some("ctd.douala"), Some("demo123")) => granted(ctd_user(), "abc"),
        (Some("minfi.yaounde"), Some("demo123")) => granted(minfi_user(), "xyz"),
        (Some("tresor.suspendu"), _) => rejected(StatusCode::OK, "Compte suspendu"),
        _ => rejected(StatusCode::UNAUTHORIZED, "Identifiants invalides"),
    }
}

async fn register(Json(body): Json<Value>) -> impl IntoResponse {
    if body["email"] == "nouveau@douala.cm" && body["password"].is_string() {
        granted(user_json("9", "Nouvel Agent", "ctd"), "abc")
    } else {
        rejected(StatusCode::BAD_REQUEST, "Email déjà utilisé")
    }
}

async fn profile(headers: HeaderMap) -> impl IntoResponse {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match bearer {
        Some("abc") => (
            StatusCode::OK,
            Json(json!({ "success": true, "data": ctd_user() })),
        ),
        Some("xyz") => (
            StatusCode::OK,
            Json(json!({ "success": true, "data": minfi_user() })),
        ),
        Some("lent") => {
            tokio::time::sleep(SLOW_PROFILE).await;
            (
                StatusCode::OK,
                Json(json!({ "success": true, "data": ctd_user() })),
            )
        }
        _ => rejected(StatusCode::UNAUTHORIZED, "Token invalide"),
    }
}

async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/profile", get(profile));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn fast_reconnect() -> Reconnection {
    Reconnection {
        enabled: true,
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(200),
    }
}

async fn session_with<C: CredentialStore>(
    credentials: C,
) -> (SessionStore<C, MemoryTransport>, MemoryServer) {
    let api = ApiClient::new(ApiConfig::new(spawn_backend().await)).unwrap();
    let (transport, server) = MemoryTransport::new();
    let store = SessionStore::new(api, credentials, transport).with_reconnection(fast_reconnect());
    (store, server)
}

async fn wait_connected<C: CredentialStore>(store: &SessionStore<C, MemoryTransport>) {
    tokio::time::timeout(WAIT, async {
        while !store.is_connected() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("channel never connected");
}

fn expected(user: Value) -> User {
    serde_json::from_value(user).unwrap()
}

/// Store whose writes always fail.
struct ReadOnlyStore;

#[async_trait]
impl CredentialStore for ReadOnlyStore {
    async fn load(&self) -> Result<Option<String>, CredentialError> {
        Ok(None)
    }

    async fn save(&self, _token: &str) -> Result<(), CredentialError> {
        Err(CredentialError::Internal("read-only".into()))
    }

    async fn clear(&self) -> Result<(), CredentialError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_login_persists_server_token_and_identity() {
    let (store, server) = session_with(MemoryCredentialStore::new()).await;
    assert_eq!(store.status(), SessionStatus::Loading);
    assert_eq!(store.bootstrap().await, SessionStatus::Unauthenticated);

    assert!(store.login("ctd.douala", "demo123").await);

    let user = store.user().await.unwrap();
    assert_eq!(user, expected(ctd_user()));
    assert_eq!(user.role, Role::Ctd);
    assert_eq!(store.credentials().load().await.unwrap().as_deref(), Some("abc"));
    assert_eq!(store.api().token().as_deref(), Some("abc"));
    assert!(store.is_authenticated());

    let peer = tokio::time::timeout(WAIT, server.accept()).await.unwrap().unwrap();
    assert_eq!(peer.token(), "abc");
    peer.accept();
    wait_connected(&store).await;
}

#[tokio::test]
async fn test_wrong_secret_persists_nothing() {
    let (store, server) = session_with(MemoryCredentialStore::new()).await;
    store.bootstrap().await;

    assert!(!store.login("ctd.douala", "wrong").await);
    assert!(!store.login("tresor.suspendu", "demo123").await);

    assert_eq!(store.status(), SessionStatus::Unauthenticated);
    assert_eq!(store.user().await, None);
    assert_eq!(store.credentials().load().await.unwrap(), None);
    assert!(server.try_accept().await.is_none());
}

#[tokio::test]
async fn test_unpersistable_credential_fails_login() {
    let (store, server) = session_with(ReadOnlyStore).await;
    store.bootstrap().await;

    assert!(!store.login("ctd.douala", "demo123").await);

    assert!(!store.is_authenticated());
    assert_eq!(store.user().await, None);
    assert!(server.try_accept().await.is_none());
}

#[tokio::test]
async fn test_bootstrap_resumes_valid_credential() {
    let (store, server) = session_with(MemoryCredentialStore::with_token("abc")).await;

    assert_eq!(store.bootstrap().await, SessionStatus::Authenticated);
    assert_eq!(store.user().await, Some(expected(ctd_user())));

    let peer = tokio::time::timeout(WAIT, server.accept()).await.unwrap().unwrap();
    assert_eq!(peer.token(), "abc");
}

#[tokio::test]
async fn test_bootstrap_discards_rejected_credential() {
    let (store, server) = session_with(MemoryCredentialStore::with_token("expired")).await;

    assert_eq!(store.bootstrap().await, SessionStatus::Unauthenticated);

    assert_eq!(store.user().await, None);
    assert_eq!(store.credentials().load().await.unwrap(), None);
    assert_eq!(store.api().token(), None);
    assert!(server.try_accept().await.is_none());
}

#[tokio::test]
async fn test_bootstrap_fails_closed_when_backend_unreachable() {
    let api = ApiClient::new(ApiConfig::new("http://127.0.0.1:9")).unwrap();
    let (transport, _server) = MemoryTransport::new();
    let store = SessionStore::new(api, MemoryCredentialStore::with_token("abc"), transport);

    assert_eq!(store.bootstrap().await, SessionStatus::Unauthenticated);
    assert_eq!(store.credentials().load().await.unwrap(), None);
}

#[tokio::test]
async fn test_waiters_see_resolved_status() {
    let (store, _server) = session_with(MemoryCredentialStore::with_token("abc")).await;
    let store = Arc::new(store);

    let waiter = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.wait_until_resolved().await })
    };
    assert_eq!(store.status(), SessionStatus::Loading);

    store.bootstrap().await;
    let resolved = tokio::time::timeout(WAIT, waiter).await.unwrap().unwrap();
    assert_eq!(resolved, SessionStatus::Authenticated);
}

#[tokio::test]
async fn test_logout_clears_session_before_channel_connects() {
    let (store, server) = session_with(MemoryCredentialStore::new()).await;
    assert!(store.login("ctd.douala", "demo123").await);

    let mut peer = tokio::time::timeout(WAIT, server.accept()).await.unwrap().unwrap();
    assert!(!store.is_connected());

    store.logout().await;

    assert_eq!(store.status(), SessionStatus::Unauthenticated);
    assert_eq!(store.user().await, None);
    assert_eq!(store.credentials().load().await.unwrap(), None);
    assert_eq!(store.api().token(), None);
    assert!(!store.is_connected());
    assert_eq!(peer.recv().await, Some(Outbound::Close));
}

#[tokio::test]
async fn test_logout_tears_down_connected_channel() {
    let (store, server) = session_with(MemoryCredentialStore::new()).await;
    assert!(store.login("ctd.douala", "demo123").await);

    let mut peer = tokio::time::timeout(WAIT, server.accept()).await.unwrap().unwrap();
    peer.accept();
    wait_connected(&store).await;

    store.logout().await;

    assert!(!store.is_connected());
    assert!(!store.join_room("region-littoral"));
    assert_eq!(peer.recv().await, Some(Outbound::Close));
    assert_eq!(peer.recv().await, None);
}

#[tokio::test]
async fn test_new_login_recreates_channel_with_new_credential() {
    let (store, server) = session_with(MemoryCredentialStore::new()).await;

    assert!(store.login("ctd.douala", "demo123").await);
    let mut first = tokio::time::timeout(WAIT, server.accept()).await.unwrap().unwrap();
    first.accept();
    wait_connected(&store).await;

    assert!(store.login("minfi.yaounde", "demo123").await);
    assert_eq!(store.user().await, Some(expected(minfi_user())));
    assert_eq!(store.credentials().load().await.unwrap().as_deref(), Some("xyz"));

    assert_eq!(first.recv().await, Some(Outbound::Close));
    let second = tokio::time::timeout(WAIT, server.accept()).await.unwrap().unwrap();
    assert_eq!(second.token(), "xyz");
}

#[tokio::test]
async fn test_channel_events_reach_subscribers() {
    let (store, server) = session_with(MemoryCredentialStore::new()).await;
    let mut events = store.events();
    assert!(store.login("ctd.douala", "demo123").await);

    let mut peer = tokio::time::timeout(WAIT, server.accept()).await.unwrap().unwrap();
    peer.accept();
    wait_connected(&store).await;

    peer.emit("project:created", json!({ "id": "P1" }));
    let event = tokio::time::timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.kind, RealtimeEventKind::ProjectCreated);
    assert_eq!(event.payload, json!({ "id": "P1" }));

    assert!(store.join_room("projet-P1"));
    assert_eq!(
        peer.recv().await,
        Some(Outbound::Emit {
            name: "join-room".into(),
            payload: json!("projet-P1"),
        })
    );
}

#[tokio::test]
async fn test_register_signs_in() {
    let (store, server) = session_with(MemoryCredentialStore::new()).await;
    let registration = Registration {
        name: "Nouvel Agent".into(),
        email: "nouveau@douala.cm".into(),
        password: "secret".into(),
        entity: "Communauté Urbaine de Douala".into(),
        role: Some(Role::Ctd),
    };

    assert!(store.register(&registration).await);
    assert_eq!(store.user().await.map(|u| u.id), Some("9".to_string()));
    assert_eq!(store.credentials().load().await.unwrap().as_deref(), Some("abc"));
    assert!(tokio::time::timeout(WAIT, server.accept()).await.unwrap().is_some());

    let taken = Registration {
        email: "existant@douala.cm".into(),
        ..registration
    };
    assert!(!store.register(&taken).await);
}

#[tokio::test]
async fn test_revoked_credential_signs_out_on_refresh() {
    let (store, _server) = session_with(MemoryCredentialStore::new()).await;
    assert!(store.login("ctd.douala", "demo123").await);
    assert_eq!(store.refresh_profile().await.unwrap(), expected(ctd_user()));

    store.api().set_token("revoked");
    let err = store.refresh_profile().await.unwrap_err();

    assert!(matches!(err, ApiError::Status { .. }));
    assert!(err.is_auth_rejection());
    assert_eq!(store.status(), SessionStatus::Unauthenticated);
    assert_eq!(store.credentials().load().await.unwrap(), None);
}

#[tokio::test]
async fn test_logout_during_bootstrap_wins() {
    let (store, server) = session_with(MemoryCredentialStore::with_token("lent")).await;
    let store = Arc::new(store);

    let bootstrap = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.bootstrap().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(store.status(), SessionStatus::Loading);

    store.logout().await;
    tokio::time::timeout(WAIT, bootstrap).await.unwrap().unwrap();

    assert_eq!(store.status(), SessionStatus::Unauthenticated);
    assert_eq!(store.user().await, None);
    assert_eq!(store.credentials().load().await.unwrap(), None);
    assert_eq!(store.api().token(), None);
    assert!(!store.is_connected());
    if let Some(mut peer) = server.try_accept().await {
        let last = tokio::time::timeout(WAIT, peer.recv()).await.unwrap();
        assert!(matches!(last, Some(Outbound::Close) | None));
    }
}
