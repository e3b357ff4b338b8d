//! Sign in to the collectivite backend and print live events.
//!
//! Run with: cargo run -p collectivite-watch
//!
//! Resumes the persisted session if there is one, otherwise signs in with
//! `COLLECTIVITE_IDENTIFIER` / `COLLECTIVITE_SECRET`. Backend location comes
//! from `COLLECTIVITE_API_URL` and friends. Extra arguments are room names to
//! join once connected.

use std::time::Duration;

use anyhow::{Context, bail};
use collectivite_api::{ApiClient, ApiConfig};
use collectivite_realtime::WebSocketTransport;
use collectivite_session::{FileCredentialStore, SessionStatus, SessionStore};
use futures::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ApiConfig::from_env();
    let report = ApiClient::new(config.clone())?.check_connectivity().await;
    tracing::info!(url = %report.url, "{}", report.message);

    let transport = WebSocketTransport::new(&config.socket_url, config.socket_connect_timeout)
        .context("invalid socket URL")?;
    let credentials = FileCredentialStore::open_default()?;
    tracing::info!(path = %credentials.path().display(), "credential store");

    let session = SessionStore::new(ApiClient::new(config)?, credentials, transport);

    if session.bootstrap().await == SessionStatus::Unauthenticated {
        let (Ok(identifier), Ok(secret)) = (
            std::env::var("COLLECTIVITE_IDENTIFIER"),
            std::env::var("COLLECTIVITE_SECRET"),
        ) else {
            bail!("no saved session; set COLLECTIVITE_IDENTIFIER and COLLECTIVITE_SECRET");
        };
        if !session.login(&identifier, &secret).await {
            bail!("login refused for {identifier}");
        }
    }

    if let Some(user) = session.user().await {
        println!(
            "Signed in as {} ({}, {})",
            user.name,
            user.role.display_name(),
            user.entity
        );
    }

    let rooms: Vec<String> = std::env::args().skip(1).collect();
    if !rooms.is_empty() {
        join_when_connected(&session, &rooms).await;
    }

    let mut events = session.event_bus().stream();
    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                println!("{} {}", event.kind, event.payload);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.logout().await;
    Ok(())
}

async fn join_when_connected<C, T>(session: &SessionStore<C, T>, rooms: &[String])
where
    C: collectivite_core::CredentialStore,
    T: collectivite_realtime::RealtimeTransport,
{
    for _ in 0..100 {
        if session.is_connected() {
            for room in rooms {
                session.join_room(room);
                tracing::info!(%room, "joined room");
            }
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tracing::warn!("not connected; rooms not joined");
}
