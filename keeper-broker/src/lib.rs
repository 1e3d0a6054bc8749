pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod state;
pub mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use keeper_core::{
    CredentialManager, EnvelopeCipher, IdentityOrchestrator, MemoryStore, RequestGate,
    SecretOrchestrator,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use config::{BrokerConfig, CliOverrides};
pub use state::AppState;
pub use telemetry::CorrelationId;

pub async fn run(config: BrokerConfig) -> anyhow::Result<()> {
    let state = build_state(&config)?;

    let listener = TcpListener::bind(config.bind_address)
        .await
        .with_context(|| {
            format!(
                "failed to bind http listener on {addr}",
                addr = config.bind_address
            )
        })?;

    let http_addr = listener.local_addr()?;
    info!(%http_addr, "http server listening");

    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    info!("http server stopped");
    Ok(())
}

/// Wires the repository, crypto, credentials and gate into shared state.
pub fn build_state(config: &BrokerConfig) -> anyhow::Result<AppState> {
    let secret = config.secret_key()?;

    let store = match &config.state_path {
        Some(path) => Arc::new(MemoryStore::with_persistence(path).with_context(|| {
            format!("failed to open state file {}", path.display())
        })?),
        None => {
            warn!("no state path configured; secrets are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let credentials = Arc::new(CredentialManager::with_ttl(secret, config.token_ttl()));
    let identity = IdentityOrchestrator::new(store.clone(), credentials.clone())
        .with_query_timeout(config.query_timeout());
    let secrets = SecretOrchestrator::new(store, EnvelopeCipher::new(secret))
        .with_query_timeout(config.query_timeout());
    let gate = RequestGate::new(credentials);

    Ok(AppState::new(
        Arc::new(identity),
        Arc::new(secrets),
        Arc::new(gate),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(?err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => warn!(?err, "failed to install sigterm handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
