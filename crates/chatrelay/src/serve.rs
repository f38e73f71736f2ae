// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatrelay serve`: wire the adapters into the gateway and run it.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use chatrelay_backend::BackendClient;
use chatrelay_config::model::{RelayConfig, SessionBackend};
use chatrelay_core::{PluginAdapter, RelayError, SessionStore};
use chatrelay_gateway::{GatewayState, RelaySettings, start_server};
use chatrelay_platform::PlatformClient;
use chatrelay_storage::{MemorySessionStore, SqliteStorage};

use crate::shutdown;

/// Run the relay until SIGINT or SIGTERM.
pub async fn run_serve(config: RelayConfig) -> Result<(), RelayError> {
    init_tracing(&config.server.log_level);
    info!(version = env!("CARGO_PKG_VERSION"), "starting chatrelay serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;

    if config.backend.base_url.is_none() {
        warn!("backend.base_url is not set; streams will end with \"backend request failed\"");
    }

    let state = build_state(&config, storage.clone())?;
    let cancel = shutdown::install_signal_handler();

    let served = start_server(&config.server.host, config.server.port, state, cancel).await;

    if let Err(e) = storage.shutdown().await {
        warn!(error = %e, "storage shutdown failed");
    }
    served?;

    info!("chatrelay serve shutdown complete");
    Ok(())
}

/// Build the gateway state from configuration and the opened storage.
fn build_state(config: &RelayConfig, storage: Arc<SqliteStorage>) -> Result<GatewayState, RelayError> {
    let sessions: Arc<dyn SessionStore> = match config.session.backend {
        SessionBackend::Sqlite => storage.clone(),
        SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
    };
    info!(backend = ?config.session.backend, ttl_secs = config.session.ttl_secs, "session store ready");

    Ok(GatewayState {
        sessions,
        catalog: storage.clone(),
        transcript: storage,
        platform: Arc::new(PlatformClient::new(&config.platform)?),
        backend: Arc::new(BackendClient::new(&config.backend)?),
        settings: RelaySettings::from_config(config),
        started_at: Instant::now(),
    })
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatrelay={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
