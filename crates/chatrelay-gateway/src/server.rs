// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the relay.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Router,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use chatrelay_config::model::RelayConfig;
use chatrelay_core::{
    AgentCatalog, ChatPlatform, GenerationBackend, RelayError, SessionStore, TranscriptStore,
};

use crate::handlers;
use crate::stream;
use crate::webhook;

/// Relay behaviour taken from configuration.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Overrides the per-request base URL derivation when set.
    pub public_base_url: Option<String>,
    pub placeholder_text: String,
    pub session_ttl: Duration,
    pub token_length: usize,
    /// Fallback proxy for models that do not name one.
    pub proxy_url: Option<String>,
}

impl RelaySettings {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            public_base_url: config.server.public_base_url.clone(),
            placeholder_text: config.platform.placeholder_text.clone(),
            session_ttl: config.session.ttl(),
            token_length: config.session.token_length,
            proxy_url: config.backend.proxy_url.clone(),
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

/// Shared state for axum request handlers.
///
/// Holds no per-request data: everything that crosses from the webhook to
/// the stream goes through the session store.
#[derive(Clone)]
pub struct GatewayState {
    pub sessions: Arc<dyn SessionStore>,
    pub catalog: Arc<dyn AgentCatalog>,
    pub transcript: Arc<dyn TranscriptStore>,
    pub platform: Arc<dyn ChatPlatform>,
    pub backend: Arc<dyn GenerationBackend>,
    pub settings: RelaySettings,
    /// Process start time for uptime calculation.
    pub started_at: Instant,
}

/// Build the relay router:
/// - POST /service/webhook
/// - GET /service/stream/{token}
/// - GET /health
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/service/webhook", post(webhook::post_webhook))
        .route("/service/stream/{token}", get(stream::get_stream))
        .route("/health", get(handlers::get_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `host:port` and serve until `shutdown` is cancelled.
pub async fn start_server(
    host: &str,
    port: u16,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), RelayError> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::Internal(format!("failed to bind relay to {addr}: {e}")))?;

    tracing::info!("relay listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| RelayError::Internal(format!("relay server error: {e}")))?;

    tracing::info!("relay server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config() {
        let mut config = RelayConfig::default();
        config.server.public_base_url = Some("https://relay.example.com".into());
        config.session.ttl_secs = 30;
        config.session.token_length = 16;

        let settings = RelaySettings::from_config(&config);
        assert_eq!(settings.public_base_url.as_deref(), Some("https://relay.example.com"));
        assert_eq!(settings.session_ttl, Duration::from_secs(30));
        assert_eq!(settings.token_length, 16);
        assert_eq!(settings.placeholder_text, config.platform.placeholder_text);
    }

    #[test]
    fn default_settings_use_ten_minute_ttl() {
        let settings = RelaySettings::default();
        assert_eq!(settings.session_ttl, Duration::from_secs(600));
        assert_eq!(settings.token_length, 12);
        assert!(settings.public_base_url.is_none());
    }
}
