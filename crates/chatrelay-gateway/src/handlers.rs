// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared response bodies and the health endpoint.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use chatrelay_core::HealthStatus;

use crate::server::GatewayState;

/// Error code for undecodable webhook payloads.
pub const VALIDATION_CODE: &str = "VALIDATION_001";

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Acknowledgement body for webhook calls.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub data: serde_json::Value,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// GET /health
///
/// Reports `degraded` when the session store or the agent catalog is unhealthy.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let sessions = state.sessions.health_check().await;
    let catalog = state.catalog.health_check().await;
    let healthy = matches!(sessions, Ok(HealthStatus::Healthy))
        && matches!(catalog, Ok(HealthStatus::Healthy));

    if !healthy {
        tracing::warn!(?sessions, ?catalog, "health check degraded");
    }

    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            uptime_secs: 42,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"uptime_secs\":42"));
    }

    #[test]
    fn error_response_has_null_data() {
        let resp = ErrorResponse::new(VALIDATION_CODE, "bad dialog_id");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], "VALIDATION_001");
        assert_eq!(json["message"], "bad dialog_id");
        assert!(json["data"].is_null());
    }
}
