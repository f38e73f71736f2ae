// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness wiring mock collaborators into a gateway.
//!
//! `RelayHarness` builds a [`GatewayState`] from the mocks and an in-memory
//! session store, and drives the router in-process with
//! `tower::ServiceExt::oneshot`.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

use chatrelay_core::types::{DialogType, MessageSender};
use chatrelay_core::{PendingRequest, RelayError, SessionStore, SseKind};
use chatrelay_gateway::sse::FRAME_BUFFER;
use chatrelay_gateway::{GatewayState, RelaySettings, SseFrame, SseWriter, router};
use chatrelay_storage::MemorySessionStore;

use crate::mock_backend::MockBackend;
use crate::mock_platform::MockChatPlatform;
use crate::mock_store::{MockCatalog, MockTranscript, active_agent, enabled_model};

/// Base URL the harness configures for stream URLs.
pub const BASE_URL: &str = "http://relay.test";

/// Form fields of a webhook call, pre-filled with a direct message to bot 99.
#[derive(Debug, Clone)]
pub struct WebhookFields(Vec<(String, String)>);

impl WebhookFields {
    pub fn direct(text: &str) -> Self {
        let fields = [
            ("text", text),
            ("reply_text", ""),
            ("token", "bot-token"),
            ("dialog_id", "42"),
            ("session_id", "0"),
            ("dialog_type", "user"),
            ("msg_id", "500"),
            ("msg_uid", "3"),
            (
                "msg_user",
                r#"{"userid":3,"email":"alice@example.com","nickname":"alice","lang":"en"}"#,
            ),
            ("mention", "0"),
            ("bot_uid", "99"),
            ("version", "1.0"),
            ("extras", "{}"),
        ];
        Self(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// Override (or add) one field.
    pub fn set(mut self, key: &str, value: &str) -> Self {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.0.push((key.to_string(), value.to_string())),
        }
        self
    }

    pub fn encode(&self) -> String {
        serde_urlencoded::to_string(&self.0).unwrap_or_default()
    }
}

/// Status, headers, and decoded frames of a stream response.
#[derive(Debug)]
pub struct StreamReply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub frames: Vec<SseFrame>,
}

pub struct RelayHarness {
    pub state: GatewayState,
    pub platform: Arc<MockChatPlatform>,
    pub backend: Arc<MockBackend>,
    pub catalog: Arc<MockCatalog>,
    pub transcript: Arc<MockTranscript>,
    pub sessions: Arc<MemorySessionStore>,
}

impl RelayHarness {
    /// Harness with default settings and [`BASE_URL`] as the public base URL.
    pub fn new() -> Self {
        Self::with_settings(RelaySettings {
            public_base_url: Some(BASE_URL.to_string()),
            ..RelaySettings::default()
        })
    }

    pub fn with_settings(settings: RelaySettings) -> Self {
        let platform = Arc::new(MockChatPlatform::new());
        let backend = Arc::new(MockBackend::new());
        let catalog = Arc::new(MockCatalog::new());
        let transcript = Arc::new(MockTranscript::new());
        let sessions = Arc::new(MemorySessionStore::new());

        let state = GatewayState {
            sessions: sessions.clone(),
            catalog: catalog.clone(),
            transcript: transcript.clone(),
            platform: platform.clone(),
            backend: backend.clone(),
            settings,
            started_at: Instant::now(),
        };

        Self {
            state,
            platform,
            backend,
            catalog,
            transcript,
            sessions,
        }
    }

    /// Register an active agent for `bot_id` backed by an enabled model.
    pub async fn seed_agent(&self, bot_id: i64, model_id: i64) {
        self.catalog.insert_agent(active_agent(bot_id, model_id)).await;
        self.catalog.insert_model(enabled_model(model_id)).await;
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// POST the fields to `/service/webhook` and decode the JSON reply.
    pub async fn post_webhook(&self, fields: &WebhookFields) -> Result<(StatusCode, Value), RelayError> {
        self.post_webhook_raw(fields.encode()).await
    }

    pub async fn post_webhook_raw(&self, body: String) -> Result<(StatusCode, Value), RelayError> {
        let request = Request::post("/service/webhook")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .map_err(|e| RelayError::Internal(e.to_string()))?;
        let response = match self.router().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| RelayError::Internal(e.to_string()))?;
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Ok((status, json))
    }

    /// GET `/service/stream/{token}` and read the response to its end.
    pub async fn open_stream(&self, token: &str) -> Result<StreamReply, RelayError> {
        let request = Request::get(format!("/service/stream/{token}"))
            .body(Body::empty())
            .map_err(|e| RelayError::Internal(e.to_string()))?;
        let response = match self.router().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| RelayError::Internal(e.to_string()))?;
        Ok(StreamReply {
            status,
            headers,
            frames: parse_frames(&String::from_utf8_lossy(&bytes)),
        })
    }

    /// Run the relay for `token` without HTTP and collect every frame.
    ///
    /// The relay runs on the calling task, so its log lines stay inside the
    /// caller's span.
    pub async fn run_relay(&self, token: &str) -> Vec<SseFrame> {
        let (tx, mut rx) = mpsc::channel(FRAME_BUFFER);
        let relay = chatrelay_gateway::stream::relay(
            self.state.clone(),
            token.to_string(),
            SseWriter::new(tx),
        );
        let collect = async move {
            let mut frames = Vec::new();
            while let Some(frame) = rx.recv().await {
                frames.push(frame);
            }
            frames
        };

        let ((), frames) = tokio::join!(relay, collect);
        frames
    }

    /// Store `request` under its own token, as the webhook would.
    pub async fn store_pending(&self, request: &PendingRequest) -> Result<(), RelayError> {
        let value = serde_json::to_string(request)
            .map_err(|e| RelayError::Session(e.to_string()))?;
        let key = PendingRequest::store_key(&request.session_token);
        self.sessions
            .insert_if_absent(&key, &value, self.state.settings.session_ttl)
            .await?;
        Ok(())
    }

    /// Decode the stored pending request for `token`.
    pub async fn stored_request(&self, token: &str) -> Option<PendingRequest> {
        let raw = self
            .sessions
            .get(&PendingRequest::store_key(token))
            .await
            .ok()
            .flatten()?;
        serde_json::from_str(&raw).ok()
    }
}

impl Default for RelayHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A pending request for bot 99 in dialog 42, as the webhook would store it.
pub fn sample_request(token: &str, send_id: i64) -> PendingRequest {
    PendingRequest {
        text: "hello".to_string(),
        reply_text: String::new(),
        bot_token: "bot-token".to_string(),
        dialog_id: 42,
        session_id: 0,
        dialog_type: DialogType::User,
        msg_id: 500,
        msg_uid: 3,
        msg_user: MessageSender {
            userid: 3,
            nickname: "alice".to_string(),
            ..MessageSender::default()
        },
        mention: false,
        bot_uid: 99,
        version: "1.0".to_string(),
        extras: serde_json::Map::new(),
        session_token: token.to_string(),
        send_id,
    }
}

/// Decode an `text/event-stream` body into frames. Blocks without a
/// recognised `event:` field are skipped.
pub fn parse_frames(body: &str) -> Vec<SseFrame> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut id = 0;
            let mut kind = None;
            let mut data = String::new();
            for line in block.lines() {
                if let Some(v) = line.strip_prefix("id:") {
                    id = v.trim().parse().unwrap_or(0);
                } else if let Some(v) = line.strip_prefix("event:") {
                    kind = SseKind::from_str(v.trim()).ok();
                } else if let Some(v) = line.strip_prefix("data:") {
                    data = v.strip_prefix(' ').unwrap_or(v).to_string();
                }
            }
            kind.map(|kind| SseFrame { id, kind, data })
        })
        .collect()
}

/// The session token embedded in a stream URL.
pub fn token_from_url(url: &str) -> Option<&str> {
    url.rsplit_once("/service/stream/").map(|(_, token)| token)
}
