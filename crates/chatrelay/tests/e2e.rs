// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: SQLite storage, the real platform and backend clients
//! against wiremock servers, and the gateway router driven in-process.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatrelay_backend::BackendClient;
use chatrelay_config::model::{BackendConfig, PlatformConfig, StorageConfig};
use chatrelay_core::types::{MessageRole, TranscriptMessage};
use chatrelay_core::{PendingRequest, SessionStore, SseKind};
use chatrelay_gateway::{GatewayState, RelaySettings, SseFrame, router};
use chatrelay_platform::PlatformClient;
use chatrelay_storage::SqliteStorage;
use chatrelay_storage::queries;
use chatrelay_test_utils::{WebhookFields, active_agent, enabled_model, parse_frames};

const PLACEHOLDER_ID: i64 = 1001;

struct Relay {
    router: Router,
    storage: Arc<SqliteStorage>,
    platform: MockServer,
    backend: MockServer,
    _dir: tempfile::TempDir,
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "ret": 1, "msg": "ok", "data": data }))
}

async fn start_relay() -> Relay {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new(StorageConfig {
        database_path: dir.path().join("relay.db").to_string_lossy().to_string(),
        wal_mode: true,
    });
    storage.initialize().await.unwrap();
    let storage = Arc::new(storage);

    let db = storage.database().unwrap();
    let model_id = queries::agents::insert_model(db, &enabled_model(0)).await.unwrap();
    queries::agents::insert_agent(db, &active_agent(99, model_id))
        .await
        .unwrap();
    queries::messages::insert_message(
        db,
        &TranscriptMessage {
            id: 0,
            conversation_id: 1,
            send_id: PLACEHOLDER_ID,
            role: MessageRole::Assistant,
            content: String::new(),
            tokens_used: 0,
            model_used: None,
            created_at: String::new(),
        },
    )
    .await
    .unwrap();

    let platform = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/dialog/msg/sendtext"))
        .and(header_eq("token", "bot-token"))
        .respond_with(ok(json!({ "id": PLACEHOLDER_ID, "dialog_id": 42 })))
        .mount(&platform)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/dialog/msg/sendstream"))
        .respond_with(ok(Value::Null))
        .mount(&platform)
        .await;

    let backend = MockServer::start().await;

    let platform_config = PlatformConfig {
        api_base_url: platform.uri(),
        ..PlatformConfig::default()
    };
    let backend_config = BackendConfig {
        base_url: Some(backend.uri()),
        ..BackendConfig::default()
    };
    let state = GatewayState {
        sessions: storage.clone(),
        catalog: storage.clone(),
        transcript: storage.clone(),
        platform: Arc::new(PlatformClient::new(&platform_config).unwrap()),
        backend: Arc::new(BackendClient::new(&backend_config).unwrap()),
        settings: RelaySettings {
            public_base_url: None,
            ..RelaySettings::default()
        },
        started_at: Instant::now(),
    };

    Relay {
        router: router(state),
        storage,
        platform,
        backend,
        _dir: dir,
    }
}

async fn mount_backend_stream(relay: &Relay, body: &str) {
    Mock::given(method("POST"))
        .and(path("/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body.to_string()),
        )
        .mount(&relay.backend)
        .await;
}

async fn post_webhook(relay: &Relay, fields: &WebhookFields) -> (StatusCode, Value) {
    let request = Request::post("/service/webhook")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::HOST, "internal:8000")
        .header("x-forwarded-proto", "https")
        .header("x-forwarded-host", "relay.example.com")
        .body(Body::from(fields.encode()))
        .unwrap();
    let response = relay.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn open_stream(relay: &Relay, token: &str) -> Vec<SseFrame> {
    let request = Request::get(format!("/service/stream/{token}"))
        .body(Body::empty())
        .unwrap();
    let response = relay.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    parse_frames(&String::from_utf8_lossy(&bytes))
}

/// JSON bodies the platform received on `endpoint`.
async fn platform_bodies(relay: &Relay, endpoint: &str) -> Vec<Value> {
    relay
        .platform
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == endpoint)
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

fn summary(frames: &[SseFrame]) -> Vec<(SseKind, String)> {
    frames
        .iter()
        .map(|f| (f.kind, f.text().unwrap_or_default()))
        .collect()
}

#[tokio::test]
async fn webhook_to_stream_round_trip() {
    let relay = start_relay().await;
    mount_backend_stream(
        &relay,
        concat!(
            "data: {\"type\": \"token\", \"content\": \"Hel\"}\n\n",
            "data: {\"type\": \"token\", \"content\": \"lo\"}\n\n",
            "data: {\"type\": \"message\", \"content\": {\"content\": \"Hello\"}}\n\n",
            "data: [DONE]\n\n",
        ),
    )
    .await;

    // Phase one: webhook.
    let (status, body) = post_webhook(&relay, &WebhookFields::direct("say hello")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    let sent = platform_bodies(&relay, "/api/dialog/msg/sendtext").await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["reply_id"], 500);
    assert_eq!(sent[0]["text_type"], "md");
    assert_eq!(sent[0]["silence"], "yes");

    let notified = platform_bodies(&relay, "/api/dialog/msg/sendstream").await;
    assert_eq!(notified.len(), 1);
    assert_eq!(notified[0]["userid"], 3);
    let stream_url = notified[0]["stream_url"].as_str().unwrap();
    let token = stream_url
        .strip_prefix("https://relay.example.com/service/stream/")
        .expect("stream URL should use the forwarded base URL");

    // The stored record is what the stream phase will read.
    let raw = relay
        .storage
        .get(&PendingRequest::store_key(token))
        .await
        .unwrap()
        .expect("session should be stored");
    let stored: PendingRequest = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored.send_id, PLACEHOLDER_ID);
    assert_eq!(stored.session_token, token);
    assert_eq!(stored.text, "say hello");

    // Phase two: stream.
    let frames = open_stream(&relay, token).await;
    assert_eq!(
        summary(&frames),
        vec![
            (SseKind::Append, "Hel".to_string()),
            (SseKind::Append, "lo".to_string()),
            (SseKind::Done, String::new()),
        ]
    );
    assert!(frames.iter().all(|f| f.id == PLACEHOLDER_ID));

    // The backend got the assembled request.
    let backend_requests = relay.backend.received_requests().await.unwrap();
    assert_eq!(backend_requests.len(), 1);
    let generation: Value = serde_json::from_slice(&backend_requests[0].body).unwrap();
    assert_eq!(generation["message"], "say hello");
    assert_eq!(generation["model"], "gpt-4o-mini");
    assert_eq!(generation["stream_tokens"], true);
    assert_eq!(generation["messages"][0]["role"], "user");

    // Transcript finalized and chat message updated with the same text.
    let row = queries::messages::get_by_send_id(relay.storage.database().unwrap(), PLACEHOLDER_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.content, "Hello");

    let sent = platform_bodies(&relay, "/api/dialog/msg/sendtext").await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1]["update_id"], PLACEHOLDER_ID);
    assert_eq!(sent[1]["text"], "Hello");
}

#[tokio::test]
async fn expired_session_ends_with_single_done() {
    let relay = start_relay().await;
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64;
    queries::sessions::insert_if_absent(
        relay.storage.database().unwrap(),
        &PendingRequest::store_key("stale"),
        "{}",
        now_ms - 700_000,
        now_ms - 100_000,
    )
    .await
    .unwrap();

    for token in ["stale", "never-issued"] {
        let frames = open_stream(&relay, token).await;
        assert_eq!(
            summary(&frames),
            vec![(SseKind::Done, "stream does not exist".to_string())]
        );
    }
    assert!(relay.backend.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn backend_error_status_is_reported_inline() {
    let relay = start_relay().await;
    Mock::given(method("POST"))
        .and(path("/stream"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&relay.backend)
        .await;

    post_webhook(&relay, &WebhookFields::direct("hi")).await;
    let notified = platform_bodies(&relay, "/api/dialog/msg/sendstream").await;
    let url = notified[0]["stream_url"].as_str().unwrap();
    let token = url.rsplit('/').next().unwrap();

    let frames = open_stream(&relay, token).await;
    assert_eq!(
        summary(&frames),
        vec![(SseKind::Done, "backend request failed".to_string())]
    );
    assert_eq!(frames[0].id, PLACEHOLDER_ID);
}

#[tokio::test]
async fn upstream_error_becomes_the_visible_answer() {
    let relay = start_relay().await;
    mount_backend_stream(
        &relay,
        concat!(
            "data: {\"type\": \"token\", \"content\": \"par\"}\n",
            "data: {\"type\": \"error\", \"content\": \"Error code: 429 - {'message': 'rate limited', 'type': None}\"}\n",
            "data: [DONE]\n",
        ),
    )
    .await;

    post_webhook(&relay, &WebhookFields::direct("hi")).await;
    let notified = platform_bodies(&relay, "/api/dialog/msg/sendstream").await;
    let token = notified[0]["stream_url"]
        .as_str()
        .unwrap()
        .rsplit('/')
        .next()
        .unwrap()
        .to_string();

    let frames = open_stream(&relay, &token).await;
    assert_eq!(
        summary(&frames),
        vec![
            (SseKind::Append, "par".to_string()),
            (SseKind::Done, "rate limited".to_string()),
        ]
    );

    let row = queries::messages::get_by_send_id(relay.storage.database().unwrap(), PLACEHOLDER_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.content, "rate limited");
}

#[tokio::test]
async fn invalid_utf8_line_does_not_end_the_stream() {
    let relay = start_relay().await;
    let mut body = b"data: {\"type\": \"token\", \"content\": \"Hel\"}\n".to_vec();
    body.extend_from_slice(b"data: {\"type\": \"token\", \xff\xfe}\n");
    body.extend_from_slice(b"data: {\"type\": \"message\", \"content\": {\"content\": \"Hello\"}}\n");
    body.extend_from_slice(b"data: [DONE]\n");
    Mock::given(method("POST"))
        .and(path("/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&relay.backend)
        .await;

    post_webhook(&relay, &WebhookFields::direct("hi")).await;
    let notified = platform_bodies(&relay, "/api/dialog/msg/sendstream").await;
    let token = notified[0]["stream_url"]
        .as_str()
        .unwrap()
        .rsplit('/')
        .next()
        .unwrap()
        .to_string();

    let frames = open_stream(&relay, &token).await;
    assert_eq!(
        summary(&frames),
        vec![
            (SseKind::Append, "Hel".to_string()),
            (SseKind::Done, String::new()),
        ]
    );

    let row = queries::messages::get_by_send_id(relay.storage.database().unwrap(), PLACEHOLDER_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.content, "Hello");
}

#[tokio::test]
async fn unknown_bot_gets_notice_and_no_session() {
    let relay = start_relay().await;

    let (status, body) =
        post_webhook(&relay, &WebhookFields::direct("hi").set("bot_uid", "12345")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "agent_unavailable");

    let sent = platform_bodies(&relay, "/api/dialog/msg/sendtext").await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["text"], "agent does not exist");
    assert_eq!(sent[0]["text_type"], "text");
    assert!(platform_bodies(&relay, "/api/dialog/msg/sendstream").await.is_empty());
}

#[tokio::test]
async fn health_is_ok_with_sqlite() {
    let relay = start_relay().await;
    let response = relay
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
}
