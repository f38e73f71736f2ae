// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook ingest: the first half of the two-phase handoff.
//!
//! The platform posts the inbound chat message here. On success the relay
//! has posted a placeholder reply, stored a [`PendingRequest`] under a fresh
//! session token, and told the platform where to open the stream. The HTTP
//! response itself carries nothing the platform acts on.

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use chatrelay_core::types::{DialogType, MessageSender, OutgoingMessage};
use chatrelay_core::{PendingRequest, RelayError};

use crate::base_url::{external_base_url, stream_url};
use crate::handlers::{ErrorResponse, StatusResponse, VALIDATION_CODE};
use crate::server::GatewayState;

/// Token generation attempts before giving up on collisions.
pub const MAX_TOKEN_ATTEMPTS: usize = 3;

pub const AGENT_MISSING: &str = "agent does not exist";
pub const AGENT_DISABLED: &str = "agent not enabled";

/// Form-encoded body of the platform's webhook call.
///
/// `msg_user` and `extras` arrive as JSON-encoded strings.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebhookForm {
    pub text: String,
    pub reply_text: String,
    pub token: String,
    pub dialog_id: i64,
    pub session_id: i64,
    pub dialog_type: String,
    pub msg_id: i64,
    pub msg_uid: i64,
    #[serde(deserialize_with = "json_encoded")]
    pub msg_user: MessageSender,
    pub mention: i64,
    pub bot_uid: i64,
    pub version: String,
    #[serde(deserialize_with = "json_encoded")]
    pub extras: Map<String, Value>,
}

fn json_encoded<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = String::deserialize(deserializer)?;
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&raw).map_err(serde::de::Error::custom)
}

impl WebhookForm {
    pub fn dialog_type(&self) -> DialogType {
        self.dialog_type.parse().unwrap_or_default()
    }

    pub fn mentioned(&self) -> bool {
        self.mention != 0
    }

    /// The session record for this message, before a token is assigned.
    pub fn into_pending(self, send_id: i64) -> PendingRequest {
        let dialog_type = self.dialog_type();
        let mention = self.mentioned();
        PendingRequest {
            text: self.text,
            reply_text: self.reply_text,
            bot_token: self.token,
            dialog_id: self.dialog_id,
            session_id: self.session_id,
            dialog_type,
            msg_id: self.msg_id,
            msg_uid: self.msg_uid,
            msg_user: self.msg_user,
            mention,
            bot_uid: self.bot_uid,
            version: self.version,
            extras: self.extras,
            session_token: String::new(),
            send_id,
        }
    }
}

/// How an ingest call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Group message that did not mention the bot.
    Ignored,
    /// The bot has no usable agent; a notice went to the dialog.
    AgentUnavailable,
    /// Placeholder posted, session stored, platform notified.
    Accepted { session_token: String },
}

impl IngestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::AgentUnavailable => "agent_unavailable",
            Self::Accepted { .. } => "accepted",
        }
    }
}

/// POST /service/webhook
pub async fn post_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    form: Result<Form<WebhookForm>, FormRejection>,
) -> Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "rejected undecodable webhook payload");
            return ErrorResponse::new(VALIDATION_CODE, rejection.body_text())
                .into_response_with(StatusCode::BAD_REQUEST);
        }
    };

    let base_url = external_base_url(state.settings.public_base_url.as_deref(), &headers);
    let dialog_id = form.dialog_id;
    match ingest(&state, form, &base_url).await {
        Ok(outcome) => Json(StatusResponse {
            status: outcome.as_str(),
        })
        .into_response(),
        Err(e) => {
            tracing::error!(dialog_id, error = %e, "webhook ingest failed");
            ErrorResponse::new("INTERNAL_001", e.to_string())
                .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Run the ingest sequence for one inbound message.
pub async fn ingest(
    state: &GatewayState,
    form: WebhookForm,
    base_url: &str,
) -> Result<IngestOutcome, RelayError> {
    if form.dialog_type() == DialogType::Group && !form.mentioned() {
        tracing::debug!(dialog_id = form.dialog_id, "group message without mention, ignoring");
        return Ok(IngestOutcome::Ignored);
    }

    let notice = match state.catalog.agent_by_bot(form.bot_uid).await? {
        None => Some(AGENT_MISSING),
        Some(agent) if !agent.is_active => Some(AGENT_DISABLED),
        Some(_) => None,
    };
    if let Some(text) = notice {
        tracing::info!(bot_id = form.bot_uid, dialog_id = form.dialog_id, reason = text, "agent unavailable");
        let message = OutgoingMessage::notice(form.dialog_id, text);
        if let Err(e) = state.platform.send_message(&form.token, message).await {
            tracing::warn!(dialog_id = form.dialog_id, error = %e, "failed to send agent notice");
        }
        return Ok(IngestOutcome::AgentUnavailable);
    }

    let placeholder = OutgoingMessage::placeholder(
        form.dialog_id,
        state.settings.placeholder_text.as_str(),
        form.msg_id,
    );
    let sent = state.platform.send_message(&form.token, placeholder).await?;
    if sent.id == 0 {
        return Err(RelayError::platform("placeholder reply returned no message id"));
    }

    let mut request = form.into_pending(sent.id);
    let token = store_pending(state, &mut request).await?;

    let url = stream_url(base_url, &token);
    state
        .platform
        .notify_stream(&request.bot_token, request.msg_uid, &url)
        .await?;

    tracing::info!(
        send_id = request.send_id,
        dialog_id = request.dialog_id,
        bot_id = request.bot_uid,
        "pending request stored, stream requested"
    );
    Ok(IngestOutcome::Accepted {
        session_token: token,
    })
}

/// Assign a fresh token to `request` and store it, retrying on collision.
async fn store_pending(
    state: &GatewayState,
    request: &mut PendingRequest,
) -> Result<String, RelayError> {
    for attempt in 1..=MAX_TOKEN_ATTEMPTS {
        let token = generate_token(state.settings.token_length);
        request.session_token = token.clone();
        let value = serde_json::to_string(request)
            .map_err(|e| RelayError::Session(format!("failed to encode pending request: {e}")))?;

        let key = PendingRequest::store_key(&token);
        if state
            .sessions
            .insert_if_absent(&key, &value, state.settings.session_ttl)
            .await?
        {
            return Ok(token);
        }
        tracing::warn!(attempt, send_id = request.send_id, "session token collision");
    }
    Err(RelayError::Session(format!(
        "no unique session token after {MAX_TOKEN_ATTEMPTS} attempts"
    )))
}

/// Random alphanumeric token drawn from the OS RNG.
pub fn generate_token(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use proptest::prelude::*;

    #[test]
    fn form_decodes_json_encoded_fields() {
        let body = serde_json::json!({
            "text": "hi bot",
            "token": "bot-secret",
            "dialog_id": 42,
            "dialog_type": "group",
            "msg_id": 7,
            "msg_uid": 3,
            "msg_user": r#"{"userid": 3, "nickname": "alice", "lang": "en"}"#,
            "mention": 1,
            "bot_uid": 99,
            "extras": r#"{"source": "mobile"}"#,
        });
        let form: WebhookForm = serde_json::from_value(body).unwrap();

        assert_eq!(form.dialog_type(), DialogType::Group);
        assert!(form.mentioned());
        assert_eq!(form.msg_user.nickname, "alice");
        assert_eq!(form.extras["source"], "mobile");
        assert_eq!(form.reply_text, "");
        assert_eq!(form.session_id, 0);
    }

    #[test]
    fn empty_json_fields_default() {
        let body = serde_json::json!({ "msg_user": "", "extras": "  ", "dialog_type": "" });
        let form: WebhookForm = serde_json::from_value(body).unwrap();
        assert_eq!(form.msg_user, MessageSender::default());
        assert!(form.extras.is_empty());
        assert_eq!(form.dialog_type(), DialogType::User);
    }

    #[test]
    fn malformed_msg_user_is_rejected() {
        let body = serde_json::json!({ "msg_user": "{not json" });
        assert!(serde_json::from_value::<WebhookForm>(body).is_err());
    }

    #[test]
    fn pending_request_carries_every_field() {
        let form = WebhookForm {
            text: "hello".into(),
            reply_text: "earlier".into(),
            token: "bot-secret".into(),
            dialog_id: 5,
            session_id: 6,
            dialog_type: "user".into(),
            msg_id: 10,
            msg_uid: 11,
            mention: 0,
            bot_uid: 12,
            version: "1.0".into(),
            ..WebhookForm::default()
        };
        let request = form.into_pending(900);
        assert_eq!(request.send_id, 900);
        assert_eq!(request.bot_token, "bot-secret");
        assert_eq!(request.reply_text, "earlier");
        assert_eq!(request.thread_id(), 6);
        assert!(!request.mention);
        assert!(request.session_token.is_empty());
    }

    #[test]
    fn tokens_are_alphanumeric_of_requested_length() {
        let token = generate_token(12);
        assert_eq!(token.len(), 12);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    proptest! {
        #[test]
        fn generated_tokens_do_not_repeat(count in 1usize..500, length in 8usize..=64) {
            let tokens: HashSet<String> = (0..count).map(|_| generate_token(length)).collect();
            prop_assert_eq!(tokens.len(), count);
        }
    }
}
