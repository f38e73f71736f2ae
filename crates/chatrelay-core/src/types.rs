// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the relay handlers and their collaborators.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays in the relay.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Session,
    Platform,
    Backend,
}

// --- Inbound webhook / session record ---

/// Kind of dialog an inbound message arrived in.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DialogType {
    /// One-to-one conversation with the bot.
    #[default]
    User,
    /// Group conversation; the bot only answers when mentioned.
    Group,
}

/// Profile of the user who sent the inbound message.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageSender {
    pub userid: i64,
    pub email: String,
    pub nickname: String,
    pub profession: String,
    pub lang: String,
    pub token: String,
}

impl std::fmt::Debug for MessageSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageSender")
            .field("userid", &self.userid)
            .field("email", &self.email)
            .field("nickname", &self.nickname)
            .field("profession", &self.profession)
            .field("lang", &self.lang)
            .field("token", &"[redacted]")
            .finish()
    }
}

/// The record carried from the webhook phase to the stream phase.
///
/// Written once under [`PendingRequest::store_key`] after the placeholder
/// reply exists, then only read. Field names match the JSON the session
/// store holds, so records written by other relay instances decode here.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub text: String,
    #[serde(default)]
    pub reply_text: String,
    /// Bot credential used for every platform call made on behalf of this request.
    #[serde(rename = "token")]
    pub bot_token: String,
    pub dialog_id: i64,
    #[serde(default)]
    pub session_id: i64,
    #[serde(default)]
    pub dialog_type: DialogType,
    pub msg_id: i64,
    pub msg_uid: i64,
    #[serde(default)]
    pub msg_user: MessageSender,
    #[serde(default)]
    pub mention: bool,
    pub bot_uid: i64,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub extras: Map<String, Value>,
    #[serde(rename = "stream_id")]
    pub session_token: String,
    /// Id of the placeholder reply; every later update targets it.
    pub send_id: i64,
}

impl PendingRequest {
    /// Namespace prefix of session store keys.
    pub const KEY_PREFIX: &'static str = "stream:";

    /// Session store key for a token.
    pub fn store_key(token: &str) -> String {
        format!("{}{token}", Self::KEY_PREFIX)
    }

    /// Conversation thread forwarded to the backend. Falls back to the
    /// dialog when the platform did not supply a session.
    pub fn thread_id(&self) -> i64 {
        if self.session_id != 0 {
            self.session_id
        } else {
            self.dialog_id
        }
    }
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("text", &self.text)
            .field("reply_text", &self.reply_text)
            .field("bot_token", &"[redacted]")
            .field("dialog_id", &self.dialog_id)
            .field("session_id", &self.session_id)
            .field("dialog_type", &self.dialog_type)
            .field("msg_id", &self.msg_id)
            .field("msg_uid", &self.msg_uid)
            .field("msg_user", &self.msg_user)
            .field("mention", &self.mention)
            .field("bot_uid", &self.bot_uid)
            .field("version", &self.version)
            .field("extras", &self.extras)
            .field("session_token", &self.session_token)
            .field("send_id", &self.send_id)
            .finish()
    }
}

// --- Agents, models and transcript rows ---

/// An agent bound to a chat-platform bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    /// System prompt sent with every generation request.
    pub prompt: String,
    pub ai_model_id: Option<i64>,
    pub temperature: f64,
    pub bot_id: i64,
    pub user_id: i64,
    pub is_active: bool,
}

/// A configured model an agent generates with.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AiModel {
    pub id: i64,
    pub name: String,
    pub provider: String,
    pub model_name: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub proxy_url: Option<String>,
    pub max_tokens: i64,
    pub temperature: f64,
    /// Absent is treated as disabled.
    pub is_enabled: Option<bool>,
}

impl AiModel {
    pub fn enabled(&self) -> bool {
        self.is_enabled.unwrap_or(false)
    }
}

impl std::fmt::Debug for AiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiModel")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("model_name", &self.model_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("base_url", &self.base_url)
            .field("proxy_url", &self.proxy_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("is_enabled", &self.is_enabled)
            .finish()
    }
}

/// Author of a transcript row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// A persisted transcript row, addressed by the platform's send id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub send_id: i64,
    pub role: MessageRole,
    pub content: String,
    pub tokens_used: i64,
    pub model_used: Option<String>,
    pub created_at: String,
}

// --- Backend stream ---

/// Kinds of backend event the classifier acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    Token,
    Message,
    Error,
}

/// One decoded line of the backend's event stream.
///
/// The content shape depends on the kind, so it stays untyped here and the
/// classifier checks it per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub is_first: bool,
}

impl StreamEvent {
    /// Known kind of this event, `None` for kinds this relay does not handle.
    pub fn event_kind(&self) -> Option<EventKind> {
        self.kind.parse().ok()
    }
}

/// One raw line of the backend body, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendLine {
    Event(StreamEvent),
    /// The `[DONE]` sentinel.
    Done,
    /// Nothing but whitespace or a bare `data:` prefix.
    Blank,
    /// Not a `{type, content}` record; carries the trimmed line and the decode error.
    Malformed { line: String, error: String },
}

impl BackendLine {
    /// Strip an optional `data:` prefix and surrounding whitespace, then decode.
    pub fn parse(raw: &str) -> Self {
        let line = raw.trim();
        let line = line.strip_prefix("data:").map_or(line, str::trim);
        if line.is_empty() {
            return Self::Blank;
        }
        if line == "[DONE]" {
            return Self::Done;
        }
        match serde_json::from_str::<StreamEvent>(line) {
            Ok(event) => Self::Event(event),
            Err(e) => Self::Malformed {
                line: line.to_string(),
                error: e.to_string(),
            },
        }
    }
}

/// SSE event names written to the stream client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SseKind {
    /// Extend the placeholder with more text.
    Append,
    /// Overwrite the placeholder.
    Replace,
    /// Terminal event.
    Done,
}

/// Provider settings forwarded to the backend per request.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub api_key: String,
    pub base_url: String,
    pub proxy_url: String,
    pub temperature: f64,
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .field("proxy_url", &self.proxy_url)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// A single history entry of a generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: MessageRole,
    pub content: String,
}

/// Body of the backend's streaming generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub message: String,
    pub provider: String,
    pub model: String,
    pub thread_id: String,
    pub user_id: String,
    pub system_prompt: String,
    pub max_tokens: i64,
    pub temperature: f64,
    pub messages: Vec<HistoryEntry>,
    pub agent_config: AgentConfig,
    pub stream_tokens: bool,
}

impl GenerationRequest {
    /// Assemble the request for one pending exchange. The user's message is
    /// the only history entry.
    pub fn assemble(
        request: &PendingRequest,
        agent: &Agent,
        model: &AiModel,
        proxy_url: Option<&str>,
    ) -> Self {
        let proxy_url = model
            .proxy_url
            .as_deref()
            .filter(|p| !p.is_empty())
            .or(proxy_url)
            .unwrap_or_default()
            .to_string();
        Self {
            message: request.text.clone(),
            provider: model.provider.clone(),
            model: model.model_name.clone(),
            thread_id: request.thread_id().to_string(),
            user_id: agent.user_id.to_string(),
            system_prompt: agent.prompt.clone(),
            max_tokens: model.max_tokens,
            temperature: model.temperature,
            messages: vec![HistoryEntry {
                role: MessageRole::User,
                content: request.text.clone(),
            }],
            agent_config: AgentConfig {
                api_key: model.api_key.clone().unwrap_or_default(),
                base_url: model.base_url.clone(),
                proxy_url,
                temperature: model.temperature,
            },
            stream_tokens: true,
        }
    }
}

// --- Chat platform ---

/// Body format of an outgoing chat message.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TextType {
    #[default]
    Text,
    Md,
}

/// A message the relay asks the platform to create or update.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub dialog_id: i64,
    pub text: String,
    pub text_type: TextType,
    /// Deliver without a notification.
    pub silence: bool,
    pub reply_id: Option<i64>,
    pub reply_check: bool,
    /// Rewrite this existing message instead of creating one.
    pub update_id: Option<i64>,
    /// Mark the updated message as edited.
    pub update_mark: bool,
}

impl OutgoingMessage {
    /// Plain-text notice, used when a bot has no usable agent.
    pub fn notice(dialog_id: i64, text: impl Into<String>) -> Self {
        Self {
            dialog_id,
            text: text.into(),
            text_type: TextType::Text,
            silence: true,
            reply_id: None,
            reply_check: false,
            update_id: None,
            update_mark: false,
        }
    }

    /// Placeholder reply to `reply_to`, whose id becomes the send id.
    pub fn placeholder(dialog_id: i64, text: impl Into<String>, reply_to: i64) -> Self {
        Self {
            dialog_id,
            text: text.into(),
            text_type: TextType::Md,
            silence: true,
            reply_id: Some(reply_to),
            reply_check: true,
            update_id: None,
            update_mark: false,
        }
    }

    /// Silent in-place rewrite of the placeholder.
    pub fn update(dialog_id: i64, send_id: i64, text: impl Into<String>) -> Self {
        Self {
            dialog_id,
            text: text.into(),
            text_type: TextType::Md,
            silence: true,
            reply_id: None,
            reply_check: false,
            update_id: Some(send_id),
            update_mark: false,
        }
    }
}

/// The platform's view of a message it just created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentMessage {
    pub id: i64,
    pub dialog_id: i64,
}

/// Basic profile returned by the platform's user lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformUser {
    pub userid: i64,
    pub email: String,
    pub nickname: String,
    pub profession: String,
    pub lang: String,
}

/// Settings for creating or editing a bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotSpec {
    pub name: String,
    pub webhook_url: String,
    /// Whether the bot keeps per-dialog sessions.
    pub session: bool,
}

/// A bot as reported back by the platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotInfo {
    pub id: i64,
    pub name: String,
}
