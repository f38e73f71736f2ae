// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat platform that records every call.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use chatrelay_core::types::{
    AdapterType, BotInfo, BotSpec, HealthStatus, OutgoingMessage, PlatformUser, SentMessage,
};
use chatrelay_core::{ChatPlatform, PluginAdapter, RelayError};

/// A stream notification as received by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamNotification {
    pub token: String,
    pub user_id: i64,
    pub stream_url: String,
}

/// A mock chat platform.
///
/// New messages get increasing ids starting at 1000; updates echo the
/// message they target. Every `send_message` and `notify_stream` call is
/// captured for assertions.
pub struct MockChatPlatform {
    sent: Arc<Mutex<Vec<(String, OutgoingMessage)>>>,
    notifications: Arc<Mutex<Vec<StreamNotification>>>,
    next_id: AtomicI64,
    zero_ids: AtomicBool,
    fail_sends: AtomicBool,
    fail_notify: AtomicBool,
}

impl MockChatPlatform {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            notifications: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicI64::new(1000),
            zero_ids: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            fail_notify: AtomicBool::new(false),
        }
    }

    /// Make new messages come back without an id.
    pub fn return_zero_ids(&self) {
        self.zero_ids.store(true, Ordering::SeqCst);
    }

    /// Make every `send_message` call fail.
    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    /// Make every `notify_stream` call fail.
    pub fn fail_notify(&self) {
        self.fail_notify.store(true, Ordering::SeqCst);
    }

    /// All messages passed to `send_message`, in call order.
    pub async fn sent_messages(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().await.iter().map(|(_, m)| m.clone()).collect()
    }

    /// Tokens used for each `send_message` call.
    pub async fn sent_tokens(&self) -> Vec<String> {
        self.sent.lock().await.iter().map(|(t, _)| t.clone()).collect()
    }

    /// Only the in-place updates.
    pub async fn updates(&self) -> Vec<OutgoingMessage> {
        self.sent_messages()
            .await
            .into_iter()
            .filter(|m| m.update_id.is_some())
            .collect()
    }

    pub async fn notifications(&self) -> Vec<StreamNotification> {
        self.notifications.lock().await.clone()
    }
}

impl Default for MockChatPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChatPlatform {
    fn name(&self) -> &str {
        "mock-platform"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Platform
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for MockChatPlatform {
    async fn send_message(
        &self,
        token: &str,
        message: OutgoingMessage,
    ) -> Result<SentMessage, RelayError> {
        let dialog_id = message.dialog_id;
        let update_id = message.update_id;
        self.sent.lock().await.push((token.to_string(), message));

        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(RelayError::platform("mock send failure"));
        }
        let id = match update_id {
            Some(id) => id,
            None if self.zero_ids.load(Ordering::SeqCst) => 0,
            None => self.next_id.fetch_add(1, Ordering::SeqCst),
        };
        Ok(SentMessage { id, dialog_id })
    }

    async fn notify_stream(
        &self,
        token: &str,
        user_id: i64,
        stream_url: &str,
    ) -> Result<(), RelayError> {
        self.notifications.lock().await.push(StreamNotification {
            token: token.to_string(),
            user_id,
            stream_url: stream_url.to_string(),
        });
        if self.fail_notify.load(Ordering::SeqCst) {
            return Err(RelayError::platform("mock notify failure"));
        }
        Ok(())
    }

    async fn user_info(&self, _token: &str) -> Result<PlatformUser, RelayError> {
        Ok(PlatformUser {
            userid: 1,
            nickname: "mock-user".to_string(),
            ..PlatformUser::default()
        })
    }

    async fn create_bot(&self, _token: &str, spec: BotSpec) -> Result<BotInfo, RelayError> {
        Ok(BotInfo {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: spec.name,
        })
    }

    async fn update_bot(
        &self,
        _token: &str,
        bot_id: i64,
        spec: BotSpec,
    ) -> Result<BotInfo, RelayError> {
        Ok(BotInfo {
            id: bot_id,
            name: spec.name,
        })
    }

    async fn delete_bot(&self, _token: &str, _bot_id: i64, _remark: &str) -> Result<(), RelayError> {
        Ok(())
    }
}
