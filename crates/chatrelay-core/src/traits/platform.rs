// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat platform client operations.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{BotInfo, BotSpec, OutgoingMessage, PlatformUser, SentMessage};

/// Remote calls into the chat platform. Every call authenticates with the
/// bot credential `token` of the request being served; none are retried.
#[async_trait]
pub trait ChatPlatform: PluginAdapter {
    /// Creates a message, or rewrites one when `update_id` is set.
    async fn send_message(
        &self,
        token: &str,
        message: OutgoingMessage,
    ) -> Result<SentMessage, RelayError>;

    /// Asks the platform to open a streaming connection to `stream_url` for `user_id`.
    async fn notify_stream(
        &self,
        token: &str,
        user_id: i64,
        stream_url: &str,
    ) -> Result<(), RelayError>;

    /// Profile of the user owning `token`.
    async fn user_info(&self, token: &str) -> Result<PlatformUser, RelayError>;

    async fn create_bot(&self, token: &str, spec: BotSpec) -> Result<BotInfo, RelayError>;

    async fn update_bot(
        &self,
        token: &str,
        bot_id: i64,
        spec: BotSpec,
    ) -> Result<BotInfo, RelayError>;

    async fn delete_bot(&self, token: &str, bot_id: i64, remark: &str) -> Result<(), RelayError>;
}
