// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update-only access to transcript rows.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::traits::adapter::PluginAdapter;

/// Finalizes transcript rows created by the platform's own message pipeline.
#[async_trait]
pub trait TranscriptStore: PluginAdapter {
    /// Overwrites the content of the row carrying `send_id`.
    ///
    /// Returns `false` when no such row exists; nothing is created.
    async fn update_content_by_send_id(
        &self,
        send_id: i64,
        content: &str,
    ) -> Result<bool, RelayError>;
}
