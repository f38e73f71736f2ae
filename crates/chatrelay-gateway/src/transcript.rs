// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript sync: finalize the stored message row for a send id.

use chatrelay_core::TranscriptStore;

/// Overwrite the content of the transcript row for `send_id`.
///
/// Rows are only ever updated here, never created; a missing row is a no-op.
/// Failures are logged and reported as `false` so the stream carries on.
pub async fn sync_transcript(store: &dyn TranscriptStore, send_id: i64, content: &str) -> bool {
    match store.update_content_by_send_id(send_id, content).await {
        Ok(true) => true,
        Ok(false) => {
            tracing::debug!(send_id, "no transcript row for send id, nothing to finalize");
            false
        }
        Err(e) => {
            tracing::error!(send_id, error = %e, "failed to finalize transcript row");
            false
        }
    }
}
