// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value store with per-key expiry carrying pending requests between phases.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::RelayError;
use crate::traits::adapter::PluginAdapter;

/// Shared store for serialized [`PendingRequest`](crate::types::PendingRequest)
/// records.
///
/// Implementations must give read-after-write consistency: a value written by
/// one task is visible to every later `get` until it expires.
#[async_trait]
pub trait SessionStore: PluginAdapter {
    /// Stores `value` under `key` for `ttl` unless a live entry already holds
    /// the key. Returns `false` on collision, leaving the existing entry alone.
    async fn insert_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, RelayError>;

    /// Returns the live value for `key`; expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>, RelayError>;
}
