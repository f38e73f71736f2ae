// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expiring key-value rows in `pending_sessions`.
//!
//! Expiry is a unix-millisecond deadline. Rows past it read as absent and are
//! purged by the next insert.

use chatrelay_core::RelayError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Insert unless a live row holds `key`. Returns whether the row was written.
pub async fn insert_if_absent(
    db: &Database,
    key: &str,
    value: &str,
    now_ms: i64,
    expires_at_ms: i64,
) -> Result<bool, RelayError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM pending_sessions WHERE expires_at <= ?1",
                params![now_ms],
            )?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO pending_sessions (key, value, expires_at) VALUES (?1, ?2, ?3)",
                params![key, value, expires_at_ms],
            )?;
            tx.commit()?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// The value under `key` if its deadline is still ahead of `now_ms`.
pub async fn get_live(db: &Database, key: &str, now_ms: i64) -> Result<Option<String>, RelayError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT value FROM pending_sessions WHERE key = ?1 AND expires_at > ?2",
                params![key, now_ms],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
