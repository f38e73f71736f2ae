// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript row operations.

use chatrelay_core::RelayError;
use chatrelay_core::types::TranscriptMessage;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Overwrite the content of the first row carrying `send_id`.
///
/// Returns whether a row was updated. Rewriting the same content is a no-op
/// in effect, so repeated calls converge.
pub async fn update_content_by_send_id(
    db: &Database,
    send_id: i64,
    content: &str,
) -> Result<bool, RelayError> {
    let content = content.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE messages SET content = ?1
                 WHERE id = (SELECT MIN(id) FROM messages WHERE send_id = ?2)",
                params![content, send_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a transcript row by send id.
pub async fn get_by_send_id(
    db: &Database,
    send_id: i64,
) -> Result<Option<TranscriptMessage>, RelayError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, conversation_id, send_id, role, content, tokens_used, model_used, created_at
                 FROM messages WHERE send_id = ?1 ORDER BY id ASC LIMIT 1",
                params![send_id],
                |row| {
                    let role: String = row.get(3)?;
                    let role = role.parse().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            3,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?;
                    Ok(TranscriptMessage {
                        id: row.get(0)?,
                        conversation_id: row.get(1)?,
                        send_id: row.get(2)?,
                        role,
                        content: row.get(4)?,
                        tokens_used: row.get(5)?,
                        model_used: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a transcript row, returning its id. Used by the platform-side
/// pipeline and tests; the relay itself never creates rows.
pub async fn insert_message(db: &Database, msg: &TranscriptMessage) -> Result<i64, RelayError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (conversation_id, send_id, role, content, tokens_used, model_used)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    msg.conversation_id,
                    msg.send_id,
                    msg.role.to_string(),
                    msg.content,
                    msg.tokens_used,
                    msg.model_used,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}
