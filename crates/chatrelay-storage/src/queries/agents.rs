// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent and model lookups.
//!
//! Rows are owned by the administration side; the relay only reads them.
//! The insert helpers exist for seeding and tests.

use chatrelay_core::RelayError;
use chatrelay_core::types::{Agent, AiModel};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};

const AGENT_COLUMNS: &str = "id, name, prompt, ai_model_id, temperature, bot_id, user_id, is_active";
const MODEL_COLUMNS: &str = "id, name, provider, model_name, api_key, base_url, proxy_url, \
                             max_tokens, temperature, is_enabled";

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: row.get(0)?,
        name: row.get(1)?,
        prompt: row.get(2)?,
        ai_model_id: row.get(3)?,
        temperature: row.get(4)?,
        bot_id: row.get(5)?,
        user_id: row.get(6)?,
        is_active: row.get(7)?,
    })
}

fn model_from_row(row: &Row<'_>) -> rusqlite::Result<AiModel> {
    Ok(AiModel {
        id: row.get(0)?,
        name: row.get(1)?,
        provider: row.get(2)?,
        model_name: row.get(3)?,
        api_key: row.get(4)?,
        base_url: row.get(5)?,
        proxy_url: row.get(6)?,
        max_tokens: row.get(7)?,
        temperature: row.get(8)?,
        is_enabled: row.get(9)?,
    })
}

/// The agent bound to `bot_id`. If several rows share a bot, the newest wins.
pub async fn agent_by_bot(db: &Database, bot_id: i64) -> Result<Option<Agent>, RelayError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE bot_id = ?1 ORDER BY id DESC LIMIT 1"),
                params![bot_id],
                agent_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn model_by_id(db: &Database, model_id: i64) -> Result<Option<AiModel>, RelayError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {MODEL_COLUMNS} FROM ai_models WHERE id = ?1"),
                params![model_id],
                model_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert an agent, returning its row id. `agent.id` is ignored.
pub async fn insert_agent(db: &Database, agent: &Agent) -> Result<i64, RelayError> {
    let agent = agent.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO agents (name, prompt, ai_model_id, temperature, bot_id, user_id, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    agent.name,
                    agent.prompt,
                    agent.ai_model_id,
                    agent.temperature,
                    agent.bot_id,
                    agent.user_id,
                    agent.is_active,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a model, returning its row id. `model.id` is ignored.
pub async fn insert_model(db: &Database, model: &AiModel) -> Result<i64, RelayError> {
    let model = model.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO ai_models (name, provider, model_name, api_key, base_url, proxy_url,
                                        max_tokens, temperature, is_enabled)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    model.name,
                    model.provider,
                    model.model_name,
                    model.api_key,
                    model.base_url,
                    model.proxy_url,
                    model.max_tokens,
                    model.temperature,
                    model.is_enabled,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}
