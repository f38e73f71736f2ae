// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read access to the agent and model registry.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Agent, AiModel};

/// Lookup of agents by bot and of models by id. The relay never writes here.
#[async_trait]
pub trait AgentCatalog: PluginAdapter {
    async fn agent_by_bot(&self, bot_id: i64) -> Result<Option<Agent>, RelayError>;

    async fn model_by_id(&self, model_id: i64) -> Result<Option<AiModel>, RelayError>;
}
