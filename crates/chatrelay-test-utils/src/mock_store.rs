// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory agent catalog and transcript store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use chatrelay_core::types::{AdapterType, Agent, AiModel, HealthStatus};
use chatrelay_core::{AgentCatalog, PluginAdapter, RelayError, TranscriptStore};

/// Agents keyed by bot id, models keyed by id.
pub struct MockCatalog {
    agents: Arc<Mutex<HashMap<i64, Agent>>>,
    models: Arc<Mutex<HashMap<i64, AiModel>>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            agents: Arc::new(Mutex::new(HashMap::new())),
            models: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn insert_agent(&self, agent: Agent) {
        self.agents.lock().await.insert(agent.bot_id, agent);
    }

    pub async fn insert_model(&self, model: AiModel) {
        self.models.lock().await.insert(model.id, model);
    }
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockCatalog {
    fn name(&self) -> &str {
        "mock-catalog"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl AgentCatalog for MockCatalog {
    async fn agent_by_bot(&self, bot_id: i64) -> Result<Option<Agent>, RelayError> {
        Ok(self.agents.lock().await.get(&bot_id).cloned())
    }

    async fn model_by_id(&self, model_id: i64) -> Result<Option<AiModel>, RelayError> {
        Ok(self.models.lock().await.get(&model_id).cloned())
    }
}

/// Transcript rows keyed by send id, plus a log of every update call.
pub struct MockTranscript {
    rows: Arc<Mutex<HashMap<i64, String>>>,
    updates: Arc<Mutex<Vec<(i64, String)>>>,
}

impl MockTranscript {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(Mutex::new(HashMap::new())),
            updates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create the row the platform's own message pipeline would have written.
    pub async fn insert_row(&self, send_id: i64, content: &str) {
        self.rows.lock().await.insert(send_id, content.to_string());
    }

    pub async fn content(&self, send_id: i64) -> Option<String> {
        self.rows.lock().await.get(&send_id).cloned()
    }

    /// Every `(send_id, content)` update attempted, matched or not.
    pub async fn updates(&self) -> Vec<(i64, String)> {
        self.updates.lock().await.clone()
    }
}

impl Default for MockTranscript {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTranscript {
    fn name(&self) -> &str {
        "mock-transcript"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl TranscriptStore for MockTranscript {
    async fn update_content_by_send_id(
        &self,
        send_id: i64,
        content: &str,
    ) -> Result<bool, RelayError> {
        self.updates
            .lock()
            .await
            .push((send_id, content.to_string()));
        let mut rows = self.rows.lock().await;
        match rows.get_mut(&send_id) {
            Some(row) => {
                *row = content.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// An active agent bound to `bot_id` using `model_id`.
pub fn active_agent(bot_id: i64, model_id: i64) -> Agent {
    Agent {
        id: bot_id + 1,
        name: format!("agent-{bot_id}"),
        prompt: "You are a helpful assistant.".to_string(),
        ai_model_id: Some(model_id),
        temperature: 0.7,
        bot_id,
        user_id: 77,
        is_active: true,
    }
}

/// An enabled model with id `id`.
pub fn enabled_model(id: i64) -> AiModel {
    AiModel {
        id,
        name: "GPT".to_string(),
        provider: "openai".to_string(),
        model_name: "gpt-4o-mini".to_string(),
        api_key: Some("sk-test".to_string()),
        base_url: "https://api.openai.com/v1".to_string(),
        proxy_url: None,
        max_tokens: 2048,
        temperature: 0.5,
        is_enabled: Some(true),
    }
}
