// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the chat platform's REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use chatrelay_config::model::PlatformConfig;
use chatrelay_core::types::{
    BotInfo, BotSpec, OutgoingMessage, PlatformUser, SentMessage,
};
use chatrelay_core::{AdapterType, ChatPlatform, HealthStatus, PluginAdapter, RelayError};

use crate::types::{BotBody, DeleteBotBody, Envelope, SendStreamBody, SendTextBody};

/// Header carrying the bot credential.
const TOKEN_HEADER: &str = "token";

/// Chat platform client. One instance serves every bot; the credential is
/// supplied per call.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    client: reqwest::Client,
    base_url: String,
}

impl PlatformClient {
    pub fn new(config: &PlatformConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RelayError::Platform {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        body: &B,
    ) -> Result<T, RelayError> {
        let request = self
            .client
            .post(self.url(path))
            .header(TOKEN_HEADER, token)
            .json(body);
        self.execute(path, request).await
    }

    async fn get<T: DeserializeOwned>(&self, token: &str, path: &str) -> Result<T, RelayError> {
        let request = self.client.get(self.url(path)).header(TOKEN_HEADER, token);
        self.execute(path, request).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, RelayError> {
        let response = request.send().await.map_err(|e| RelayError::Platform {
            message: format!("{path}: request failed: {e}"),
            source: Some(Box::new(e)),
        })?;

        let status = response.status();
        debug!(path, status = %status, "platform response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::platform(format!("{path}: HTTP {status}: {body}")));
        }

        let envelope: Envelope = response.json().await.map_err(|e| RelayError::Platform {
            message: format!("{path}: malformed response: {e}"),
            source: Some(Box::new(e)),
        })?;
        if envelope.ret != 1 {
            return Err(RelayError::platform(format!(
                "{path}: ret={}: {}",
                envelope.ret, envelope.msg
            )));
        }

        serde_json::from_value(envelope.data).map_err(|e| RelayError::Platform {
            message: format!("{path}: unexpected data shape: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

#[async_trait]
impl PluginAdapter for PlatformClient {
    fn name(&self) -> &str {
        "platform"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Platform
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        // Every call needs a bot credential, so there is nothing to probe.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for PlatformClient {
    async fn send_message(
        &self,
        token: &str,
        message: OutgoingMessage,
    ) -> Result<SentMessage, RelayError> {
        self.post(token, "/api/dialog/msg/sendtext", &SendTextBody::from(&message))
            .await
    }

    async fn notify_stream(
        &self,
        token: &str,
        user_id: i64,
        stream_url: &str,
    ) -> Result<(), RelayError> {
        let body = SendStreamBody {
            userid: user_id,
            stream_url,
        };
        let _: serde_json::Value = self.post(token, "/api/dialog/msg/sendstream", &body).await?;
        Ok(())
    }

    async fn user_info(&self, token: &str) -> Result<PlatformUser, RelayError> {
        self.get(token, "/api/users/info").await
    }

    async fn create_bot(&self, token: &str, spec: BotSpec) -> Result<BotInfo, RelayError> {
        self.post(token, "/api/users/bot/add", &BotBody::new(None, &spec))
            .await
    }

    async fn update_bot(
        &self,
        token: &str,
        bot_id: i64,
        spec: BotSpec,
    ) -> Result<BotInfo, RelayError> {
        self.post(token, "/api/users/bot/edit", &BotBody::new(Some(bot_id), &spec))
            .await
    }

    async fn delete_bot(&self, token: &str, bot_id: i64, remark: &str) -> Result<(), RelayError> {
        let body = DeleteBotBody { id: bot_id, remark };
        let _: serde_json::Value = self.post(token, "/api/users/bot/delete", &body).await?;
        Ok(())
    }
}
