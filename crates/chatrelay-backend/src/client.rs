// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the AI backend's `/stream` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use chatrelay_config::model::BackendConfig;
use chatrelay_core::types::GenerationRequest;
use chatrelay_core::{
    AdapterType, GenerationBackend, HealthStatus, LineStream, PluginAdapter, RelayError,
};

use crate::lines::body_lines;

/// Streaming generation client.
///
/// The timeout bounds the wait for response headers only; once the body is
/// streaming it may run as long as the backend keeps producing.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: Option<String>,
    request_timeout: Duration,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, RelayError> {
        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()
            .map_err(|e| RelayError::Backend {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: config
                .base_url
                .as_deref()
                .map(|url| url.trim_end_matches('/').to_string()),
            request_timeout,
        })
    }
}

#[async_trait]
impl PluginAdapter for BackendClient {
    fn name(&self) -> &str {
        "backend"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Backend
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(match self.base_url {
            Some(_) => HealthStatus::Healthy,
            None => HealthStatus::Degraded("backend.base_url is not set".into()),
        })
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl GenerationBackend for BackendClient {
    async fn generate(&self, request: GenerationRequest) -> Result<LineStream, RelayError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| RelayError::Config("backend.base_url is not set".into()))?;

        let send = self
            .client
            .post(format!("{base_url}/stream"))
            .json(&request)
            .send();
        let response = tokio::time::timeout(self.request_timeout, send)
            .await
            .map_err(|_| RelayError::Timeout {
                duration: self.request_timeout,
            })?
            .map_err(|e| RelayError::Backend {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, model = %request.model, "backend stream opened");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::backend(format!(
                "backend returned {status}: {body}"
            )));
        }

        Ok(body_lines(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatrelay_core::types::{AgentConfig, HistoryEntry, MessageRole};
    use futures::StreamExt;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: Option<String>, timeout_secs: u64) -> BackendClient {
        BackendClient::new(&BackendConfig {
            base_url,
            proxy_url: None,
            request_timeout_secs: timeout_secs,
        })
        .unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            message: "hi".into(),
            provider: "openai".into(),
            model: "gpt-4o".into(),
            thread_id: "7".into(),
            user_id: "9".into(),
            system_prompt: "be brief".into(),
            max_tokens: 4000,
            temperature: 0.7,
            messages: vec![HistoryEntry {
                role: MessageRole::User,
                content: "hi".into(),
            }],
            agent_config: AgentConfig {
                api_key: "sk-1".into(),
                base_url: String::new(),
                proxy_url: String::new(),
                temperature: 0.7,
            },
            stream_tokens: true,
        }
    }

    async fn collect(stream: LineStream) -> Vec<String> {
        stream.map(|line| line.unwrap()).collect().await
    }

    #[tokio::test]
    async fn streams_body_lines_in_order() {
        let server = MockServer::start().await;
        let body = "data: {\"type\":\"token\",\"content\":\"Hel\"}\r\n\
                    data: {\"type\":\"token\",\"content\":\"lo\"}\n\
                    \n\
                    data: [DONE]";
        Mock::given(method("POST"))
            .and(path("/stream"))
            .and(body_partial_json(json!({
                "message": "hi",
                "model": "gpt-4o",
                "thread_id": "7",
                "stream_tokens": true,
                "messages": [{"role": "user", "content": "hi"}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let lines = collect(
            client(Some(server.uri()), 5)
                .generate(request())
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(
            lines,
            vec![
                r#"data: {"type":"token","content":"Hel"}"#,
                r#"data: {"type":"token","content":"lo"}"#,
                "",
                "data: [DONE]",
            ]
        );
    }

    #[tokio::test]
    async fn invalid_utf8_spoils_only_its_own_line() {
        let server = MockServer::start().await;
        let mut body = b"data: {\"type\":\"token\",\"content\":\"Hel\"}\n".to_vec();
        body.extend_from_slice(b"data: {\"type\":\"token\",\"content\":\"\xff\"}\n");
        body.extend_from_slice(b"data: {\"type\":\"message\",\"content\":{\"content\":\"Hello\"}}\n");
        Mock::given(method("POST"))
            .and(path("/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&server)
            .await;

        let lines = collect(
            client(Some(server.uri()), 5)
                .generate(request())
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains('\u{fffd}'));
        assert_eq!(
            lines[2],
            r#"data: {"type":"message","content":{"content":"Hello"}}"#
        );
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stream"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(Some(server.uri()), 5)
            .generate(request())
            .await
            .err()
            .expect("500 must fail");
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn slow_headers_time_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stream"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let err = client(Some(server.uri()), 1)
            .generate(request())
            .await
            .err()
            .expect("must time out");
        assert!(matches!(err, RelayError::Timeout { .. }));
    }

    #[tokio::test]
    async fn missing_base_url_fails_fast() {
        let backend = client(None, 5);
        assert!(matches!(
            backend.generate(request()).await.err(),
            Some(RelayError::Config(_))
        ));
        assert!(matches!(
            backend.health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));
    }
}
