// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock AI backend with scripted line streams.
//!
//! Each `generate` call pops the next script from a FIFO queue. An empty
//! queue yields a stream containing only `[DONE]`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use tokio::sync::Mutex;

use chatrelay_core::types::{AdapterType, GenerationRequest, HealthStatus};
use chatrelay_core::{GenerationBackend, LineStream, PluginAdapter, RelayError};

struct Script {
    lines: Vec<String>,
    /// Keep the stream open after the last line instead of ending it.
    hold_open: bool,
}

pub struct MockBackend {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    fail: AtomicBool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            fail: AtomicBool::new(false),
        }
    }

    /// Queue the raw lines of one backend response.
    pub async fn push_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scripts.lock().await.push_back(Script {
            lines: lines.into_iter().map(Into::into).collect(),
            hold_open: false,
        });
    }

    /// Queue a response that stalls after its lines, like a slow generation.
    pub async fn push_open_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scripts.lock().await.push_back(Script {
            lines: lines.into_iter().map(Into::into).collect(),
            hold_open: true,
        });
    }

    /// Make every `generate` call fail before streaming.
    pub fn fail_requests(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Requests received so far.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockBackend {
    fn name(&self) -> &str {
        "mock-backend"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Backend
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate(&self, request: GenerationRequest) -> Result<LineStream, RelayError> {
        self.requests.lock().await.push(request);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RelayError::backend("mock backend returned 503"));
        }

        let script = self.scripts.lock().await.pop_front().unwrap_or(Script {
            lines: vec!["[DONE]".to_string()],
            hold_open: false,
        });
        let lines = stream::iter(script.lines.into_iter().map(Ok));
        if script.hold_open {
            Ok(lines.chain(stream::pending()).boxed())
        } else {
            Ok(lines.boxed())
        }
    }
}

/// One backend event line as the backend frames it.
pub fn event_line(kind: &str, content: serde_json::Value) -> String {
    format!(
        "data: {}",
        serde_json::json!({ "type": kind, "content": content })
    )
}

/// A `token` line.
pub fn token_line(text: &str) -> String {
    event_line("token", serde_json::Value::String(text.to_string()))
}
