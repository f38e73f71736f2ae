// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming generation backend.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::RelayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::GenerationRequest;

/// Raw lines of the backend's response body, in arrival order.
pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, RelayError>> + Send>>;

/// The AI backend the stream phase drives.
#[async_trait]
pub trait GenerationBackend: PluginAdapter {
    /// Starts a generation and returns its body as lines. Fails if the
    /// backend cannot be reached or rejects the request. Dropping the stream
    /// closes the upstream connection.
    async fn generate(&self, request: GenerationRequest) -> Result<LineStream, RelayError>;
}
