// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for chatrelay.
//!
//! Holds the error type, the pending-request record and backend event types,
//! and the collaborator traits the gateway handlers are written against.

pub mod error;
pub mod traits;
pub mod types;

pub use error::RelayError;
pub use types::{
    AdapterType, BackendLine, HealthStatus, PendingRequest, SseKind, StreamEvent,
};

pub use traits::{
    AgentCatalog, ChatPlatform, GenerationBackend, LineStream, PluginAdapter, SessionStore,
    TranscriptStore,
};
