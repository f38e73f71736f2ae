// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for chatrelay integration tests.
//!
//! Provides mock collaborators and a harness for fast, deterministic tests
//! without a chat platform or AI backend.
//!
//! # Components
//!
//! - [`MockChatPlatform`] - records sent messages and stream notifications
//! - [`MockBackend`] - scripted backend line streams
//! - [`MockCatalog`] / [`MockTranscript`] - in-memory agents, models, transcript rows
//! - [`RelayHarness`] - all of the above behind a gateway router

pub mod harness;
pub mod mock_backend;
pub mod mock_platform;
pub mod mock_store;

pub use harness::{
    BASE_URL, RelayHarness, StreamReply, WebhookFields, parse_frames, sample_request,
    token_from_url,
};
pub use mock_backend::{MockBackend, event_line, token_line};
pub use mock_platform::{MockChatPlatform, StreamNotification};
pub use mock_store::{MockCatalog, MockTranscript, active_agent, enabled_model};
