// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits the relay handlers are written against.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod backend;
pub mod catalog;
pub mod platform;
pub mod session;
pub mod transcript;

pub use adapter::PluginAdapter;
pub use backend::{GenerationBackend, LineStream};
pub use catalog::AgentCatalog;
pub use platform::ChatPlatform;
pub use session::SessionStore;
pub use transcript::TranscriptStore;
