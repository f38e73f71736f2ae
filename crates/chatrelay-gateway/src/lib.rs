// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for chatrelay.
//!
//! Two decoupled exchanges correlated through the session store:
//! - `POST /service/webhook` posts a placeholder reply, stores the pending
//!   request under a fresh token, and asks the platform to open the stream.
//! - `GET /service/stream/{token}` resolves the token, calls the AI backend,
//!   and relays its events as SSE while mirroring the answer to the chat.

pub mod base_url;
pub mod classifier;
pub mod handlers;
pub mod server;
pub mod sse;
pub mod stream;
pub mod transcript;
pub mod webhook;

pub use classifier::{Dispatched, RelayContext, dispatch, parse_error_content};
pub use server::{GatewayState, RelaySettings, router, start_server};
pub use sse::{SseFrame, SseWriter};
pub use webhook::{IngestOutcome, WebhookForm, ingest};
