// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat platform adapter for chatrelay.
//!
//! [`PlatformClient`] speaks the platform's `{ret, msg, data}` REST API and
//! implements [`ChatPlatform`](chatrelay_core::ChatPlatform): message
//! create/update, stream notification, user lookup and bot administration.

pub mod client;
pub mod types;

pub use client::PlatformClient;
