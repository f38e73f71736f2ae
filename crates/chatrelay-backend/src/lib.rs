// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI backend adapter for chatrelay.
//!
//! [`BackendClient`] posts a generation request to `<base_url>/stream` and
//! hands back the response body as a stream of raw lines. Classifying those
//! lines is the gateway's job.

pub mod client;
pub mod lines;

pub use client::BackendClient;
