// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each takes a [`Database`](crate::Database) and runs on
//! its background thread.

pub mod agents;
pub mod messages;
pub mod sessions;
