// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence for chatrelay.
//!
//! WAL-mode SQLite with embedded migrations and a single-writer model via
//! `tokio-rusqlite`, holding agents, models, transcript rows and pending
//! sessions. [`MemorySessionStore`] covers single-process deployments.

pub mod adapter;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use memory::MemorySessionStore;
