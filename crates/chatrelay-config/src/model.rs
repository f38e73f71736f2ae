// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level relay configuration.
///
/// All sections are optional and default to values suitable for a local
/// single-node deployment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Pending-request session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Chat platform client settings.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// AI backend client settings.
    #[serde(default)]
    pub backend: BackendConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally visible base URL embedded in stream URLs. When unset it is
    /// derived from the forwarding headers of each webhook request.
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: None,
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "chatrelay.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Where pending-request sessions live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// The `pending_sessions` table; visible to every relay process sharing the database.
    #[default]
    Sqlite,
    /// Process-local map; only for single-instance deployments.
    Memory,
}

/// Pending-request session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    #[serde(default)]
    pub backend: SessionBackend,

    /// Seconds before an unconsumed session expires.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Length of generated session tokens.
    #[serde(default = "default_token_length")]
    pub token_length: usize,
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::default(),
            ttl_secs: default_ttl_secs(),
            token_length: default_token_length(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    600
}

fn default_token_length() -> usize {
    12
}

/// Chat platform client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    #[serde(default = "default_platform_url")]
    pub api_base_url: String,

    /// Body of the placeholder reply posted before generation starts.
    #[serde(default = "default_placeholder_text")]
    pub placeholder_text: String,

    #[serde(default = "default_platform_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_platform_url(),
            placeholder_text: default_placeholder_text(),
            request_timeout_secs: default_platform_timeout(),
        }
    }
}

fn default_platform_url() -> String {
    "http://127.0.0.1:2222".to_string()
}

fn default_placeholder_text() -> String {
    "...".to_string()
}

fn default_platform_timeout() -> u64 {
    15
}

/// AI backend client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL of the backend; `/stream` is appended. Streams fail with
    /// "backend request failed" while unset.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Proxy forwarded to the backend for models that don't set their own.
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Seconds allowed for the backend to answer with response headers.
    #[serde(default = "default_backend_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            proxy_url: None,
            request_timeout_secs: default_backend_timeout(),
        }
    }
}

fn default_backend_timeout() -> u64 {
    60
}
