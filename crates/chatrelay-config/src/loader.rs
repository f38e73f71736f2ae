// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./chatrelay.toml` > `~/.config/chatrelay/chatrelay.toml`
//! > `/etc/chatrelay/chatrelay.toml` with environment variable overrides via the
//! `CHATRELAY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::RelayConfig;

/// Config sections an environment key may address.
const SECTIONS: &[&str] = &["server", "storage", "session", "platform", "backend"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/chatrelay/chatrelay.toml` (system-wide)
/// 3. `~/.config/chatrelay/chatrelay.toml` (user XDG config)
/// 4. `./chatrelay.toml` (local directory)
/// 5. `CHATRELAY_*` environment variables
pub fn load_config() -> Result<RelayConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<RelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for XDG config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::file("/etc/chatrelay/chatrelay.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("chatrelay/chatrelay.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("chatrelay.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Only the leading section name becomes a dot, so underscore-containing
/// keys survive: `CHATRELAY_SERVER_PUBLIC_BASE_URL` -> `server.public_base_url`.
fn env_provider() -> Env {
    Env::prefixed("CHATRELAY_").map(|key| map_env_key(key.as_str()).into())
}

/// Figment passes the key with the prefix stripped but its case kept.
fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_on_first_underscore_only() {
        assert_eq!(
            map_env_key("SERVER_PUBLIC_BASE_URL"),
            "server.public_base_url"
        );
        assert_eq!(map_env_key("SESSION_TTL_SECS"), "session.ttl_secs");
        assert_eq!(
            map_env_key("BACKEND_REQUEST_TIMEOUT_SECS"),
            "backend.request_timeout_secs"
        );
        assert_eq!(map_env_key("backend_base_url"), "backend.base_url");
        assert_eq!(map_env_key("UNKNOWN_KEY"), "unknown_key");
    }
}
