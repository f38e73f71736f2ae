// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::RelayConfig;

const MIN_TOKEN_LENGTH: usize = 8;
const MAX_TOKEN_LENGTH: usize = 64;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(invalid("server.host must not be empty".to_string()));
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(invalid(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            )));
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(invalid("storage.database_path must not be empty".to_string()));
    }

    if config.session.ttl_secs == 0 {
        errors.push(invalid("session.ttl_secs must be at least 1".to_string()));
    }

    let len = config.session.token_length;
    if !(MIN_TOKEN_LENGTH..=MAX_TOKEN_LENGTH).contains(&len) {
        errors.push(invalid(format!(
            "session.token_length must be between {MIN_TOKEN_LENGTH} and {MAX_TOKEN_LENGTH}, got {len}"
        )));
    }

    if config.backend.request_timeout_secs == 0 {
        errors.push(invalid(
            "backend.request_timeout_secs must be at least 1".to_string(),
        ));
    }

    check_url(
        &mut errors,
        "platform.api_base_url",
        Some(&config.platform.api_base_url),
    );
    check_url(
        &mut errors,
        "server.public_base_url",
        config.server.public_base_url.as_ref(),
    );
    check_url(&mut errors, "backend.base_url", config.backend.base_url.as_ref());
    check_url(&mut errors, "backend.proxy_url", config.backend.proxy_url.as_ref());

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Validation { message }
}

fn check_url(errors: &mut Vec<ConfigError>, key: &str, value: Option<&String>) {
    let Some(value) = value else {
        return;
    };
    let rest = value
        .strip_prefix("http://")
        .or_else(|| value.strip_prefix("https://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => {}
        _ => errors.push(invalid(format!(
            "{key} `{value}` must be an absolute http(s) URL"
        ))),
    }
}
