// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as URL shape and sane timeouts.

use crate::diagnostic::ConfigError;
use crate::model::PalaverConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &PalaverConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let url = config.backend.url.trim();
    if url.is_empty() {
        errors.push(ConfigError::Validation {
            message: "backend.url must not be empty".to_string(),
        });
    } else if !url.starts_with("http://") && !url.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!("backend.url `{url}` must start with http:// or https://"),
        });
    }

    if config.backend.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "backend.request_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.backend.realtime_heartbeat_secs < 5 {
        errors.push(ConfigError::Validation {
            message: format!(
                "backend.realtime_heartbeat_secs must be at least 5, got {}",
                config.backend.realtime_heartbeat_secs
            ),
        });
    }

    if config.app.name.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "app.name must not be empty".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = PalaverConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_url_fails_validation() {
        let mut config = PalaverConfig::default();
        config.backend.url = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("backend.url"))));
    }

    #[test]
    fn non_http_url_fails_validation() {
        let mut config = PalaverConfig::default();
        config.backend.url = "ftp://example.com".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("http"))));
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let mut config = PalaverConfig::default();
        config.backend.request_timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("request_timeout_secs"))));
    }

    #[test]
    fn short_heartbeat_fails_validation() {
        let mut config = PalaverConfig::default();
        config.backend.realtime_heartbeat_secs = 1;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("realtime_heartbeat_secs"))));
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = PalaverConfig::default();
        config.backend.url = "https://abc.supabase.co".to_string();
        config.backend.anon_key = Some("anon".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
