// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Palaver configuration system.

use palaver_config::diagnostic::{suggest_key, ConfigError};
use palaver_config::model::PalaverConfig;
use palaver_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_palaver_config() {
    let toml = r#"
[app]
name = "test-client"
log_level = "debug"

[backend]
url = "https://abc.supabase.co"
anon_key = "anon-123"
service_role_key = "service-456"
request_timeout_secs = 10
realtime_heartbeat_secs = 15
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.app.name, "test-client");
    assert_eq!(config.app.log_level, "debug");
    assert_eq!(config.backend.url, "https://abc.supabase.co");
    assert_eq!(config.backend.anon_key.as_deref(), Some("anon-123"));
    assert_eq!(config.backend.service_role_key.as_deref(), Some("service-456"));
    assert_eq!(config.backend.request_timeout_secs, 10);
    assert_eq!(config.backend.realtime_heartbeat_secs, 15);
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.app.name, "palaver");
    assert_eq!(config.app.log_level, "info");
    assert_eq!(config.backend.url, "http://localhost:54321");
    assert!(config.backend.anon_key.is_none());
    assert!(config.backend.service_role_key.is_none());
    assert_eq!(config.backend.request_timeout_secs, 30);
    assert_eq!(config.backend.realtime_heartbeat_secs, 25);
}

/// Unknown field in [backend] section produces an error.
#[test]
fn unknown_field_in_backend_produces_error() {
    let toml = r#"
[backend]
anon_kye = "abc"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("anon_kye"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[logging]
level = "debug"
"#;

    let err = load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("logging"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Dotted override (the shape env vars are mapped into) reaches nested keys.
#[test]
fn dotted_override_reaches_backend_url() {
    use figment::{providers::Serialized, Figment};

    let config: PalaverConfig = Figment::new()
        .merge(Serialized::defaults(PalaverConfig::default()))
        .merge(("backend.url", "https://env.example.com"))
        .extract()
        .expect("should merge dotted override");

    assert_eq!(config.backend.url, "https://env.example.com");
}

/// `PALAVER_BACKEND_SERVICE_ROLE_KEY` must map to `backend.service_role_key`,
/// not `backend.service.role.key` -- the underscore-containing key pitfall.
#[test]
fn dotted_override_reaches_service_role_key() {
    use figment::{providers::Serialized, Figment};

    let config: PalaverConfig = Figment::new()
        .merge(Serialized::defaults(PalaverConfig::default()))
        .merge(("backend.service_role_key", "srk-from-env"))
        .extract()
        .expect("should set service_role_key via dot notation");

    assert_eq!(config.backend.service_role_key.as_deref(), Some("srk-from-env"));
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: PalaverConfig = Figment::new()
        .merge(Serialized::defaults(PalaverConfig::default()))
        .merge(Toml::file("/nonexistent/path/palaver.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.app.name, "palaver");
}

/// Unknown key "anon_kye" in [backend] produces a suggestion.
#[test]
fn diagnostic_error_includes_unknown_key_and_suggestion() {
    let toml = r#"
[backend]
anon_kye = "abc"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    assert!(!errors.is_empty(), "should have at least one error");

    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys } if {
            key == "anon_kye"
                && suggestion.as_deref() == Some("anon_key")
                && valid_keys.contains("anon_key")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'anon_kye' with suggestion 'anon_key', got: {errors:?}"
    );
}

/// Error output includes the list of valid keys for the section.
#[test]
fn diagnostic_error_includes_valid_keys() {
    let toml = r#"
[app]
naem = "test"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_valid_keys = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { valid_keys, .. } if {
            valid_keys.contains("name") && valid_keys.contains("log_level")
        })
    });
    assert!(has_valid_keys, "error should list valid keys for [app] section");
}

/// Invalid type (string where number expected) produces a clear message.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[backend]
request_timeout_secs = "not_a_number"
"#;

    let err = load_config_from_str(toml).expect_err("should reject invalid type");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("invalid type") || err_str.contains("request_timeout_secs"),
        "error should mention type mismatch, got: {err_str}"
    );
}

/// ConfigError implements miette::Diagnostic and renders with the suggestion.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "anon_kye".to_string(),
        suggestion: Some("anon_key".to_string()),
        valid_keys: "url, anon_key, service_role_key".to_string(),
    };

    assert!(error.code().is_some(), "should have diagnostic code");
    let help = error.help().expect("should have help text").to_string();
    assert!(
        help.contains("did you mean `anon_key`"),
        "help should contain suggestion, got: {help}"
    );

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("anon_kye"), "rendered report should mention the key");
}

/// Validation catches a malformed backend URL.
#[test]
fn validation_catches_bad_backend_url() {
    let toml = r#"
[backend]
url = "not-a-url"
"#;

    let errors = load_and_validate_str(toml).expect_err("bad URL should fail");
    let has_validation_error = errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("backend.url"))
    });
    assert!(has_validation_error, "should have validation error for backend.url");
}

/// suggest_key behaves across the suggestion threshold.
#[test]
fn suggest_key_threshold_behavior() {
    let valid = &["url", "anon_key", "service_role_key"];
    assert_eq!(suggest_key("anon_kye", valid), Some("anon_key".to_string()));
    assert!(suggest_key("zzzzzz", valid).is_none());
}
