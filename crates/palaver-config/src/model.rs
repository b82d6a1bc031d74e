// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Palaver chat client.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Palaver configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PalaverConfig {
    /// Client identity and behavior settings.
    #[serde(default)]
    pub app: AppConfig,

    /// Hosted backend settings.
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Client identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Display name of the client.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_app_name() -> String {
    "palaver".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Hosted backend configuration.
///
/// The anon key authorizes ordinary client calls; the service-role key is
/// only needed for the administrative identity listing. Either may also be
/// supplied via `PALAVER_BACKEND_ANON_KEY` / `PALAVER_BACKEND_SERVICE_ROLE_KEY`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL of the backend project (e.g. `https://abc.supabase.co`).
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// Public API key sent with every request.
    #[serde(default)]
    pub anon_key: Option<String>,

    /// Privileged key for the administrative identity listing.
    #[serde(default)]
    pub service_role_key: Option<String>,

    /// Per-request timeout for REST calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Interval between websocket heartbeats on the push feed.
    #[serde(default = "default_realtime_heartbeat_secs")]
    pub realtime_heartbeat_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            anon_key: None,
            service_role_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            realtime_heartbeat_secs: default_realtime_heartbeat_secs(),
        }
    }
}

fn default_backend_url() -> String {
    // Local development stack default.
    "http://localhost:54321".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_realtime_heartbeat_secs() -> u64 {
    25
}
