// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client shared by the auth and relational gateways.
//!
//! Holds the connection pool, the public API key, the optional privileged
//! key, and the current session. The session lives only in this process:
//! trust is re-derived from the backend whenever a view asks for the
//! current identity.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tracing::info;

use palaver_config::model::BackendConfig;
use palaver_core::{Identity, PalaverError};

/// Conventional environment variables of the hosted service, consulted when
/// the config file does not carry the keys.
const ANON_KEY_ENV: &str = "SUPABASE_ANON_KEY";
const SERVICE_ROLE_KEY_ENV: &str = "SUPABASE_SERVICE_ROLE_KEY";

/// An authenticated session held for the lifetime of the process.
#[derive(Debug, Clone)]
pub(crate) struct AuthSession {
    pub access_token: String,
    pub identity: Identity,
}

/// Client for a Supabase-style hosted backend.
///
/// Implements all three gateway traits: auth (GoTrue), tables (PostgREST),
/// and realtime (Phoenix websocket). Cheap to clone via the shared inner
/// connection pool.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) anon_key: String,
    pub(crate) service_role_key: Option<SecretString>,
    pub(crate) session: Arc<RwLock<Option<AuthSession>>>,
    pub(crate) heartbeat: Duration,
}

impl SupabaseClient {
    /// Creates a client from the backend configuration.
    ///
    /// # Key resolution
    /// 1. `backend.anon_key` / `backend.service_role_key` if set
    /// 2. `SUPABASE_ANON_KEY` / `SUPABASE_SERVICE_ROLE_KEY` env vars
    /// 3. Missing anon key is an error; missing service-role key only
    ///    disables the administrative identity listing.
    pub fn new(config: &BackendConfig) -> Result<Self, PalaverError> {
        let anon_key = resolve_key(&config.anon_key, ANON_KEY_ENV).ok_or_else(|| {
            PalaverError::Config(format!(
                "backend anon key required: set backend.anon_key or {ANON_KEY_ENV}"
            ))
        })?;
        let service_role_key =
            resolve_key(&config.service_role_key, SERVICE_ROLE_KEY_ENV).map(SecretString::from);

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&anon_key)
                .map_err(|e| PalaverError::Config(format!("invalid anon key header value: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PalaverError::Config(format!("failed to build HTTP client: {e}")))?;

        let base_url = config.url.trim_end_matches('/').to_string();

        info!(url = %base_url, "backend client initialized");

        Ok(Self {
            http,
            base_url,
            anon_key,
            service_role_key,
            session: Arc::new(RwLock::new(None)),
            heartbeat: Duration::from_secs(config.realtime_heartbeat_secs),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// The bearer token for data-plane requests: the session's access token
    /// when signed in, the public key otherwise.
    pub(crate) async fn bearer_token(&self) -> String {
        match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.anon_key.clone(),
        }
    }

    /// The privileged key, or an auth error if it was not configured.
    pub(crate) fn service_role_key(&self) -> Result<&str, PalaverError> {
        self.service_role_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or_else(|| PalaverError::Auth {
                message: format!(
                    "identity listing requires the service-role key: set backend.service_role_key or {SERVICE_ROLE_KEY_ENV}"
                ),
                source: None,
            })
    }

    pub(crate) async fn store_session(&self, session: AuthSession) {
        *self.session.write().await = Some(session);
    }

    pub(crate) async fn clear_session(&self) {
        *self.session.write().await = None;
    }
}

fn resolve_key(configured: &Option<String>, env_var: &str) -> Option<String> {
    configured
        .clone()
        .filter(|k| !k.trim().is_empty())
        .or_else(|| std::env::var(env_var).ok().filter(|k| !k.trim().is_empty()))
}
