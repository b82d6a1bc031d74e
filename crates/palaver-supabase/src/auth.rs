// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auth gateway over the backend's identity service.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use palaver_core::traits::AuthGateway;
use palaver_core::{Identity, PalaverError, SignUpStatus};

use crate::client::{AuthSession, SupabaseClient};
use crate::wire::{AdminUserList, AuthErrorBody, GoTrueUser, TokenResponse};

#[async_trait]
impl AuthGateway for SupabaseClient {
    async fn current_identity(&self) -> Result<Option<Identity>, PalaverError> {
        let token = match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => return Ok(None),
        };

        let url = format!("{}/auth/v1/user", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| PalaverError::Auth {
                message: format!("identity check failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            // The backend no longer honors the session; forget it.
            self.clear_session().await;
            debug!("session rejected by backend, treating as signed out");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PalaverError::Auth {
                message: auth_error_message(status, &body),
                source: None,
            });
        }

        let user: GoTrueUser = response.json().await.map_err(|e| PalaverError::Auth {
            message: format!("malformed identity response: {e}"),
            source: Some(Box::new(e)),
        })?;

        match user.identity() {
            Some(identity) => Ok(Some(identity)),
            None => Err(PalaverError::Decode {
                table: "auth.users".to_string(),
                message: "current user record has no email".to_string(),
            }),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, PalaverError> {
        let url = format!("{}/auth/v1/token", self.base_url);
        let response = self
            .http
            .post(&url)
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({"email": email, "password": password}))
            .send()
            .await
            .map_err(|e| PalaverError::Auth {
                message: format!("sign-in request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PalaverError::Auth {
                message: auth_error_message(status, &body),
                source: None,
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| PalaverError::Auth {
            message: format!("malformed token response: {e}"),
            source: Some(Box::new(e)),
        })?;

        let identity = token.user.identity().ok_or_else(|| PalaverError::Decode {
            table: "auth.users".to_string(),
            message: "signed-in user record has no email".to_string(),
        })?;

        self.store_session(AuthSession {
            access_token: token.access_token,
            identity: identity.clone(),
        })
        .await;

        info!(user = %identity.id, "signed in");
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpStatus, PalaverError> {
        let url = format!("{}/auth/v1/signup", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({"email": email, "password": password}))
            .send()
            .await
            .map_err(|e| PalaverError::Auth {
                message: format!("sign-up request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PalaverError::Auth {
                message: auth_error_message(status, &body),
                source: None,
            });
        }

        let body: serde_json::Value = response.json().await.map_err(|e| PalaverError::Auth {
            message: format!("malformed sign-up response: {e}"),
            source: Some(Box::new(e)),
        })?;

        // Deployments with auto-confirm return a full session; the rest
        // return the bare user record and send a verification email.
        if body.get("access_token").is_some() {
            let token: TokenResponse =
                serde_json::from_value(body).map_err(|e| PalaverError::Auth {
                    message: format!("malformed sign-up session: {e}"),
                    source: Some(Box::new(e)),
                })?;
            let identity = token.user.identity().ok_or_else(|| PalaverError::Decode {
                table: "auth.users".to_string(),
                message: "signed-up user record has no email".to_string(),
            })?;
            self.store_session(AuthSession {
                access_token: token.access_token,
                identity: identity.clone(),
            })
            .await;
            info!(user = %identity.id, "signed up and confirmed");
            Ok(SignUpStatus::Confirmed(identity))
        } else {
            info!("sign-up pending email verification");
            Ok(SignUpStatus::PendingVerification)
        }
    }

    async fn sign_out(&self) -> Result<(), PalaverError> {
        let token = match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => return Ok(()),
        };

        let url = format!("{}/auth/v1/logout", self.base_url);
        let result = self.http.post(&url).bearer_auth(&token).send().await;

        // The local session is discarded regardless: a failed logout call
        // must not leave the client signed in.
        self.clear_session().await;

        match result {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => {
                warn!(status = %response.status(), "backend rejected logout, session discarded locally");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "logout request failed, session discarded locally");
                Ok(())
            }
        }
    }

    async fn list_identities(&self) -> Result<Vec<Identity>, PalaverError> {
        let service_key = self.service_role_key()?.to_string();

        let url = format!("{}/auth/v1/admin/users", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("apikey", &service_key)
            .bearer_auth(&service_key)
            .send()
            .await
            .map_err(|e| PalaverError::Query {
                table: "auth.users".to_string(),
                message: format!("identity listing failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PalaverError::Query {
                table: "auth.users".to_string(),
                message: auth_error_message(status, &body),
                source: None,
            });
        }

        let listing: AdminUserList = response.json().await.map_err(|e| PalaverError::Query {
            table: "auth.users".to_string(),
            message: format!("malformed listing response: {e}"),
            source: Some(Box::new(e)),
        })?;

        let total = listing.users.len();
        let identities: Vec<Identity> = listing
            .users
            .iter()
            .filter_map(GoTrueUser::identity)
            .collect();
        if identities.len() < total {
            debug!(
                skipped = total - identities.len(),
                "skipped identities without an email"
            );
        }

        Ok(identities)
    }
}

fn auth_error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<AuthErrorBody>(body)
        .ok()
        .and_then(|b| b.message().map(str::to_string))
    {
        Some(message) => format!("{status}: {message}"),
        None => format!("{status}: {body}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palaver_config::model::BackendConfig;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> SupabaseClient {
        test_client_with_service_key(server, None)
    }

    fn test_client_with_service_key(
        server: &MockServer,
        service_role_key: Option<&str>,
    ) -> SupabaseClient {
        let config = BackendConfig {
            url: "https://placeholder.invalid".to_string(),
            anon_key: Some("anon-key".to_string()),
            service_role_key: service_role_key.map(str::to_string),
            request_timeout_secs: 5,
            realtime_heartbeat_secs: 25,
        };
        SupabaseClient::new(&config)
            .unwrap()
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn sign_in_stores_session_and_returns_identity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt-1",
                "user": {"id": "u1", "email": "a@x.com"},
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let identity = client.sign_in("a@x.com", "hunter2").await.unwrap();
        assert_eq!(identity.email, "a@x.com");
        assert_eq!(client.bearer_token().await, "jwt-1");
    }

    #[tokio::test]
    async fn sign_in_failure_surfaces_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials",
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.sign_in("a@x.com", "wrong").await.unwrap_err();
        assert!(err.is_auth());
        assert!(err.to_string().contains("Invalid login credentials"));
    }

    #[tokio::test]
    async fn current_identity_without_session_is_none_without_network() {
        // No mock mounted: a request would 404 and fail the test.
        let server = MockServer::start().await;
        let client = test_client(&server);
        assert!(client.current_identity().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn current_identity_clears_rejected_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt-1",
                "user": {"id": "u1", "email": "a@x.com"},
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "expired"})))
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.sign_in("a@x.com", "hunter2").await.unwrap();

        assert!(client.current_identity().await.unwrap().is_none());
        // Session was forgotten: data-plane calls fall back to the anon key.
        assert_eq!(client.bearer_token().await, "anon-key");
    }

    #[tokio::test]
    async fn sign_up_without_session_is_pending_verification() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u2",
                "email": "b@x.com",
                "confirmation_sent_at": "2026-03-01T12:00:00Z",
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let status = client.sign_up("b@x.com", "hunter2").await.unwrap();
        assert_eq!(status, SignUpStatus::PendingVerification);
        assert_eq!(client.bearer_token().await, "anon-key");
    }

    #[tokio::test]
    async fn sign_up_with_autoconfirm_signs_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt-2",
                "user": {"id": "u2", "email": "b@x.com"},
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        match client.sign_up("b@x.com", "hunter2").await.unwrap() {
            SignUpStatus::Confirmed(identity) => assert_eq!(identity.email, "b@x.com"),
            other => panic!("expected confirmed, got {other:?}"),
        }
        assert_eq!(client.bearer_token().await, "jwt-2");
    }

    #[tokio::test]
    async fn list_identities_requires_service_role_key() {
        let server = MockServer::start().await;
        let client = test_client(&server);
        if std::env::var("SUPABASE_SERVICE_ROLE_KEY").is_err() {
            let err = client.list_identities().await.unwrap_err();
            assert!(err.is_auth());
        }
    }

    #[tokio::test]
    async fn list_identities_uses_service_key_and_skips_email_less_users() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/admin/users"))
            .and(header("apikey", "service-key"))
            .and(header("authorization", "Bearer service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "users": [
                    {"id": "u1", "email": "a@x.com"},
                    {"id": "u2", "email": "b@x.com"},
                    {"id": "u3"},
                ],
            })))
            .mount(&server)
            .await;

        let client = test_client_with_service_key(&server, Some("service-key"));
        let identities = client.list_identities().await.unwrap();
        assert_eq!(identities.len(), 2);
        assert_eq!(identities[0].email, "a@x.com");
        assert_eq!(identities[1].email, "b@x.com");
    }

    #[tokio::test]
    async fn sign_out_discards_session_even_when_backend_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt-1",
                "user": {"id": "u1", "email": "a@x.com"},
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.sign_in("a@x.com", "hunter2").await.unwrap();
        client.sign_out().await.unwrap();
        assert_eq!(client.bearer_token().await, "anon-key");
        assert!(client.current_identity().await.unwrap().is_none());
    }
}
