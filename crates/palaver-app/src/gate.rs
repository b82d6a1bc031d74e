// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session gate: decides whether a mounting view may proceed.

use std::sync::Arc;

use tracing::{debug, warn};

use palaver_core::{AuthGateway, Identity};

/// What a mounting view should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Proceed; the identity is available to descendant components.
    SignedIn(Identity),
    /// Route to the sign-in screen and render nothing further.
    SignInRequired,
}

/// Re-derives trust from the backend on every view activation.
///
/// There is no local session cache and no periodic re-check: a session that
/// expires mid-use is only noticed on the next mount or on a write the
/// backend rejects.
pub struct SessionGate {
    auth: Arc<dyn AuthGateway>,
}

impl SessionGate {
    pub fn new(auth: Arc<dyn AuthGateway>) -> Self {
        Self { auth }
    }

    /// Asks the auth service for the current identity.
    ///
    /// A transport failure is treated the same as "no session": the user is
    /// sent to sign-in rather than shown a view that cannot load anything.
    pub async fn check(&self) -> GateOutcome {
        match self.auth.current_identity().await {
            Ok(Some(identity)) => {
                debug!(user = %identity.id, "session gate passed");
                GateOutcome::SignedIn(identity)
            }
            Ok(None) => GateOutcome::SignInRequired,
            Err(e) => {
                warn!(error = %e, "identity check failed, routing to sign-in");
                GateOutcome::SignInRequired
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryBackend;
    use palaver_core::UserId;

    fn identity(id: &str, email: &str) -> Identity {
        Identity {
            id: UserId(id.into()),
            email: email.into(),
        }
    }

    #[tokio::test]
    async fn signed_in_user_passes_the_gate() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.sign_in_as(identity("u1", "a@x.com")).await;

        let gate = SessionGate::new(backend);
        match gate.check().await {
            GateOutcome::SignedIn(found) => assert_eq!(found.id, UserId("u1".into())),
            other => panic!("expected signed in, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn absent_session_routes_to_sign_in() {
        let backend = Arc::new(InMemoryBackend::new());
        let gate = SessionGate::new(backend);
        assert_eq!(gate.check().await, GateOutcome::SignInRequired);
    }

    #[tokio::test]
    async fn transport_failure_routes_to_sign_in() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.sign_in_as(identity("u1", "a@x.com")).await;
        backend.fail_auth(true);

        let gate = SessionGate::new(backend);
        assert_eq!(gate.check().await, GateOutcome::SignInRequired);
    }
}
