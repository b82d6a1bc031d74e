// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway trait for the hosted authentication service.

use async_trait::async_trait;

use crate::error::PalaverError;
use crate::types::{Identity, SignUpStatus};

/// Gateway to the hosted auth collaborator.
///
/// Sessions live inside the gateway; the client never caches one. Trust is
/// re-derived by asking for the current identity whenever a view mounts.
#[async_trait]
pub trait AuthGateway: Send + Sync + 'static {
    /// Identity of the currently signed-in user, if any.
    ///
    /// `Ok(None)` means "no session" -- including a session the backend no
    /// longer honors. Transport failures are errors, left to the caller to
    /// interpret.
    async fn current_identity(&self) -> Result<Option<Identity>, PalaverError>;

    /// Password sign-in. On success the gateway holds the session for
    /// subsequent calls.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, PalaverError>;

    /// Registers a new account. Backends requiring email verification
    /// report [`SignUpStatus::PendingVerification`].
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpStatus, PalaverError>;

    /// Discards the current session.
    async fn sign_out(&self) -> Result<(), PalaverError>;

    /// Every known identity. Requires administrative privilege on the backend.
    async fn list_identities(&self) -> Result<Vec<Identity>, PalaverError>;
}
