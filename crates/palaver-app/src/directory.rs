// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity directory: everyone you could start a chat with.

use tracing::debug;

use palaver_core::{AuthGateway, Identity, PalaverError};

/// Cached listing of all other identities, locally filterable.
///
/// Loaded once per view; filtering always runs against the full cached
/// list, never a previously filtered subset, so repeated narrowing and
/// broadening stays consistent.
#[derive(Debug)]
pub struct IdentityDirectory {
    all: Vec<Identity>,
}

impl IdentityDirectory {
    /// Fetches the full identity listing and drops the caller's own entry.
    ///
    /// Fails if no identity is resolvable -- the directory is meaningless
    /// without knowing who to exclude.
    pub async fn load(auth: &dyn AuthGateway) -> Result<Self, PalaverError> {
        let current = auth
            .current_identity()
            .await?
            .ok_or_else(|| PalaverError::Auth {
                message: "no authenticated identity".to_string(),
                source: None,
            })?;

        let mut all = auth.list_identities().await?;
        all.retain(|identity| identity.id != current.id);

        debug!(count = all.len(), "identity directory loaded");
        Ok(Self { all })
    }

    /// The full cached listing, in backend order.
    pub fn all(&self) -> &[Identity] {
        &self.all
    }

    /// Case-insensitive substring match on email.
    ///
    /// A blank query returns the full listing unmodified. Re-evaluated on
    /// every keystroke; no debounce.
    pub fn filter(&self, query: &str) -> Vec<&Identity> {
        let query = query.trim();
        if query.is_empty() {
            return self.all.iter().collect();
        }
        let needle = query.to_lowercase();
        self.all
            .iter()
            .filter(|identity| identity.email.to_lowercase().contains(&needle))
            .collect()
    }

    /// Exact (case-insensitive) email lookup.
    pub fn find_by_email(&self, email: &str) -> Option<&Identity> {
        self.all
            .iter()
            .find(|identity| identity.email.eq_ignore_ascii_case(email))
    }
}
