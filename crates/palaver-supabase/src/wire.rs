// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire payload types for the hosted backend's three services.

use serde::{Deserialize, Serialize};

use palaver_core::{Identity, UserId};

/// Successful password-grant or auto-confirmed signup response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub user: GoTrueUser,
}

/// A user record as the auth service returns it.
///
/// `email` is genuinely optional on the wire (phone-only accounts exist on
/// the hosted service even though this client never creates them).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GoTrueUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl GoTrueUser {
    /// A typed identity, or `None` when the record has no email to show.
    pub fn identity(&self) -> Option<Identity> {
        let email = self.email.clone().filter(|e| !e.is_empty())?;
        Some(Identity {
            id: UserId(self.id.clone()),
            email,
        })
    }
}

/// Response of the administrative user listing.
#[derive(Debug, Deserialize)]
pub(crate) struct AdminUserList {
    pub users: Vec<GoTrueUser>,
}

/// Error body shapes the auth service emits, depending on endpoint and era.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthErrorBody {
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AuthErrorBody {
    pub fn message(&self) -> Option<&str> {
        self.error_description
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.error.as_deref())
    }
}

/// Error body the relational store emits on failed queries and writes.
#[derive(Debug, Deserialize)]
pub(crate) struct RestErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl RestErrorBody {
    pub fn message(&self) -> Option<String> {
        match (&self.message, &self.details) {
            (Some(m), Some(d)) => Some(format!("{m} ({d})")),
            (Some(m), None) => Some(m.clone()),
            (None, Some(d)) => Some(d.clone()),
            (None, None) => None,
        }
    }
}

/// Phoenix channel envelope used by the push service in both directions.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PhoenixEnvelope {
    pub topic: String,
    pub event: String,
    pub payload: serde_json::Value,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
}
