// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Palaver chat client.

use thiserror::Error;

/// The primary error type used across the gateway traits and client core.
///
/// The variants mirror how failures are handled downstream: auth failures
/// send the user back to sign-in, query failures degrade the view, write
/// failures abort the operation with prior state intact, and subscription
/// failures leave the view without a live feed.
#[derive(Debug, Error)]
pub enum PalaverError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Authentication failures: no session, invalid credentials, or a rejected token.
    #[error("auth error: {message}")]
    Auth {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Read-path failures against the relational store (listings, chat lookup, message load).
    #[error("query error on `{table}`: {message}")]
    Query {
        table: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Write-path failures (chat creation, message send).
    #[error("write error on `{table}`: {message}")]
    Write {
        table: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Push-feed failures (subscribe handshake, protocol, socket).
    #[error("subscription error: {message}")]
    Subscription {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A backend row did not match the expected schema.
    #[error("decode error on `{table}`: {message}")]
    Decode { table: String, message: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PalaverError {
    /// True for failures that invalidate the session and should route the
    /// user back to sign-in rather than degrade the current view.
    pub fn is_auth(&self) -> bool {
        matches!(self, PalaverError::Auth { .. })
    }
}
