// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed domain entities and boundary decoding.
//!
//! All three entities are owned and persisted by the hosted backend; the
//! client only ever holds transient, decoded copies for rendering. Rows
//! cross the gateway boundary as raw JSON and are validated into these
//! types exactly once, at the call site that knows which relation they
//! came from.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PalaverError;

/// Opaque identifier of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Opaque identifier of a chat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub String);

/// Opaque identifier of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An authenticated user account, supplied by the hosted auth service.
///
/// Immutable from the client's perspective; never created or mutated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
}

/// A two-party conversation record linking exactly two identities.
///
/// A chat is identified by its *unordered* participant pair: for any two
/// identities at most one chat row may exist, regardless of which
/// participant occupies which slot. Created lazily on first contact,
/// never deleted or mutated by this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub participant_a: UserId,
    pub participant_b: UserId,
}

impl Chat {
    /// True if `user` occupies either participant slot.
    pub fn involves(&self, user: &UserId) -> bool {
        self.participant_a == *user || self.participant_b == *user
    }

    /// True if this chat links exactly the given pair, in either slot order.
    pub fn links(&self, x: &UserId, y: &UserId) -> bool {
        (self.participant_a == *x && self.participant_b == *y)
            || (self.participant_a == *y && self.participant_b == *x)
    }

    /// The other participant, if `user` is one of the two.
    pub fn peer_of(&self, user: &UserId) -> Option<&UserId> {
        if self.participant_a == *user {
            Some(&self.participant_b)
        } else if self.participant_b == *user {
            Some(&self.participant_a)
        } else {
            None
        }
    }
}

/// A single piece of chat content, immutable once created.
///
/// Within a chat, history is displayed in non-decreasing `created_at` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a sign-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpStatus {
    /// The account is active and signed in.
    Confirmed(Identity),
    /// The backend sent a verification email; the account is not usable yet.
    PendingVerification,
}

/// A raw backend row. Decoded into typed values at the gateway boundary.
pub type Row = serde_json::Value;

/// Decode a backend row into a typed value, attributing failures to `table`.
pub fn decode_row<T: DeserializeOwned>(table: &str, row: Row) -> Result<T, PalaverError> {
    serde_json::from_value(row).map_err(|e| PalaverError::Decode {
        table: table.to_string(),
        message: e.to_string(),
    })
}

/// Decode a batch of rows, failing on the first row that does not conform.
pub fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Row>) -> Result<Vec<T>, PalaverError> {
    rows.into_iter().map(|row| decode_row(table, row)).collect()
}
