// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relation and column names of the hosted backend schema.
//!
//! The backend owns the schema; this module is the single place the client
//! spells its names.

/// The `chats` relation: one row per unordered participant pair.
pub const CHATS: &str = "chats";

/// The `messages` relation: append-only chat content.
pub const MESSAGES: &str = "messages";

pub mod chats {
    pub const ID: &str = "id";
    pub const PARTICIPANT_A: &str = "participant_a";
    pub const PARTICIPANT_B: &str = "participant_b";
}

pub mod messages {
    pub const ID: &str = "id";
    pub const CHAT_ID: &str = "chat_id";
    pub const SENDER_ID: &str = "sender_id";
    pub const CONTENT: &str = "content";
    pub const CREATED_AT: &str = "created_at";
}
