// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Palaver chat client.
//!
//! This crate provides the typed domain model, error taxonomy, filter AST,
//! subscription handle, and the gateway traits through which every data
//! operation reaches the hosted backend. The backend client and the
//! in-memory test double both implement the traits defined here.

pub mod error;
pub mod filter;
pub mod schema;
pub mod subscription;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::PalaverError;
pub use filter::{Filter, Order};
pub use subscription::Subscription;
pub use types::{Chat, ChatId, Identity, Message, MessageId, Row, SignUpStatus, UserId};

// Re-export the gateway traits at crate root.
pub use traits::{AuthGateway, RealtimeGateway, TableGateway};
