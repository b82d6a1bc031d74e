// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway trait definitions for the hosted backend collaborators.
//!
//! Every data operation in the client goes through one of these traits,
//! injected as `Arc<dyn Trait + Send + Sync>` at construction so tests can
//! substitute an in-memory double. All use `#[async_trait]` for dynamic
//! dispatch compatibility.

pub mod auth;
pub mod realtime;
pub mod table;

pub use auth::AuthGateway;
pub use realtime::RealtimeGateway;
pub use table::TableGateway;
