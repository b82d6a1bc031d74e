// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway trait for the hosted relational store.

use async_trait::async_trait;

use crate::error::PalaverError;
use crate::filter::{Filter, Order};
use crate::types::Row;

/// Gateway to the hosted relational store collaborator.
///
/// Rows cross this boundary as raw JSON; callers validate them into typed
/// values with [`crate::types::decode_row`].
#[async_trait]
pub trait TableGateway: Send + Sync + 'static {
    /// Rows of `table` matching `filter`, in backend order unless `order`
    /// is given.
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<&Order>,
    ) -> Result<Vec<Row>, PalaverError>;

    /// Inserts one row and returns the stored representation, including
    /// backend-assigned columns (id, creation timestamp).
    async fn insert(&self, table: &str, row: Row) -> Result<Row, PalaverError>;
}
