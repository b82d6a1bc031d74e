// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relational gateway over the backend's REST surface.
//!
//! Renders the client's filter AST into the query syntax the hosted store
//! understands: top-level equalities become `column=eq.value` parameters,
//! disjunctions become an `or=(...)` parameter with nested `and(...)` /
//! `or(...)` groups.

use async_trait::async_trait;
use tracing::debug;

use palaver_core::traits::TableGateway;
use palaver_core::{Filter, Order, PalaverError, Row};

use crate::client::SupabaseClient;
use crate::wire::RestErrorBody;

/// Renders a filter into REST query parameters.
pub(crate) fn render_filter(filter: &Filter) -> Vec<(String, String)> {
    match filter {
        Filter::Eq(column, value) => vec![(column.clone(), format!("eq.{value}"))],
        // A top-level conjunction is just more parameters.
        Filter::All(branches) => branches.iter().flat_map(render_filter).collect(),
        Filter::Any(branches) => vec![("or".to_string(), render_group(branches))],
    }
}

fn render_group(branches: &[Filter]) -> String {
    let parts: Vec<String> = branches.iter().map(render_nested).collect();
    format!("({})", parts.join(","))
}

fn render_nested(filter: &Filter) -> String {
    match filter {
        Filter::Eq(column, value) => format!("{column}.eq.{value}"),
        Filter::All(branches) => format!("and{}", render_group(branches)),
        Filter::Any(branches) => format!("or{}", render_group(branches)),
    }
}

/// Renders an ordering into the `order` query parameter value.
pub(crate) fn render_order(order: &Order) -> String {
    let direction = if order.ascending { "asc" } else { "desc" };
    format!("{}.{direction}", order.column)
}

#[async_trait]
impl TableGateway for SupabaseClient {
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<&Order>,
    ) -> Result<Vec<Row>, PalaverError> {
        let mut query = render_filter(filter);
        query.push(("select".to_string(), "*".to_string()));
        if let Some(order) = order {
            query.push(("order".to_string(), render_order(order)));
        }

        let url = format!("{}/rest/v1/{table}", self.base_url);
        let bearer = self.bearer_token().await;

        let response = self
            .http
            .get(&url)
            .bearer_auth(bearer)
            .query(&query)
            .send()
            .await
            .map_err(|e| PalaverError::Query {
                table: table.to_string(),
                message: format!("request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PalaverError::Query {
                table: table.to_string(),
                message: rest_error_message(status, &body),
                source: None,
            });
        }

        let rows: Vec<Row> = response.json().await.map_err(|e| PalaverError::Query {
            table: table.to_string(),
            message: format!("malformed response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        debug!(table, rows = rows.len(), "select complete");
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, PalaverError> {
        let url = format!("{}/rest/v1/{table}", self.base_url);
        let bearer = self.bearer_token().await;

        let response = self
            .http
            .post(&url)
            .bearer_auth(bearer)
            // Ask the store to echo the created row, backend-assigned
            // columns included.
            .header("prefer", "return=representation")
            .json(&serde_json::Value::Array(vec![row]))
            .send()
            .await
            .map_err(|e| PalaverError::Write {
                table: table.to_string(),
                message: format!("request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PalaverError::Write {
                table: table.to_string(),
                message: rest_error_message(status, &body),
                source: None,
            });
        }

        let mut rows: Vec<Row> = response.json().await.map_err(|e| PalaverError::Write {
            table: table.to_string(),
            message: format!("malformed response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if rows.len() != 1 {
            return Err(PalaverError::Write {
                table: table.to_string(),
                message: format!("expected 1 created row, got {}", rows.len()),
                source: None,
            });
        }

        debug!(table, "insert complete");
        Ok(rows.remove(0))
    }
}

fn rest_error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<RestErrorBody>(body).ok().and_then(|b| b.message()) {
        Some(message) => format!("{status}: {message}"),
        None => format!("{status}: {body}"),
    }
}
