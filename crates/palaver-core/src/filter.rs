// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row filter and ordering model for relational queries.
//!
//! Gateways translate this small AST into their native query syntax. It is
//! deliberately minimal: equality, conjunction, and disjunction are all the
//! client needs -- the two-ordering chat lookup is a disjunction of two
//! conjunctions.

use crate::types::Row;

/// A predicate over rows of a single relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Column equals value.
    Eq(String, String),
    /// Every branch matches.
    All(Vec<Filter>),
    /// At least one branch matches.
    Any(Vec<Filter>),
}

impl Filter {
    /// Single-column equality.
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Eq(column.into(), value.into())
    }

    /// Conjunction of branches.
    pub fn all(branches: impl IntoIterator<Item = Filter>) -> Self {
        Filter::All(branches.into_iter().collect())
    }

    /// Disjunction of branches.
    pub fn any(branches: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Any(branches.into_iter().collect())
    }

    /// The `(column, value)` pair if this filter is a single equality.
    ///
    /// Push protocols typically accept only this shape.
    pub fn as_single_eq(&self) -> Option<(&str, &str)> {
        match self {
            Filter::Eq(column, value) => Some((column, value)),
            _ => None,
        }
    }

    /// Evaluates the predicate against a JSON row.
    ///
    /// String columns compare verbatim; other scalar columns compare via
    /// their JSON rendering. Used by in-memory gateways; the hosted backend
    /// evaluates server-side.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::Eq(column, value) => match row.get(column) {
                Some(serde_json::Value::String(s)) => s == value,
                Some(other) => other.to_string() == *value,
                None => false,
            },
            Filter::All(branches) => branches.iter().all(|b| b.matches(row)),
            Filter::Any(branches) => branches.iter().any(|b| b.matches(row)),
        }
    }
}

/// Result ordering for a relational query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn ascending(column: impl Into<String>) -> Self {
        Order {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        Order {
            column: column.into(),
            ascending: false,
        }
    }
}
