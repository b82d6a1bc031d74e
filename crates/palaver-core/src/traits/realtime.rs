// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway trait for the hosted push-notification service.

use async_trait::async_trait;

use crate::error::PalaverError;
use crate::filter::Filter;
use crate::subscription::Subscription;

/// Gateway to the hosted push collaborator.
#[async_trait]
pub trait RealtimeGateway: Send + Sync + 'static {
    /// Opens a push subscription for insert events on `table` rows
    /// matching `filter`.
    ///
    /// Push protocols generally accept only single-column equality
    /// filters; gateways reject anything richer at subscribe time. The
    /// returned handle releases the server-side subscription on close or
    /// drop.
    async fn subscribe(&self, table: &str, filter: Filter) -> Result<Subscription, PalaverError>;
}
