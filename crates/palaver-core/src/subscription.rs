// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cancellable handle to a push subscription on a backend relation.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::types::Row;

/// A standing request for insert notifications on a single relation.
///
/// The handle owns the receiving half of the feed. The gateway task that
/// produces rows watches the cancellation token and releases the
/// server-side subscription when it fires; dropping the handle cancels,
/// so an unsubscribed feed can never outlive its owner.
#[derive(Debug)]
pub struct Subscription {
    inserts: mpsc::Receiver<Row>,
    cancel: CancellationToken,
}

impl Subscription {
    /// Pairs a row feed with the token that tears it down.
    pub fn new(inserts: mpsc::Receiver<Row>, cancel: CancellationToken) -> Self {
        Self { inserts, cancel }
    }

    /// The next inserted row, or `None` once the feed has closed.
    pub async fn next_insert(&mut self) -> Option<Row> {
        self.inserts.recv().await
    }

    /// A token observers can use to tear this subscription down from elsewhere.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Releases the subscription. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
