// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory backend double for deterministic tests.
//!
//! Implements all three gateway traits over plain vectors, with injectable
//! failures, recorded writes, a per-call select delay for exercising stale
//! loads, and manual push helpers for simulating the realtime feed.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeZone;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use palaver_core::{
    AuthGateway, Filter, Identity, Order, PalaverError, RealtimeGateway, Row, SignUpStatus,
    Subscription, TableGateway,
};

struct Feed {
    table: String,
    filter: Filter,
    tx: mpsc::Sender<Row>,
    token: CancellationToken,
}

pub struct InMemoryBackend {
    current: Mutex<Option<Identity>>,
    identities: Mutex<Vec<Identity>>,
    rows: Mutex<HashMap<String, Vec<Row>>>,
    inserted: Mutex<HashMap<String, Vec<Row>>>,
    feeds: Mutex<Vec<Feed>>,
    select_delays: Mutex<VecDeque<Duration>>,
    next_row: AtomicU64,
    auth_down: AtomicBool,
    selects_down: AtomicBool,
    inserts_down: AtomicBool,
    subscribe_failures: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            identities: Mutex::new(Vec::new()),
            rows: Mutex::new(HashMap::new()),
            inserted: Mutex::new(HashMap::new()),
            feeds: Mutex::new(Vec::new()),
            select_delays: Mutex::new(VecDeque::new()),
            next_row: AtomicU64::new(0),
            auth_down: AtomicBool::new(false),
            selects_down: AtomicBool::new(false),
            inserts_down: AtomicBool::new(false),
            subscribe_failures: AtomicUsize::new(0),
        }
    }

    pub async fn sign_in_as(&self, identity: Identity) {
        *self.current.lock().await = Some(identity);
    }

    pub async fn sign_out_current(&self) {
        *self.current.lock().await = None;
    }

    pub async fn add_identity(&self, identity: Identity) {
        self.identities.lock().await.push(identity);
    }

    /// Places a row in the store without recording it as a client write.
    pub async fn seed_row(&self, table: &str, row: Row) {
        self.rows.lock().await.entry(table.to_string()).or_default().push(row);
    }

    /// Simulates an insert by another client: stored, then fanned out to
    /// matching feeds.
    pub async fn push_insert(&self, table: &str, row: Row) {
        self.seed_row(table, row.clone()).await;
        self.fan_out(table, &row, true).await;
    }

    /// Fans a row out to every live feed on `table`, ignoring filters --
    /// an over-broad feed, for exercising the consumer's own guards.
    pub async fn push_to_all(&self, table: &str, row: Row) {
        self.fan_out(table, &row, false).await;
    }

    /// Rows the client wrote to `table` through the gateway.
    pub async fn inserted_into(&self, table: &str) -> Vec<Row> {
        self.inserted.lock().await.get(table).cloned().unwrap_or_default()
    }

    pub async fn live_subscriber_count(&self, table: &str) -> usize {
        let mut feeds = self.feeds.lock().await;
        feeds.retain(|feed| !feed.token.is_cancelled());
        feeds.iter().filter(|feed| feed.table == table).count()
    }

    /// The next call to `select` sleeps first; later calls are unaffected.
    pub async fn delay_next_select(&self, delay: Duration) {
        self.select_delays.lock().await.push_back(delay);
    }

    pub fn fail_auth(&self, down: bool) {
        self.auth_down.store(down, AtomicOrdering::SeqCst);
    }

    pub fn fail_selects(&self, down: bool) {
        self.selects_down.store(down, AtomicOrdering::SeqCst);
    }

    pub fn fail_inserts(&self, down: bool) {
        self.inserts_down.store(down, AtomicOrdering::SeqCst);
    }

    /// The next `n` subscribe calls fail before succeeding again.
    pub fn fail_next_subscribes(&self, n: usize) {
        self.subscribe_failures.store(n, AtomicOrdering::SeqCst);
    }

    async fn fan_out(&self, table: &str, row: &Row, respect_filters: bool) {
        let feeds = self.feeds.lock().await;
        for feed in feeds.iter() {
            if feed.table != table || feed.token.is_cancelled() {
                continue;
            }
            if respect_filters && !feed.filter.matches(row) {
                continue;
            }
            let _ = feed.tx.send(row.clone()).await;
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthGateway for InMemoryBackend {
    async fn current_identity(&self) -> Result<Option<Identity>, PalaverError> {
        if self.auth_down.load(AtomicOrdering::SeqCst) {
            return Err(PalaverError::Auth {
                message: "auth service unreachable".to_string(),
                source: None,
            });
        }
        Ok(self.current.lock().await.clone())
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<Identity, PalaverError> {
        let identity = self
            .identities
            .lock()
            .await
            .iter()
            .find(|identity| identity.email == email)
            .cloned()
            .ok_or_else(|| PalaverError::Auth {
                message: "invalid login credentials".to_string(),
                source: None,
            })?;
        self.sign_in_as(identity.clone()).await;
        Ok(identity)
    }

    async fn sign_up(&self, _email: &str, _password: &str) -> Result<SignUpStatus, PalaverError> {
        Ok(SignUpStatus::PendingVerification)
    }

    async fn sign_out(&self) -> Result<(), PalaverError> {
        self.sign_out_current().await;
        Ok(())
    }

    async fn list_identities(&self) -> Result<Vec<Identity>, PalaverError> {
        if self.auth_down.load(AtomicOrdering::SeqCst) {
            return Err(PalaverError::Query {
                table: "auth.users".to_string(),
                message: "auth service unreachable".to_string(),
                source: None,
            });
        }
        Ok(self.identities.lock().await.clone())
    }
}

#[async_trait]
impl TableGateway for InMemoryBackend {
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<&Order>,
    ) -> Result<Vec<Row>, PalaverError> {
        let delay = self.select_delays.lock().await.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.selects_down.load(AtomicOrdering::SeqCst) {
            return Err(PalaverError::Query {
                table: table.to_string(),
                message: "store unreachable".to_string(),
                source: None,
            });
        }

        let rows = self.rows.lock().await;
        let mut matched: Vec<Row> = rows
            .get(table)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = order {
            matched.sort_by(|a, b| {
                let left = column_text(a, &order.column);
                let right = column_text(b, &order.column);
                if order.ascending { left.cmp(&right) } else { right.cmp(&left) }
            });
        }
        Ok(matched)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, PalaverError> {
        if self.inserts_down.load(AtomicOrdering::SeqCst) {
            return Err(PalaverError::Write {
                table: table.to_string(),
                message: "store unreachable".to_string(),
                source: None,
            });
        }

        let n = self.next_row.fetch_add(1, AtomicOrdering::SeqCst);
        let mut stored = row;
        if let Some(object) = stored.as_object_mut() {
            object.insert("id".to_string(), format!("{table}-{n}").into());
            let created_at = chrono::Utc
                .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
                .unwrap()
                + chrono::TimeDelta::seconds(n as i64);
            object.insert("created_at".to_string(), created_at.to_rfc3339().into());
        }

        self.rows
            .lock()
            .await
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());
        self.inserted
            .lock()
            .await
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());

        // Like the hosted backend, an accepted insert reaches live feeds.
        self.fan_out(table, &stored, true).await;
        Ok(stored)
    }
}

#[async_trait]
impl RealtimeGateway for InMemoryBackend {
    async fn subscribe(&self, table: &str, filter: Filter) -> Result<Subscription, PalaverError> {
        let remaining = self.subscribe_failures.load(AtomicOrdering::SeqCst);
        if remaining > 0 {
            self.subscribe_failures.store(remaining - 1, AtomicOrdering::SeqCst);
            return Err(PalaverError::Subscription {
                message: "push service unreachable".to_string(),
                source: None,
            });
        }

        let (tx, rx) = mpsc::channel(64);
        let token = CancellationToken::new();
        self.feeds.lock().await.push(Feed {
            table: table.to_string(),
            filter,
            tx,
            token: token.clone(),
        });
        Ok(Subscription::new(rx, token))
    }
}

fn column_text(row: &Row, column: &str) -> String {
    match row.get(column) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}
