// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-side message store for the selected chat.
//!
//! State machine per selection: `Unselected -> Loading -> Subscribed`.
//! Selecting a chat tears down the previous push feed, replaces the
//! in-memory list with freshly loaded history, then arms a new feed.
//! A generation counter makes selection last-write-wins: anything a stale
//! load or stale feed produces after a newer selection is discarded.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

use palaver_core::types::{decode_row, decode_rows};
use palaver_core::{
    schema, AuthGateway, Chat, Filter, Message, Order, PalaverError, RealtimeGateway,
    Subscription, TableGateway,
};

/// Attempts at arming the push feed before giving up on it.
const SUBSCRIBE_ATTEMPTS: usize = 2;

/// Buffered appends awaiting a consumer.
const APPEND_BUFFER: usize = 256;

/// Lifecycle of the store with respect to the selected chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// No chat selected; the list is empty.
    Unselected,
    /// History query in flight for the selected chat.
    Loading,
    /// History shown; push feed armed (or abandoned after retries).
    Subscribed,
}

impl std::fmt::Display for StoreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreState::Unselected => write!(f, "unselected"),
            StoreState::Loading => write!(f, "loading"),
            StoreState::Subscribed => write!(f, "subscribed"),
        }
    }
}

/// Result of a send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The message row was persisted; it will arrive via the push feed.
    Sent,
    /// Nothing was written: blank content, no selection, or no identity.
    Skipped,
}

struct StoreInner {
    state: StoreState,
    chat: Option<Chat>,
    messages: Vec<Message>,
    /// Bumped on every selection change; stale work compares against it.
    generation: u64,
    /// Teardown token of the live subscription, if any.
    teardown: Option<tokio_util::sync::CancellationToken>,
}

/// Holds the visible message list for the currently selected chat.
pub struct MessageStore {
    auth: Arc<dyn AuthGateway>,
    tables: Arc<dyn TableGateway>,
    realtime: Arc<dyn RealtimeGateway>,
    inner: Arc<Mutex<StoreInner>>,
    appended_tx: mpsc::Sender<Message>,
    appended_rx: Mutex<mpsc::Receiver<Message>>,
}

impl MessageStore {
    pub fn new(
        auth: Arc<dyn AuthGateway>,
        tables: Arc<dyn TableGateway>,
        realtime: Arc<dyn RealtimeGateway>,
    ) -> Self {
        let (appended_tx, appended_rx) = mpsc::channel(APPEND_BUFFER);
        Self {
            auth,
            tables,
            realtime,
            inner: Arc::new(Mutex::new(StoreInner {
                state: StoreState::Unselected,
                chat: None,
                messages: Vec::new(),
                generation: 0,
                teardown: None,
            })),
            appended_tx,
            appended_rx: Mutex::new(appended_rx),
        }
    }

    pub async fn state(&self) -> StoreState {
        self.inner.lock().await.state
    }

    pub async fn selected_chat(&self) -> Option<Chat> {
        self.inner.lock().await.chat.clone()
    }

    /// Snapshot of the visible list.
    pub async fn messages(&self) -> Vec<Message> {
        self.inner.lock().await.messages.clone()
    }

    /// Selects `chat`, replacing any previous selection.
    ///
    /// The previous subscription is torn down before anything else -- at
    /// most one feed is ever live. History is loaded ascending by creation
    /// time and replaces the list wholesale; a load failure is logged and
    /// degrades to an empty list rather than failing the selection. The
    /// push feed is armed only after the load resolves, so the history
    /// query is never polluted by concurrent arrivals (the remaining
    /// insert-between-query-and-subscribe window is accepted).
    pub async fn select(&self, chat: Chat) -> Result<(), PalaverError> {
        let generation = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            if let Some(token) = inner.teardown.take() {
                token.cancel();
            }
            inner.state = StoreState::Loading;
            inner.chat = Some(chat.clone());
            inner.messages.clear();
            inner.generation
        };

        let filter = Filter::eq(schema::messages::CHAT_ID, chat.id.0.clone());
        let order = Order::ascending(schema::messages::CREATED_AT);
        let loaded = self
            .tables
            .select(schema::MESSAGES, &filter, Some(&order))
            .await;

        {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                debug!(chat = %chat.id, "discarding stale history load");
                return Ok(());
            }
            match loaded.and_then(|rows| decode_rows::<Message>(schema::MESSAGES, rows)) {
                Ok(messages) => {
                    debug!(chat = %chat.id, count = messages.len(), "history loaded");
                    inner.messages = messages;
                }
                Err(e) => {
                    warn!(chat = %chat.id, error = %e, "history load failed, showing empty view");
                }
            }
        }

        let subscription = self.subscribe_with_retry(&chat).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            // A newer selection won while subscribing; release the feed we
            // just opened instead of arming it.
            if let Some(subscription) = subscription {
                subscription.close();
            }
            debug!(chat = %chat.id, "discarding stale subscription");
            return Ok(());
        }
        inner.state = StoreState::Subscribed;
        if let Some(subscription) = subscription {
            inner.teardown = Some(subscription.cancel_token());
            drop(inner);
            self.spawn_forwarder(chat, generation, subscription);
        }
        Ok(())
    }

    /// Clears the selection and releases the live subscription.
    ///
    /// Also the teardown path for view unmount.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        if let Some(token) = inner.teardown.take() {
            token.cancel();
        }
        inner.state = StoreState::Unselected;
        inner.chat = None;
        inner.messages.clear();
    }

    /// Persists a message to the selected chat.
    ///
    /// A no-op when the trimmed content is empty, no chat is selected, or
    /// no identity is resolvable. The created row is *not* appended to the
    /// local list -- it arrives through the push feed; appending both copies
    /// would show the message twice.
    pub async fn send(&self, content: &str) -> Result<SendOutcome, PalaverError> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(SendOutcome::Skipped);
        }
        let Some(chat) = self.selected_chat().await else {
            return Ok(SendOutcome::Skipped);
        };
        let sender = match self.auth.current_identity().await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                debug!("no identity at send time, message not sent");
                return Ok(SendOutcome::Skipped);
            }
            Err(e) => {
                warn!(error = %e, "identity unresolvable at send time, message not sent");
                return Ok(SendOutcome::Skipped);
            }
        };

        let row = json!({
            schema::messages::CHAT_ID: chat.id.0,
            schema::messages::SENDER_ID: sender.id.0,
            schema::messages::CONTENT: content,
        });
        self.tables.insert(schema::MESSAGES, row).await?;
        debug!(chat = %chat.id, "message persisted");
        Ok(SendOutcome::Sent)
    }

    /// The next message appended by the push feed.
    ///
    /// Intended for a frontend task that reacts to arrivals without
    /// polling [`MessageStore::messages`]. Yields across selection changes;
    /// returns only messages that actually entered the visible list.
    pub async fn next_appended(&self) -> Option<Message> {
        let mut rx = self.appended_rx.lock().await;
        rx.recv().await
    }

    async fn subscribe_with_retry(&self, chat: &Chat) -> Option<Subscription> {
        let filter = Filter::eq(schema::messages::CHAT_ID, chat.id.0.clone());
        for attempt in 0..SUBSCRIBE_ATTEMPTS {
            match self
                .realtime
                .subscribe(schema::MESSAGES, filter.clone())
                .await
            {
                Ok(subscription) => return Some(subscription),
                Err(e) => {
                    warn!(chat = %chat.id, attempt, error = %e, "push subscribe failed");
                }
            }
        }
        error!(chat = %chat.id, "push feed unavailable, new messages will appear on reselect");
        None
    }

    /// Drains the subscription into the visible list, in arrival order.
    ///
    /// Pushed rows are appended as they arrive -- not re-sorted by creation
    /// time -- so out-of-order delivery can visually misplace a message
    /// until the next full load. The task stops at the first row observed
    /// after a newer selection.
    fn spawn_forwarder(&self, chat: Chat, generation: u64, mut subscription: Subscription) {
        let inner = Arc::clone(&self.inner);
        let appended_tx = self.appended_tx.clone();
        tokio::spawn(async move {
            while let Some(row) = subscription.next_insert().await {
                let message: Message = match decode_row(schema::MESSAGES, row) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(chat = %chat.id, error = %e, "dropping undecodable pushed row");
                        continue;
                    }
                };
                let appended = {
                    let mut inner = inner.lock().await;
                    if inner.generation != generation {
                        break;
                    }
                    if message.chat_id == chat.id {
                        inner.messages.push(message.clone());
                        true
                    } else {
                        // An over-broad feed can push rows for other chats.
                        false
                    }
                };
                if appended && appended_tx.send(message).await.is_err() {
                    break;
                }
            }
            debug!(chat = %chat.id, "push forwarder stopped");
        });
    }
}
