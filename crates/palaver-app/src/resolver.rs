// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat resolver: deterministic lookup-or-create for a two-party chat.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use palaver_core::types::decode_rows;
use palaver_core::{schema, Chat, Filter, Identity, PalaverError, TableGateway, UserId};

/// Resolves the one chat covering an unordered identity pair.
pub struct ChatResolver {
    tables: Arc<dyn TableGateway>,
}

impl ChatResolver {
    pub fn new(tables: Arc<dyn TableGateway>) -> Self {
        Self { tables }
    }

    /// Finds the existing chat between `current` and `counterparty`, or
    /// creates one with `current` in the first slot.
    ///
    /// The backend query is order-sensitive, so the unordered-pair
    /// invariant is enforced here with a disjunction across both slot
    /// orders. Should multiple rows match (the invariant was violated on
    /// some earlier write), the lowest chat id wins -- stable no matter how
    /// the backend orders its results.
    ///
    /// Any backend failure aborts resolution; nothing is created and the
    /// error is surfaced to the caller.
    pub async fn resolve(
        &self,
        current: &Identity,
        counterparty: &Identity,
    ) -> Result<Chat, PalaverError> {
        let filter = pair_filter(&current.id, &counterparty.id);
        let rows = self.tables.select(schema::CHATS, &filter, None).await?;
        let mut chats: Vec<Chat> = decode_rows(schema::CHATS, rows)?;

        if !chats.is_empty() {
            if chats.len() > 1 {
                warn!(
                    count = chats.len(),
                    a = %current.id,
                    b = %counterparty.id,
                    "multiple chat rows for one pair, picking lowest id"
                );
            }
            chats.sort_by(|x, y| x.id.cmp(&y.id));
            let chat = chats.swap_remove(0);
            debug!(chat = %chat.id, "existing chat resolved");
            return Ok(chat);
        }

        let row = json!({
            schema::chats::PARTICIPANT_A: current.id.0,
            schema::chats::PARTICIPANT_B: counterparty.id.0,
        });
        let created = self.tables.insert(schema::CHATS, row).await?;
        let chat: Chat = palaver_core::types::decode_row(schema::CHATS, created)?;
        info!(chat = %chat.id, a = %current.id, b = %counterparty.id, "chat created");
        Ok(chat)
    }
}

/// Both slot orders of one unordered pair.
fn pair_filter(x: &UserId, y: &UserId) -> Filter {
    Filter::any([
        Filter::all([
            Filter::eq(schema::chats::PARTICIPANT_A, x.0.clone()),
            Filter::eq(schema::chats::PARTICIPANT_B, y.0.clone()),
        ]),
        Filter::all([
            Filter::eq(schema::chats::PARTICIPANT_A, y.0.clone()),
            Filter::eq(schema::chats::PARTICIPANT_B, x.0.clone()),
        ]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryBackend;
    use serde_json::json;

    fn identity(id: &str, email: &str) -> Identity {
        Identity {
            id: UserId(id.into()),
            email: email.into(),
        }
    }

    #[tokio::test]
    async fn creates_chat_on_first_contact() {
        let backend = Arc::new(InMemoryBackend::new());
        let resolver = ChatResolver::new(backend.clone());
        let (u1, u2) = (identity("u1", "a@x.com"), identity("u2", "b@x.com"));

        let chat = resolver.resolve(&u1, &u2).await.unwrap();
        assert_eq!(chat.participant_a, UserId("u1".into()));
        assert_eq!(chat.participant_b, UserId("u2".into()));
        assert_eq!(backend.inserted_into(schema::CHATS).await.len(), 1);
    }

    #[tokio::test]
    async fn resolving_from_either_side_yields_the_same_chat() {
        let backend = Arc::new(InMemoryBackend::new());
        let resolver = ChatResolver::new(backend.clone());
        let (u1, u2) = (identity("u1", "a@x.com"), identity("u2", "b@x.com"));

        let first = resolver.resolve(&u1, &u2).await.unwrap();
        let second = resolver.resolve(&u2, &u1).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(backend.inserted_into(schema::CHATS).await.len(), 1);
    }

    #[tokio::test]
    async fn repeated_resolution_is_idempotent() {
        let backend = Arc::new(InMemoryBackend::new());
        let resolver = ChatResolver::new(backend.clone());
        let (u1, u2) = (identity("u1", "a@x.com"), identity("u2", "b@x.com"));

        let first = resolver.resolve(&u1, &u2).await.unwrap();
        let second = resolver.resolve(&u1, &u2).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(backend.inserted_into(schema::CHATS).await.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_rows_resolve_to_lowest_id() {
        let backend = Arc::new(InMemoryBackend::new());
        backend
            .seed_row(
                schema::CHATS,
                json!({"id": "chat-b", "participant_a": "u1", "participant_b": "u2"}),
            )
            .await;
        backend
            .seed_row(
                schema::CHATS,
                json!({"id": "chat-a", "participant_a": "u2", "participant_b": "u1"}),
            )
            .await;

        let resolver = ChatResolver::new(backend.clone());
        let chat = resolver
            .resolve(&identity("u1", "a@x.com"), &identity("u2", "b@x.com"))
            .await
            .unwrap();

        assert_eq!(chat.id.0, "chat-a");
        // Tolerated on read, but never compounded with another insert.
        assert!(backend.inserted_into(schema::CHATS).await.is_empty());
    }

    #[tokio::test]
    async fn lookup_failure_aborts_without_creating() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_selects(true);

        let resolver = ChatResolver::new(backend.clone());
        let err = resolver
            .resolve(&identity("u1", "a@x.com"), &identity("u2", "b@x.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, PalaverError::Query { .. }));
        assert!(backend.inserted_into(schema::CHATS).await.is_empty());
    }

    #[tokio::test]
    async fn creation_failure_surfaces_write_error() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_inserts(true);

        let resolver = ChatResolver::new(backend.clone());
        let err = resolver
            .resolve(&identity("u1", "a@x.com"), &identity("u2", "b@x.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, PalaverError::Write { .. }));
    }
}
