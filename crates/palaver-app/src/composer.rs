// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Composer: local draft and attachment state for the message input.

use tracing::debug;

use palaver_core::PalaverError;

use crate::store::{MessageStore, SendOutcome};

/// Outgoing-message state owned by the input area.
///
/// The attachment is a display-only file reference: it is shown next to the
/// input and can be removed, but is never uploaded with the message.
#[derive(Debug, Default)]
pub struct Composer {
    draft: String,
    attachment: Option<String>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn attachment(&self) -> Option<&str> {
        self.attachment.as_deref()
    }

    pub fn attach(&mut self, name: impl Into<String>) {
        self.attachment = Some(name.into());
    }

    pub fn remove_attachment(&mut self) {
        self.attachment = None;
    }

    /// Hands the draft to the message store for persistence.
    ///
    /// The draft is cleared only when the send actually happened; a skipped
    /// send leaves it for the user to finish, and a failed send must not
    /// destroy text the backend never stored.
    pub async fn submit(&mut self, store: &MessageStore) -> Result<SendOutcome, PalaverError> {
        match store.send(&self.draft).await {
            Ok(SendOutcome::Sent) => {
                self.draft.clear();
                debug!("draft sent and cleared");
                Ok(SendOutcome::Sent)
            }
            Ok(SendOutcome::Skipped) => Ok(SendOutcome::Skipped),
            Err(e) => Err(e),
        }
    }
}
