//! Staged upload batch
//!
//! Files and captured photos queued by the user before a single commit
//! submission. Mutable until submitted, then cleared in one step.

use crate::api::DocumentPayload;
use crate::{Error, Result};

/// Documents staged for the next upload submission
#[derive(Debug, Default)]
pub struct PendingUploads {
    documents: Vec<DocumentPayload>,
}

impl PendingUploads {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage another document
    pub fn stage(&mut self, document: DocumentPayload) {
        tracing::debug!(filename = %document.filename, bytes = document.bytes.len(), "staged document");
        self.documents.push(document);
    }

    /// Remove a staged document by position
    ///
    /// # Errors
    ///
    /// Returns error if the index is out of range.
    pub fn unstage(&mut self, index: usize) -> Result<DocumentPayload> {
        if index >= self.documents.len() {
            return Err(Error::Session(format!("no staged document #{index}")));
        }
        Ok(self.documents.remove(index))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Filenames of the staged documents, in staging order
    #[must_use]
    pub fn filenames(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.filename.clone()).collect()
    }

    /// Take the whole batch, leaving the queue empty
    #[must_use]
    pub fn take_all(&mut self) -> Vec<DocumentPayload> {
        std::mem::take(&mut self.documents)
    }

    /// Discard everything staged
    pub fn clear(&mut self) {
        self.documents.clear();
    }
}
