//! In-memory source.

use super::{FetchResult, Source};
use crate::error::FetchError;
use crate::model::{Attachment, Document, Space};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A [`Source`] backed by values held in memory.
///
/// Children are derived from each document's ancestor chain, in insertion
/// order. Used for tests and for converting content fetched elsewhere.
#[derive(Debug, Default)]
pub struct MemorySource {
    base_url: Option<String>,
    spaces: Vec<Space>,
    documents: Vec<Document>,
    by_id: HashMap<String, usize>,
    bytes: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    document_fetches: AtomicUsize,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL reported to the exporter.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Add a space.
    pub fn with_space(mut self, space: Space) -> Self {
        self.spaces.retain(|s| s.key != space.key);
        self.spaces.push(space);
        self
    }

    /// Add a document. Its attachments become the page's attachment metadata.
    pub fn with_document(mut self, document: Document) -> Self {
        match self.by_id.get(&document.id) {
            Some(&i) => self.documents[i] = document,
            None => {
                self.by_id.insert(document.id.clone(), self.documents.len());
                self.documents.push(document);
            }
        }
        self
    }

    /// Set the downloadable content of an attachment.
    pub fn with_attachment_bytes(mut self, attachment_id: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.bytes.insert(attachment_id.into(), bytes);
        self
    }

    /// Make every fetch of this document or attachment ID fail with a transport error.
    pub fn with_failure(mut self, id: impl Into<String>) -> Self {
        self.failing.insert(id.into());
        self
    }

    /// Number of `fetch_document` calls served so far.
    pub fn document_fetches(&self) -> usize {
        self.document_fetches.load(Ordering::Relaxed)
    }

    fn check(&self, id: &str) -> FetchResult<()> {
        if self.failing.contains(id) {
            return Err(FetchError::Transport(format!("simulated failure for `{}`", id)));
        }
        Ok(())
    }

    fn document(&self, id: &str) -> FetchResult<&Document> {
        self.check(id)?;
        self.by_id
            .get(id)
            .map(|&i| &self.documents[i])
            .ok_or_else(|| FetchError::not_found("page", id))
    }
}

impl Source for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch_document(&self, id: &str) -> FetchResult<Document> {
        self.document_fetches.fetch_add(1, Ordering::Relaxed);
        self.document(id).cloned()
    }

    fn fetch_children(&self, id: &str) -> FetchResult<Vec<String>> {
        self.document(id)?;
        Ok(self
            .documents
            .iter()
            .filter(|d| d.parent_id() == Some(id))
            .map(|d| d.id.clone())
            .collect())
    }

    fn fetch_space(&self, key: &str) -> FetchResult<Space> {
        let mut space = self
            .spaces
            .iter()
            .find(|s| s.key == key)
            .cloned()
            .ok_or_else(|| FetchError::not_found("space", key))?;
        if space.members.is_empty() {
            space.members = self
                .documents
                .iter()
                .filter(|d| d.space_key == key)
                .map(|d| d.id.clone())
                .collect();
        }
        Ok(space)
    }

    fn fetch_all_spaces(&self) -> FetchResult<Vec<Space>> {
        self.spaces.iter().map(|s| self.fetch_space(&s.key)).collect()
    }

    fn fetch_attachment_meta(&self, document_id: &str) -> FetchResult<Vec<Attachment>> {
        Ok(self.document(document_id)?.attachments.clone())
    }

    fn fetch_attachment_bytes(&self, attachment: &Attachment) -> FetchResult<Vec<u8>> {
        self.check(&attachment.id)?;
        self.bytes
            .get(&attachment.id)
            .cloned()
            .ok_or_else(|| FetchError::not_found("attachment", attachment.id.clone()))
    }

    fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }
}
