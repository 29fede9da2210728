//! Content retrieval.
//!
//! The exporter never talks to Confluence directly; it goes through a
//! [`Source`]. The REST client (feature `client`) and the in-memory
//! [`MemorySource`] are the two implementations shipped with the crate.

mod memory;

pub use memory::MemorySource;

use crate::error::FetchError;
use crate::model::{Attachment, Document, Space};

/// Result of a retrieval call.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Trait for document sources.
///
/// Implementations handle their own retry policy; an error returned here is
/// final. Not-found must be reported as [`FetchError::NotFound`] so the
/// exporter can tell a missing page from a broken connection.
pub trait Source: Send + Sync {
    /// Get the name of this source, for logging.
    fn name(&self) -> &str;

    /// Fetch one page with its content tree, labels and properties.
    fn fetch_document(&self, id: &str) -> FetchResult<Document>;

    /// IDs of the direct children of a page, in display order.
    fn fetch_children(&self, id: &str) -> FetchResult<Vec<String>>;

    /// Fetch a space.
    fn fetch_space(&self, key: &str) -> FetchResult<Space>;

    /// Fetch every space visible to the caller.
    fn fetch_all_spaces(&self) -> FetchResult<Vec<Space>>;

    /// Attachment metadata of a page.
    fn fetch_attachment_meta(&self, document_id: &str) -> FetchResult<Vec<Attachment>>;

    /// Download an attachment.
    fn fetch_attachment_bytes(&self, attachment: &Attachment) -> FetchResult<Vec<u8>>;

    /// Base URL used to build links to pages outside the export.
    fn base_url(&self) -> Option<&str> {
        None
    }
}
