//! # confluence-markdown
//!
//! Export Confluence pages, page trees and spaces to a directory of linked
//! Markdown files.
//!
//! ## Quick Start
//!
//! ```no_run
//! use confluence_markdown::{export, ConfluenceClient, ExportConfig, ExportScope};
//!
//! fn main() -> confluence_markdown::Result<()> {
//!     let config = ExportConfig::load(ExportConfig::default_path())?
//!         .with_output_directory("./export");
//!     let client = ConfluenceClient::from_config(&config)?;
//!
//!     let report = export(&client, &ExportScope::space("DOC"), &config)?;
//!     println!("exported {}, failed {}", report.exported, report.failed.len());
//!     Ok(())
//! }
//! ```
//!
//! ## How an export runs
//!
//! 1. The [`ExportIndex`] is built: every page in scope gets its output
//!    path from the configured path template before anything is written.
//! 2. Pages are converted in parallel. Links to pages in the index become
//!    relative Markdown links; links to anything else point back to
//!    Confluence.
//! 3. Referenced attachments are downloaded next to the pages.
//!
//! A page that fails to convert is recorded in the [`ExportReport`] and the
//! run continues. Only a missing export root or an invalid template aborts
//! the whole run.
//!
//! ## Features
//!
//! - `client` (default): blocking REST client for Confluence Cloud and Server

#[cfg(feature = "client")]
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod index;
pub mod model;
pub mod parser;
pub mod path;
pub mod render;
pub mod source;

// Re-export commonly used types
#[cfg(feature = "client")]
pub use client::ConfluenceClient;
pub use config::{AuthConfig, ExportConfig, RetryConfig};
pub use error::{Error, FetchError, Result};
pub use export::{
    CancelToken, ExportEvent, ExportFailure, ExportReport, ExportState, Exporter, FsWriter,
    MemoryWriter, OutputWriter,
};
pub use index::{ExportIndex, ExportScope, IndexEntry};
pub use model::{Attachment, ContentNode, Document, Space};
pub use parser::{parse_page_html, parse_page_ref, parse_view_html};
pub use path::{LinkStyle, PathResolver};
pub use render::{to_markdown, MarkdownRenderer, RenderOptions, RenderedDocument};
pub use source::{MemorySource, Source};

/// Export `scope` from `source` with the given configuration.
///
/// # Example
///
/// ```
/// use confluence_markdown::{export, Document, ExportConfig, ExportScope, MemorySource, Space};
///
/// let dir = tempfile::tempdir().unwrap();
/// let source = MemorySource::new()
///     .with_space(Space::new("DOC", "Docs").with_homepage("1"))
///     .with_document(Document::new("1", "Home", "DOC"));
/// let config = ExportConfig::default()
///     .with_output_directory(dir.path())
///     .with_page_path("{page_title}.md");
///
/// let report = export(&source, &ExportScope::space("DOC"), &config).unwrap();
/// assert_eq!(report.exported, 1);
/// assert!(dir.path().join("Home.md").exists());
/// ```
pub fn export(source: &dyn Source, scope: &ExportScope, config: &ExportConfig) -> Result<ExportReport> {
    config.exporter(source)?.run(scope)
}

/// Convert one page to Markdown without writing anything.
///
/// Links to other pages are treated as external, since no index is built.
pub fn page_to_markdown(source: &dyn Source, id: &str, options: &RenderOptions) -> Result<String> {
    let doc = source.fetch_document(id)?;
    let mut index = ExportIndex::new(".");
    if let Some(url) = source.base_url() {
        index = index.with_base_url(url);
    }
    Ok(render::to_markdown(&doc, &index, options)?.markdown)
}
