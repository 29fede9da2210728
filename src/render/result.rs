//! Rendering result with referenced attachments and statistics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Result of rendering one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderedDocument {
    /// The Markdown text
    pub markdown: String,

    /// IDs of exported attachments the document references
    pub attachments: BTreeSet<String>,

    /// Conversion statistics
    pub stats: RenderStats,
}

/// Statistics collected while converting a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStats {
    /// Number of headings rendered
    pub heading_count: u32,

    /// Number of tables rendered
    pub table_count: u32,

    /// Number of images rendered
    pub image_count: u32,

    /// Links resolved to another exported file
    pub local_link_count: u32,

    /// Links to targets outside the export
    pub external_link_count: u32,

    /// Macros handled by a dedicated converter
    pub macro_count: u32,

    /// Macros without a converter, rendered as fallback
    pub unsupported_macro_count: u32,

    /// Unrecognized nodes rendered as plain text
    pub unknown_node_count: u32,
}

impl RenderStats {
    /// Number of nodes that degraded to fallback output.
    pub fn fallback_count(&self) -> u32 {
        self.unsupported_macro_count + self.unknown_node_count
    }

    /// Merge another stats instance into this one.
    pub fn merge(&mut self, other: &RenderStats) {
        self.heading_count += other.heading_count;
        self.table_count += other.table_count;
        self.image_count += other.image_count;
        self.local_link_count += other.local_link_count;
        self.external_link_count += other.external_link_count;
        self.macro_count += other.macro_count;
        self.unsupported_macro_count += other.unsupported_macro_count;
        self.unknown_node_count += other.unknown_node_count;
    }
}
