//! Outcome of an export run.

use crate::index::PathCollision;
use crate::render::RenderStats;
use serde::Serialize;

/// A page or attachment that could not be exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportFailure {
    /// Page or attachment ID
    pub id: String,

    /// Title, when known
    pub title: Option<String>,

    /// Path below the output root, when one was assigned
    pub path: Option<String>,

    /// What went wrong
    pub error: String,
}

impl ExportFailure {
    /// Create a failure record.
    pub fn new(id: impl Into<String>, error: impl ToString) -> Self {
        Self {
            id: id.into(),
            title: None,
            path: None,
            error: error.to_string(),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the output path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Summary of an export run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportReport {
    /// Pages written
    pub exported: usize,

    /// Pages that failed, in no particular order
    pub failed: Vec<ExportFailure>,

    /// Pages not attempted because the run was cancelled
    pub skipped: usize,

    /// Pages not written because another target owns their output path
    pub shadowed: usize,

    /// Attachments written
    pub attachments_written: usize,

    /// Attachments already present on disk and left alone
    pub attachments_skipped: usize,

    /// Attachments that could not be fetched or written
    pub attachment_failures: Vec<ExportFailure>,

    /// Output paths claimed by more than one target
    pub collisions: Vec<PathCollision>,

    /// Whether the run was cancelled before finishing
    pub cancelled: bool,

    /// Conversion statistics over all exported pages
    pub stats: RenderStats,
}

impl ExportReport {
    /// Check if every page and attachment was exported.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failed.is_empty() && self.attachment_failures.is_empty()
    }

    /// Total number of pages the run was asked to export.
    pub fn total(&self) -> usize {
        self.exported + self.failed.len() + self.skipped + self.shadowed
    }
}
