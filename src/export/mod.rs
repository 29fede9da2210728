//! Export orchestration: index the scope, convert every page, write the files.
//!
//! A run moves through [`ExportState`]s in order. The whole index is built
//! before the first file is written, so every link can be resolved. Pages
//! are then converted in parallel; a page that fails is recorded in the
//! [`ExportReport`] and the run carries on.

mod report;
mod writer;

pub use report::{ExportFailure, ExportReport};
pub use writer::{FsWriter, MemoryWriter, OutputWriter};

use crate::error::Result;
use crate::index::{AttachmentEntry, ExportIndex, ExportScope, IndexBuild, IndexEntry};
use crate::model::Document;
use crate::path::PathResolver;
use crate::render::{MarkdownRenderer, RenderOptions, RenderStats, RenderedDocument};
use crate::source::Source;
use crossbeam_channel::Sender;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Phase of an export run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportState {
    /// Not started
    #[default]
    Idle,
    /// Building the export index
    IndexBuilding,
    /// Converting and writing pages
    Converting,
    /// Finished; see the report for failures
    Done,
    /// Aborted by a fatal error
    Failed,
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportState::Idle => "idle",
            ExportState::IndexBuilding => "indexing",
            ExportState::Converting => "converting",
            ExportState::Done => "done",
            ExportState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Progress notifications sent while a run is in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportEvent {
    /// The run entered a new state
    State(ExportState),
    /// The index is complete
    Indexed {
        /// Pages to convert
        documents: usize,
        /// Attachments known to the index
        attachments: usize,
    },
    /// A page was written
    DocumentExported {
        /// Page ID
        id: String,
        /// Path below the output root
        path: String,
    },
    /// A page could not be exported
    DocumentFailed {
        /// Page ID
        id: String,
        /// Reason
        error: String,
    },
    /// An attachment was written or already present
    AttachmentExported {
        /// Attachment ID
        id: String,
    },
    /// An attachment could not be exported
    AttachmentFailed {
        /// Attachment ID
        id: String,
        /// Reason
        error: String,
    },
}

/// Shared flag to stop a run early.
///
/// Pages already written stay on disk; pages not yet started are skipped.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum Outcome {
    Exported {
        attachments: BTreeSet<String>,
        stats: RenderStats,
    },
    Failed,
    Skipped,
    Shadowed,
}

enum AttachmentOutcome {
    Written,
    Present,
    Failed,
    Skipped,
}

/// Runs exports against a [`Source`].
pub struct Exporter<'a> {
    source: &'a dyn Source,
    writer: Box<dyn OutputWriter + 'a>,
    resolver: PathResolver,
    output_root: PathBuf,
    options: RenderOptions,
    include_attachments: bool,
    export_all_attachments: bool,
    events: Option<Sender<ExportEvent>>,
    cancel: CancelToken,
    state: ExportState,
}

impl<'a> Exporter<'a> {
    /// Create an exporter writing below `output_root` with default settings.
    pub fn new(source: &'a dyn Source, output_root: impl Into<PathBuf>) -> Self {
        Self {
            source,
            writer: Box::new(FsWriter::new()),
            resolver: PathResolver::default(),
            output_root: output_root.into(),
            options: RenderOptions::default(),
            include_attachments: true,
            export_all_attachments: false,
            events: None,
            cancel: CancelToken::new(),
            state: ExportState::Idle,
        }
    }

    /// Set the output writer.
    pub fn with_writer(mut self, writer: impl OutputWriter + 'a) -> Self {
        self.writer = Box::new(writer);
        self
    }

    /// Set the path resolver.
    pub fn with_resolver(mut self, resolver: PathResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Set the rendering options.
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Enable or disable attachment export.
    pub fn with_attachments(mut self, include: bool) -> Self {
        self.include_attachments = include;
        self
    }

    /// Export every attachment, not only those referenced by a page.
    pub fn with_all_attachments(mut self, all: bool) -> Self {
        self.export_all_attachments = all;
        self
    }

    /// Send progress events to `sender`.
    pub fn with_events(mut self, sender: Sender<ExportEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Use an existing cancellation token.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this exporter's runs.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Current state.
    pub fn state(&self) -> ExportState {
        self.state
    }

    /// Export a scope.
    ///
    /// Returns `Err` only when indexing fails; conversion and write failures
    /// are collected in the report.
    pub fn run(&mut self, scope: &ExportScope) -> Result<ExportReport> {
        self.set_state(ExportState::IndexBuilding);
        let build = match ExportIndex::build(self.source, scope, &self.resolver, &self.output_root)
        {
            Ok(build) => build,
            Err(err) => {
                log::error!("Export of {} aborted: {}", scope, err);
                self.set_state(ExportState::Failed);
                return Err(err);
            }
        };
        self.emit(ExportEvent::Indexed {
            documents: build.index.len(),
            attachments: build.index.attachments().count(),
        });

        self.set_state(ExportState::Converting);
        let report = self.convert(build);
        self.set_state(ExportState::Done);

        log::info!(
            "Exported {} page(s), {} failed, {} attachment(s) written{}",
            report.exported,
            report.failed.len(),
            report.attachments_written,
            if report.cancelled { " (cancelled)" } else { "" }
        );
        Ok(report)
    }

    fn set_state(&mut self, state: ExportState) {
        log::info!("Export state: {} -> {}", self.state, state);
        self.state = state;
        self.emit(ExportEvent::State(state));
    }

    fn emit(&self, event: ExportEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = events.send(event);
        }
    }

    fn convert(&self, build: IndexBuild) -> ExportReport {
        let IndexBuild {
            index,
            documents,
            failures,
        } = build;
        let renderer = MarkdownRenderer::new(&index, self.options.clone());
        let entries: Vec<&IndexEntry> = index.documents().collect();

        let (failure_tx, failure_rx) = crossbeam_channel::unbounded::<ExportFailure>();
        let outcomes: Vec<Outcome> = entries
            .par_iter()
            .map_with(failure_tx, |failures, entry| {
                if self.cancel.is_cancelled() {
                    return Outcome::Skipped;
                }
                if index.path_owner(&entry.relative_path) != Some(entry.id.as_str()) {
                    log::debug!("Page {} is shadowed at {}, not written", entry.id, entry.relative_path);
                    return Outcome::Shadowed;
                }
                match self.export_document(&renderer, documents.get(&entry.id), entry) {
                    Ok(rendered) => {
                        self.emit(ExportEvent::DocumentExported {
                            id: entry.id.clone(),
                            path: entry.relative_path.clone(),
                        });
                        Outcome::Exported {
                            attachments: rendered.attachments,
                            stats: rendered.stats,
                        }
                    }
                    Err(err) => {
                        log::warn!("Failed to export page {} ({}): {}", entry.id, entry.title, err);
                        self.emit(ExportEvent::DocumentFailed {
                            id: entry.id.clone(),
                            error: err.to_string(),
                        });
                        let _ = failures.send(
                            ExportFailure::new(entry.id.clone(), &err)
                                .with_title(entry.title.clone())
                                .with_path(entry.relative_path.clone()),
                        );
                        Outcome::Failed
                    }
                }
            })
            .collect();

        let mut report = ExportReport {
            collisions: index.collisions().to_vec(),
            failed: failures
                .into_iter()
                .map(|(id, error)| ExportFailure::new(id, error))
                .collect(),
            ..Default::default()
        };
        report.failed.extend(failure_rx.try_iter());

        let mut referenced = BTreeSet::new();
        for outcome in outcomes {
            match outcome {
                Outcome::Exported { attachments, stats } => {
                    report.exported += 1;
                    report.stats.merge(&stats);
                    referenced.extend(attachments);
                }
                Outcome::Failed => {}
                Outcome::Skipped => report.skipped += 1,
                Outcome::Shadowed => report.shadowed += 1,
            }
        }

        if self.include_attachments {
            let wanted: Vec<&AttachmentEntry> = if self.export_all_attachments {
                index.attachments().collect()
            } else {
                referenced.iter().filter_map(|id| index.attachment(id)).collect()
            };
            self.export_attachments(&index, &wanted, &mut report);
        }

        report.cancelled = self.cancel.is_cancelled();
        report
    }

    fn export_document(
        &self,
        renderer: &MarkdownRenderer<'_>,
        prefetched: Option<&Document>,
        entry: &IndexEntry,
    ) -> Result<RenderedDocument> {
        let fetched;
        let doc = match prefetched {
            Some(doc) => doc,
            None => {
                fetched = self.source.fetch_document(&entry.id)?;
                &fetched
            }
        };

        let rendered = renderer.render(doc)?;
        self.writer
            .write(&entry.absolute_path, rendered.markdown.as_bytes())?;
        log::debug!("Wrote {}", entry.absolute_path.display());
        Ok(rendered)
    }

    fn export_attachments(
        &self,
        index: &ExportIndex,
        wanted: &[&AttachmentEntry],
        report: &mut ExportReport,
    ) {
        if wanted.is_empty() {
            return;
        }
        log::debug!("Exporting {} attachment(s)", wanted.len());

        let (failure_tx, failure_rx) = crossbeam_channel::unbounded::<ExportFailure>();
        let outcomes: Vec<AttachmentOutcome> = wanted
            .par_iter()
            .map_with(failure_tx, |failures, entry| {
                if self.cancel.is_cancelled() {
                    return AttachmentOutcome::Skipped;
                }
                let id = entry.attachment.id.clone();
                if index.path_owner(&entry.relative_path) != Some(id.as_str()) {
                    return AttachmentOutcome::Skipped;
                }
                if self.writer.exists(&entry.absolute_path) {
                    log::debug!("Attachment {} already exported", id);
                    self.emit(ExportEvent::AttachmentExported { id });
                    return AttachmentOutcome::Present;
                }

                let written = self
                    .source
                    .fetch_attachment_bytes(&entry.attachment)
                    .map_err(crate::error::Error::from)
                    .and_then(|bytes| self.writer.write(&entry.absolute_path, &bytes));
                match written {
                    Ok(()) => {
                        self.emit(ExportEvent::AttachmentExported { id });
                        AttachmentOutcome::Written
                    }
                    Err(err) => {
                        log::warn!("Failed to export attachment {}: {}", id, err);
                        self.emit(ExportEvent::AttachmentFailed {
                            id: id.clone(),
                            error: err.to_string(),
                        });
                        let _ = failures.send(
                            ExportFailure::new(id, &err)
                                .with_title(entry.attachment.title.clone())
                                .with_path(entry.relative_path.clone()),
                        );
                        AttachmentOutcome::Failed
                    }
                }
            })
            .collect();

        for outcome in outcomes {
            match outcome {
                AttachmentOutcome::Written => report.attachments_written += 1,
                AttachmentOutcome::Present => report.attachments_skipped += 1,
                AttachmentOutcome::Failed | AttachmentOutcome::Skipped => {}
            }
        }
        report.attachment_failures.extend(failure_rx.try_iter());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::model::{ContentNode, Space};

    fn source() -> MemorySource {
        MemorySource::new()
            .with_space(Space::new("S", "Docs").with_homepage("1"))
            .with_document(
                Document::new("1", "Home", "S").with_body(vec![ContentNode::paragraph("hi")]),
            )
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let shared = token.clone();
        assert!(!shared.is_cancelled());
        token.cancel();
        assert!(shared.is_cancelled());
    }

    #[test]
    fn test_state_transitions_reported() {
        let source = source();
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut exporter = Exporter::new(&source, "/out")
            .with_writer(MemoryWriter::new())
            .with_events(tx);
        assert_eq!(exporter.state(), ExportState::Idle);

        exporter.run(&ExportScope::page("1")).unwrap();
        assert_eq!(exporter.state(), ExportState::Done);

        let states: Vec<ExportState> = rx
            .try_iter()
            .filter_map(|e| match e {
                ExportEvent::State(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                ExportState::IndexBuilding,
                ExportState::Converting,
                ExportState::Done
            ]
        );
    }

    #[test]
    fn test_missing_root_fails_run() {
        let source = source();
        let mut exporter = Exporter::new(&source, "/out").with_writer(MemoryWriter::new());
        let err = exporter.run(&ExportScope::page("404")).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(exporter.state(), ExportState::Failed);
    }

    #[test]
    fn test_cancelled_before_start_skips_pages() {
        let source = source();
        let writer = MemoryWriter::new();
        let mut exporter = Exporter::new(&source, "/out").with_writer(writer.clone());
        exporter.cancel_token().cancel();

        let report = exporter.run(&ExportScope::page("1")).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.exported, 0);
        assert!(writer.is_empty());
    }
}
