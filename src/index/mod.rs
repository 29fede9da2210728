//! Export index: where every exported page and attachment will be written.
//!
//! The index is built once, before any page is converted, so a link can be
//! resolved to its target's output path even when the target has not been
//! written yet. After [`ExportIndex::build`] returns the index is read-only
//! and can be shared between conversion threads.

mod build;
mod scope;

pub use build::IndexBuild;
pub use scope::ExportScope;

use crate::error::Result;
use crate::model::{Attachment, AttachmentRef, DocumentRef};
use crate::path::PathResolver;
use crate::source::Source;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Where a page will be exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    /// Page ID
    pub id: String,

    /// Page title
    pub title: String,

    /// Space key
    pub space_key: String,

    /// Ancestor IDs, root first
    pub ancestors: Vec<String>,

    /// `/`-separated path below the output root
    pub relative_path: String,

    /// Path on disk
    pub absolute_path: PathBuf,
}

/// Where an attachment will be exported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentEntry {
    /// Attachment metadata
    pub attachment: Attachment,

    /// `/`-separated path below the output root
    pub relative_path: String,

    /// Path on disk
    pub absolute_path: PathBuf,
}

/// Two targets computed to the same output path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathCollision {
    /// The contested path
    pub path: String,

    /// ID registered last; its file is the one left on disk
    pub kept: String,

    /// ID whose output is overwritten
    pub shadowed: String,
}

/// A reference to something outside the export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalRef {
    /// Best known human-readable name
    pub title: Option<String>,

    /// Link to the original, when one can be built
    pub url: Option<String>,
}

/// Outcome of resolving a reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a, T> {
    /// Target is part of this export
    Local(&'a T),

    /// Target is outside the export scope
    External(ExternalRef),
}

impl<'a, T> Resolution<'a, T> {
    /// The local entry, if any.
    pub fn local(&self) -> Option<&'a T> {
        match self {
            Resolution::Local(entry) => Some(*entry),
            Resolution::External(_) => None,
        }
    }

    /// Check if the target is outside the export.
    pub fn is_external(&self) -> bool {
        matches!(self, Resolution::External(_))
    }
}

/// Read-only registry of output paths.
#[derive(Debug, Clone, Default)]
pub struct ExportIndex {
    output_root: PathBuf,
    base_url: Option<String>,
    documents: BTreeMap<String, IndexEntry>,
    order: Vec<String>,
    attachments: BTreeMap<String, AttachmentEntry>,
    by_owner: HashMap<String, Vec<String>>,
    children: HashMap<String, Vec<String>>,
    titles: HashMap<String, String>,
    paths: HashMap<String, String>,
    collisions: Vec<PathCollision>,
}

impl ExportIndex {
    /// Create an empty index rooted at `output_root`.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            ..Default::default()
        }
    }

    /// Set the Confluence base URL used for links to unexported pages.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Traverse `scope` through `source` and compute every output path.
    ///
    /// Fails if the scope root does not exist, a template is unusable or the
    /// source reports a transport error. Pages discovered below the root that
    /// turn out to be inaccessible are skipped with a warning.
    pub fn build(
        source: &dyn Source,
        scope: &ExportScope,
        resolver: &PathResolver,
        output_root: &Path,
    ) -> Result<IndexBuild> {
        build::IndexBuilder::new(source, resolver, output_root).build(scope)
    }

    /// Register a page. A path already taken by another ID is recorded as a collision.
    pub fn add_document(&mut self, entry: IndexEntry) {
        self.claim_path(&entry.relative_path, &entry.id);
        self.titles.insert(entry.id.clone(), entry.title.clone());
        if let Some(parent) = entry.ancestors.last() {
            let siblings = self.children.entry(parent.clone()).or_default();
            if !siblings.contains(&entry.id) {
                siblings.push(entry.id.clone());
            }
        }
        if !self.documents.contains_key(&entry.id) {
            self.order.push(entry.id.clone());
        }
        self.documents.insert(entry.id.clone(), entry);
    }

    /// Register an attachment.
    pub fn add_attachment(&mut self, entry: AttachmentEntry) {
        let id = entry.attachment.id.clone();
        self.claim_path(&entry.relative_path, &id);
        let owned = self
            .by_owner
            .entry(entry.attachment.owner_id.clone())
            .or_default();
        if !owned.contains(&id) {
            owned.push(id.clone());
        }
        self.attachments.insert(id, entry);
    }

    /// ID of the target whose file ends up at `path`; the last one registered.
    pub fn path_owner(&self, path: &str) -> Option<&str> {
        self.paths.get(path).map(String::as_str)
    }

    /// Remember the title of a page outside the export, for external links.
    pub fn add_known_title(&mut self, id: impl Into<String>, title: impl Into<String>) {
        self.titles.entry(id.into()).or_insert_with(|| title.into());
    }

    fn claim_path(&mut self, path: &str, id: &str) {
        if let Some(previous) = self.paths.insert(path.to_string(), id.to_string()) {
            if previous != id {
                log::warn!(
                    "Path collision: `{}` and `{}` both export to {}",
                    previous,
                    id,
                    path
                );
                self.collisions.push(PathCollision {
                    path: path.to_string(),
                    kept: id.to_string(),
                    shadowed: previous,
                });
            }
        }
    }

    /// The output root.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Base URL of the Confluence instance, if known.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Get a page entry.
    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.documents.get(id)
    }

    /// Check if a page is part of the export.
    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    /// Get an attachment entry by attachment ID.
    pub fn attachment(&self, id: &str) -> Option<&AttachmentEntry> {
        self.attachments.get(id)
    }

    /// Pages in discovery order (breadth first).
    pub fn documents(&self) -> impl Iterator<Item = &IndexEntry> {
        self.order.iter().filter_map(|id| self.documents.get(id))
    }

    /// All attachments, ordered by ID.
    pub fn attachments(&self) -> impl Iterator<Item = &AttachmentEntry> {
        self.attachments.values()
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if the index has no pages.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Collisions found while registering paths.
    pub fn collisions(&self) -> &[PathCollision] {
        &self.collisions
    }

    /// Title of any page seen during indexing, exported or not.
    pub fn title_of(&self, id: &str) -> Option<&str> {
        self.titles.get(id).map(String::as_str)
    }

    /// Exported children of a page, in display order.
    pub fn children_of(&self, id: &str) -> Vec<&IndexEntry> {
        self.children
            .get(id)
            .map(|ids| ids.iter().filter_map(|c| self.documents.get(c)).collect())
            .unwrap_or_default()
    }

    /// Find an exported page by title within a space.
    pub fn find_by_title(&self, space_key: &str, title: &str) -> Option<&IndexEntry> {
        self.order
            .iter()
            .filter_map(|id| self.documents.get(id))
            .find(|e| e.space_key == space_key && e.title == title)
    }

    /// Attachments owned by a page, in source order.
    pub fn attachments_of(&self, owner_id: &str) -> Vec<&AttachmentEntry> {
        self.by_owner
            .get(owner_id)
            .map(|ids| ids.iter().filter_map(|a| self.attachments.get(a)).collect())
            .unwrap_or_default()
    }

    /// Resolve a page ID.
    pub fn resolve(&self, id: &str) -> Resolution<'_, IndexEntry> {
        self.resolve_document(&DocumentRef::new(id))
    }

    /// Resolve a page reference.
    pub fn resolve_document(&self, reference: &DocumentRef) -> Resolution<'_, IndexEntry> {
        if let Some(entry) = self.documents.get(&reference.id) {
            return Resolution::Local(entry);
        }

        let url = match reference.href.as_deref() {
            Some(href) if !href.is_empty() => Some(self.absolutize(href)),
            _ => self
                .base_url
                .as_ref()
                .filter(|_| !reference.id.is_empty())
                .map(|base| format!("{}/pages/viewpage.action?pageId={}", base, reference.id)),
        };
        Resolution::External(ExternalRef {
            title: self.titles.get(&reference.id).cloned(),
            url,
        })
    }

    /// Resolve an attachment reference found in `owner_id`'s content.
    ///
    /// Looks among the owner's attachments by file ID, then attachment ID,
    /// then title; IDs are then tried across the whole export.
    pub fn resolve_attachment(
        &self,
        owner_id: &str,
        reference: &AttachmentRef,
    ) -> Resolution<'_, AttachmentEntry> {
        let owner = reference.owner_id.as_deref().unwrap_or(owner_id);
        let owned = self.attachments_of(owner);

        let found = reference
            .file_id
            .as_deref()
            .and_then(|fid| {
                owned
                    .iter()
                    .find(|e| e.attachment.effective_file_id() == Some(fid))
                    .copied()
            })
            .or_else(|| {
                reference.id.as_deref().and_then(|id| {
                    owned.iter().find(|e| e.attachment.id == id).copied()
                })
            })
            .or_else(|| {
                reference.title.as_deref().and_then(|title| {
                    owned.iter().find(|e| e.attachment.title == title).copied()
                })
            })
            .or_else(|| reference.id.as_deref().and_then(|id| self.attachments.get(id)))
            .or_else(|| {
                reference.file_id.as_deref().and_then(|fid| {
                    self.attachments
                        .values()
                        .find(|e| e.attachment.effective_file_id() == Some(fid))
                })
            });

        match found {
            Some(entry) => Resolution::Local(entry),
            None => Resolution::External(ExternalRef {
                title: reference.title.clone(),
                url: reference
                    .href
                    .as_deref()
                    .filter(|h| !h.is_empty())
                    .map(|h| self.absolutize(h)),
            }),
        }
    }

    fn absolutize(&self, href: &str) -> String {
        match (&self.base_url, href.starts_with('/')) {
            (Some(base), true) => format!("{}{}", base, href),
            _ => href.to_string(),
        }
    }
}
