//! Scope traversal and path assignment.

use super::{AttachmentEntry, ExportIndex, ExportScope, IndexEntry};
use crate::error::{FetchError, Result};
use crate::model::{Attachment, Document, Space};
use crate::path::{join_relative, PathResolver, TemplateVars};
use crate::source::{FetchResult, Source};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A finished index together with the pages fetched while building it.
#[derive(Debug)]
pub struct IndexBuild {
    /// The read-only index
    pub index: ExportIndex,

    /// Every exported page, by ID
    pub documents: HashMap<String, Document>,

    /// Pages that could not be fetched, with the reason
    pub failures: Vec<(String, String)>,
}

struct Fetched {
    document: Document,
    children: Vec<String>,
}

pub(super) struct IndexBuilder<'a> {
    source: &'a dyn Source,
    resolver: &'a PathResolver,
    output_root: &'a Path,
    spaces: HashMap<String, Space>,
    titles: HashMap<String, String>,
    documents: Vec<Document>,
    failures: Vec<(String, String)>,
    seen: HashSet<String>,
}

impl<'a> IndexBuilder<'a> {
    pub(super) fn new(
        source: &'a dyn Source,
        resolver: &'a PathResolver,
        output_root: &'a Path,
    ) -> Self {
        Self {
            source,
            resolver,
            output_root,
            spaces: HashMap::new(),
            titles: HashMap::new(),
            documents: Vec::new(),
            failures: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub(super) fn build(mut self, scope: &ExportScope) -> Result<IndexBuild> {
        log::info!("Indexing {} from {}", scope, self.source.name());

        match scope {
            ExportScope::Page(id) => self.traverse(vec![id.clone()], scope, true)?,
            ExportScope::Tree { root, .. } => self.traverse(vec![root.clone()], scope, true)?,
            ExportScope::Space(key) => {
                let space = self.source.fetch_space(key)?;
                self.collect_space(space, scope, true)?;
            }
            ExportScope::AllSpaces => {
                for space in self.source.fetch_all_spaces()? {
                    self.collect_space(space, scope, false)?;
                }
            }
        }

        self.load_spaces()?;
        self.load_titles()?;
        Ok(self.finish())
    }

    fn collect_space(&mut self, space: Space, scope: &ExportScope, strict: bool) -> Result<()> {
        log::debug!("Collecting space {} ({})", space.key, space.name);
        let homepage = space.homepage_id.clone();
        let members = space.members.clone();
        self.spaces.insert(space.key.clone(), space);

        match homepage {
            Some(home) => self.traverse(vec![home], scope, strict)?,
            None if members.is_empty() => {
                log::warn!("Space has no homepage and no listed pages; nothing to export");
            }
            None => {}
        }

        let unseen: Vec<String> = members
            .into_iter()
            .filter(|id| !self.seen.contains(id))
            .collect();
        if !unseen.is_empty() {
            self.traverse(unseen, scope, false)?;
        }
        Ok(())
    }

    /// Breadth-first traversal; each level is fetched in parallel.
    fn traverse(&mut self, roots: Vec<String>, scope: &ExportScope, strict_roots: bool) -> Result<()> {
        let descend = scope.includes_descendants();
        let source = self.source;
        let mut level = roots;
        let mut depth = 0;

        while !level.is_empty() {
            level.retain(|id| self.seen.insert(id.clone()));
            log::debug!("Fetching {} page(s) at depth {}", level.len(), depth);

            let results: Vec<(String, FetchResult<Fetched>)> = level
                .par_iter()
                .map(|id| (id.clone(), fetch_one(source, id, descend)))
                .collect();

            let mut next = Vec::new();
            for (id, result) in results {
                match result {
                    Ok(fetched) => {
                        next.extend(
                            fetched
                                .children
                                .into_iter()
                                .filter(|child| !scope.is_ignored(child)),
                        );
                        self.documents.push(fetched.document);
                    }
                    Err(err) if strict_roots && depth == 0 => return Err(err.into()),
                    Err(err) if err.is_not_found() => {
                        log::warn!("Skipping inaccessible page {}: {}", id, err);
                    }
                    Err(err) => {
                        log::warn!("Could not fetch page {}: {}", id, err);
                        self.failures.push((id, err.to_string()));
                    }
                }
            }

            level = next;
            depth += 1;
        }
        Ok(())
    }

    fn load_spaces(&mut self) -> Result<()> {
        let missing: HashSet<String> = self
            .documents
            .iter()
            .map(|d| d.space_key.clone())
            .filter(|key| !key.is_empty() && !self.spaces.contains_key(key))
            .collect();

        for key in missing {
            match self.source.fetch_space(&key) {
                Ok(space) => {
                    self.spaces.insert(key, space);
                }
                Err(err) if err.is_not_found() => {
                    log::warn!("Space {} not accessible, using its key as name", key);
                    self.spaces.insert(key.clone(), Space::new(key.clone(), key));
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    /// Titles of ancestors and homepages outside the scope are fetched once.
    fn load_titles(&mut self) -> Result<()> {
        for doc in &self.documents {
            self.titles.insert(doc.id.clone(), doc.title.clone());
        }

        let mut wanted: Vec<String> = self
            .documents
            .iter()
            .flat_map(|d| d.ancestors.iter().cloned())
            .chain(self.spaces.values().filter_map(|s| s.homepage_id.clone()))
            .filter(|id| !self.titles.contains_key(id))
            .collect();
        wanted.sort();
        wanted.dedup();
        if wanted.is_empty() {
            return Ok(());
        }

        log::debug!("Fetching titles of {} page(s) outside the scope", wanted.len());
        let source = self.source;
        let fetched: Vec<(String, FetchResult<Document>)> = wanted
            .par_iter()
            .map(|id| (id.clone(), source.fetch_document(id)))
            .collect();

        for (id, result) in fetched {
            match result {
                Ok(doc) => {
                    self.titles.insert(id, doc.title);
                }
                Err(err) => {
                    log::warn!("Ancestor {} not accessible ({}), using its ID as title", id, err);
                    self.titles.insert(id.clone(), id);
                }
            }
        }
        Ok(())
    }

    fn title(&self, id: &str) -> String {
        self.titles.get(id).cloned().unwrap_or_else(|| id.to_string())
    }

    fn base_vars(&self, doc: &Document) -> TemplateVars {
        let space = self.spaces.get(&doc.space_key);
        let homepage_id = space.and_then(|s| s.homepage_id.clone()).unwrap_or_default();
        TemplateVars {
            space_key: doc.space_key.clone(),
            space_name: space
                .map(|s| s.name.clone())
                .unwrap_or_else(|| doc.space_key.clone()),
            homepage_title: if homepage_id.is_empty() {
                String::new()
            } else {
                self.title(&homepage_id)
            },
            homepage_id,
            ..Default::default()
        }
    }

    fn page_vars(&self, doc: &Document) -> TemplateVars {
        TemplateVars {
            ancestor_ids: doc.ancestors.clone(),
            ancestor_titles: doc.ancestors.iter().map(|a| self.title(a)).collect(),
            page_id: doc.id.clone(),
            page_title: doc.title.clone(),
            ..self.base_vars(doc)
        }
    }

    fn attachment_vars(&self, doc: &Document, attachment: &Attachment) -> TemplateVars {
        let mut ancestor_ids = doc.ancestors.clone();
        ancestor_ids.push(doc.id.clone());
        TemplateVars {
            ancestor_titles: ancestor_ids.iter().map(|a| self.title(a)).collect(),
            ancestor_ids,
            attachment_id: attachment.id.clone(),
            attachment_title: attachment.title.clone(),
            attachment_file_id: attachment.effective_file_id().map(String::from),
            attachment_extension: attachment.extension(),
            ..self.base_vars(doc)
        }
    }

    fn finish(self) -> IndexBuild {
        let mut index = ExportIndex::new(self.output_root);
        if let Some(base) = self.source.base_url() {
            index = index.with_base_url(base);
        }

        let mut attachment_count = 0;
        for doc in &self.documents {
            let relative_path = self.resolver.page_path(&self.page_vars(doc));
            index.add_document(IndexEntry {
                id: doc.id.clone(),
                title: doc.title.clone(),
                space_key: doc.space_key.clone(),
                ancestors: doc.ancestors.clone(),
                absolute_path: join_relative(self.output_root, &relative_path),
                relative_path,
            });

            for attachment in &doc.attachments {
                let relative_path = self
                    .resolver
                    .attachment_path(&self.attachment_vars(doc, attachment));
                index.add_attachment(AttachmentEntry {
                    attachment: attachment.clone(),
                    absolute_path: join_relative(self.output_root, &relative_path),
                    relative_path,
                });
                attachment_count += 1;
            }
        }
        for (id, title) in &self.titles {
            index.add_known_title(id.clone(), title.clone());
        }

        log::info!(
            "Indexed {} page(s) and {} attachment(s)",
            index.len(),
            attachment_count
        );

        let documents = self
            .documents
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();
        IndexBuild {
            index,
            documents,
            failures: self.failures,
        }
    }
}

fn fetch_one(source: &dyn Source, id: &str, descend: bool) -> FetchResult<Fetched> {
    let mut document = source.fetch_document(id)?;

    let attachments = match source.fetch_attachment_meta(id) {
        Ok(list) => list,
        Err(FetchError::NotFound { .. }) => Vec::new(),
        Err(err) => return Err(err),
    };
    document.attachments = attachments
        .into_iter()
        .map(|mut att| {
            if att.owner_id.is_empty() {
                att.owner_id = document.id.clone();
            }
            if att.space_key.is_empty() {
                att.space_key = document.space_key.clone();
            }
            att
        })
        .collect();

    let children = if descend {
        source.fetch_children(id)?
    } else {
        Vec::new()
    };

    Ok(Fetched { document, children })
}
