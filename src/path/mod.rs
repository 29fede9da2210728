//! Output path computation.
//!
//! Pages and attachments are named by path templates such as
//! `{space_name}/{ancestor_titles}/{page_title}.md`. Every substituted
//! value is sanitized into a safe file name, and links between exported
//! files are computed from those paths.

mod href;
mod sanitize;
mod template;

pub use href::{
    decode_link_path, encode_link_path, link_href, relative_path, resolve_href, LinkStyle,
};
pub use sanitize::{default_char_map, sanitize_key, FilenameSanitizer, DEFAULT_MAX_LENGTH};
pub use template::{PathTemplate, TemplateKind, TemplateVars, Variable};

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Join a `/`-separated relative path onto a directory.
pub fn join_relative(root: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

/// Default page template.
pub const DEFAULT_PAGE_TEMPLATE: &str = "{space_name}/{ancestor_titles}/{page_title}.md";

/// Default attachment template.
pub const DEFAULT_ATTACHMENT_TEMPLATE: &str =
    "{space_name}/attachments/{attachment_file_id}{attachment_extension}";

/// Page and attachment templates bundled with the sanitization policy.
#[derive(Debug, Clone)]
pub struct PathResolver {
    page: PathTemplate,
    attachment: PathTemplate,
    sanitizer: FilenameSanitizer,
}

impl PathResolver {
    /// Parse both templates. Unknown placeholders are reported here, before any fetch.
    pub fn new(
        page_template: &str,
        attachment_template: &str,
        sanitizer: FilenameSanitizer,
    ) -> Result<Self> {
        Ok(Self {
            page: PathTemplate::page(page_template)?,
            attachment: PathTemplate::attachment(attachment_template)?,
            sanitizer,
        })
    }

    /// Path of a page's Markdown file.
    pub fn page_path(&self, vars: &TemplateVars) -> String {
        self.page.render(vars, &self.sanitizer)
    }

    /// Path of an attachment file.
    pub fn attachment_path(&self, vars: &TemplateVars) -> String {
        self.attachment.render(vars, &self.sanitizer)
    }

    /// The sanitization policy.
    pub fn sanitizer(&self) -> &FilenameSanitizer {
        &self.sanitizer
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self {
            page: parse_default(DEFAULT_PAGE_TEMPLATE, TemplateKind::Page),
            attachment: parse_default(DEFAULT_ATTACHMENT_TEMPLATE, TemplateKind::Attachment),
            sanitizer: FilenameSanitizer::default(),
        }
    }
}

fn parse_default(template: &str, kind: TemplateKind) -> PathTemplate {
    PathTemplate::parse(template, kind).expect("built-in templates are valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_resolver() {
        let resolver = PathResolver::default();
        let vars = TemplateVars {
            space_name: "Docs".into(),
            page_title: "Home".into(),
            ..Default::default()
        };
        assert_eq!(resolver.page_path(&vars), "Docs/Home.md");
    }

    #[test]
    fn test_invalid_template_reported() {
        let err = PathResolver::new("{nope}.md", DEFAULT_ATTACHMENT_TEMPLATE, Default::default());
        assert!(err.is_err());
    }

    #[test]
    fn test_sanitization_safety() {
        let resolver = PathResolver::new(
            DEFAULT_PAGE_TEMPLATE,
            DEFAULT_ATTACHMENT_TEMPLATE,
            FilenameSanitizer::new(default_char_map(), 12),
        )
        .unwrap();
        let vars = TemplateVars {
            space_name: "A:very<long>space|name".into(),
            ancestor_titles: vec!["x/y".into(), "what?".into()],
            page_title: "Ends with dots...".into(),
            ..Default::default()
        };
        let path = resolver.page_path(&vars);
        for segment in path.split('/') {
            assert!(resolver.sanitizer().is_safe(segment), "unsafe segment {segment:?}");
            assert!(!segment.is_empty());
        }
    }
}
