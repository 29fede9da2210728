//! Rendering options and configuration.

use crate::path::LinkStyle;
use serde::{Deserialize, Serialize};

/// Macros skipped entirely unless configured otherwise.
pub const DEFAULT_IGNORED_MACROS: &[&str] = &["qc-read-and-understood-signature-box"];

/// Options for rendering document content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Relative or root-absolute links to other pages
    pub link_style: LinkStyle,

    /// Relative or root-absolute links to attachments
    pub attachment_link_style: LinkStyle,

    /// Include YAML front matter with page properties and labels
    pub include_frontmatter: bool,

    /// Start with a breadcrumb line linking the ancestors
    pub include_breadcrumbs: bool,

    /// Start with the page title as a level-1 heading
    pub include_document_title: bool,

    /// Maximum heading level (1-6)
    pub max_heading_level: u8,

    /// Character to use for unordered list markers
    pub list_marker: char,

    /// Escape special Markdown characters
    pub escape_special_chars: bool,

    /// Macro names that render to nothing
    pub ignored_macros: Vec<String>,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the link style for pages and attachments.
    pub fn with_link_style(mut self, style: LinkStyle) -> Self {
        self.link_style = style;
        self.attachment_link_style = style;
        self
    }

    /// Set the link style for attachments only.
    pub fn with_attachment_link_style(mut self, style: LinkStyle) -> Self {
        self.attachment_link_style = style;
        self
    }

    /// Enable or disable front matter.
    pub fn with_frontmatter(mut self, include: bool) -> Self {
        self.include_frontmatter = include;
        self
    }

    /// Enable or disable breadcrumbs.
    pub fn with_breadcrumbs(mut self, include: bool) -> Self {
        self.include_breadcrumbs = include;
        self
    }

    /// Enable or disable the leading title heading.
    pub fn with_document_title(mut self, include: bool) -> Self {
        self.include_document_title = include;
        self
    }

    /// Set the maximum heading level.
    pub fn with_max_heading(mut self, level: u8) -> Self {
        self.max_heading_level = level.clamp(1, 6);
        self
    }

    /// Set the list marker character.
    pub fn with_list_marker(mut self, marker: char) -> Self {
        self.list_marker = marker;
        self
    }

    /// Enable or disable escaping.
    pub fn with_escaping(mut self, escape: bool) -> Self {
        self.escape_special_chars = escape;
        self
    }

    /// Add a macro to the ignore list.
    pub fn ignore_macro(mut self, name: impl Into<String>) -> Self {
        self.ignored_macros.push(name.into());
        self
    }

    /// Check if a macro is on the ignore list.
    pub fn is_ignored(&self, macro_name: &str) -> bool {
        self.ignored_macros.iter().any(|m| m == macro_name)
    }

    /// Options producing only the converted body: no front matter, breadcrumbs or title.
    pub fn body_only() -> Self {
        Self::default()
            .with_frontmatter(false)
            .with_breadcrumbs(false)
            .with_document_title(false)
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            link_style: LinkStyle::Relative,
            attachment_link_style: LinkStyle::Relative,
            include_frontmatter: true,
            include_breadcrumbs: true,
            include_document_title: true,
            max_heading_level: 6,
            list_marker: '-',
            escape_special_chars: true,
            ignored_macros: DEFAULT_IGNORED_MACROS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_options_builder() {
        let options = RenderOptions::new()
            .with_frontmatter(false)
            .with_max_heading(9)
            .with_link_style(LinkStyle::Absolute);

        assert!(!options.include_frontmatter);
        assert_eq!(options.max_heading_level, 6);
        assert_eq!(options.link_style, LinkStyle::Absolute);
    }

    #[test]
    fn test_default_ignored_macros() {
        let options = RenderOptions::default();
        assert!(options.is_ignored("qc-read-and-understood-signature-box"));
        assert!(!options.is_ignored("toc"));
    }

    #[test]
    fn test_body_only() {
        let options = RenderOptions::body_only();
        assert!(!options.include_frontmatter);
        assert!(!options.include_breadcrumbs);
        assert!(!options.include_document_title);
    }

    #[test]
    fn test_deserialize_partial() {
        let options: RenderOptions =
            serde_json::from_str(r#"{"link_style": "absolute", "list_marker": "*"}"#).unwrap();
        assert_eq!(options.link_style, LinkStyle::Absolute);
        assert_eq!(options.list_marker, '*');
        assert!(options.include_frontmatter);
    }
}
