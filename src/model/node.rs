//! Content node types: the rich-content tree of a single document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Table;

/// One structural unit of a document's content tree.
///
/// Nodes are plain values. Rendering never mutates them, so converting the
/// same tree twice against the same index yields the same Markdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentNode {
    /// A run of text with inline styling
    Text(TextRun),

    /// A heading (level 1-6)
    Heading {
        /// Heading level
        level: u8,
        /// Inline content
        children: Vec<ContentNode>,
    },

    /// A paragraph of inline content
    Paragraph(Vec<ContentNode>),

    /// An ordered or unordered list
    List(List),

    /// A list item; may contain nested lists
    ListItem(Vec<ContentNode>),

    /// A table
    Table(Table),

    /// A hyperlink
    Link(Link),

    /// An image
    Image(Image),

    /// A fenced code block
    CodeBlock {
        /// Language tag, if known
        language: Option<String>,
        /// Verbatim code
        code: String,
    },

    /// A checklist item
    Task {
        /// Whether the task is done
        checked: bool,
        /// Task content
        children: Vec<ContentNode>,
    },

    /// A severity-tagged panel
    Alert {
        /// Severity
        kind: AlertKind,
        /// Optional panel title
        title: Option<String>,
        /// Panel body
        children: Vec<ContentNode>,
    },

    /// A macro, dispatched by name at render time
    Macro(Macro),

    /// A hard line break
    LineBreak,

    /// A horizontal rule
    HorizontalRule,

    /// A block quote
    Quote(Vec<ContentNode>),

    /// Anything the parser did not recognize
    Unknown {
        /// Original element name
        tag: String,
        /// Flattened text content
        text: String,
        /// Recognized children, if any
        children: Vec<ContentNode>,
    },
}

impl ContentNode {
    /// Create a plain text node.
    pub fn text(text: impl Into<String>) -> Self {
        ContentNode::Text(TextRun::new(text))
    }

    /// Create a styled text node.
    pub fn styled(text: impl Into<String>, style: TextStyle) -> Self {
        ContentNode::Text(TextRun {
            text: text.into(),
            style,
        })
    }

    /// Create a heading with plain text.
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        ContentNode::Heading {
            level: level.clamp(1, 6),
            children: vec![ContentNode::text(text)],
        }
    }

    /// Create a paragraph with plain text.
    pub fn paragraph(text: impl Into<String>) -> Self {
        ContentNode::Paragraph(vec![ContentNode::text(text)])
    }

    /// Create a link to another document.
    pub fn page_link(id: impl Into<String>, text: impl Into<String>) -> Self {
        ContentNode::Link(Link {
            target: LinkTarget::Document(DocumentRef::new(id)),
            children: vec![ContentNode::text(text)],
            title: None,
        })
    }

    /// Create a link to an external URL.
    pub fn url_link(url: impl Into<String>, text: impl Into<String>) -> Self {
        ContentNode::Link(Link {
            target: LinkTarget::Url(url.into()),
            children: vec![ContentNode::text(text)],
            title: None,
        })
    }

    /// Whether this node renders inline (inside a paragraph).
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            ContentNode::Text(_)
                | ContentNode::Link(_)
                | ContentNode::Image(_)
                | ContentNode::LineBreak
        ) || match self {
            ContentNode::Macro(m) => m.is_inline(),
            ContentNode::Unknown { children, .. } => children.iter().all(ContentNode::is_inline),
            _ => false,
        }
    }

    /// Child nodes of container variants.
    pub fn children(&self) -> &[ContentNode] {
        match self {
            ContentNode::Heading { children, .. }
            | ContentNode::Task { children, .. }
            | ContentNode::Alert { children, .. }
            | ContentNode::Unknown { children, .. } => children,
            ContentNode::Paragraph(children)
            | ContentNode::ListItem(children)
            | ContentNode::Quote(children) => children,
            ContentNode::List(list) => &list.items,
            ContentNode::Link(link) => &link.children,
            ContentNode::Macro(m) => &m.body,
            _ => &[],
        }
    }

    /// Get the plain text content of this node and its descendants.
    pub fn plain_text(&self) -> String {
        match self {
            ContentNode::Text(run) => run.text.clone(),
            ContentNode::LineBreak => "\n".to_string(),
            ContentNode::CodeBlock { code, .. } => code.clone(),
            ContentNode::Image(image) => image.alt.clone().unwrap_or_default(),
            ContentNode::Table(table) => table.plain_text(),
            ContentNode::Unknown { text, children, .. } if children.is_empty() => text.clone(),
            other => plain_text(other.children()),
        }
    }
}

/// Concatenate the plain text of a node sequence.
pub fn plain_text(nodes: &[ContentNode]) -> String {
    nodes.iter().map(ContentNode::plain_text).collect()
}

/// A run of text with consistent styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// The text content
    pub text: String,

    /// Text styling
    #[serde(default)]
    pub style: TextStyle,
}

impl TextRun {
    /// Create a new text run with default style.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: TextStyle::default(),
        }
    }

    /// Create a bold text run.
    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: TextStyle {
                bold: true,
                ..Default::default()
            },
        }
    }

    /// Create an italic text run.
    pub fn italic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: TextStyle {
                italic: true,
                ..Default::default()
            },
        }
    }

    /// Check if this run is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Inline text styling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextStyle {
    /// Bold text
    pub bold: bool,

    /// Italic text
    pub italic: bool,

    /// Underlined text
    pub underline: bool,

    /// Strikethrough text
    pub strikethrough: bool,

    /// Superscript
    pub superscript: bool,

    /// Subscript
    pub subscript: bool,

    /// Inline code
    pub code: bool,
}

impl TextStyle {
    /// Check if any styling is applied.
    pub fn has_styling(&self) -> bool {
        self.bold
            || self.italic
            || self.underline
            || self.strikethrough
            || self.superscript
            || self.subscript
            || self.code
    }
}

/// A hyperlink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Where the link points
    pub target: LinkTarget,

    /// Link text (inline nodes)
    pub children: Vec<ContentNode>,

    /// Link title (tooltip)
    pub title: Option<String>,
}

/// Target of a link or image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkTarget {
    /// An external URL, emitted verbatim
    Url(String),

    /// An in-page anchor
    Anchor(String),

    /// Another document
    Document(DocumentRef),

    /// An attachment
    Attachment(AttachmentRef),
}

/// Reference to another document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Referenced document ID
    pub id: String,

    /// Original href, used when the document is outside the export
    pub href: Option<String>,
}

impl DocumentRef {
    /// Create a reference by ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: None,
        }
    }

    /// Set the original href.
    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }
}

/// Reference to an attachment of the current (or another) document.
///
/// Confluence identifies attachments in several ways depending on the source
/// version; any of the fields may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Attachment content ID
    pub id: Option<String>,

    /// Media file ID
    pub file_id: Option<String>,

    /// Attachment title (file name)
    pub title: Option<String>,

    /// Owning document, when it differs from the current one
    pub owner_id: Option<String>,

    /// Original href, used when the attachment is not exported
    pub href: Option<String>,
}

impl AttachmentRef {
    /// Reference an attachment by ID.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Reference an attachment by file ID.
    pub fn by_file_id(file_id: impl Into<String>) -> Self {
        Self {
            file_id: Some(file_id.into()),
            ..Default::default()
        }
    }

    /// Reference an attachment by title.
    pub fn by_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Check if the reference carries no identifying information at all.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.file_id.is_none() && self.title.is_none()
    }
}

/// An image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Image source
    pub target: LinkTarget,

    /// Alternative text
    pub alt: Option<String>,

    /// Width in pixels
    pub width: Option<u32>,

    /// Height in pixels
    pub height: Option<u32>,
}

impl Image {
    /// Create an image pointing at an attachment.
    pub fn attachment(reference: AttachmentRef) -> Self {
        Self {
            target: LinkTarget::Attachment(reference),
            alt: None,
            width: None,
            height: None,
        }
    }

    /// Set alternative text.
    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }
}

/// An ordered or unordered list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    /// Ordered (numbered) list
    pub ordered: bool,

    /// Starting number for ordered lists
    pub start: u32,

    /// Items; normally [`ContentNode::ListItem`] or [`ContentNode::Task`]
    pub items: Vec<ContentNode>,
}

impl List {
    /// Largest item number Markdown accepts (nine digits).
    pub const MAX_NUMBER: u32 = 999_999_999;

    /// Create a bulleted list.
    pub fn unordered(items: Vec<ContentNode>) -> Self {
        Self {
            ordered: false,
            start: 1,
            items,
        }
    }

    /// Create a numbered list.
    pub fn ordered(items: Vec<ContentNode>) -> Self {
        Self {
            ordered: true,
            start: 1,
            items,
        }
    }
}

/// Severity of an alert panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Info panel
    Info,
    /// Generic panel
    #[default]
    Panel,
    /// Tip panel
    Tip,
    /// Note panel
    Note,
    /// Warning panel
    Warning,
}

impl AlertKind {
    /// Map a Confluence macro name to an alert kind.
    pub fn from_macro_name(name: &str) -> Option<Self> {
        match name {
            "info" => Some(AlertKind::Info),
            "panel" => Some(AlertKind::Panel),
            "tip" => Some(AlertKind::Tip),
            "note" => Some(AlertKind::Note),
            "warning" => Some(AlertKind::Warning),
            _ => None,
        }
    }

    /// GitHub alert keyword.
    pub fn github_keyword(&self) -> &'static str {
        match self {
            AlertKind::Info => "IMPORTANT",
            AlertKind::Panel => "NOTE",
            AlertKind::Tip => "TIP",
            AlertKind::Note => "WARNING",
            AlertKind::Warning => "CAUTION",
        }
    }
}

/// A macro invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Macro {
    /// Macro name (e.g. "toc", "expand")
    pub name: String,

    /// Raw parameters
    pub params: BTreeMap<String, String>,

    /// Rich body, if any
    pub body: Vec<ContentNode>,
}

impl Macro {
    /// Create a macro with no parameters or body.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: Vec<ContentNode>) -> Self {
        self.body = body;
        self
    }

    /// Get a parameter value.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Whether the macro renders inside running text.
    pub fn is_inline(&self) -> bool {
        matches!(self.name.as_str(), "status" | "jira" | "anchor")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        let para = ContentNode::Paragraph(vec![
            ContentNode::text("Hello "),
            ContentNode::Text(TextRun::bold("world")),
            ContentNode::page_link("2", "!"),
        ]);
        assert_eq!(para.plain_text(), "Hello world!");
    }

    #[test]
    fn test_heading_clamped() {
        let h = ContentNode::heading(9, "Deep");
        assert!(matches!(h, ContentNode::Heading { level: 6, .. }));
    }

    #[test]
    fn test_text_style() {
        assert!(!TextStyle::default().has_styling());
        let style = TextStyle {
            underline: true,
            ..Default::default()
        };
        assert!(style.has_styling());
    }

    #[test]
    fn test_alert_kind_mapping() {
        assert_eq!(AlertKind::from_macro_name("info"), Some(AlertKind::Info));
        assert_eq!(AlertKind::from_macro_name("toc"), None);
        assert_eq!(AlertKind::Note.github_keyword(), "WARNING");
        assert_eq!(AlertKind::Warning.github_keyword(), "CAUTION");
    }

    #[test]
    fn test_macro_params() {
        let m = Macro::new("jira").with_param("key", "ABC-1");
        assert_eq!(m.param("key"), Some("ABC-1"));
        assert_eq!(m.param("summary"), None);
    }

    #[test]
    fn test_inline_classification() {
        assert!(ContentNode::text("a").is_inline());
        assert!(ContentNode::Macro(Macro::new("status")).is_inline());
        assert!(!ContentNode::Macro(Macro::new("toc")).is_inline());
        assert!(!ContentNode::paragraph("a").is_inline());
    }

    #[test]
    fn test_attachment_ref_empty() {
        assert!(AttachmentRef::default().is_empty());
        assert!(!AttachmentRef::by_file_id("abc").is_empty());
    }
}
