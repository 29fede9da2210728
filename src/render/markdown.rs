//! Markdown rendering for Confluence documents.

use crate::error::Result;
use crate::index::{ExportIndex, ExternalRef, Resolution};
use crate::model::{ContentNode, Document, Image, Link, LinkTarget, List};
use crate::path::{link_href, FilenameSanitizer};
use std::collections::BTreeSet;

use super::frontmatter::{front_matter, page_properties};
use super::inline::{code_fence, code_span, escape_markdown, heading_slug, EmphasisWriter};
use super::{RenderOptions, RenderStats, RenderedDocument};

/// Blank line between blocks.
pub(super) const BLOCK_SEP: &str = "\n\n";

/// Convert a document to Markdown.
pub fn to_markdown(
    doc: &Document,
    index: &ExportIndex,
    options: &RenderOptions,
) -> Result<RenderedDocument> {
    MarkdownRenderer::new(index, options.clone()).render(doc)
}

/// Markdown renderer.
///
/// Holds the read-only export index used to resolve links; one renderer
/// can convert any number of documents, from any number of threads.
pub struct MarkdownRenderer<'a> {
    index: &'a ExportIndex,
    options: RenderOptions,
}

impl<'a> MarkdownRenderer<'a> {
    /// Create a new Markdown renderer.
    pub fn new(index: &'a ExportIndex, options: RenderOptions) -> Self {
        Self { index, options }
    }

    /// Render a document to Markdown.
    ///
    /// Never fails on content: unexpected nodes degrade to plain text.
    pub fn render(&self, doc: &Document) -> Result<RenderedDocument> {
        let mut conv = Converter::new(self.index, &self.options, doc);
        let body = conv.blocks(&doc.body, BLOCK_SEP);

        let mut parts = Vec::new();
        if self.options.include_frontmatter {
            let fm = front_matter(&page_properties(doc), &doc.labels)?;
            if !fm.is_empty() {
                parts.push(fm);
            }
        }
        if self.options.include_breadcrumbs && !doc.ancestors.is_empty() {
            parts.push(conv.breadcrumbs());
        }
        if self.options.include_document_title && !doc.title.trim().is_empty() {
            parts.push(format!("# {}", conv.escape(doc.title.trim())));
        }
        if !body.is_empty() {
            parts.push(body);
        }

        let mut markdown = parts.join(BLOCK_SEP);
        markdown.push('\n');

        log::debug!(
            "Rendered page {} ({} bytes, {} fallback node(s))",
            doc.id,
            markdown.len(),
            conv.stats.fallback_count()
        );

        Ok(RenderedDocument {
            markdown,
            attachments: conv.attachments,
            stats: conv.stats,
        })
    }
}

/// Where inline content ends up, which decides how line breaks and links are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Inline {
    /// Running text of a block
    Block,
    /// Inside a table cell
    Cell,
    /// Inside link text
    LinkText,
}

impl Inline {
    fn line_break(self) -> &'static str {
        match self {
            Inline::Block => "  \n",
            Inline::Cell => "<br/>",
            Inline::LinkText => " ",
        }
    }
}

/// Per-document conversion state.
pub(super) struct Converter<'a> {
    pub(super) index: &'a ExportIndex,
    pub(super) options: &'a RenderOptions,
    pub(super) doc: &'a Document,
    pub(super) path: String,
    pub(super) attachments: BTreeSet<String>,
    pub(super) stats: RenderStats,
}

impl<'a> Converter<'a> {
    fn new(index: &'a ExportIndex, options: &'a RenderOptions, doc: &'a Document) -> Self {
        let path = match index.get(&doc.id) {
            Some(entry) => entry.relative_path.clone(),
            None => format!("{}.md", FilenameSanitizer::default().sanitize(&doc.title)),
        };
        Self {
            index,
            options,
            doc,
            path,
            attachments: BTreeSet::new(),
            stats: RenderStats::default(),
        }
    }

    pub(super) fn escape(&self, text: &str) -> String {
        if self.options.escape_special_chars {
            escape_markdown(text)
        } else {
            text.to_string()
        }
    }

    /// Render a node sequence; consecutive inline nodes form one paragraph.
    pub(super) fn blocks(&mut self, nodes: &[ContentNode], sep: &str) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut i = 0;
        while i < nodes.len() {
            let part = if nodes[i].is_inline() {
                let start = i;
                while i < nodes.len() && nodes[i].is_inline() {
                    i += 1;
                }
                self.inline(&nodes[start..i], Inline::Block)
                    .trim_matches(|c: char| c == ' ' || c == '\n')
                    .to_string()
            } else {
                i += 1;
                self.block(&nodes[i - 1])
            };
            if !part.trim().is_empty() {
                parts.push(part);
            }
        }
        parts.join(sep)
    }

    pub(super) fn block(&mut self, node: &ContentNode) -> String {
        match node {
            ContentNode::Heading { level, children } => {
                let text = self.inline(children, Inline::Block).replace("  \n", " ");
                let text = text.trim();
                if text.is_empty() {
                    return String::new();
                }
                self.stats.heading_count += 1;
                let level = (*level).min(self.options.max_heading_level).clamp(1, 6);
                format!("{} {}", "#".repeat(level as usize), text)
            }
            ContentNode::Paragraph(children) => {
                if children.iter().all(ContentNode::is_inline) {
                    self.inline(children, Inline::Block)
                        .trim_matches(|c: char| c == ' ' || c == '\n')
                        .to_string()
                } else {
                    self.blocks(children, BLOCK_SEP)
                }
            }
            ContentNode::List(list) => self.list(list),
            ContentNode::ListItem(_) | ContentNode::Task { .. } => {
                self.list(&List::unordered(vec![node.clone()]))
            }
            ContentNode::Table(table) => self.table(table),
            ContentNode::CodeBlock { language, code } => {
                let code = code.trim_end_matches('\n');
                let fence = code_fence(code);
                format!(
                    "{}{}\n{}\n{}",
                    fence,
                    language.as_deref().unwrap_or(""),
                    code,
                    fence
                )
            }
            ContentNode::Alert {
                kind,
                title,
                children,
            } => {
                let mut body = String::new();
                if let Some(title) = title.as_deref().filter(|t| !t.trim().is_empty()) {
                    body.push_str(&format!("**{}**", self.escape(title.trim())));
                }
                let inner = self.blocks(children, BLOCK_SEP);
                if !inner.is_empty() {
                    if !body.is_empty() {
                        body.push_str(BLOCK_SEP);
                    }
                    body.push_str(&inner);
                }
                let mut out = format!("> [!{}]", kind.github_keyword());
                if !body.is_empty() {
                    out.push('\n');
                    out.push_str(&quote_lines(&body));
                }
                out
            }
            ContentNode::Quote(children) => quote_lines(&self.blocks(children, BLOCK_SEP)),
            ContentNode::Macro(m) => self.macro_node(m),
            ContentNode::HorizontalRule => "---".to_string(),
            ContentNode::Unknown { tag, text, children } => {
                log::warn!(
                    "Unrecognized element <{}> in page {} rendered as text",
                    tag,
                    self.doc.id
                );
                self.stats.unknown_node_count += 1;
                let mut parts = Vec::new();
                if !text.trim().is_empty() && children.is_empty() {
                    parts.push(self.escape(text.trim()));
                }
                let inner = self.blocks(children, BLOCK_SEP);
                if !inner.is_empty() {
                    parts.push(inner);
                }
                parts.join(BLOCK_SEP)
            }
            inline => self.inline(std::slice::from_ref(inline), Inline::Block),
        }
    }

    fn list(&mut self, list: &List) -> String {
        let mut lines: Vec<String> = Vec::new();
        let mut number = list.start;
        let mut last_width = 2;

        for item in &list.items {
            let (task, content): (&str, &[ContentNode]) = match item {
                ContentNode::ListItem(children) => ("", children),
                ContentNode::Task { checked, children } => {
                    (if *checked { "[x] " } else { "[ ] " }, children)
                }
                ContentNode::List(nested) => {
                    let nested = self.list(nested);
                    lines.extend(nested.lines().map(|l| indent_line(l, last_width)));
                    continue;
                }
                other => ("", std::slice::from_ref(other)),
            };

            let marker = if list.ordered {
                let marker = format!("{}.", number.min(List::MAX_NUMBER));
                number = number.saturating_add(1);
                marker
            } else {
                self.options.list_marker.to_string()
            };
            last_width = marker.chars().count() + 1;

            let body = self.blocks(content, "\n");
            let mut body_lines = body.lines();
            match body_lines.next() {
                Some(first) => lines.push(format!("{} {}{}", marker, task, first)),
                None => lines.push(format!("{} {}", marker, task).trim_end().to_string()),
            }
            lines.extend(body_lines.map(|l| indent_line(l, last_width)));
        }
        lines.join("\n")
    }

    /// Render inline nodes with balanced emphasis.
    pub(super) fn inline(&mut self, nodes: &[ContentNode], ctx: Inline) -> String {
        let mut writer = EmphasisWriter::new(self.options.escape_special_chars);
        for node in nodes {
            self.inline_node(&mut writer, node, ctx);
        }
        writer.finish()
    }

    fn inline_node(&mut self, w: &mut EmphasisWriter, node: &ContentNode, ctx: Inline) {
        match node {
            ContentNode::Text(run) => {
                if ctx == Inline::Block {
                    w.text(&run.text, &run.style);
                } else {
                    w.text(&run.text.replace('\n', " "), &run.style);
                }
            }
            ContentNode::LineBreak => w.raw(ctx.line_break()),
            ContentNode::Link(link) if ctx == Inline::LinkText => {
                for child in &link.children {
                    self.inline_node(w, child, ctx);
                }
            }
            ContentNode::Link(link) => {
                let markup = self.link(link);
                w.raw(&markup);
            }
            ContentNode::Image(image) => {
                let markup = self.image(image);
                w.raw(&markup);
            }
            ContentNode::Macro(m) => {
                let markup = self.macro_node(m);
                match ctx {
                    Inline::Block => w.raw(&markup),
                    _ => w.raw(&markup.replace('\n', ctx.line_break())),
                }
            }
            ContentNode::CodeBlock { code, .. } => {
                w.raw(&code_span(&code.replace('\n', " ")));
            }
            ContentNode::Table(table) => {
                let text = table.plain_text().replace(['\n', '\t'], " ");
                w.text(&text, &Default::default());
            }
            ContentNode::List(list) if ctx == Inline::Cell => {
                let html = self.html_list(list);
                w.raw(&html);
            }
            ContentNode::Task { checked, children } => {
                w.raw(if *checked { "[x] " } else { "[ ] " });
                for child in children {
                    self.inline_node(w, child, ctx);
                }
            }
            ContentNode::Unknown { text, children, .. } if children.is_empty() => {
                self.stats.unknown_node_count += 1;
                w.text(text, &Default::default());
            }
            ContentNode::HorizontalRule => {}
            other => {
                for child in other.children() {
                    self.inline_node(w, child, ctx);
                }
            }
        }
    }

    fn link(&mut self, link: &Link) -> String {
        let index = self.index;
        let text = self.inline(&link.children, Inline::LinkText).trim().to_string();
        let title = link
            .title
            .as_deref()
            .map(|t| format!(" \"{}\"", t.replace('"', "\\\"")))
            .unwrap_or_default();

        match &link.target {
            LinkTarget::Url(url) if text.is_empty() => format!("<{}>", url),
            LinkTarget::Url(url) => format!("[{}]({}{})", text, link_target(url), title),
            LinkTarget::Anchor(anchor) => {
                let label = if text.is_empty() { self.escape(anchor) } else { text };
                format!("[{}](#{}{})", label, heading_slug(anchor), title)
            }
            LinkTarget::Document(reference) => match index.resolve_document(reference) {
                Resolution::Local(entry) => {
                    self.stats.local_link_count += 1;
                    let label = if text.is_empty() { self.escape(&entry.title) } else { text };
                    let href = link_href(self.options.link_style, &self.path, &entry.relative_path);
                    format!("[{}]({}{})", label, href, title)
                }
                Resolution::External(ext) => {
                    let fallback = ext.title.clone().unwrap_or_else(|| reference.id.clone());
                    let label = if text.is_empty() { self.escape(&fallback) } else { text };
                    self.external(label, ext)
                }
            },
            LinkTarget::Attachment(reference) => {
                match index.resolve_attachment(&self.doc.id, reference) {
                    Resolution::Local(entry) => {
                        self.stats.local_link_count += 1;
                        self.attachments.insert(entry.attachment.id.clone());
                        let label = if text.is_empty() {
                            self.escape(&entry.attachment.title)
                        } else {
                            text
                        };
                        let href = link_href(
                            self.options.attachment_link_style,
                            &self.path,
                            &entry.relative_path,
                        );
                        format!("[{}]({}{})", label, href, title)
                    }
                    Resolution::External(ext) => {
                        let label = if text.is_empty() {
                            self.escape(ext.title.as_deref().unwrap_or_default())
                        } else {
                            text
                        };
                        self.external(label, ext)
                    }
                }
            }
        }
    }

    fn image(&mut self, image: &Image) -> String {
        let index = self.index;
        self.stats.image_count += 1;
        let alt = image.alt.as_deref().map(|a| self.escape(a)).unwrap_or_default();

        match &image.target {
            LinkTarget::Url(url) => format!("![{}]({})", alt, link_target(url)),
            LinkTarget::Attachment(reference) => {
                match index.resolve_attachment(&self.doc.id, reference) {
                    Resolution::Local(entry) => {
                        self.attachments.insert(entry.attachment.id.clone());
                        let href = link_href(
                            self.options.attachment_link_style,
                            &self.path,
                            &entry.relative_path,
                        );
                        let alt = if alt.is_empty() {
                            self.escape(&entry.attachment.title)
                        } else {
                            alt
                        };
                        format!("![{}]({})", alt, href)
                    }
                    Resolution::External(ext) => match ext.url {
                        Some(url) => format!("![{}]({})", alt, link_target(&url)),
                        None => alt,
                    },
                }
            }
            LinkTarget::Document(_) | LinkTarget::Anchor(_) => self.link(&Link {
                target: image.target.clone(),
                children: Vec::new(),
                title: image.alt.clone(),
            }),
        }
    }

    /// Link to something outside the export; plain text when no URL is known.
    pub(super) fn external(&mut self, label: String, ext: ExternalRef) -> String {
        self.stats.external_link_count += 1;
        match ext.url {
            Some(url) if label.is_empty() => format!("<{}>", url),
            Some(url) => format!("[{}]({})", label, link_target(&url)),
            None => label,
        }
    }

    /// Link to an exported page, or its external fallback.
    pub(super) fn page_link(&mut self, id: &str) -> String {
        let index = self.index;
        match index.resolve(id) {
            Resolution::Local(entry) => {
                self.stats.local_link_count += 1;
                let href = link_href(self.options.link_style, &self.path, &entry.relative_path);
                format!("[{}]({})", self.escape(&entry.title), href)
            }
            Resolution::External(ext) => {
                let label = self.escape(ext.title.as_deref().unwrap_or(id));
                self.external(label, ext)
            }
        }
    }

    fn breadcrumbs(&mut self) -> String {
        let doc = self.doc;
        doc.ancestors
            .iter()
            .map(|id| self.page_link(id))
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

fn indent_line(line: &str, width: usize) -> String {
    if line.is_empty() {
        String::new()
    } else {
        format!("{}{}", " ".repeat(width), line)
    }
}

fn quote_lines(body: &str) -> String {
    body.lines()
        .map(|l| if l.is_empty() { ">".to_string() } else { format!("> {}", l) })
        .collect::<Vec<_>>()
        .join("\n")
}

/// URLs with whitespace or parentheses go in angle brackets to stay one link target.
pub(super) fn link_target(url: &str) -> String {
    if url.contains(|c: char| c.is_whitespace() || c == '(' || c == ')') {
        format!("<{}>", url)
    } else {
        url.to_string()
    }
}
