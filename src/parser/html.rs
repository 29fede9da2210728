//! Walks Confluence view HTML and builds content nodes.

use crate::model::{
    plain_text, AlertKind, AttachmentRef, ContentNode, DocumentRef, Image, Link, LinkTarget, List,
    Macro, Table, TableCell, TableRow, TextRun, TextStyle,
};
use crate::render::clean_user_name;
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::sync::OnceLock;

use super::url::page_id_from_href;

fn brush_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"brush:\s*([^;]+)").expect("valid brush regex"))
}

fn diagram_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\|diagramName=(.+?)\|").expect("valid diagram name regex"))
}

/// Elements whose children are parsed as if the element were not there.
const TRANSPARENT: &[&str] = &[
    "html", "body", "div", "span", "section", "article", "main", "header", "footer", "nav",
    "aside", "font", "center", "small", "big", "mark", "abbr", "cite", "q", "label", "figure",
    "figcaption", "dl", "colgroup", "thead", "tbody", "tfoot",
];

/// Elements dropped with their content.
const SKIPPED: &[&str] = &["script", "style", "noscript", "template", "button", "input", "col"];

#[derive(Default)]
pub(super) struct Walker<'e> {
    pub(super) properties: Vec<(String, String)>,
    /// The page's export view, where report macros carry their rendered rows.
    pub(super) export_view: Option<&'e Html>,
}

impl<'e> Walker<'e> {
    /// Parse the children of `el`.
    pub(super) fn collect(&mut self, el: ElementRef<'_>, style: TextStyle) -> Vec<ContentNode> {
        let mut out = Vec::new();
        self.children(el, style, &mut out);
        drop_block_whitespace(out)
    }

    fn children(&mut self, el: ElementRef<'_>, style: TextStyle, out: &mut Vec<ContentNode>) {
        for child in el.children() {
            match child.value() {
                Node::Text(text) => push_text(out, &collapse_whitespace(text), style),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.element(child, style, out);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, el: ElementRef<'_>, style: TextStyle, out: &mut Vec<ContentNode>) {
        if let Some(name) = el.value().attr("data-macro-name") {
            out.push(self.macro_element(el, name, style));
            return;
        }

        let tag = el.value().name();
        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse().unwrap_or(1);
                let children = self.collect(el, style);
                if !is_blank(&children) {
                    out.push(ContentNode::Heading { level, children });
                }
            }
            "p" | "dt" | "dd" => {
                let children = self.collect(el, style);
                if !is_blank(&children) {
                    out.push(ContentNode::Paragraph(children));
                }
            }
            "ul" | "ol" => out.push(ContentNode::List(self.list(el, tag == "ol", style))),
            "li" => out.push(self.list_item(el, style)),
            "table" if has_class(el, "metadata-summary-macro") => {
                match self.properties_report(el) {
                    Some(report) => {
                        let table = self.table(report, style);
                        if !table.is_empty() {
                            out.push(ContentNode::Table(table));
                        }
                    }
                    None => log::debug!("Page properties report not found in export view"),
                }
            }
            "table" => {
                let table = self.table(el, style);
                if !table.is_empty() {
                    out.push(ContentNode::Table(table));
                }
            }
            "pre" => {
                if let Some(code) = code_block(el, None) {
                    out.push(code);
                }
            }
            "blockquote" => out.push(ContentNode::Quote(self.collect(el, style))),
            "hr" => out.push(ContentNode::HorizontalRule),
            "br" => out.push(ContentNode::LineBreak),
            "a" => self.link(el, style, out),
            "img" => out.push(image(el)),
            "strong" | "b" => self.children(el, TextStyle { bold: true, ..style }, out),
            "em" | "i" => self.children(el, TextStyle { italic: true, ..style }, out),
            "u" | "ins" => self.children(el, TextStyle { underline: true, ..style }, out),
            "s" | "del" | "strike" => {
                self.children(el, TextStyle { strikethrough: true, ..style }, out)
            }
            "sup" => self.children(el, TextStyle { superscript: true, ..style }, out),
            "sub" => self.children(el, TextStyle { subscript: true, ..style }, out),
            "code" | "tt" | "kbd" | "samp" => {
                self.children(el, TextStyle { code: true, ..style }, out)
            }
            "time" => match el.value().attr("datetime") {
                Some(datetime) => push_text(out, datetime, style),
                None => self.children(el, style, out),
            },
            "div" if has_class(el, "columnLayout") => self.column_layout(el, style, out),
            "div" if has_class(el, "expand-container") => {
                out.push(ContentNode::Macro(self.expand(el, style)));
            }
            "span" if has_class(el, "status-macro") => {
                out.push(ContentNode::Macro(status(el)));
            }
            "span" if has_class(el, "confluence-anchor-link") => {
                if let Some(id) = el.value().attr("id") {
                    out.push(ContentNode::Macro(Macro::new("anchor").with_param("name", id)));
                }
            }
            _ if SKIPPED.contains(&tag) => {}
            _ if TRANSPARENT.contains(&tag) => self.children(el, style, out),
            _ => {
                log::debug!("Unrecognized element <{}>", tag);
                out.push(ContentNode::Unknown {
                    tag: tag.to_string(),
                    text: collapse_whitespace(&el.text().collect::<String>())
                        .trim()
                        .to_string(),
                    children: self.collect(el, style),
                });
            }
        }
    }

    fn list(&mut self, el: ElementRef<'_>, ordered: bool, style: TextStyle) -> List {
        let mut items = Vec::new();
        for child in el.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "li" => items.push(self.list_item(child, style)),
                "ul" | "ol" => {
                    let nested = self.list(child, child.value().name() == "ol", style);
                    items.push(ContentNode::List(nested));
                }
                _ => {}
            }
        }
        List {
            ordered,
            start: el
                .value()
                .attr("start")
                .and_then(|s| s.trim().parse::<u32>().ok())
                .map_or(1, |n| n.min(List::MAX_NUMBER)),
            items,
        }
    }

    fn list_item(&mut self, el: ElementRef<'_>, style: TextStyle) -> ContentNode {
        let children = self.collect(el, style);
        if el.value().attr("data-inline-task-id").is_some() {
            ContentNode::Task {
                checked: has_class(el, "checked"),
                children,
            }
        } else {
            ContentNode::ListItem(children)
        }
    }

    fn table(&mut self, el: ElementRef<'_>, style: TextStyle) -> Table {
        let mut table = Table::new();
        self.table_rows(el, style, &mut table);
        table
    }

    fn table_rows(&mut self, el: ElementRef<'_>, style: TextStyle, table: &mut Table) {
        for child in el.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "caption" => {
                    let caption = collapse_whitespace(&child.text().collect::<String>());
                    let caption = caption.trim();
                    if !caption.is_empty() {
                        table.caption = Some(caption.to_string());
                    }
                }
                "thead" | "tbody" | "tfoot" => self.table_rows(child, style, table),
                "tr" => {
                    let cells = child
                        .children()
                        .filter_map(ElementRef::wrap)
                        .filter(|c| matches!(c.value().name(), "td" | "th"))
                        .map(|c| self.table_cell(c, style))
                        .collect();
                    table.add_row(TableRow::new(cells));
                }
                _ => {}
            }
        }
    }

    fn table_cell(&mut self, el: ElementRef<'_>, style: TextStyle) -> TableCell {
        let span = |name: &str| {
            el.value()
                .attr(name)
                .and_then(|v| v.trim().parse::<u16>().ok())
                .unwrap_or(1)
        };
        let mut cell = TableCell::new(self.collect(el, style))
            .rowspan(span("rowspan"))
            .colspan(span("colspan"));
        if el.value().name() == "th" {
            cell = cell.as_header();
        }
        cell
    }

    /// Side-by-side sections become a one-row table.
    fn column_layout(&mut self, el: ElementRef<'_>, style: TextStyle, out: &mut Vec<ContentNode>) {
        let cells: Vec<ElementRef<'_>> = descendants(el)
            .filter(|d| d.value().name() == "div" && has_class(*d, "cell"))
            .collect();
        if cells.len() < 2 {
            self.children(el, style, out);
            return;
        }
        let row = cells
            .into_iter()
            .map(|cell| TableCell::new(self.collect(cell, style)))
            .collect();
        out.push(ContentNode::Table(Table::from_rows(vec![TableRow::new(row)])));
    }

    fn link(&mut self, el: ElementRef<'_>, style: TextStyle, out: &mut Vec<ContentNode>) {
        let attr = |name: &str| el.value().attr(name).filter(|v| !v.is_empty() && *v != "null");
        let href = attr("href").unwrap_or("");

        if has_class(el, "user-mention") {
            let name = clean_user_name(&el.text().collect::<String>());
            push_text(out, &name, style);
            return;
        }
        if href.contains("createpage.action") || has_class(el, "createlink") {
            self.children(el, style, out);
            return;
        }

        let children = self.collect(el, style);
        let target = match attr("data-linked-resource-type") {
            Some("page") | Some("blogpost") if attr("data-linked-resource-id").is_some() => {
                let id = attr("data-linked-resource-id").unwrap_or_default();
                Some(LinkTarget::Document(document_ref(id, href)))
            }
            Some("attachment") => Some(LinkTarget::Attachment(AttachmentRef {
                id: attr("data-linked-resource-id").map(String::from),
                file_id: attr("data-linked-resource-file-id")
                    .or_else(|| attr("data-media-id"))
                    .map(String::from),
                title: attr("data-filename")
                    .or_else(|| attr("data-linked-resource-default-alias"))
                    .map(String::from),
                owner_id: attr("data-linked-resource-container-id").map(String::from),
                href: Some(href.to_string()).filter(|h| !h.is_empty()),
            })),
            _ if href.starts_with('#') => {
                let text = plain_text(&children);
                let anchor = if text.trim().is_empty() { &href[1..] } else { text.trim() };
                Some(LinkTarget::Anchor(anchor.to_string()))
            }
            _ if is_confluence_page_href(href) => page_id_from_href(href)
                .map(|id| LinkTarget::Document(document_ref(&id, href))),
            _ if !href.is_empty() => Some(LinkTarget::Url(href.to_string())),
            _ => None,
        };

        match target {
            Some(target) => out.push(ContentNode::Link(Link {
                target,
                children,
                title: None,
            })),
            None => out.extend(children),
        }
    }

    fn macro_element(&mut self, el: ElementRef<'_>, name: &str, style: TextStyle) -> ContentNode {
        let mut params = macro_params(el);

        if let Some(kind) = AlertKind::from_macro_name(name) {
            let title = descendants(el)
                .find(|d| has_class(*d, "title") || has_class(*d, "panelHeader"))
                .map(|t| collapse_whitespace(&t.text().collect::<String>()).trim().to_string())
                .filter(|t| !t.is_empty())
                .or_else(|| params.param("title").map(String::from));
            let body = descendants(el).find(|d| {
                has_class(*d, "confluence-information-macro-body") || has_class(*d, "panelContent")
            });
            let children = self.collect(body.unwrap_or(el), style);
            return ContentNode::Alert {
                kind,
                title,
                children,
            };
        }

        match name {
            "code" | "noformat" => {
                let language = params.param("language").map(String::from);
                if let Some(code) = descendants(el)
                    .find(|d| d.value().name() == "pre")
                    .and_then(|pre| code_block(pre, language))
                {
                    return code;
                }
            }
            "details" => {
                let body = self.collect(el, style);
                self.collect_properties(&body);
                return ContentNode::Macro(params.with_body(body));
            }
            "expand" => return ContentNode::Macro(self.expand(el, style)),
            "drawio" => {
                if params.param("diagramName").is_none() {
                    if let Some(c) = diagram_name_regex().captures(&el.html()) {
                        params = params.with_param("diagramName", c[1].trim());
                    }
                }
                return ContentNode::Macro(params);
            }
            "jira" if el.value().name() == "div" && el.value().attr("data-jira-key").is_none() => {
                let tables = self.export_elements(|d| {
                    d.value().name() == "div" && has_class(d, "jira-table")
                });
                match tables.as_slice() {
                    [table] => {
                        let body = self.collect(*table, style);
                        return ContentNode::Macro(params.with_body(body));
                    }
                    [] => log::debug!("No Jira table found in export view"),
                    _ => log::warn!("Multiple Jira tables on one page are not supported"),
                }
            }
            "jira" => return ContentNode::Macro(self.jira(el, params, style)),
            "status" => return ContentNode::Macro(status(el)),
            "toc" | "children" | "attachments" => return ContentNode::Macro(params),
            "anchor" => {
                if params.param("name").is_none() {
                    let name = params
                        .param("")
                        .or_else(|| el.value().attr("id"))
                        .map(String::from);
                    if let Some(name) = name {
                        params = params.with_param("name", name);
                    }
                }
                return ContentNode::Macro(params);
            }
            _ => {}
        }

        let body = self.collect(el, style);
        ContentNode::Macro(params.with_body(body))
    }

    fn expand(&mut self, el: ElementRef<'_>, style: TextStyle) -> Macro {
        let mut expand = Macro::new("expand");
        if let Some(title) = descendants(el)
            .find(|d| has_class(*d, "expand-control-text"))
            .map(|t| collapse_whitespace(&t.text().collect::<String>()).trim().to_string())
            .filter(|t| !t.is_empty())
        {
            expand = expand.with_param("title", title);
        }
        let body = match descendants(el).find(|d| has_class(*d, "expand-content")) {
            Some(content) => self.collect(content, style),
            None => self.collect(el, style),
        };
        expand.with_body(body)
    }

    fn jira(&mut self, el: ElementRef<'_>, mut params: Macro, style: TextStyle) -> Macro {
        if let Some(key) = el.value().attr("data-jira-key") {
            params = params.with_param("key", key);
        }
        if let Some(href) = descendants(el)
            .find(|d| d.value().name() == "a" && has_class(*d, "jira-issue-key"))
            .and_then(|a| a.value().attr("href"))
        {
            params = params.with_param("url", href);
        }
        if let Some(summary) = descendants(el)
            .find(|d| has_class(*d, "summary"))
            .map(|s| collapse_whitespace(&s.text().collect::<String>()).trim().to_string())
            .filter(|s| !s.is_empty())
        {
            params = params.with_param("summary", summary);
        }
        if params.param("key").is_some() {
            params
        } else {
            let body = self.collect(el, style);
            params.with_body(body)
        }
    }

    /// The rendered table behind a page-properties report, matched on `data-cql`.
    fn properties_report(&self, el: ElementRef<'_>) -> Option<ElementRef<'e>> {
        let cql = el.value().attr("data-cql").filter(|c| !c.is_empty())?;
        self.export_elements(|d| d.value().name() == "table" && d.value().attr("data-cql") == Some(cql))
            .into_iter()
            .next()
    }

    fn export_elements<F>(&self, matches: F) -> Vec<ElementRef<'e>>
    where
        F: Fn(ElementRef<'e>) -> bool,
    {
        match self.export_view {
            Some(html) => descendants(html.root_element()).filter(|d| matches(*d)).collect(),
            None => Vec::new(),
        }
    }

    /// Two-cell rows of page-properties tables.
    fn collect_properties(&mut self, nodes: &[ContentNode]) {
        for node in nodes {
            match node {
                ContentNode::Table(table) => {
                    for row in &table.rows {
                        if let [key, value] = row.cells.as_slice() {
                            let key = key.plain_text().trim().to_string();
                            let value = value.plain_text().trim().to_string();
                            if !key.is_empty() && !self.properties.iter().any(|(k, _)| *k == key) {
                                self.properties.push((key, value));
                            }
                        }
                    }
                }
                other => self.collect_properties(other.children()),
            }
        }
    }
}

fn status(el: ElementRef<'_>) -> Macro {
    let title = collapse_whitespace(&el.text().collect::<String>());
    Macro::new("status").with_param("title", title.trim())
}

fn image(el: ElementRef<'_>) -> ContentNode {
    let attr = |name: &str| el.value().attr(name).filter(|v| !v.is_empty() && *v != "null");

    if has_class(el, "emoticon") {
        let text = attr("data-emoji-fallback").or_else(|| attr("alt")).unwrap_or("");
        return ContentNode::text(text);
    }

    let src = attr("src").or_else(|| attr("data-image-src")).unwrap_or("");
    let is_attachment = attr("data-linked-resource-id").is_some() || attr("data-media-id").is_some();
    let target = if is_attachment {
        LinkTarget::Attachment(AttachmentRef {
            id: attr("data-linked-resource-id").map(String::from),
            file_id: attr("data-media-id").map(String::from),
            title: attr("data-linked-resource-default-alias").map(String::from),
            owner_id: attr("data-linked-resource-container-id").map(String::from),
            href: Some(src.to_string()).filter(|s| !s.is_empty()),
        })
    } else {
        LinkTarget::Url(src.to_string())
    };

    ContentNode::Image(Image {
        target,
        alt: attr("alt").or_else(|| attr("title")).map(String::from),
        width: attr("width").and_then(|w| w.trim().parse().ok()),
        height: attr("height").and_then(|h| h.trim().parse().ok()),
    })
}

fn code_block(pre: ElementRef<'_>, fallback_language: Option<String>) -> Option<ContentNode> {
    let code: String = pre.text().collect();
    if code.trim().is_empty() {
        return None;
    }
    let language = pre
        .value()
        .attr("data-syntaxhighlighter-params")
        .and_then(|p| brush_regex().captures(p))
        .map(|c| c[1].trim().to_string())
        .or(fallback_language)
        .filter(|l| !l.is_empty());
    Some(ContentNode::CodeBlock { language, code })
}

/// `key=value|key=value` parameters carried on macro elements.
fn macro_params(el: ElementRef<'_>) -> Macro {
    let mut m = Macro::new(el.value().attr("data-macro-name").unwrap_or_default());
    if let Some(raw) = el.value().attr("data-macro-parameters") {
        for pair in raw.split('|') {
            if let Some((key, value)) = pair.split_once('=') {
                m = m.with_param(key.trim(), value.trim());
            }
        }
    }
    m
}

fn document_ref(id: &str, href: &str) -> DocumentRef {
    let reference = DocumentRef::new(id);
    if href.is_empty() {
        reference
    } else {
        reference.with_href(href)
    }
}

fn is_confluence_page_href(href: &str) -> bool {
    href.starts_with('/') || href.contains("/wiki/") || href.contains("viewpage.action")
}

fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

fn descendants<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.descendants().skip(1).filter_map(ElementRef::wrap)
}

fn is_blank(nodes: &[ContentNode]) -> bool {
    nodes.iter().all(|n| match n {
        ContentNode::Text(run) => run.text.trim().is_empty(),
        ContentNode::LineBreak => true,
        _ => false,
    })
}

/// Collapse runs of HTML whitespace into one space.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if matches!(c, ' ' | '\n' | '\t' | '\r' | '\u{c}') {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Remove whitespace-only text next to block nodes; it is markup formatting.
fn drop_block_whitespace(nodes: Vec<ContentNode>) -> Vec<ContentNode> {
    if nodes.iter().all(ContentNode::is_inline) {
        return nodes;
    }
    let keep: Vec<bool> = (0..nodes.len())
        .map(|i| {
            let blank = matches!(&nodes[i], ContentNode::Text(run) if run.text.trim().is_empty());
            let after_block = i == 0 || !nodes[i - 1].is_inline();
            let before_block = nodes.get(i + 1).map_or(true, |n| !n.is_inline());
            !(blank && (after_block || before_block))
        })
        .collect();
    nodes
        .into_iter()
        .zip(keep)
        .filter_map(|(node, keep)| keep.then_some(node))
        .collect()
}

fn push_text(out: &mut Vec<ContentNode>, text: &str, style: TextStyle) {
    if text.is_empty() {
        return;
    }
    let previous_ends_in_space = matches!(
        out.last(),
        Some(ContentNode::Text(run)) if run.text.ends_with(' ')
    );
    let text = if previous_ends_in_space {
        text.trim_start_matches(' ')
    } else {
        text
    };
    if !text.is_empty() {
        out.push(ContentNode::Text(TextRun {
            text: text.to_string(),
            style,
        }));
    }
}
