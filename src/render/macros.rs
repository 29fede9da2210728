//! Macro conversion, dispatched by macro name.

use crate::model::{plain_text, AlertKind, ContentNode, Macro};
use crate::path::link_href;

use super::inline::heading_slug;
use super::markdown::{link_target, Converter, BLOCK_SEP};

const EXPAND_SUMMARY: &str = "Click here to expand...";

/// Strip licensing suffixes Confluence appends to display names.
pub fn clean_user_name(name: &str) -> String {
    let name = name.trim();
    let name = name.strip_suffix("(Unlicensed)").unwrap_or(name).trim_end();
    let name = name.strip_suffix("(Deactivated)").unwrap_or(name);
    name.trim().to_string()
}

impl Converter<'_> {
    pub(super) fn macro_node(&mut self, m: &Macro) -> String {
        if self.options.is_ignored(&m.name) {
            return String::new();
        }

        if let Some(kind) = AlertKind::from_macro_name(&m.name) {
            self.stats.macro_count += 1;
            return self.block(&ContentNode::Alert {
                kind,
                title: m.param("title").map(str::to_string),
                children: m.body.clone(),
            });
        }

        let out = match m.name.as_str() {
            "toc" => self.toc(m),
            "expand" => self.expand(m),
            "details" => String::new(),
            "drawio" => self.drawio(m),
            "scroll-ignore" => self.hidden(m),
            "jira" => self.jira(m),
            "attachments" => self.attachment_table(),
            "children" => self.children(m),
            "status" => self.status(m),
            "anchor" => self.anchor(m),
            "code" | "noformat" => self.block(&ContentNode::CodeBlock {
                language: m
                    .param("language")
                    .or_else(|| m.param("brush"))
                    .map(str::to_string),
                code: plain_text(&m.body),
            }),
            _ => return self.unsupported(m),
        };
        self.stats.macro_count += 1;
        out
    }

    fn unsupported(&mut self, m: &Macro) -> String {
        self.stats.unsupported_macro_count += 1;
        let body = self.blocks(&m.body, BLOCK_SEP);
        if body.is_empty() {
            log::warn!(
                "Unsupported macro '{}' in page {} left as a comment",
                m.name,
                self.doc.id
            );
            format!("<!-- unsupported macro: {} -->", m.name)
        } else {
            log::debug!("Unsupported macro '{}' rendered from its body", m.name);
            body
        }
    }

    /// Nested list of links to the page's own headings.
    fn toc(&mut self, m: &Macro) -> String {
        let min = param_level(m, "minLevel").unwrap_or(1);
        let max = param_level(m, "maxLevel").unwrap_or(6);

        let mut headings = Vec::new();
        collect_headings(&self.doc.body, &mut headings);
        headings.retain(|(level, text)| (min..=max).contains(level) && !text.is_empty());

        let Some(top) = headings.iter().map(|(level, _)| *level).min() else {
            return String::new();
        };
        headings
            .iter()
            .map(|(level, text)| {
                format!(
                    "{}- [{}](#{})",
                    "  ".repeat((level - top) as usize),
                    self.escape(text),
                    heading_slug(text)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn expand(&mut self, m: &Macro) -> String {
        let summary = m
            .param("title")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(EXPAND_SUMMARY)
            .to_string();
        let body = self.blocks(&m.body, BLOCK_SEP);
        format!(
            "<details>\n<summary>{}</summary>\n\n{}\n\n</details>",
            summary, body
        )
    }

    /// Preview image wrapped in a link to the diagram source.
    fn drawio(&mut self, m: &Macro) -> String {
        let Some(name) = m
            .param("diagramName")
            .or_else(|| m.param("name"))
            .map(str::trim)
            .filter(|n| !n.is_empty())
        else {
            return String::new();
        };

        let index = self.index;
        let owned = index.attachments_of(&self.doc.id);
        let preview_name = format!("{}.png", name);
        let diagram = owned.iter().find(|e| e.attachment.title == name);
        let preview = owned.iter().find(|e| e.attachment.title == preview_name);

        match (diagram, preview) {
            (Some(diagram), Some(preview)) => {
                self.attachments.insert(diagram.attachment.id.clone());
                self.attachments.insert(preview.attachment.id.clone());
                let style = self.options.attachment_link_style;
                format!(
                    "[![{}]({})]({})",
                    self.escape(name),
                    link_href(style, &self.path, &preview.relative_path),
                    link_href(style, &self.path, &diagram.relative_path)
                )
            }
            _ => {
                log::debug!("Drawio diagram '{}' has no exported attachments", name);
                format!("<!-- Drawio diagram `{}` not found -->", name)
            }
        }
    }

    fn hidden(&mut self, m: &Macro) -> String {
        let body = self.blocks(&m.body, BLOCK_SEP);
        if body.is_empty() {
            return String::new();
        }
        format!("<!--\n{}\n-->", body.replace("-->", "--&gt;"))
    }

    fn jira(&mut self, m: &Macro) -> String {
        let key = m.param("key").map(str::trim).filter(|k| !k.is_empty());
        let summary = m.param("summary").map(str::trim).filter(|s| !s.is_empty());
        let url = m
            .param("url")
            .or_else(|| m.param("href"))
            .filter(|u| !u.is_empty());

        let Some(key) = key else {
            return self.blocks(&m.body, BLOCK_SEP);
        };
        let label = match summary {
            Some(summary) => format!("\\[{}\\] {}", key, self.escape(summary)),
            None => format!("\\[{}\\]", key),
        };
        match url {
            Some(url) => format!("[{}]({})", label, link_target(url)),
            None => label,
        }
    }

    /// Table of the page's attachments with their last modification.
    fn attachment_table(&mut self) -> String {
        let index = self.index;
        let owned = index.attachments_of(&self.doc.id);
        if owned.is_empty() {
            return String::new();
        }

        let mut lines = vec!["| File | Modified |".to_string(), "| --- | --- |".to_string()];
        for entry in owned {
            self.attachments.insert(entry.attachment.id.clone());
            let href = link_href(
                self.options.attachment_link_style,
                &self.path,
                &entry.relative_path,
            );
            let modified = entry
                .attachment
                .modified
                .as_ref()
                .map(|v| {
                    let when = v.when.format("%b %d, %Y").to_string();
                    match v.by.as_deref().map(clean_user_name) {
                        Some(by) if !by.is_empty() => format!("{} by {}", when, self.escape(&by)),
                        _ => when,
                    }
                })
                .unwrap_or_default();
            lines.push(format!(
                "| [{}]({}) | {} |",
                self.escape(&entry.attachment.title),
                href,
                modified
            ));
        }
        lines.join("\n")
    }

    /// Links to indexed child pages, nested down to `depth` levels.
    fn children(&mut self, m: &Macro) -> String {
        let depth = if m.param("all") == Some("true") {
            usize::MAX
        } else {
            m.param("depth")
                .and_then(|d| d.trim().parse::<usize>().ok())
                .filter(|d| *d > 0)
                .unwrap_or(1)
        };
        let root = match m.param("page").map(str::trim).filter(|p| !p.is_empty()) {
            None => self.doc.id.clone(),
            Some(page) => {
                // `page` names a title, optionally as `SPACE:Title`.
                let (space, title) = match page.split_once(':') {
                    Some((space, title)) if self.index.find_by_title(space, title).is_some() => {
                        (space, title)
                    }
                    _ => (self.doc.space_key.as_str(), page),
                };
                match self.index.find_by_title(space, title) {
                    Some(entry) => entry.id.clone(),
                    None => {
                        log::debug!("Children macro names page {:?}, which is not exported", page);
                        return String::new();
                    }
                }
            }
        };
        let mut lines = Vec::new();
        self.child_lines(&root, 0, depth, &mut lines);
        lines.join("\n")
    }

    fn child_lines(&mut self, id: &str, level: usize, depth: usize, lines: &mut Vec<String>) {
        if level >= depth {
            return;
        }
        let index = self.index;
        for child in index.children_of(id) {
            let link = self.page_link(&child.id);
            lines.push(format!("{}- {}", "  ".repeat(level), link));
            self.child_lines(&child.id, level + 1, depth, lines);
        }
    }

    fn status(&mut self, m: &Macro) -> String {
        let title = match m.param("title") {
            Some(title) => title.trim().to_string(),
            None => plain_text(&m.body).trim().to_string(),
        };
        if title.is_empty() {
            return String::new();
        }
        format!("**{}**", self.escape(&title.to_uppercase()))
    }

    fn anchor(&mut self, m: &Macro) -> String {
        match m.param("name").or_else(|| m.param("")) {
            Some(name) if !name.trim().is_empty() => {
                format!("<a id=\"{}\"></a>", heading_slug(name))
            }
            _ => String::new(),
        }
    }
}

fn param_level(m: &Macro, key: &str) -> Option<u8> {
    m.param(key)
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map(|l| l.clamp(1, 6))
}

fn collect_headings(nodes: &[ContentNode], out: &mut Vec<(u8, String)>) {
    for node in nodes {
        match node {
            ContentNode::Heading { level, children } => {
                out.push((*level, plain_text(children).trim().to_string()));
            }
            ContentNode::Macro(m) if m.name == "toc" => {}
            other => collect_headings(other.children(), out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{AttachmentEntry, ExportIndex, IndexEntry};
    use crate::model::{Attachment, Document};
    use crate::render::{to_markdown, RenderOptions, RenderedDocument};
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    fn index() -> ExportIndex {
        let mut index = ExportIndex::new("/out");
        for (id, title, ancestors, path) in [
            ("1", "Home", vec![], "S/Home.md"),
            ("2", "Child", vec!["1"], "S/Home/Child.md"),
            ("3", "Grandchild", vec!["1", "2"], "S/Home/Child/Grandchild.md"),
        ] {
            index.add_document(IndexEntry {
                id: id.into(),
                title: title.into(),
                space_key: "S".into(),
                ancestors: ancestors.into_iter().map(String::from).collect(),
                relative_path: path.into(),
                absolute_path: PathBuf::from("/out").join(path),
            });
        }
        for (id, title) in [("a1", "flow"), ("a2", "flow.png")] {
            let attachment = Attachment::new(id, title, "1").with_modified(
                Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
                Some("Alice (Unlicensed)".into()),
            );
            index.add_attachment(AttachmentEntry {
                relative_path: format!("S/attachments/{}", id),
                absolute_path: PathBuf::from("/out/S/attachments").join(id),
                attachment,
            });
        }
        index
    }

    fn render(nodes: Vec<ContentNode>) -> RenderedDocument {
        let index = index();
        let doc = Document::new("1", "Home", "S").with_body(nodes);
        to_markdown(&doc, &index, &RenderOptions::body_only()).unwrap()
    }

    fn render_macro(m: Macro) -> String {
        render(vec![ContentNode::Macro(m)]).markdown.trim_end().to_string()
    }

    #[test]
    fn test_clean_user_name() {
        assert_eq!(clean_user_name("Alice (Unlicensed)"), "Alice");
        assert_eq!(clean_user_name("Bob (Deactivated)"), "Bob");
        assert_eq!(clean_user_name("Carol"), "Carol");
    }

    #[test]
    fn test_toc_lists_headings() {
        let md = render(vec![
            ContentNode::Macro(Macro::new("toc")),
            ContentNode::heading(1, "Intro"),
            ContentNode::heading(2, "Getting Started"),
        ])
        .markdown;
        assert!(md.starts_with("- [Intro](#intro)\n  - [Getting Started](#getting-started)"));
    }

    #[test]
    fn test_expand_default_summary() {
        let m = Macro::new("expand").with_body(vec![ContentNode::paragraph("hidden")]);
        assert_eq!(
            render_macro(m),
            "<details>\n<summary>Click here to expand...</summary>\n\nhidden\n\n</details>"
        );
    }

    #[test]
    fn test_drawio_found() {
        let result = render(vec![ContentNode::Macro(
            Macro::new("drawio").with_param("diagramName", "flow"),
        )]);
        assert_eq!(
            result.markdown.trim_end(),
            "[![flow](attachments/a2)](attachments/a1)"
        );
        assert_eq!(result.attachments.len(), 2);
    }

    #[test]
    fn test_drawio_missing() {
        let m = Macro::new("drawio").with_param("diagramName", "other");
        assert_eq!(render_macro(m), "<!-- Drawio diagram `other` not found -->");
    }

    #[test]
    fn test_jira_issue() {
        let m = Macro::new("jira")
            .with_param("key", "ABC-1")
            .with_param("summary", "Fix it")
            .with_param("url", "https://jira/browse/ABC-1");
        assert_eq!(render_macro(m), "[\\[ABC-1\\] Fix it](https://jira/browse/ABC-1)");
    }

    #[test]
    fn test_attachments_table() {
        let md = render_macro(Macro::new("attachments"));
        assert_eq!(
            md,
            "| File | Modified |\n| --- | --- |\n\
             | [flow](attachments/a1) | Jan 02, 2024 by Alice |\n\
             | [flow.png](attachments/a2) | Jan 02, 2024 by Alice |"
        );
    }

    #[test]
    fn test_children_depth() {
        assert_eq!(render_macro(Macro::new("children")), "- [Child](Home/Child.md)");
        let all = render_macro(Macro::new("children").with_param("all", "true"));
        assert_eq!(
            all,
            "- [Child](Home/Child.md)\n  - [Grandchild](Home/Child/Grandchild.md)"
        );
    }

    #[test]
    fn test_children_of_named_page() {
        let named = render_macro(Macro::new("children").with_param("page", "Child"));
        assert_eq!(named, "- [Grandchild](Home/Child/Grandchild.md)");
        let keyed = render_macro(Macro::new("children").with_param("page", "S:Child"));
        assert_eq!(keyed, named);
        assert_eq!(render_macro(Macro::new("children").with_param("page", "Nowhere")), "");
    }

    #[test]
    fn test_jira_url_with_parentheses() {
        let m = Macro::new("jira")
            .with_param("key", "ABC-2")
            .with_param("url", "https://jira/issues/?jql=key in (ABC-2)");
        assert_eq!(
            render_macro(m),
            "[\\[ABC-2\\]](<https://jira/issues/?jql=key in (ABC-2)>)"
        );
    }

    #[test]
    fn test_status_and_ignored() {
        let status = Macro::new("status").with_param("title", "done");
        let ignored = Macro::new("qc-read-and-understood-signature-box");
        let md = render(vec![
            ContentNode::Paragraph(vec![ContentNode::text("State: "), ContentNode::Macro(status)]),
            ContentNode::Macro(ignored),
        ]);
        assert_eq!(md.markdown.trim_end(), "State: **DONE**");
    }

    #[test]
    fn test_unsupported_macro_degrades() {
        let with_body = Macro::new("mystery").with_body(vec![ContentNode::paragraph("inner")]);
        let without = Macro::new("gadget");
        let result = render(vec![
            ContentNode::Macro(with_body),
            ContentNode::Macro(without),
        ]);
        assert_eq!(
            result.markdown.trim_end(),
            "inner\n\n<!-- unsupported macro: gadget -->"
        );
        assert_eq!(result.stats.unsupported_macro_count, 2);
    }

    #[test]
    fn test_alert_macro() {
        let m = Macro::new("info")
            .with_param("title", "Heads up")
            .with_body(vec![ContentNode::paragraph("Read this")]);
        assert_eq!(
            render_macro(m),
            "> [!IMPORTANT]\n> **Heads up**\n>\n> Read this"
        );
    }

    #[test]
    fn test_scroll_ignore_hidden() {
        let m = Macro::new("scroll-ignore").with_body(vec![ContentNode::paragraph("secret")]);
        assert_eq!(render_macro(m), "<!--\nsecret\n-->");
    }
}
