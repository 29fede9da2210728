//! Confluence view HTML parsing.
//!
//! Turns the rendered `body.view` of a page into the content tree used by
//! the renderer. Macros are recognized by their `data-macro-name` markers
//! and carry their parameters through; anything unrecognized is kept as an
//! unknown node so the renderer can degrade it to text.
//!
//! Page-properties reports and Jira issue tables are only shells in the
//! view; their content is taken from `body.export_view` when it is given.

mod html;
mod url;

pub use url::{page_id_from_href, parse_page_ref};

use crate::model::{ContentNode, TextStyle};
use html::Walker;
use scraper::Html;

/// Content tree and page properties parsed from view HTML.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedBody {
    /// Top-level content nodes
    pub nodes: Vec<ContentNode>,

    /// Key/value pairs from page-properties (`details`) macros
    pub properties: Vec<(String, String)>,
}

/// Parse Confluence view HTML.
///
/// Parsing never fails: malformed markup is repaired by the HTML parser and
/// unknown elements become [`ContentNode::Unknown`].
pub fn parse_view_html(html: &str) -> ParsedBody {
    parse_page_html(html, None)
}

/// Parse view HTML, filling report macros from the page's export view.
pub fn parse_page_html(view: &str, export_view: Option<&str>) -> ParsedBody {
    let fragment = Html::parse_fragment(view);
    let export = export_view
        .filter(|html| !html.trim().is_empty())
        .map(Html::parse_fragment);
    let mut walker = Walker {
        export_view: export.as_ref(),
        ..Default::default()
    };
    let nodes = walker.collect(fragment.root_element(), TextStyle::default());
    log::trace!("Parsed {} top-level nodes", nodes.len());
    ParsedBody {
        nodes,
        properties: walker.properties,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlertKind, LinkTarget};

    fn parse(html: &str) -> Vec<ContentNode> {
        parse_view_html(html).nodes
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let nodes = parse("<h2>Title</h2>\n<p>Hello   <strong>big</strong>\n world</p><p> </p>");
        assert_eq!(nodes.len(), 2);
        assert!(matches!(&nodes[0], ContentNode::Heading { level: 2, .. }));
        let ContentNode::Paragraph(children) = &nodes[1] else {
            panic!("expected paragraph");
        };
        assert_eq!(crate::model::plain_text(children), "Hello big world");
        assert!(matches!(&children[1], ContentNode::Text(run) if run.style.bold));
    }

    #[test]
    fn test_page_link() {
        let nodes = parse(
            r#"<p><a href="/wiki/spaces/A/pages/42/Child" data-linked-resource-id="42" data-linked-resource-type="page">Child</a></p>"#,
        );
        let ContentNode::Paragraph(children) = &nodes[0] else {
            panic!("expected paragraph");
        };
        let ContentNode::Link(link) = &children[0] else {
            panic!("expected link");
        };
        let LinkTarget::Document(doc) = &link.target else {
            panic!("expected document link");
        };
        assert_eq!(doc.id, "42");
        assert_eq!(doc.href.as_deref(), Some("/wiki/spaces/A/pages/42/Child"));
    }

    #[test]
    fn test_page_link_from_href_only() {
        let nodes = parse(r#"<a href="/wiki/spaces/A/pages/7">x</a> <a href="https://rust-lang.org">y</a>"#);
        assert!(matches!(
            &nodes[0],
            ContentNode::Link(l) if matches!(&l.target, LinkTarget::Document(d) if d.id == "7")
        ));
        assert!(matches!(
            &nodes[2],
            ContentNode::Link(l) if l.target == LinkTarget::Url("https://rust-lang.org".into())
        ));
    }

    #[test]
    fn test_attachment_image() {
        let nodes = parse(
            r#"<img class="confluence-embedded-image" src="/download/x.png" alt="diagram" data-linked-resource-id="99" data-media-id="f-1" data-linked-resource-container-id="42" width="300">"#,
        );
        let ContentNode::Image(image) = &nodes[0] else {
            panic!("expected image");
        };
        let LinkTarget::Attachment(att) = &image.target else {
            panic!("expected attachment image");
        };
        assert_eq!(att.id.as_deref(), Some("99"));
        assert_eq!(att.file_id.as_deref(), Some("f-1"));
        assert_eq!(att.owner_id.as_deref(), Some("42"));
        assert_eq!(image.width, Some(300));
        assert_eq!(image.alt.as_deref(), Some("diagram"));
    }

    #[test]
    fn test_task_list() {
        let nodes = parse(
            r#"<ul class="inline-task-list"><li data-inline-task-id="1" class="checked">done</li><li data-inline-task-id="2">open</li></ul>"#,
        );
        let ContentNode::List(list) = &nodes[0] else {
            panic!("expected list");
        };
        assert!(matches!(&list.items[0], ContentNode::Task { checked: true, .. }));
        assert!(matches!(&list.items[1], ContentNode::Task { checked: false, .. }));
    }

    const REPORT_VIEW: &str = r#"<div data-macro-name="detailssummary"><table class="metadata-summary-macro" data-cql="label = &quot;ops&quot;"></table></div>"#;

    const REPORT_EXPORT: &str = r#"<table class="metadata-summary-macro" data-cql="label = &quot;ops&quot;"><tr><th>Title</th><th>Owner</th></tr><tr><td>Runbook</td><td>Ann</td></tr></table>"#;

    #[test]
    fn test_properties_report_from_export_view() {
        let nodes = parse_page_html(REPORT_VIEW, Some(REPORT_EXPORT)).nodes;
        let ContentNode::Macro(m) = &nodes[0] else {
            panic!("expected macro");
        };
        let ContentNode::Table(table) = &m.body[0] else {
            panic!("expected report table");
        };
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].cells[1].plain_text(), "Ann");

        let without = parse_view_html(REPORT_VIEW).nodes;
        assert!(matches!(&without[0], ContentNode::Macro(m) if m.body.is_empty()));
    }

    #[test]
    fn test_jira_table_from_export_view() {
        let view = r#"<div data-macro-name="jira" data-macro-parameters="jqlQuery=project = ABC"><p>Loading issues</p></div>"#;
        let export = r#"<div class="jira-table"><table><tr><th>Key</th></tr><tr><td>ABC-1</td></tr></table></div>"#;

        let nodes = parse_page_html(view, Some(export)).nodes;
        let ContentNode::Macro(m) = &nodes[0] else {
            panic!("expected macro");
        };
        assert_eq!(m.name, "jira");
        assert!(matches!(&m.body[0], ContentNode::Table(t) if t.rows.len() == 2));

        let twice = format!("{export}{export}");
        let nodes = parse_page_html(view, Some(&twice)).nodes;
        let ContentNode::Macro(m) = &nodes[0] else {
            panic!("expected macro");
        };
        assert_eq!(crate::model::plain_text(&m.body).trim(), "Loading issues");
    }

    #[test]
    fn test_ordered_list_start_is_clamped() {
        let nodes = parse(r#"<ol start="4294967295"><li>a</li></ol><ol start="x"><li>b</li></ol>"#);
        assert!(matches!(&nodes[0], ContentNode::List(l) if l.ordered && l.start == 999_999_999));
        assert!(matches!(&nodes[1], ContentNode::List(l) if l.start == 1));
    }

    #[test]
    fn test_table_spans_and_header() {
        let nodes = parse(
            "<table><tbody><tr><th>A</th><th>B</th></tr><tr><td colspan=\"2\">wide</td></tr></tbody></table>",
        );
        let ContentNode::Table(table) = &nodes[0] else {
            panic!("expected table");
        };
        assert!(table.has_header_row());
        assert_eq!(table.rows[1].cells[0].colspan, 2);
    }

    #[test]
    fn test_code_macro_language() {
        let nodes = parse(
            r#"<div class="code panel" data-macro-name="code"><div class="codeContent"><pre class="syntaxhighlighter-pre" data-syntaxhighlighter-params="brush: rust; gutter: false">fn main() {}
</pre></div></div>"#,
        );
        assert_eq!(
            nodes[0],
            ContentNode::CodeBlock {
                language: Some("rust".into()),
                code: "fn main() {}\n".into(),
            }
        );
    }

    #[test]
    fn test_alert_macro() {
        let nodes = parse(
            r#"<div class="confluence-information-macro" data-macro-name="warning"><p class="title">Careful</p><div class="confluence-information-macro-body"><p>Hot</p></div></div>"#,
        );
        let ContentNode::Alert { kind, title, children } = &nodes[0] else {
            panic!("expected alert");
        };
        assert_eq!(*kind, AlertKind::Warning);
        assert_eq!(title.as_deref(), Some("Careful"));
        assert_eq!(crate::model::plain_text(children), "Hot");
    }

    #[test]
    fn test_macro_parameters_and_properties() {
        let parsed = parse_view_html(
            r#"<div data-macro-name="details" data-macro-parameters="id=meta|hidden=false"><table><tbody><tr><th>Owner</th><td>Alice</td></tr><tr><th>Status</th><td>Draft</td></tr></tbody></table></div>"#,
        );
        let ContentNode::Macro(m) = &parsed.nodes[0] else {
            panic!("expected macro");
        };
        assert_eq!(m.name, "details");
        assert_eq!(m.param("id"), Some("meta"));
        assert_eq!(
            parsed.properties,
            vec![
                ("Owner".to_string(), "Alice".to_string()),
                ("Status".to_string(), "Draft".to_string())
            ]
        );
    }

    #[test]
    fn test_jira_and_status() {
        let nodes = parse(
            r#"<p><span class="confluence-jim-macro jira-issue" data-jira-key="PRJ-1" data-macro-name="jira"><a class="jira-issue-key" href="https://jira/browse/PRJ-1">PRJ-1</a> - <span class="summary">Fix it</span></span> <span class="status-macro aui-lozenge">done</span></p>"#,
        );
        let ContentNode::Paragraph(children) = &nodes[0] else {
            panic!("expected paragraph");
        };
        let ContentNode::Macro(jira) = &children[0] else {
            panic!("expected jira macro");
        };
        assert_eq!(jira.param("key"), Some("PRJ-1"));
        assert_eq!(jira.param("url"), Some("https://jira/browse/PRJ-1"));
        assert_eq!(jira.param("summary"), Some("Fix it"));
        assert!(children
            .iter()
            .any(|n| matches!(n, ContentNode::Macro(m) if m.name == "status" && m.param("title") == Some("done"))));
    }

    #[test]
    fn test_user_mention_and_emoticon() {
        let nodes = parse(
            r#"<p><a class="confluence-userlink user-mention" href="/display/~bob">Bob (Deactivated)</a> <img class="emoticon emoticon-smile" alt="(smile)" data-emoji-fallback=":)"></p>"#,
        );
        assert_eq!(nodes[0].plain_text(), "Bob :)");
    }

    #[test]
    fn test_unknown_element_kept() {
        let nodes = parse("<custom-widget>payload</custom-widget><script>alert(1)</script>");
        assert_eq!(nodes.len(), 1);
        assert!(matches!(
            &nodes[0],
            ContentNode::Unknown { tag, text, .. } if tag == "custom-widget" && text == "payload"
        ));
    }

    #[test]
    fn test_column_layout_becomes_table() {
        let nodes = parse(
            r#"<div class="contentLayout2"><div class="columnLayout two-equal"><div class="cell normal"><div class="innerCell"><p>left</p></div></div><div class="cell normal"><div class="innerCell"><p>right</p></div></div></div></div>"#,
        );
        let ContentNode::Table(table) = &nodes[0] else {
            panic!("expected table");
        };
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].cells.len(), 2);
        assert_eq!(table.rows[0].cells[1].plain_text(), "right");
    }
}
