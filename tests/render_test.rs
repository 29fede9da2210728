//! Integration tests: Confluence view HTML through to Markdown.

use confluence_markdown::index::IndexEntry;
use confluence_markdown::{parse_view_html, to_markdown, Document, ExportIndex, RenderOptions};
use std::path::PathBuf;

const PAGE: &str = r#"
<h1>Overview</h1>
<p>Read the <a href="/wiki/spaces/DOC/pages/2/Setup" data-linked-resource-id="2" data-linked-resource-type="page">setup guide</a> first.</p>
<div data-macro-name="details" data-macro-parameters="id=meta">
  <table><tbody>
    <tr><th>Owner</th><td>Alice</td></tr>
    <tr><th>Status</th><td>Draft</td></tr>
  </tbody></table>
</div>
<div class="confluence-information-macro" data-macro-name="warning">
  <div class="confluence-information-macro-body"><p>Back up first.</p></div>
</div>
<div class="code panel" data-macro-name="code"><div class="codeContent"><pre class="syntaxhighlighter-pre" data-syntaxhighlighter-params="brush: bash; gutter: false">make install</pre></div></div>
<table>
  <thead><tr><th>Key</th><th>Value</th></tr></thead>
  <tbody><tr><td>port</td><td>8080</td></tr></tbody>
</table>
<ul><li>one</li><li>two</li></ul>
"#;

fn index() -> ExportIndex {
    let mut index = ExportIndex::new("/out").with_base_url("https://wiki.example.com");
    for (id, title, path, ancestors) in [
        ("1", "Guide", "DOC/Guide.md", vec![]),
        ("2", "Setup", "DOC/Guide/Setup.md", vec!["1"]),
    ] {
        index.add_document(IndexEntry {
            id: id.into(),
            title: title.into(),
            space_key: "DOC".into(),
            ancestors: ancestors.into_iter().map(String::from).collect(),
            relative_path: path.into(),
            absolute_path: PathBuf::from("/out").join(path),
        });
    }
    index
}

fn guide() -> Document {
    let parsed = parse_view_html(PAGE);
    let mut doc = Document::new("1", "Guide", "DOC")
        .with_label("ops")
        .with_body(parsed.nodes);
    for (key, value) in parsed.properties {
        doc.set_property(key, value);
    }
    doc
}

#[test]
fn test_full_page_body() {
    let md = to_markdown(&guide(), &index(), &RenderOptions::body_only())
        .unwrap()
        .markdown;

    assert!(md.starts_with("# Overview\n\n"));
    assert!(md.contains("Read the [setup guide](Guide/Setup.md) first."));
    assert!(md.contains("> [!CAUTION]"));
    assert!(md.contains("> Back up first."));
    assert!(md.contains("```bash\nmake install"));
    assert!(md.contains("| Key | Value |\n| --- | --- |\n| port | 8080 |"));
    assert!(md.contains("- one\n- two"));
    assert!(!md.contains("Alice"));
}

#[test]
fn test_front_matter_from_page_properties() {
    let md = to_markdown(&guide(), &index(), &RenderOptions::default())
        .unwrap()
        .markdown;

    assert!(md.starts_with("---\n"));
    assert!(md.contains("owner: Alice"));
    assert!(md.contains("status: Draft"));
    assert!(md.contains("tags:\n  - '#ops'"));
}

#[test]
fn test_absolute_link_style() {
    let options = RenderOptions::body_only().with_link_style(confluence_markdown::LinkStyle::Absolute);
    let md = to_markdown(&guide(), &index(), &options).unwrap().markdown;
    assert!(md.contains("[setup guide](/DOC/Guide/Setup.md)"));
}

#[test]
fn test_unexported_target_links_back_to_confluence() {
    let mut index = ExportIndex::new("/out").with_base_url("https://wiki.example.com");
    index.add_document(IndexEntry {
        id: "1".into(),
        title: "Guide".into(),
        space_key: "DOC".into(),
        ancestors: vec![],
        relative_path: "Guide.md".into(),
        absolute_path: PathBuf::from("/out/Guide.md"),
    });

    let md = to_markdown(&guide(), &index, &RenderOptions::body_only())
        .unwrap()
        .markdown;
    assert!(md.contains("[setup guide](https://wiki.example.com/wiki/spaces/DOC/pages/2/Setup)"));
}

#[test]
fn test_page_to_markdown_without_index() {
    use confluence_markdown::model::TextRun;
    use confluence_markdown::{page_to_markdown, ContentNode, MemorySource};

    let source = MemorySource::new()
        .with_base_url("https://wiki.example.com")
        .with_document(Document::new("5", "Solo", "DOC").with_body(vec![
            ContentNode::Paragraph(vec![
                ContentNode::Text(TextRun::italic("see")),
                ContentNode::text(" "),
                ContentNode::url_link("https://rust-lang.org", "Rust"),
                ContentNode::text(" and "),
                ContentNode::page_link("1", "Guide"),
            ]),
        ]));

    let md = page_to_markdown(&source, "5", &RenderOptions::body_only()).unwrap();
    assert!(md.starts_with("_see_ "));
    assert!(md.contains("[Rust](https://rust-lang.org)"));
    assert!(md.contains("[Guide](https://wiki.example.com/pages/viewpage.action?pageId=1)"));
    assert!(page_to_markdown(&source, "404", &RenderOptions::body_only()).is_err());
}

#[test]
fn test_huge_list_start_still_renders() {
    let parsed = parse_view_html(r#"<ol start="4294967295"><li>a</li><li>b</li></ol>"#);
    let doc = Document::new("9", "Numbers", "DOC").with_body(parsed.nodes);
    let md = to_markdown(&doc, &index(), &RenderOptions::body_only())
        .unwrap()
        .markdown;
    assert_eq!(md.trim_end(), "999999999. a\n999999999. b");
}
