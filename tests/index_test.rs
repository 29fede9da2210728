//! Integration tests for index building and path assignment.

use confluence_markdown::index::Resolution;
use confluence_markdown::path::{FilenameSanitizer, PathResolver};
use confluence_markdown::{
    export, Attachment, Document, Error, ExportConfig, ExportIndex, ExportScope, MemorySource,
    Space,
};
use std::path::Path;

fn source() -> MemorySource {
    MemorySource::new()
        .with_base_url("https://wiki.example.com")
        .with_space(Space::new("ENG", "Engineering: Team").with_homepage("1"))
        .with_document(Document::new("1", "Home", "ENG"))
        .with_document(Document::new("2", "Design / Plans", "ENG").with_ancestors(["1"]))
        .with_document(
            Document::new("3", "API", "ENG")
                .with_ancestors(["1", "2"])
                .with_attachment(Attachment::new("a1", "spec.pdf", "3").with_media_type("application/pdf")),
        )
}

fn resolver(page: &str) -> PathResolver {
    PathResolver::new(
        page,
        "{space_key}/{attachment_title}",
        FilenameSanitizer::default(),
    )
    .unwrap()
}

fn build(scope: &ExportScope, page_template: &str) -> ExportIndex {
    ExportIndex::build(&source(), scope, &resolver(page_template), Path::new("/out"))
        .unwrap()
        .index
}

#[test]
fn test_paths_follow_template() {
    let index = build(&ExportScope::space("ENG"), "{ancestor_titles}/{page_title}.md");

    assert_eq!(index.len(), 3);
    assert_eq!(index.get("1").unwrap().relative_path, "Home.md");
    assert_eq!(index.get("2").unwrap().relative_path, "Home/Design _ Plans.md");
    assert_eq!(index.get("3").unwrap().relative_path, "Home/Design _ Plans/API.md");
    assert_eq!(
        index.get("3").unwrap().absolute_path,
        Path::new("/out/Home/Design _ Plans/API.md")
    );
}

#[test]
fn test_space_variables() {
    let index = build(&ExportScope::page("3"), "{space_key}/{homepage_title}/{space_name}/{page_id}.md");
    assert_eq!(index.get("3").unwrap().relative_path, "ENG/Home/Engineering_ Team/3.md");
}

#[test]
fn test_single_page_scope_keeps_ancestor_titles() {
    let index = build(&ExportScope::page("3"), "{ancestor_titles}/{page_title}.md");

    assert_eq!(index.len(), 1);
    assert_eq!(index.get("3").unwrap().relative_path, "Home/Design _ Plans/API.md");
    assert!(!index.contains("2"));
    assert_eq!(index.title_of("2"), Some("Design / Plans"));
}

#[test]
fn test_out_of_scope_resolves_external() {
    let index = build(&ExportScope::page("3"), "{page_title}.md");

    assert!(index.resolve("3").local().is_some());
    match index.resolve("1") {
        Resolution::External(ext) => {
            assert_eq!(ext.title.as_deref(), Some("Home"));
            assert_eq!(
                ext.url.as_deref(),
                Some("https://wiki.example.com/pages/viewpage.action?pageId=1")
            );
        }
        other => panic!("expected external, got {:?}", other),
    }
}

#[test]
fn test_attachments_indexed_with_owner() {
    let index = build(&ExportScope::space("ENG"), "{page_title}.md");

    let entry = index.attachment("a1").unwrap();
    assert_eq!(entry.relative_path, "ENG/spec.pdf");
    assert_eq!(entry.attachment.owner_id, "3");
    assert_eq!(entry.attachment.space_key, "ENG");
    assert_eq!(index.attachments_of("3").len(), 1);
}

#[test]
fn test_children_in_index_order() {
    let index = build(&ExportScope::tree("1"), "{page_id}.md");
    let children: Vec<&str> = index.children_of("1").iter().map(|e| e.id.as_str()).collect();
    assert_eq!(children, vec!["2"]);
}

#[test]
fn test_unknown_placeholder_fails_before_fetching() {
    let source = source();
    let dir = tempfile::tempdir().unwrap();
    let mut config = ExportConfig::default().with_output_directory(dir.path());
    config.page_path = "{space_key}/{page_name}.md".to_string();

    let err = export(&source, &ExportScope::space("ENG"), &config).unwrap_err();
    assert!(matches!(err, Error::InvalidTemplate { ref placeholder, .. } if placeholder == "page_name"));
    assert_eq!(source.document_fetches(), 0);
}

#[test]
fn test_missing_root_is_not_found() {
    let err = ExportIndex::build(
        &source(),
        &ExportScope::tree("77"),
        &resolver("{page_title}.md"),
        Path::new("/out"),
    )
    .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(err.is_fatal());
}
