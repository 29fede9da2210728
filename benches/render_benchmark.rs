//! Benchmarks for page conversion.
//!
//! Run with: cargo bench
//!
//! Pages are synthetic Confluence view HTML with links between them.

use confluence_markdown::index::IndexEntry;
use confluence_markdown::{
    parse_view_html, to_markdown, Document, ExportIndex, Exporter, MemorySource, MemoryWriter,
    RenderOptions, Space,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::PathBuf;

/// View HTML for a page with `sections` headed sections, each linking to the next page.
fn create_page_html(page: usize, sections: usize) -> String {
    let mut html = String::new();
    for s in 0..sections {
        html.push_str(&format!("<h2>Section {}</h2>", s + 1));
        html.push_str(&format!(
            "<p>Some <strong>bold</strong> text and a <a href=\"/wiki/spaces/B/pages/{0}\" data-linked-resource-id=\"{0}\" data-linked-resource-type=\"page\">link</a>.</p>",
            page + 1
        ));
        html.push_str("<ul><li>first</li><li>second<ul><li>nested</li></ul></li></ul>");
        html.push_str("<table><tbody><tr><th>Key</th><th>Value</th></tr><tr><td>a</td><td>1</td></tr></tbody></table>");
        html.push_str("<div data-macro-name=\"code\"><pre data-syntaxhighlighter-params=\"brush: rust\">fn main() {}</pre></div>");
    }
    html
}

fn create_index(pages: usize) -> ExportIndex {
    let mut index = ExportIndex::new("/out");
    for i in 0..pages {
        index.add_document(IndexEntry {
            id: i.to_string(),
            title: format!("Page {}", i),
            space_key: "B".into(),
            ancestors: Vec::new(),
            relative_path: format!("B/Page {}.md", i),
            absolute_path: PathBuf::from(format!("/out/B/Page {}.md", i)),
        });
    }
    index
}

/// Benchmark HTML parsing at various sizes.
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_view_html");

    for sections in [1, 10, 50].iter() {
        let html = create_page_html(0, *sections);
        group.bench_function(format!("{}_sections", sections), |b| {
            b.iter(|| parse_view_html(black_box(&html)));
        });
    }

    group.finish();
}

/// Benchmark Markdown rendering of an already parsed page.
fn bench_render(c: &mut Criterion) {
    let index = create_index(2);
    let doc = Document::new("0", "Page 0", "B").with_body(parse_view_html(&create_page_html(0, 20)).nodes);
    let options = RenderOptions::default();

    c.bench_function("render_20_sections", |b| {
        b.iter(|| to_markdown(black_box(&doc), &index, &options).unwrap());
    });
}

/// Benchmark a whole export into memory.
fn bench_export(c: &mut Criterion) {
    let pages = 50;
    let mut source = MemorySource::new().with_space(Space::new("B", "Bench").with_homepage("0"));
    for i in 0..pages {
        let mut doc = Document::new(i.to_string(), format!("Page {}", i), "B")
            .with_body(parse_view_html(&create_page_html(i, 5)).nodes);
        if i > 0 {
            doc = doc.with_ancestors(["0"]);
        }
        source = source.with_document(doc);
    }

    c.bench_function("export_50_pages", |b| {
        b.iter(|| {
            let mut exporter = Exporter::new(&source, "/out").with_writer(MemoryWriter::new());
            exporter.run(&confluence_markdown::ExportScope::space("B")).unwrap()
        });
    });
}

criterion_group!(benches, bench_parse, bench_render, bench_export);
criterion_main!(benches);
