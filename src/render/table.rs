//! Table rendering.

use crate::model::{ContentNode, List, Table, TableCell};

use super::inline::code_span;
use super::markdown::{Converter, Inline};

const CELL_BREAK: &str = "<br/>";

impl Converter<'_> {
    /// Render a table as a GitHub pipe table.
    ///
    /// Merged cells keep their content in the first slot they cover; the
    /// remaining slots are left empty. Tables without a header row get an
    /// empty one, since pipe tables cannot exist without it.
    pub(super) fn table(&mut self, table: &Table) -> String {
        let grid = table.grid();
        let width = grid.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            return String::new();
        }
        self.stats.table_count += 1;

        let mut rows: Vec<Vec<String>> = Vec::with_capacity(grid.len());
        for row in &grid {
            let mut cells = Vec::with_capacity(width);
            for slot in row {
                cells.push(match slot {
                    Some(cell) => self.cell(cell),
                    None => String::new(),
                });
            }
            rows.push(cells);
        }

        let header = if table.has_header_row() {
            rows.remove(0)
        } else {
            vec![String::new(); width]
        };

        let mut lines = Vec::with_capacity(rows.len() + 3);
        if let Some(caption) = table.caption.as_deref().filter(|c| !c.trim().is_empty()) {
            lines.push(format!("_{}_", self.escape(caption.trim())));
            lines.push(String::new());
        }
        lines.push(table_row(&header));
        lines.push(table_row(&vec!["---".to_string(); width]));
        lines.extend(rows.iter().map(|r| table_row(r)));
        lines.join("\n")
    }

    /// Render cell content onto a single line.
    fn cell(&mut self, cell: &TableCell) -> String {
        escape_pipes(&self.cell_content(&cell.content))
    }

    fn cell_content(&mut self, nodes: &[ContentNode]) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut i = 0;
        while i < nodes.len() {
            let part = if nodes[i].is_inline() {
                let start = i;
                while i < nodes.len() && nodes[i].is_inline() {
                    i += 1;
                }
                self.inline(&nodes[start..i], Inline::Cell)
            } else {
                i += 1;
                self.cell_block(&nodes[i - 1])
            };
            let part = part.trim();
            if !part.is_empty() {
                parts.push(part.to_string());
            }
        }
        parts.join(CELL_BREAK)
    }

    fn cell_block(&mut self, node: &ContentNode) -> String {
        match node {
            ContentNode::Paragraph(children) | ContentNode::Quote(children) => {
                self.cell_content(children)
            }
            ContentNode::Heading { children, .. } => {
                let text = self.inline(children, Inline::Cell);
                let text = text.trim();
                if text.is_empty() {
                    String::new()
                } else {
                    format!("**{}**", text)
                }
            }
            ContentNode::List(list) => self.html_list(list),
            ContentNode::ListItem(_) | ContentNode::Task { .. } => {
                self.html_list(&List::unordered(vec![node.clone()]))
            }
            ContentNode::CodeBlock { code, .. } => {
                let code = code.trim_end_matches('\n');
                code.lines().map(code_span).collect::<Vec<_>>().join(CELL_BREAK)
            }
            ContentNode::Table(table) => {
                self.escape(&table.plain_text().replace(['\n', '\t'], " "))
            }
            ContentNode::Macro(m) => self.macro_node(m).replace('\n', CELL_BREAK),
            ContentNode::HorizontalRule => String::new(),
            other => self.cell_content(other.children()),
        }
    }

    /// Render a list as inline HTML so it fits in a table cell.
    pub(super) fn html_list(&mut self, list: &List) -> String {
        let tag = if list.ordered { "ol" } else { "ul" };
        let mut out = format!("<{}>", tag);
        for item in &list.items {
            match item {
                ContentNode::ListItem(children) => {
                    out.push_str(&format!("<li>{}</li>", self.cell_content(children)));
                }
                ContentNode::Task { checked, children } => {
                    let mark = if *checked { "[x]" } else { "[ ]" };
                    out.push_str(&format!("<li>{} {}</li>", mark, self.cell_content(children)));
                }
                ContentNode::List(nested) => out.push_str(&self.html_list(nested)),
                other => {
                    let content = self.cell_content(std::slice::from_ref(other));
                    out.push_str(&format!("<li>{}</li>", content));
                }
            }
        }
        out.push_str(&format!("</{}>", tag));
        out
    }
}

fn table_row(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

/// Escape `|` characters not already escaped.
fn escape_pipes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut backslashes = 0;
    for c in text.chars() {
        if c == '|' && backslashes % 2 == 0 {
            out.push('\\');
        }
        if c == '\\' {
            backslashes += 1;
        } else {
            backslashes = 0;
        }
        out.push(c);
    }
    out.replace('\n', CELL_BREAK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ExportIndex;
    use crate::model::{Document, TableRow};
    use crate::render::{to_markdown, RenderOptions};

    fn render(table: Table) -> String {
        let index = ExportIndex::new("/out");
        let doc = Document::new("1", "T", "S").with_body(vec![ContentNode::Table(table)]);
        to_markdown(&doc, &index, &RenderOptions::body_only())
            .unwrap()
            .markdown
            .trim_end()
            .to_string()
    }

    #[test]
    fn test_table_with_header() {
        let table = Table::from_rows(vec![
            TableRow::header(["Name", "Age"]),
            TableRow::from_strings(["Alice", "30"]),
        ]);
        assert_eq!(render(table), "| Name | Age |\n| --- | --- |\n| Alice | 30 |");
    }

    #[test]
    fn test_table_without_header_gets_empty_one() {
        let table = Table::from_rows(vec![TableRow::from_strings(["a", "b"])]);
        assert_eq!(render(table), "|  |  |\n| --- | --- |\n| a | b |");
    }

    #[test]
    fn test_table_merged_cells_padded() {
        let table = Table::from_rows(vec![
            TableRow::header(["A", "B"]),
            TableRow::new(vec![TableCell::text("wide").colspan(2)]),
        ]);
        assert_eq!(render(table), "| A | B |\n| --- | --- |\n| wide |  |");
    }

    #[test]
    fn test_cell_with_paragraphs_and_list() {
        let cell = TableCell::new(vec![
            ContentNode::paragraph("one"),
            ContentNode::paragraph("two"),
            ContentNode::List(List::unordered(vec![ContentNode::ListItem(vec![
                ContentNode::text("x"),
            ])])),
        ]);
        let table = Table::from_rows(vec![TableRow::header(["H"]), TableRow::new(vec![cell])]);
        assert_eq!(
            render(table),
            "| H |\n| --- |\n| one<br/>two<br/><ul><li>x</li></ul> |"
        );
    }

    #[test]
    fn test_escape_pipes() {
        assert_eq!(escape_pipes("a|b"), "a\\|b");
        assert_eq!(escape_pipes("a\\|b"), "a\\|b");
        assert_eq!(escape_pipes("a\nb"), "a<br/>b");
    }
}
