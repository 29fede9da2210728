//! Tables, with cells holding nested content.

use super::ContentNode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Rows of cells plus an optional caption.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Rows, top to bottom
    pub rows: Vec<TableRow>,

    /// `<caption>` text
    pub caption: Option<String>,
}

impl Table {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table without caption.
    pub fn from_rows(rows: Vec<TableRow>) -> Self {
        Self {
            rows,
            caption: None,
        }
    }

    /// Append a row.
    pub fn add_row(&mut self, row: TableRow) {
        self.rows.push(row);
    }

    /// True when no row has a cell.
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.cells.is_empty())
    }

    /// Whether the first row consists solely of header cells.
    pub fn has_header_row(&self) -> bool {
        self.rows
            .first()
            .is_some_and(|r| !r.cells.is_empty() && r.cells.iter().all(|c| c.header))
    }

    /// Lay the table out on a rectangular grid.
    ///
    /// Cells spanning several rows or columns occupy their first slot; the
    /// other slots they cover are `None`. Short rows are padded with `None`
    /// so every row has the same width.
    pub fn grid(&self) -> Vec<Vec<Option<&TableCell>>> {
        let mut occupied: HashSet<(usize, usize)> = HashSet::new();
        let mut grid: Vec<Vec<Option<&TableCell>>> = Vec::with_capacity(self.rows.len());

        for (r, row) in self.rows.iter().enumerate() {
            if row.cells.is_empty() {
                continue;
            }
            let mut current = Vec::new();
            let mut c = 0;
            for cell in &row.cells {
                while occupied.remove(&(r, c)) {
                    current.push(None);
                    c += 1;
                }
                let rs = cell.rowspan.max(1) as usize;
                let cs = cell.colspan.max(1) as usize;
                current.push(Some(cell));
                for _ in 1..cs {
                    current.push(None);
                }
                for i in 0..rs {
                    for j in 0..cs {
                        if i > 0 || j > 0 {
                            occupied.insert((r + i, c + j));
                        }
                    }
                }
                c += cs;
            }
            while occupied.remove(&(r, c)) {
                current.push(None);
                c += 1;
            }
            grid.push(current);
        }

        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut grid {
            row.resize(width, None);
        }
        grid
    }

    /// Cell text, rows on separate lines.
    pub fn plain_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.plain_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One `<tr>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Cells, left to right
    pub cells: Vec<TableCell>,
}

impl TableRow {
    /// A row of cells.
    pub fn new(cells: Vec<TableCell>) -> Self {
        Self { cells }
    }

    /// Create a header row from text values.
    pub fn header<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::new(
            values
                .into_iter()
                .map(|v| TableCell::text(v).as_header())
                .collect(),
        )
    }

    /// A row of plain-text cells.
    pub fn from_strings<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::new(values.into_iter().map(TableCell::text).collect())
    }

    /// Cell text separated by tabs.
    pub fn plain_text(&self) -> String {
        self.cells
            .iter()
            .map(|c| c.plain_text())
            .collect::<Vec<_>>()
            .join("\t")
    }
}

/// One `<td>` or `<th>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    /// Cell content; may contain block-level nodes
    pub content: Vec<ContentNode>,

    /// Whether this is a header cell
    pub header: bool,

    /// `rowspan`, at least 1
    pub rowspan: u16,

    /// `colspan`, at least 1
    pub colspan: u16,
}

impl TableCell {
    /// A cell spanning one slot.
    pub fn new(content: Vec<ContentNode>) -> Self {
        Self {
            content,
            header: false,
            rowspan: 1,
            colspan: 1,
        }
    }

    /// A cell holding one text run.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![ContentNode::text(text)])
    }

    /// Mark as a header cell.
    pub fn as_header(mut self) -> Self {
        self.header = true;
        self
    }

    /// Set the column span.
    pub fn colspan(mut self, span: u16) -> Self {
        self.colspan = span;
        self
    }

    /// Set the row span.
    pub fn rowspan(mut self, span: u16) -> Self {
        self.rowspan = span;
        self
    }

    /// Text of the cell content.
    pub fn plain_text(&self) -> String {
        super::node::plain_text(&self.content)
    }

    /// Whether the cell has no visible text.
    pub fn is_empty(&self) -> bool {
        self.plain_text().trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(row: &[Option<&TableCell>]) -> Vec<String> {
        row.iter()
            .map(|c| c.map(|c| c.plain_text()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_table_new() {
        let table = Table::new();
        assert!(table.is_empty());
        assert!(table.grid().is_empty());
    }

    #[test]
    fn test_header_detection() {
        let mut table = Table::new();
        table.add_row(TableRow::header(["Name", "Age"]));
        table.add_row(TableRow::from_strings(["Alice", "30"]));
        assert!(table.has_header_row());

        let plain = Table::from_rows(vec![TableRow::from_strings(["a", "b"])]);
        assert!(!plain.has_header_row());
    }

    #[test]
    fn test_grid_colspan() {
        let table = Table::from_rows(vec![
            TableRow::new(vec![TableCell::text("Merged").colspan(2)]),
            TableRow::from_strings(["a", "b"]),
        ]);

        let grid = table.grid();
        assert_eq!(texts(&grid[0]), vec!["Merged", ""]);
        assert_eq!(texts(&grid[1]), vec!["a", "b"]);
    }

    #[test]
    fn test_grid_rowspan() {
        let table = Table::from_rows(vec![
            TableRow::new(vec![TableCell::text("Tall").rowspan(2), TableCell::text("x")]),
            TableRow::from_strings(["y"]),
        ]);

        let grid = table.grid();
        assert_eq!(texts(&grid[0]), vec!["Tall", "x"]);
        assert_eq!(texts(&grid[1]), vec!["", "y"]);
    }

    #[test]
    fn test_grid_ragged_rows_padded() {
        let table = Table::from_rows(vec![
            TableRow::from_strings(["a", "b", "c"]),
            TableRow::from_strings(["d"]),
        ]);
        let grid = table.grid();
        assert_eq!(grid[1].len(), 3);
    }
}
