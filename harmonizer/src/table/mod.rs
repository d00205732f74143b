//! In-memory tables of strings.
//!
//! Every table in this crate, whether it came from a spreadsheet export, a
//! CSV lookup file or a projection, is a [`Table`]: ordered column names and
//! rows of strings. A missing cell is always `""`, never a null sentinel, so
//! callers can apply string operations without checking for absence.

pub mod loader;

pub use loader::{
    decode_content, detect_delimiter, detect_encoding, load_csv, load_token_list, parse_csv_bytes,
};

use crate::error::{TableError, TableResult};

/// Column-named rows of string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table from already-normalized parts.
    ///
    /// Rows shorter than the header are padded with `""`, longer rows are cut.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Build a table from a raw grid whose first non-blank row is the header.
    ///
    /// Blank rows and columns that are blank in the header and every cell are
    /// dropped, which mirrors how the spreadsheets are maintained by hand:
    /// stray empty rows at the bottom and empty columns on the right.
    pub fn from_grid(grid: Vec<Vec<String>>) -> Self {
        let mut grid = grid
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()));

        let header = match grid.next() {
            Some(header) => header,
            None => return Self::default(),
        };
        let body: Vec<Vec<String>> = grid.collect();

        let width = body
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(header.len()))
            .max()
            .unwrap_or(0);

        let keep: Vec<usize> = (0..width)
            .filter(|&i| {
                let header_blank = header.get(i).map_or(true, |h| h.trim().is_empty());
                let cells_blank = body
                    .iter()
                    .all(|row| row.get(i).map_or(true, |c| c.trim().is_empty()));
                !(header_blank && cells_blank)
            })
            .collect();

        let columns = keep
            .iter()
            .map(|&i| header.get(i).map(|h| h.trim().to_string()).unwrap_or_default())
            .collect();
        let rows = body
            .into_iter()
            .map(|row| {
                keep.iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Position of a column, or [`TableError::MissingColumn`].
    pub fn require_column(&self, name: &str) -> TableResult<usize> {
        self.column_index(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Cell at `(row, column)`; `""` when the column is absent.
    pub fn get(&self, row: usize, column: &str) -> &str {
        self.column_index(column)
            .and_then(|i| self.rows.get(row).map(|r| r[i].as_str()))
            .unwrap_or("")
    }

    /// Iterate rows as cell slices aligned with [`Table::columns`].
    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(Vec::as_slice)
    }
}
