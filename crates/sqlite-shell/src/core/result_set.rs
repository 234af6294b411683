//! Cursor over the tabular text printed by `sqlite3 -header`.
//!
//! The shell prints one header line followed by one line per row, fields
//! separated by `|`. There is no escaping: a value containing `|` or a line
//! break cannot be told apart from a field or row boundary and will shift the
//! cells of that row.

use tracing::debug;

use crate::core::types::{Cell, FetchMode, Row};

pub const FIELD_DELIMITER: char = '|';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
    cursor: usize,
}

impl ResultSet {
    /// Builds a result set from already split values. Each row is padded with
    /// undefined cells or cut down to the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|row| align(row.into_iter().map(Some).collect(), width))
            .collect();
        Self {
            columns,
            rows,
            cursor: 0,
        }
    }

    /// Parses a header line plus data lines. One trailing line terminator is
    /// accepted and ignored; empty text yields an empty result set.
    pub fn parse(text: &str) -> Self {
        let text = text.strip_suffix('\n').unwrap_or(text);
        let text = text.strip_suffix('\r').unwrap_or(text);
        if text.is_empty() {
            return Self::new(Vec::new(), Vec::new());
        }

        let mut lines = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
        let columns: Vec<String> = lines
            .next()
            .map(|header| header.split(FIELD_DELIMITER).map(str::to_string).collect())
            .unwrap_or_default();
        let width = columns.len();
        let rows = lines
            .map(|line| align(line.split(FIELD_DELIMITER).map(|v| Some(v.to_string())).collect(), width))
            .collect();

        Self {
            columns,
            rows,
            cursor: 0,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    pub fn fetch_array(&mut self, mode: FetchMode) -> Option<Row> {
        let cells = self.rows.get(self.cursor)?;
        self.cursor += 1;
        Some(Row::render(&self.columns, cells, mode))
    }

    /// Every row not yet fetched. Empty when the cursor is exhausted or the
    /// result had no rows at all.
    pub fn fetch_all(&mut self, mode: FetchMode) -> Vec<Row> {
        let mut out = Vec::with_capacity(self.remaining());
        while let Some(row) = self.fetch_array(mode) {
            out.push(row);
        }
        out
    }

    pub fn reset(&mut self) -> bool {
        self.cursor = 0;
        true
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn remaining(&self) -> usize {
        self.rows.len() - self.cursor
    }
}

fn align(mut cells: Vec<Cell>, width: usize) -> Vec<Cell> {
    if cells.len() > width {
        debug!(cells = cells.len(), width, "row wider than header; dropping surplus cells");
    }
    cells.resize(width, None);
    cells
}
