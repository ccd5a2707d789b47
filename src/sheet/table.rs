//! In-memory tables with named columns.

use super::grid::Cell;

/// An ordered set of named columns plus row-major data.
///
/// Built once per file per session and mutated in place by the column
/// preprocessor; never persisted.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table; rows shorter than the column list are padded.
    pub fn new(columns: Vec<String>, mut rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        for row in &mut rows {
            row.resize(width, Cell::Empty);
            row.truncate(width);
        }
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column by exact label.
    pub fn col_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    /// All values of a column by label.
    pub fn column(&self, label: &str) -> Option<Vec<&Cell>> {
        let idx = self.col_index(label)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Apply a fallible transform to every value of a column, in place.
    /// The transform sees each cell and returns its replacement.
    pub fn apply_column<F, E>(&mut self, label: &str, mut f: F) -> Result<bool, E>
    where
        F: FnMut(&Cell) -> Result<Cell, E>,
    {
        let Some(idx) = self.col_index(label) else {
            return Ok(false);
        };
        for row in &mut self.rows {
            row[idx] = f(&row[idx])?;
        }
        Ok(true)
    }
}
