//! Raw spreadsheet grids loaded via calamine.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use serde::Serialize;

use crate::error::SheetError;

/// One spreadsheet cell. Values carry no schema; a column can mix text,
/// numbers and dates freely.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Number(f64),
    Bool(bool),
    DateTime(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// True for string cells only; numbers, bools and dates are data, not
    /// header candidates.
    pub fn is_text(&self) -> bool {
        matches!(self, Cell::Text(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view: integral cells directly, floats with no fraction,
    /// digit-strings by parsing.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(n) => Some(*n),
            Cell::Number(f) if f.fract() == 0.0 => Some(*f as i64),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(n) => Some(*n as f64),
            Cell::Number(f) => Some(*f),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Display form used in blurbs and rendered results.
    pub fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Int(n) => n.to_string(),
            Cell::Number(f) => format!("{}", f),
            Cell::Bool(b) => b.to_string(),
            Cell::DateTime(s) => s.clone(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty => Cell::Empty,
            Data::String(s) => {
                if s.trim().is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(s.clone())
                }
            }
            Data::Int(n) => Cell::Int(*n),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::Error(e) => Cell::Text(format!("#ERR({:?})", e)),
            Data::DateTime(dt) => Cell::DateTime(format!("{}", dt)),
            Data::DateTimeIso(s) => Cell::DateTime(s.clone()),
            Data::DurationIso(s) => Cell::DateTime(s.clone()),
        }
    }
}

/// A row-major 2-D cell grid with rectangular dimensions. Row and column
/// indices are absolute sheet coordinates starting at (0, 0).
#[derive(Debug, Clone, Default)]
pub struct RawGrid {
    rows: Vec<Vec<Cell>>,
}

impl RawGrid {
    /// Build a grid from rows, padding short rows so the grid is rectangular.
    pub fn from_rows(mut rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, Cell::Empty);
        }
        Self { rows }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn row(&self, i: usize) -> &[Cell] {
        &self.rows[i]
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        &self.rows[row][col]
    }

    /// Non-empty cell count in a row.
    pub fn row_filled(&self, i: usize) -> usize {
        self.rows[i].iter().filter(|c| !c.is_empty()).count()
    }

    /// Text cell count in a row.
    pub fn row_text(&self, i: usize) -> usize {
        self.rows[i].iter().filter(|c| c.is_text()).count()
    }

    /// Non-empty cell count in a column, over all rows.
    pub fn col_filled(&self, j: usize) -> usize {
        self.rows.iter().filter(|r| !r[j].is_empty()).count()
    }

    /// Text cell count in a column, over all rows.
    pub fn col_text(&self, j: usize) -> usize {
        self.rows.iter().filter(|r| r[j].is_text()).count()
    }
}

/// Load the first worksheet of a spreadsheet into a [`RawGrid`].
///
/// Cell positions are preserved even when the sheet's used range does not
/// start at A1, so header offsets index real sheet coordinates.
pub fn load_grid(path: &Path) -> Result<RawGrid, SheetError> {
    let unreadable = |reason: String| SheetError::UnreadableFile {
        file: path.display().to_string(),
        reason,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| unreadable(e.to_string()))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| unreadable("workbook has no sheets".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| unreadable(e.to_string()))?;

    let Some(end) = range.end() else {
        return Ok(RawGrid::default());
    };

    let mut rows = Vec::with_capacity(end.0 as usize + 1);
    for r in 0..=end.0 {
        let mut row = Vec::with_capacity(end.1 as usize + 1);
        for c in 0..=end.1 {
            row.push(range.get_value((r, c)).map(Cell::from).unwrap_or(Cell::Empty));
        }
        rows.push(row);
    }
    Ok(RawGrid::from_rows(rows))
}
