//! Header detection over raw grids.
//!
//! Real-world sheets bury their column labels under title banners and notes.
//! The locator finds the first row that looks like labels: more than one
//! filled cell, the next row equally filled, and mostly text. A heuristic,
//! not a proof — two-row runs of equal fill count can still fool it.

use super::grid::RawGrid;

/// How much of the grid to probe with the strict rule before falling back.
const SCAN_LIMIT: usize = 10;

/// Whether to also detect a header column (leading decorative banners) or
/// treat the table as starting at column 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectMode {
    RowOnly,
    RowAndColumn,
}

/// Offset of the real header inside a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPosition {
    /// First row judged to be column labels.
    pub row: usize,
    /// First column judged to be data labels; 0 unless column detection is
    /// enabled and finds a leading banner block.
    pub col: usize,
}

/// Locate the header of `grid`. Returns `None` only for degenerate grids
/// where no row at all has more than one filled cell.
pub fn locate(grid: &RawGrid, mode: DetectMode) -> Option<HeaderPosition> {
    let row = detect_row_strict(grid).or_else(|| detect_row_fallback(grid))?;

    let col = match mode {
        DetectMode::RowOnly => 0,
        DetectMode::RowAndColumn => detect_col_strict(grid)
            .or_else(|| detect_col_fallback(grid))
            .unwrap_or(0),
    };

    Some(HeaderPosition { row, col })
}

/// Strict rule: >1 filled cells, next row with the same filled count, and
/// more than half the filled cells are text. First match wins.
fn detect_row_strict(grid: &RawGrid) -> Option<usize> {
    for i in 0..grid.n_rows().min(SCAN_LIMIT) {
        let filled = grid.row_filled(i);
        if filled <= 1 {
            continue;
        }
        if i + 1 >= grid.n_rows() || grid.row_filled(i + 1) != filled {
            continue;
        }
        if grid.row_text(i) * 2 > filled {
            return Some(i);
        }
    }
    None
}

/// Fallback: first row with more than one filled cell, no scan cap.
fn detect_row_fallback(grid: &RawGrid) -> Option<usize> {
    (0..grid.n_rows()).find(|&i| grid.row_filled(i) > 1)
}

/// Symmetric strict rule over the first columns, using full-column counts.
fn detect_col_strict(grid: &RawGrid) -> Option<usize> {
    for j in 0..grid.n_cols().min(SCAN_LIMIT) {
        let filled = grid.col_filled(j);
        if filled <= 1 {
            continue;
        }
        if j + 1 >= grid.n_cols() || grid.col_filled(j + 1) != filled {
            continue;
        }
        if grid.col_text(j) * 2 > filled {
            return Some(j);
        }
    }
    None
}

fn detect_col_fallback(grid: &RawGrid) -> Option<usize> {
    (0..grid.n_cols()).find(|&j| grid.col_filled(j) > 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::grid::Cell;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn num(n: i64) -> Cell {
        Cell::Int(n)
    }

    /// A clean sheet: labels at row 0, data below.
    fn plain_sheet() -> RawGrid {
        RawGrid::from_rows(vec![
            vec![text("Material"), text("Units Sold"), text("Month")],
            vec![text("Copper"), num(10), text("March")],
            vec![text("Zinc"), num(4), text("April")],
        ])
    }

    /// Banner rows above the real header.
    fn banner_sheet() -> RawGrid {
        RawGrid::from_rows(vec![
            vec![text("Sales Report 2021"), Cell::Empty, Cell::Empty],
            vec![Cell::Empty, Cell::Empty, Cell::Empty],
            vec![text("Material"), text("Units Sold"), text("Price ($)")],
            vec![text("Copper"), num(10), num(3)],
            vec![text("Zinc"), num(4), num(5)],
        ])
    }

    #[test]
    fn test_header_at_row_zero() {
        let pos = locate(&plain_sheet(), DetectMode::RowOnly).unwrap();
        assert_eq!(pos, HeaderPosition { row: 0, col: 0 });
    }

    #[test]
    fn test_header_below_banner() {
        let pos = locate(&banner_sheet(), DetectMode::RowOnly).unwrap();
        assert_eq!(pos.row, 2);
    }

    #[test]
    fn test_first_matching_row_wins() {
        // Two candidate runs; the earlier one must win.
        let grid = RawGrid::from_rows(vec![
            vec![text("a"), text("b")],
            vec![text("c"), text("d")],
            vec![text("e"), text("f")],
            vec![text("g"), text("h")],
        ]);
        let pos = locate(&grid, DetectMode::RowOnly).unwrap();
        assert_eq!(pos.row, 0);
    }

    #[test]
    fn test_mostly_numeric_row_rejected() {
        // Row 1 has equal fill with row 2 but is numeric, so the strict rule
        // skips it; the fallback then picks the first multi-cell row.
        let grid = RawGrid::from_rows(vec![
            vec![text("title only"), Cell::Empty],
            vec![num(1), num(2)],
            vec![num(3), num(4)],
        ]);
        let pos = locate(&grid, DetectMode::RowOnly).unwrap();
        assert_eq!(pos.row, 1);
    }

    #[test]
    fn test_unequal_next_row_fill_falls_back() {
        // Header row has 3 filled cells, the row below only 2: strict rule
        // fails everywhere, fallback returns the first multi-cell row.
        let grid = RawGrid::from_rows(vec![
            vec![text("Material"), text("Units"), text("Notes")],
            vec![text("Copper"), num(10), Cell::Empty],
        ]);
        let pos = locate(&grid, DetectMode::RowOnly).unwrap();
        assert_eq!(pos.row, 0);
    }

    #[test]
    fn test_empty_grid_not_found() {
        assert!(locate(&RawGrid::default(), DetectMode::RowOnly).is_none());
        let sparse = RawGrid::from_rows(vec![
            vec![Cell::Empty, Cell::Empty],
            vec![text("lonely"), Cell::Empty],
        ]);
        assert!(locate(&sparse, DetectMode::RowOnly).is_none());
    }

    #[test]
    fn test_strict_rule_not_applied_past_scan_limit() {
        // Header sits at row 12, beyond the 10-row strict scan; only the
        // fallback can find it.
        let mut rows = vec![vec![Cell::Empty, Cell::Empty]; 12];
        rows.push(vec![text("Material"), text("Units")]);
        rows.push(vec![text("Copper"), num(10)]);
        let grid = RawGrid::from_rows(rows);
        let pos = locate(&grid, DetectMode::RowOnly).unwrap();
        assert_eq!(pos.row, 12);
    }

    #[test]
    fn test_column_detection_finds_banner_column() {
        // Column 0 holds a single merged-style banner value; columns 1..2
        // are equally filled and mostly text.
        let grid = RawGrid::from_rows(vec![
            vec![text("Q1"), text("Material"), text("Supplier")],
            vec![Cell::Empty, text("Copper"), text("Acme")],
            vec![Cell::Empty, text("Zinc"), text("Globex")],
        ]);
        let pos = locate(&grid, DetectMode::RowAndColumn).unwrap();
        assert_eq!(pos.col, 1);
    }

    #[test]
    fn test_row_only_mode_keeps_col_zero() {
        let pos = locate(&banner_sheet(), DetectMode::RowOnly).unwrap();
        assert_eq!(pos.col, 0);
    }
}
