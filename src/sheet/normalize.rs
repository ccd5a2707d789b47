//! Sheet normalization: raw grid in, labeled table plus info blurb out.
//!
//! The blurb carries whatever non-data text sat above the detected header
//! (sheet titles, notes) so metadata inference has context beyond the bare
//! column labels.

use std::collections::BTreeMap;
use std::path::Path;

use super::grid::{load_grid, Cell, RawGrid};
use super::header::{locate, DetectMode, HeaderPosition};
use super::table::Table;

/// Blurb used when the header sits at row 0 and nothing precedes it.
pub const NO_INFORMATION: &str = "No information";

/// Spreadsheet extensions the normalizer accepts.
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls"];

/// Leftmost unlabeled column convention: in this domain it is always a
/// material identifier.
const UNNAMED_COLUMN_LABEL: &str = "Material";

/// A normalized sheet: the labeled table and the descriptive blurb.
#[derive(Debug, Clone)]
pub struct NormalizedSheet {
    pub table: Table,
    pub blurb: String,
}

pub fn is_spreadsheet(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| SPREADSHEET_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Normalize a batch of files from `dir`.
///
/// Partial-failure semantics: unreadable or headerless files are logged and
/// skipped, the rest of the batch still returns.
pub fn normalize_files(
    dir: &Path,
    files: &[String],
    mode: DetectMode,
) -> BTreeMap<String, NormalizedSheet> {
    let mut out = BTreeMap::new();
    for file in files {
        if !is_spreadsheet(file) {
            continue;
        }
        let path = dir.join(file);
        if !path.exists() {
            log::warn!("Skipping missing file '{}'", file);
            continue;
        }
        let grid = match load_grid(&path) {
            Ok(g) => g,
            Err(e) => {
                log::warn!("Skipping '{}': {}", file, e);
                continue;
            }
        };
        let Some(pos) = locate(&grid, mode) else {
            log::warn!("Skipping '{}': no header detected", file);
            continue;
        };
        out.insert(file.clone(), normalize_grid(&grid, pos));
    }
    out
}

/// Build the table and blurb for a grid with a known header position.
pub fn normalize_grid(grid: &RawGrid, pos: HeaderPosition) -> NormalizedSheet {
    let blurb = build_blurb(grid, pos.row);

    let mut columns = label_row(grid.row(pos.row));
    let mut rows: Vec<Vec<Cell>> = (pos.row + 1..grid.n_rows())
        .map(|i| grid.row(i).to_vec())
        .collect();

    if pos.col > 0 {
        columns.drain(..pos.col.min(columns.len()));
        for row in &mut rows {
            row.drain(..pos.col.min(row.len()));
        }
    }

    NormalizedSheet { table: Table::new(columns, rows), blurb }
}

/// Turn the header row into trimmed, unique column labels. Empty header
/// cells get the domain's unnamed-column label.
fn label_row(cells: &[Cell]) -> Vec<String> {
    let mut labels = Vec::with_capacity(cells.len());
    for cell in cells {
        let trimmed = cell.display().trim().to_string();
        let base = if trimmed.is_empty() || looks_unnamed(&trimmed) {
            UNNAMED_COLUMN_LABEL.to_string()
        } else {
            trimmed
        };
        let mut label = base.clone();
        let mut n = 1;
        while labels.contains(&label) {
            n += 1;
            label = format!("{} {}", base, n);
        }
        labels.push(label);
    }
    labels
}

/// Synthetic labels produced by readers that auto-name blank header cells.
fn looks_unnamed(label: &str) -> bool {
    label.to_lowercase().starts_with("unnamed")
}

/// Concatenate every non-empty value above the header row. Row 0's
/// pseudo-labels come first, then each banner row's fragments in order.
fn build_blurb(grid: &RawGrid, header_row: usize) -> String {
    if header_row == 0 {
        return NO_INFORMATION.to_string();
    }
    let fragments: Vec<String> = (0..header_row)
        .flat_map(|i| {
            grid.row(i)
                .iter()
                .filter(|c| !c.is_empty())
                .map(|c| c.display().trim().to_string())
                .filter(|s| !s.is_empty() && !looks_unnamed(s))
                .collect::<Vec<_>>()
        })
        .collect();
    if fragments.is_empty() {
        NO_INFORMATION.to_string()
    } else {
        fragments.join(", ")
    }
}
