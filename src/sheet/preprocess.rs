//! Per-canonical-column normalization applied after metadata inference.
//!
//! Only two canonical columns carry transforms. Strictness differs on
//! purpose: a bad month is a data-quality wart (warn and keep the value), a
//! bad year breaks every downstream range filter (fail the run).

use std::collections::BTreeMap;

use crate::error::SheetError;
use crate::metadata::MetadataRecord;

use super::grid::Cell;
use super::table::Table;

/// Full English month names, position = month number - 1.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Apply the registered transforms to every mapped column of every table
/// that has a metadata record. In-place; tables without a record are left
/// untouched.
pub fn preprocess_tables(
    tables: &mut BTreeMap<String, Table>,
    metadata: &BTreeMap<String, MetadataRecord>,
) -> Result<(), SheetError> {
    for (filename, table) in tables.iter_mut() {
        let Some(record) = metadata.get(filename) else {
            continue;
        };
        for (canonical, actual_label) in &record.columns {
            match canonical.as_str() {
                "month" => {
                    table.apply_column::<_, SheetError>(actual_label, |cell| {
                        Ok(normalize_month(cell))
                    })?;
                }
                "year" => {
                    table.apply_column(actual_label, |cell| {
                        cell.as_i64().map(Cell::Int).ok_or_else(|| {
                            SheetError::YearCoercion {
                                column: actual_label.clone(),
                                value: cell.display(),
                            }
                        })
                    })?;
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// Month normalization: English month name or integer 1-12 becomes the
/// month number; anything else is logged and passed through unchanged.
pub fn normalize_month(cell: &Cell) -> Cell {
    if let Some(name) = cell.as_str() {
        if let Some(idx) = MONTH_NAMES.iter().position(|m| *m == name) {
            return Cell::Int(idx as i64 + 1);
        }
        log::warn!("Invalid month value: {}", name);
        return cell.clone();
    }
    if let Some(n) = cell.as_i64() {
        if (1..=12).contains(&n) {
            return Cell::Int(n);
        }
        log::warn!("Month out of range: {}", n);
        return cell.clone();
    }
    log::warn!("Invalid month value: {:?}", cell);
    cell.clone()
}
