//! Built-in analytic operations over the loaded workspace.
//!
//! Every operation works through the same access pattern: select sheets by
//! metadata (type, country, year range), resolve canonical column names to
//! the sheet's actual labels, then filter and aggregate rows. No operation
//! touches a sheet's labels directly.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::agent::{FunctionRegistry, FunctionSpec, ParamSpec, ToolContext};
use crate::error::DispatchError;
use crate::metadata::MetadataRecord;
use crate::sheet::Table;

/// Build the registry of all built-in operations. The reserved
/// direct-generation entry is seeded by the registry itself.
pub fn registry() -> FunctionRegistry {
    FunctionRegistry::new()
        .register(
            FunctionSpec {
                name: "get_suppliers_by_material",
                description: "Get suppliers that deliver a material.",
                parameters: vec![ParamSpec {
                    name: "material",
                    ty: "string",
                    description: "The material to search for.",
                }],
            },
            Arc::new(|ctx, params| {
                let material = str_param(params, "material")?;
                get_suppliers_by_material(ctx, &material)
            }),
        )
        .register(
            FunctionSpec {
                name: "get_material_amount_sold",
                description: "Get the amount of units sold of a material of all countries of a year.",
                parameters: vec![
                    ParamSpec {
                        name: "material",
                        ty: "string",
                        description: "The material to search for.",
                    },
                    ParamSpec {
                        name: "year",
                        ty: "int",
                        description: "The year of sales.",
                    },
                    ParamSpec {
                        name: "month_from",
                        ty: "int",
                        description: "The start month of sales. Available values: 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12. Default: 1",
                    },
                    ParamSpec {
                        name: "month_to",
                        ty: "int",
                        description: "The end month of sales. Available values: 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12. Default: 12",
                    },
                    ParamSpec {
                        name: "country",
                        ty: "string",
                        description: "The country. Available options: CH, DE, FR, US, ES, global. Default: global.",
                    },
                ],
            },
            Arc::new(|ctx, params| {
                let material = str_param(params, "material")?;
                let year = int_param(params, "year")?;
                let month_from = int_param_or(params, "month_from", 1)?;
                let month_to = int_param_or(params, "month_to", 12)?;
                let country = str_param_or(params, "country", "global")?;
                get_material_amount_sold(ctx, &material, year, month_from, month_to, &country)
            }),
        )
        .register(
            FunctionSpec {
                name: "get_material_sales_per_country_in_currency",
                description: "Get the sales of a material of all countries of a year in a specific currency.",
                parameters: vec![
                    ParamSpec {
                        name: "material",
                        ty: "string",
                        description: "The material to search for.",
                    },
                    ParamSpec {
                        name: "year",
                        ty: "int",
                        description: "The year of sales.",
                    },
                    ParamSpec {
                        name: "to_currency",
                        ty: "string",
                        description: "The currency. Available options: CHF, USD, EUR",
                    },
                    ParamSpec {
                        name: "country",
                        ty: "string",
                        description: "The country. Available options: CH, DE, FR, US, ES, global. Default: global.",
                    },
                ],
            },
            Arc::new(|ctx, params| {
                let material = str_param(params, "material")?;
                let year = int_param(params, "year")?;
                let to_currency = str_param(params, "to_currency")?;
                let country = str_param_or(params, "country", "global")?;
                get_material_sales_per_country_in_currency(ctx, &material, year, &to_currency, &country)
            }),
        )
        .register(
            FunctionSpec {
                name: "get_total_sales_per_month",
                description: "Get the total sales for a specific country grouped by months (for each month) for a specific year in a country.",
                parameters: vec![
                    ParamSpec {
                        name: "country",
                        ty: "string",
                        description: "The country to plot the evolution of sales for.",
                    },
                    ParamSpec {
                        name: "year",
                        ty: "int",
                        description: "The year to plot the evolution of sales for.",
                    },
                    ParamSpec {
                        name: "month_from",
                        ty: "string",
                        description: "The starting month to plot the evolution of sales for. Available values: 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12.",
                    },
                    ParamSpec {
                        name: "month_to",
                        ty: "string",
                        description: "The ending month to get the evolution of sales for. Available values: 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12.",
                    },
                    ParamSpec {
                        name: "material",
                        ty: "string, None",
                        description: "The material to get the evolution of sales for. Optional.",
                    },
                ],
            },
            Arc::new(|ctx, params| {
                let country = str_param(params, "country")?;
                let year = int_param(params, "year")?;
                let month_from = int_param(params, "month_from")?;
                let month_to = int_param(params, "month_to")?;
                let material = opt_str_param(params, "material");
                get_total_sales_per_month(ctx, &country, year, month_from, month_to, material.as_deref())
            }),
        )
}

// --- parameter extraction -------------------------------------------------

/// Routing models emit parameters with loose types; numbers sometimes arrive
/// quoted. Extraction accepts both and reports the offending value otherwise.
fn str_param(params: &Map<String, Value>, name: &str) -> Result<String, DispatchError> {
    match params.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(v) => Err(bad(name, v)),
        None => Err(DispatchError::MissingParameter(name.to_string())),
    }
}

fn str_param_or(
    params: &Map<String, Value>,
    name: &str,
    default: &str,
) -> Result<String, DispatchError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(default.to_string()),
        _ => str_param(params, name),
    }
}

fn int_param(params: &Map<String, Value>, name: &str) -> Result<i64, DispatchError> {
    match params.get(name) {
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| bad(name, &params[name])),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| bad(name, &params[name])),
        Some(v) => Err(bad(name, v)),
        None => Err(DispatchError::MissingParameter(name.to_string())),
    }
}

fn int_param_or(
    params: &Map<String, Value>,
    name: &str,
    default: i64,
) -> Result<i64, DispatchError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(default),
        _ => int_param(params, name),
    }
}

fn opt_str_param(params: &Map<String, Value>, name: &str) -> Option<String> {
    match params.get(name) {
        Some(Value::String(s)) if !s.is_empty() && !s.eq_ignore_ascii_case("none") => {
            Some(s.clone())
        }
        _ => None,
    }
}

fn bad(name: &str, value: &Value) -> DispatchError {
    DispatchError::BadParameter {
        name: name.to_string(),
        value: value.to_string(),
    }
}

// --- sheet selection and column access ------------------------------------

/// Sheets of a given type whose metadata matches the country filter and
/// covers the year. `country = "global"` means no country filter; a year of
/// `None` means no year filter.
fn select_sheets<'a>(
    ctx: &'a ToolContext,
    kind: &str,
    country: &str,
    year: Option<i32>,
) -> Vec<(&'a str, &'a MetadataRecord, &'a Table)> {
    ctx.tables
        .iter()
        .filter_map(|(name, table)| {
            let record = ctx.metadata.get(name)?;
            if !record.kind.eq_ignore_ascii_case(kind) {
                return None;
            }
            if !country.eq_ignore_ascii_case("global")
                && !record.country_code.eq_ignore_ascii_case(country)
            {
                return None;
            }
            if let Some(y) = year {
                if !record.covers_year(y) {
                    return None;
                }
            }
            Some((name.as_str(), record, table))
        })
        .collect()
}

/// Resolve a canonical column to its index in the table, via the record's
/// label mapping.
fn col(record: &MetadataRecord, table: &Table, canonical: &str) -> Option<usize> {
    table.col_index(record.label_for(canonical)?)
}

fn cell_matches_text(cell: &crate::sheet::Cell, wanted: &str) -> bool {
    cell.as_str()
        .map(|s| s.trim().eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

/// Row predicate shared by the sales aggregations: material (when given)
/// and, when the columns exist, year equality and month range.
fn sales_row_matches(
    record: &MetadataRecord,
    table: &Table,
    row: &[crate::sheet::Cell],
    material: Option<&str>,
    year: i32,
    month_from: i64,
    month_to: i64,
) -> bool {
    if let Some(material) = material {
        match col(record, table, "material") {
            Some(idx) => {
                if !cell_matches_text(&row[idx], material) {
                    return false;
                }
            }
            None => return false,
        }
    }
    if let Some(idx) = col(record, table, "year") {
        if row[idx].as_i64() != Some(year as i64) {
            return false;
        }
    }
    if let Some(idx) = col(record, table, "month") {
        match row[idx].as_i64() {
            Some(m) if (month_from..=month_to).contains(&m) => {}
            _ => return false,
        }
    }
    true
}

/// The sales value column of a sheet: prefers dollars, falls back to euros.
/// Returns the column index and its currency code.
fn sales_value_col(record: &MetadataRecord, table: &Table) -> Option<(usize, &'static str)> {
    if let Some(idx) = col(record, table, "total_sales_dollar") {
        return Some((idx, "USD"));
    }
    col(record, table, "total_sales_euro").map(|idx| (idx, "EUR"))
}

// --- operations -----------------------------------------------------------

/// Distinct suppliers delivering `material`, across every sheet that maps
/// both a supplier and a material column.
pub fn get_suppliers_by_material(
    ctx: &ToolContext,
    material: &str,
) -> Result<String, DispatchError> {
    let mut suppliers: Vec<String> = Vec::new();
    for (name, record) in &ctx.metadata {
        let Some(table) = ctx.tables.get(name) else {
            continue;
        };
        let (Some(supplier_idx), Some(material_idx)) =
            (col(record, table, "supplier"), col(record, table, "material"))
        else {
            continue;
        };
        for row in table.rows() {
            if cell_matches_text(&row[material_idx], material) {
                let supplier = row[supplier_idx].display();
                if !supplier.is_empty() && !suppliers.contains(&supplier) {
                    suppliers.push(supplier);
                }
            }
        }
    }

    if suppliers.is_empty() {
        return Ok(format!("No suppliers found for {}.", material));
    }
    Ok(format!("Suppliers for {}: {}", material, suppliers.join(", ")))
}

/// Units of `material` sold in `year`, summed over the month range, in one
/// country or across all of them.
pub fn get_material_amount_sold(
    ctx: &ToolContext,
    material: &str,
    year: i64,
    month_from: i64,
    month_to: i64,
    country: &str,
) -> Result<String, DispatchError> {
    let mut total: i64 = 0;
    let mut matched = false;

    for (_, record, table) in select_sheets(ctx, "sales", country, Some(year as i32)) {
        let Some(units_idx) = col(record, table, "units_sold") else {
            continue;
        };
        for row in table.rows() {
            if sales_row_matches(record, table, row, Some(material), year as i32, month_from, month_to) {
                if let Some(units) = row[units_idx].as_i64() {
                    total += units;
                    matched = true;
                }
            }
        }
    }

    if !matched {
        return Ok(format!(
            "No sales data found for {} in {} ({}).",
            material, year, country
        ));
    }
    Ok(format!(
        "Units of {} sold in {} (months {}-{}, {}): {}",
        material, year, month_from, month_to, country, total
    ))
}

/// Sales of `material` in `year` per country, converted to `to_currency`.
pub fn get_material_sales_per_country_in_currency(
    ctx: &ToolContext,
    material: &str,
    year: i64,
    to_currency: &str,
    country: &str,
) -> Result<String, DispatchError> {
    use std::collections::BTreeMap;

    let mut per_country: BTreeMap<String, f64> = BTreeMap::new();

    for (_, record, table) in select_sheets(ctx, "sales", country, Some(year as i32)) {
        let Some((value_idx, from_currency)) = sales_value_col(record, table) else {
            continue;
        };
        let rate = ctx.rates.rate(from_currency, to_currency)?;
        for row in table.rows() {
            if sales_row_matches(record, table, row, Some(material), year as i32, 1, 12) {
                if let Some(amount) = row[value_idx].as_f64() {
                    *per_country.entry(record.country_code.clone()).or_default() += amount * rate;
                }
            }
        }
    }

    if per_country.is_empty() {
        return Ok(format!(
            "No sales data found for {} in {} ({}).",
            material, year, country
        ));
    }

    let mut lines = vec![format!("Sales of {} in {} ({}):", material, year, to_currency)];
    for (code, amount) in &per_country {
        lines.push(format!("{}: {:.2}", code, amount));
    }
    Ok(lines.join("\n"))
}

/// Total sales per month for a country and year, optionally restricted to
/// one material. Months without data report 0.
pub fn get_total_sales_per_month(
    ctx: &ToolContext,
    country: &str,
    year: i64,
    month_from: i64,
    month_to: i64,
    material: Option<&str>,
) -> Result<String, DispatchError> {
    if !(1..=12).contains(&month_from) || !(1..=12).contains(&month_to) || month_from > month_to {
        return Err(DispatchError::BadParameter {
            name: "month_from/month_to".to_string(),
            value: format!("{}-{}", month_from, month_to),
        });
    }

    let mut per_month = vec![0.0f64; (month_to - month_from + 1) as usize];
    let mut matched = false;

    // Sheets may carry dollar or euro totals; everything is reported in USD.
    for (_, record, table) in select_sheets(ctx, "sales", country, Some(year as i32)) {
        let (Some((value_idx, from_currency)), Some(month_idx)) =
            (sales_value_col(record, table), col(record, table, "month"))
        else {
            continue;
        };
        let rate = ctx.rates.rate(from_currency, "USD")?;
        for row in table.rows() {
            if !sales_row_matches(record, table, row, material, year as i32, month_from, month_to) {
                continue;
            }
            let (Some(month), Some(amount)) = (row[month_idx].as_i64(), row[value_idx].as_f64())
            else {
                continue;
            };
            per_month[(month - month_from) as usize] += amount * rate;
            matched = true;
        }
    }

    if !matched {
        return Ok(format!(
            "No sales data found for {} in {}.",
            country, year
        ));
    }

    let mut lines = vec![format!("Total sales in {} for {} (USD):", country, year)];
    for (i, amount) in per_month.iter().enumerate() {
        lines.push(format!("Month {}: {:.2}", month_from + i as i64, amount));
    }
    Ok(lines.join("\n"))
}
