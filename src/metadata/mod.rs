//! Sheet metadata: semantic type, country, year range, column mapping.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::MetadataError;

pub mod cache;
pub mod infer;

pub use cache::MetadataCache;
pub use infer::MetadataInferencer;

/// The closed canonical column vocabulary every sheet-specific label is
/// mapped onto.
pub const CANONICAL_COLUMNS: &[&str] = &[
    "supplier",
    "material",
    "cost_per_unit_dollar",
    "lead_time_days",
    "price_dollar",
    "units_in_storage",
    "year",
    "month",
    "units_sold",
    "total_sales_dollar",
    "total_sales_euro",
];

/// A year range bound: a concrete year, or whatever sentinel the model
/// produced (typically `"unknown"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YearBound {
    Year(i32),
    Unknown(String),
}

impl YearBound {
    /// Digit-strings become concrete years; other strings stay sentinels.
    pub fn coerced(self) -> Self {
        match self {
            YearBound::Unknown(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => {
                match s.parse() {
                    Ok(y) => YearBound::Year(y),
                    Err(_) => YearBound::Unknown(s),
                }
            }
            other => other,
        }
    }

    pub fn year(&self) -> Option<i32> {
        match self {
            YearBound::Year(y) => Some(*y),
            YearBound::Unknown(_) => None,
        }
    }
}

/// Inferred classification of one sheet, cached per file content per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Semantic sheet type: sales, inventory, costs_per_unit, ...
    #[serde(rename = "type")]
    pub kind: String,
    /// CH, DE, FR, US, ES or global.
    pub country_code: String,
    pub year_from: YearBound,
    pub year_to: YearBound,
    /// Lower-cased canonical name -> actual header label.
    pub columns: BTreeMap<String, String>,
    /// Content hash of the file this record describes.
    pub checksum: String,
}

impl MetadataRecord {
    /// Resolve the actual header label for a canonical column name.
    pub fn label_for(&self, canonical: &str) -> Option<&str> {
        self.columns.get(canonical).map(String::as_str)
    }

    /// Whether the record's year range covers `year`. Unknown bounds are
    /// treated as open.
    pub fn covers_year(&self, year: i32) -> bool {
        let from_ok = self.year_from.year().map(|y| y <= year).unwrap_or(true);
        let to_ok = self.year_to.year().map(|y| year <= y).unwrap_or(true);
        from_ok && to_ok
    }
}

/// SHA-256 content hash of a file, hex encoded.
pub fn file_checksum(path: &Path) -> Result<String, MetadataError> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_bound_coercion() {
        assert_eq!(
            YearBound::Unknown("2021".to_string()).coerced(),
            YearBound::Year(2021)
        );
        assert_eq!(
            YearBound::Unknown("unknown".to_string()).coerced(),
            YearBound::Unknown("unknown".to_string())
        );
        assert_eq!(YearBound::Year(1999).coerced(), YearBound::Year(1999));
    }

    #[test]
    fn test_year_bound_serde_roundtrip() {
        let json = serde_json::to_string(&YearBound::Year(2021)).unwrap();
        assert_eq!(json, "2021");
        let back: YearBound = serde_json::from_str(&json).unwrap();
        assert_eq!(back, YearBound::Year(2021));

        let back: YearBound = serde_json::from_str("\"unknown\"").unwrap();
        assert_eq!(back, YearBound::Unknown("unknown".to_string()));
    }

    #[test]
    fn test_covers_year() {
        let mut record = MetadataRecord {
            kind: "sales".to_string(),
            country_code: "CH".to_string(),
            year_from: YearBound::Year(2020),
            year_to: YearBound::Year(2022),
            columns: BTreeMap::new(),
            checksum: String::new(),
        };
        assert!(record.covers_year(2021));
        assert!(!record.covers_year(2019));

        record.year_to = YearBound::Unknown("unknown".to_string());
        assert!(record.covers_year(2030));
    }

    #[test]
    fn test_checksum_stable_and_content_addressed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");
        std::fs::write(&path, b"same bytes").unwrap();
        let a = file_checksum(&path).unwrap();
        let b = file_checksum(&path).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        std::fs::write(&path, b"different bytes").unwrap();
        assert_ne!(file_checksum(&path).unwrap(), a);
    }
}
