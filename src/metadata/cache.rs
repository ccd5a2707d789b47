//! Daily, file-system-backed metadata cache.
//!
//! One generation: entries are keyed `{YYYY-MM-DD}_{filename}.json` and only
//! today's survive a load. Stale entries are purged eagerly, along with the
//! uploaded data file they described. Corruption is decoded-or-skip, never
//! fatal.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::MetadataError;

use super::MetadataRecord;

/// Sidecar written by the upload collaborator: display filename -> on-disk
/// path. Not a cache entry.
pub const FILE_MAPPING: &str = "file_mapping.json";

fn date_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap())
}

/// Metadata cache rooted at one directory (conventionally `tmp/`).
pub struct MetadataCache {
    dir: PathBuf,
}

impl MetadataCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn today() -> String {
        chrono::Local::now().format("%Y-%m-%d").to_string()
    }

    /// Load all of today's records, keyed by data filename. A missing cache
    /// directory is an empty cache. Entries from prior days are deleted and
    /// excluded; malformed names and unreadable records are skipped.
    pub fn load(&self) -> BTreeMap<String, MetadataRecord> {
        let mut records = BTreeMap::new();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(_) => return records,
        };
        let today = Self::today();

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(".json") || name.starts_with("file_mapping") {
                continue;
            }
            let Some((date, data_name_json)) = name.split_once('_') else {
                log::warn!("Invalid cache file: {}", name);
                continue;
            };
            if !date_prefix_re().is_match(date) {
                log::warn!("Invalid cache file: {}", name);
                continue;
            }

            if date != today {
                self.purge_entry(&name, data_name_json);
                continue;
            }

            let data_name = data_name_json.trim_end_matches(".json").to_string();
            match self.read_record(&entry.path()) {
                Ok(record) => {
                    records.insert(data_name, record);
                }
                Err(e) => log::warn!("Skipping unreadable cache entry '{}': {}", name, e),
            }
        }
        records
    }

    /// Write a record under today's date prefix, overwriting any existing
    /// entry with the same name.
    pub fn store(&self, filename: &str, record: &MetadataRecord) -> Result<(), MetadataError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}_{}.json", Self::today(), filename));
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| MetadataError::Parse(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn read_record(&self, path: &Path) -> Result<MetadataRecord, MetadataError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| MetadataError::Parse(e.to_string()))
    }

    /// Delete a stale cache entry and, when present, the data file it
    /// described. Uploads are day-scoped just like their classifications.
    fn purge_entry(&self, cache_name: &str, data_name_json: &str) {
        let cache_path = self.dir.join(cache_name);
        if let Err(e) = std::fs::remove_file(&cache_path) {
            log::warn!("Failed to remove stale cache entry '{}': {}", cache_name, e);
        } else {
            log::info!("Purged stale cache entry '{}'", cache_name);
        }
        let data_path = self.dir.join(data_name_json.trim_end_matches(".json"));
        if data_path.exists() {
            if let Err(e) = std::fs::remove_file(&data_path) {
                log::warn!("Failed to remove stale data file '{}': {}", data_path.display(), e);
            }
        }
    }

    /// Read the upload collaborator's filename -> path sidecar. Absent or
    /// unreadable sidecars yield an empty mapping.
    pub fn load_file_mapping(&self) -> BTreeMap<String, PathBuf> {
        let path = self.dir.join(FILE_MAPPING);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return BTreeMap::new();
        };
        match serde_json::from_str(&content) {
            Ok(mapping) => mapping,
            Err(e) => {
                log::warn!("Ignoring malformed {}: {}", FILE_MAPPING, e);
                BTreeMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::YearBound;

    fn sample_record(checksum: &str) -> MetadataRecord {
        MetadataRecord {
            kind: "sales".to_string(),
            country_code: "CH".to_string(),
            year_from: YearBound::Year(2021),
            year_to: YearBound::Year(2021),
            columns: [("material".to_string(), "Material".to_string())]
                .into_iter()
                .collect(),
            checksum: checksum.to_string(),
        }
    }

    #[test]
    fn test_missing_directory_is_empty_cache() {
        let cache = MetadataCache::new("/nonexistent/sheetwise-cache");
        assert!(cache.load().is_empty());
    }

    #[test]
    fn test_store_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path());
        cache.store("sales.xlsx", &sample_record("abc")).unwrap();

        let loaded = cache.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["sales.xlsx"], sample_record("abc"));
    }

    #[test]
    fn test_stale_entries_purged_with_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path());

        let stale_json = dir.path().join("2000-01-01_old.xlsx.json");
        let record = serde_json::to_string(&sample_record("stale")).unwrap();
        std::fs::write(&stale_json, record).unwrap();
        let stale_data = dir.path().join("old.xlsx");
        std::fs::write(&stale_data, b"bytes").unwrap();

        let loaded = cache.load();
        assert!(loaded.is_empty());
        assert!(!stale_json.exists());
        assert!(!stale_data.exists());
    }

    #[test]
    fn test_malformed_names_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path());

        std::fs::write(dir.path().join("notadate_sales.xlsx.json"), b"{}").unwrap();
        std::fs::write(dir.path().join("nounderscoreatall.json"), b"{}").unwrap();
        cache.store("good.xlsx", &sample_record("ok")).unwrap();

        let loaded = cache.load();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key("good.xlsx"));
        // Malformed names are skipped, never deleted.
        assert!(dir.path().join("notadate_sales.xlsx.json").exists());
    }

    #[test]
    fn test_unparseable_record_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path());

        let today = chrono::Local::now().format("%Y-%m-%d");
        std::fs::write(
            dir.path().join(format!("{}_bad.xlsx.json", today)),
            b"{not json",
        )
        .unwrap();

        assert!(cache.load().is_empty());
    }

    #[test]
    fn test_file_mapping_not_treated_as_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path());
        std::fs::write(
            dir.path().join(FILE_MAPPING),
            br#"{"sales.xlsx": "/uploads/sales.xlsx"}"#,
        )
        .unwrap();

        assert!(cache.load().is_empty());
        let mapping = cache.load_file_mapping();
        assert_eq!(mapping["sales.xlsx"], PathBuf::from("/uploads/sales.xlsx"));
    }
}
