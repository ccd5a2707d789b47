//! Model-driven metadata inference with checksum-keyed cache reuse.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::agent::json_extract::extract_object;
use crate::error::MetadataError;
use crate::model::{collect, ChatMessage, TextGenerator};
use crate::sheet::NormalizedSheet;

use super::{file_checksum, MetadataCache, MetadataRecord, YearBound, CANONICAL_COLUMNS};

/// Infers a [`MetadataRecord`] per sheet, reusing cached classifications
/// whenever the file content hash still matches.
pub struct MetadataInferencer {
    cache: MetadataCache,
}

impl MetadataInferencer {
    pub fn new(cache: MetadataCache) -> Self {
        Self { cache }
    }

    /// Classify every sheet in the batch. Cached records with a matching
    /// checksum are reused verbatim without a model call; everything else
    /// (no record, or checksum mismatch) goes through inference and is
    /// stored under today's date.
    pub async fn infer(
        &self,
        model: &dyn TextGenerator,
        dir: &Path,
        sheets: &BTreeMap<String, NormalizedSheet>,
    ) -> Result<BTreeMap<String, MetadataRecord>, MetadataError> {
        let cached = self.cache.load();
        let mut out = BTreeMap::new();

        for (filename, sheet) in sheets {
            let checksum = file_checksum(&dir.join(filename))?;

            if let Some(record) = cached.get(filename) {
                if record.checksum == checksum {
                    out.insert(filename.clone(), record.clone());
                    continue;
                }
                log::info!("File '{}' differs from its cached classification", filename);
            }

            let record = self.infer_file(model, filename, sheet, checksum).await?;
            out.insert(filename.clone(), record);
        }
        Ok(out)
    }

    /// One inference round trip: prompt, accumulate the stream, parse,
    /// post-process, store.
    async fn infer_file(
        &self,
        model: &dyn TextGenerator,
        filename: &str,
        sheet: &NormalizedSheet,
        checksum: String,
    ) -> Result<MetadataRecord, MetadataError> {
        let prompt = build_metadata_prompt(filename, &sheet.blurb, sheet.table.columns());

        let mut stream = model.generate(&[ChatMessage::user(prompt)]).await?;
        let answer = collect(&mut stream).await;

        let mut record = parse_metadata_answer(&answer)?;
        record.checksum = checksum;
        self.cache.store(filename, &record)?;
        Ok(record)
    }
}

/// Build the classification prompt: filename, info blurb, the sheet's
/// column labels, and the canonical vocabulary to map them onto.
pub fn build_metadata_prompt(filename: &str, blurb: &str, columns: &[String]) -> String {
    format!(
        r#"As an AI assistant, please extract the metadata from this filename: '{filename}' and this information: '{blurb}'. Also map the columns to a list of available options.

----------------------------------------
The columns are: {columns}.
Available options are: {options}.
----------------------------------------

The output should be in the following format:
{{
    "type": "type of the data. Available options are: sales, inventory, costs_per_unit.",
    "country_code": "country code. Available options are: CH, DE, FR, US, ES, global.",
    "year_from": "The year the data starts from.",
    "year_to": "The year the data ends at. If the data is for a single year, year_from and year_to should be the same.",
    "columns": "Map columns to available options. Example: {{'Cost per Unit ($)': 'cost_per_unit_dollar', 'Lead Time (Days)': 'lead_time_days', ...}}"
}}

Remember to only give the json object as output, without any additional text. Strictly avoid anything else than JSON output, also explanations and other text."#,
        filename = filename,
        blurb = blurb,
        columns = columns.join(", "),
        options = CANONICAL_COLUMNS.join(", "),
    )
}

/// Parse the accumulated model answer into a record (checksum left empty).
///
/// The model maps actual-label -> canonical-name; downstream lookups go the
/// other way, so the mapping is inverted here with lower-cased canonical
/// keys. Mappings outside the canonical vocabulary are dropped with a
/// warning.
pub fn parse_metadata_answer(answer: &str) -> Result<MetadataRecord, MetadataError> {
    let value = extract_object(answer)?;

    let kind = require_str(&value, "type")?;
    let country_code = require_str(&value, "country_code")?;
    let year_from = parse_year(&value, "year_from")?;
    let year_to = parse_year(&value, "year_to")?;

    let raw_columns = value
        .get("columns")
        .and_then(Value::as_object)
        .ok_or(MetadataError::MissingField("columns"))?;

    let mut columns = BTreeMap::new();
    for (actual_label, canonical) in raw_columns {
        let Some(canonical) = canonical.as_str() else {
            log::warn!("Dropping non-string column mapping for '{}'", actual_label);
            continue;
        };
        let canonical = canonical.to_lowercase();
        if !CANONICAL_COLUMNS.contains(&canonical.as_str()) {
            log::warn!(
                "Dropping mapping '{}' -> '{}': not a canonical column",
                actual_label,
                canonical
            );
            continue;
        }
        columns.insert(canonical, actual_label.clone());
    }

    Ok(MetadataRecord {
        kind,
        country_code,
        year_from,
        year_to,
        columns,
        checksum: String::new(),
    })
}

fn require_str(value: &Value, field: &'static str) -> Result<String, MetadataError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(MetadataError::MissingField(field))
}

fn parse_year(value: &Value, field: &'static str) -> Result<YearBound, MetadataError> {
    match value.get(field) {
        Some(Value::Number(n)) => {
            let y = n
                .as_i64()
                .ok_or_else(|| MetadataError::Parse(format!("{} is not an integer", field)))?;
            Ok(YearBound::Year(y as i32))
        }
        Some(Value::String(s)) => Ok(YearBound::Unknown(s.clone()).coerced()),
        _ => Err(MetadataError::MissingField(field)),
    }
}
