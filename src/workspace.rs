//! Assembles the queryable workspace: files on disk in, `ToolContext` out.
//!
//! The pipeline runs once per turn batch: list spreadsheets in the data
//! directory, normalize them, infer (or reuse) metadata, preprocess the
//! month and year columns, and hand everything to the dispatcher.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::agent::ToolContext;
use crate::currency::RateSource;
use crate::error::WorkspaceError;
use crate::metadata::{MetadataCache, MetadataInferencer};
use crate::model::TextGenerator;
use crate::sheet::{normalize_files, preprocess::preprocess_tables, DetectMode};

/// List spreadsheet filenames in `dir`, sorted. A missing directory is an
/// empty workspace, not an error.
pub fn list_spreadsheets(dir: &Path) -> Result<Vec<String>, WorkspaceError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut files: Vec<String> = entries
        .flatten()
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            crate::sheet::normalize::is_spreadsheet(&name).then_some(name)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Run the full load pipeline and return a context ready for dispatch.
pub async fn load(
    dir: &Path,
    model: Arc<dyn TextGenerator>,
    rates: Arc<dyn RateSource>,
) -> Result<ToolContext, WorkspaceError> {
    let files = list_spreadsheets(dir)?;
    log::info!("Loading {} spreadsheet(s) from {}", files.len(), dir.display());

    let sheets = normalize_files(dir, &files, DetectMode::RowAndColumn);

    let inferencer = MetadataInferencer::new(MetadataCache::new(dir));
    let metadata = inferencer.infer(model.as_ref(), dir, &sheets).await?;

    let mut tables: BTreeMap<_, _> = sheets
        .into_iter()
        .map(|(name, sheet)| (name, sheet.table))
        .collect();
    preprocess_tables(&mut tables, &metadata)?;

    Ok(ToolContext { tables, metadata, rates, model })
}
