//! Error types, one enum per concern.
//!
//! The split mirrors how failures are handled: sheet errors skip a file and
//! continue the batch, metadata errors abort inference for one file,
//! dispatch errors are caught at the turn boundary and rendered to the user.

use thiserror::Error;

/// Errors while reading or transforming a spreadsheet.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Unreadable file '{file}': {reason}")]
    UnreadableFile { file: String, reason: String },

    #[error("No header found in '{0}' (fewer than 2 filled cells in every row)")]
    HeaderNotFound(String),

    #[error("Column '{column}' has a non-numeric year value: {value}")]
    YearCoercion { column: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from metadata inference and its cache.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Metadata response missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Metadata response malformed: {0}")]
    Parse(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the tolerant JSON extractor.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("No balanced JSON object found in model output")]
    NoJsonFound,

    #[error("Extracted text is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

/// Errors from a model backend.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Unknown model backend '{0}'")]
    UnknownBackend(String),

    #[error("Model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model returned an error: {0}")]
    Api(String),
}

/// Errors surfaced by the function dispatcher. All of these are caught at
/// the turn boundary and yielded as text; none crash the host loop.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Routing answer missing '{0}' field")]
    BadDecision(&'static str),

    #[error("Missing parameter '{0}'")]
    MissingParameter(String),

    #[error("Parameter '{name}' has unexpected value: {value}")]
    BadParameter { name: String, value: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Currency(#[from] CurrencyError),
}

/// Errors while assembling the queryable workspace from a data directory.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the currency rate collaborator.
#[derive(Debug, Error)]
pub enum CurrencyError {
    #[error("No rate available for {from} -> {to}")]
    UnknownPair { from: String, to: String },
}
