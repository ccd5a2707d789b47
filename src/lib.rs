//! Conversational analytics over ad-hoc spreadsheets.
//!
//! Spreadsheets land in a data directory in whatever shape their authors
//! exported them. The pipeline finds each sheet's header, normalizes it into
//! a labeled table, asks a language model to classify the sheet (cached per
//! content per day), and routes user questions either to built-in analytic
//! operations or to direct model generation.

pub mod agent;
pub mod config;
pub mod currency;
pub mod error;
pub mod functions;
pub mod metadata;
pub mod model;
pub mod sheet;
pub mod workspace;
