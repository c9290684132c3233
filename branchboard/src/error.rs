use std::path::PathBuf;

use thiserror::Error;

/// The primary error type that can be produced by branchboard.
///
/// Note that neither of the two user-visible "missing data" conditions is an
/// error: an unknown branch or a null field surfaces as a sentinel view
/// result, never as a variant here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error {0}: {1}")]
    Io(String, std::io::Error),
    #[error("failed to load table from file {0}")]
    FailedToLoadTable(PathBuf),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("cannot determine file type of file: {0}")]
    CannotDetermineFileType(PathBuf),
    #[error("no view registered with name: {0}")]
    NoSuchView(String),
    #[error("no branch has been selected yet")]
    NoSelection,
    #[error("invalid month value: {0}")]
    InvalidMonth(String),
    #[error("invalid time of day: {0}")]
    InvalidTime(String),
}
