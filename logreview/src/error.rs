use std::path::PathBuf;
use thiserror::Error;

/// Sentinel written into any field the assistant could not resolve.
pub const SENTINEL: &str = "ERROR";

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("{table} table is missing required column(s): {}", .columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("endpoint request failed: {0}")]
    Transport(String),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("{}: {source}", .path.display())]
    File { path: PathBuf, source: std::io::Error },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReviewError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, ReviewError::MissingColumns { .. } | ReviewError::InvalidConfig(_))
    }
}
