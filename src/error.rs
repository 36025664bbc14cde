use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading or reshaping metric tables.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("none of the candidate paths exist: {}", display_paths(.candidates))]
    NotFoundAny { candidates: Vec<PathBuf> },

    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("algorithm '{algorithm}' missing from dataset '{dataset}'")]
    MissingAlgorithm { dataset: String, algorithm: String },

    #[error("unknown dataset '{0}'")]
    UnknownDataset(String),

    #[error("row {row}, column '{column}': '{raw}' is not a number")]
    InvalidNumber {
        row: usize,
        column: String,
        raw: String,
    },

    #[error("row {row} has {found} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("table has no rows")]
    Empty,

    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),
}

/// Why a single comparison chart could not be built.
#[derive(Debug, Error, PartialEq)]
pub enum ComparisonError {
    #[error("'Data' column must contain {} values for comparison", quoted(.required))]
    MissingConditions { required: Vec<String> },

    #[error("missing metric column '{0}'")]
    MissingMetric(String),

    #[error("duplicate entry for method '{method}' under condition '{condition}'")]
    DuplicateEntry { method: String, condition: String },

    #[error("no method has values for every condition of '{0}'")]
    Empty(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn quoted(labels: &[String]) -> String {
    labels
        .iter()
        .map(|l| format!("'{l}'"))
        .collect::<Vec<_>>()
        .join(" and ")
}
