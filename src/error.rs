use std::path::PathBuf;

use thiserror::Error;

use crate::data::variable::VariableKey;

// ---------------------------------------------------------------------------
// Import errors – fatal for one import attempt, never for the application
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("could not read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not decode text: {0}")]
    Decode(String),

    #[error("malformed table")]
    Csv(#[from] csv::Error),

    #[error("file contains no rows")]
    EmptyFile,

    #[error("no data could be extracted; the file may be empty or in an unexpected format, try Custom Import")]
    NoExtractableData,

    #[error(transparent)]
    Mapping(#[from] MappingError),
}

/// A custom-import mapping that must be corrected before the import can run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("variable '{name}' has a data column but no position column")]
    MissingPositionColumn { name: String },

    #[error("variable '{name}' refers to column {column}, but the table has {width} columns")]
    ColumnOutOfRange {
        name: String,
        column: usize,
        width: usize,
    },

    #[error("display name '{name}' is mapped more than once")]
    DuplicateName { name: String },
}

// ---------------------------------------------------------------------------
// Recoverable user-facing errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("select a primary plot before integrating")]
    NoPrimary,

    #[error("integration start ({start:.3}) must be less than end ({end:.3})")]
    InvalidRange { start: f64, end: f64 },

    #[error("no data points found between {start:.3} and {end:.3}")]
    NoPointsInRange { start: f64, end: f64 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlotError {
    #[error("nothing selected for plotting")]
    EmptySelection,

    #[error("the data for '{name}' is missing or empty")]
    EmptySeries { name: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenameError {
    #[error("{key} cannot be given an empty name")]
    EmptyName { key: VariableKey },

    #[error("'{name}' is already used by {holder}")]
    NameInUse { name: String, holder: VariableKey },
}
