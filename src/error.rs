use std::path::PathBuf;

use thiserror::Error;

/// A result value that may not be written to the log.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("Invalid WPM value: {0} (expected 0 to 500)")]
    WpmOutOfRange(f64),

    #[error("Invalid accuracy value: {0} (expected 0 to 100)")]
    AccuracyOutOfRange(f64),
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("log is missing required columns, found: {0}")]
    BadHeader(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Record(#[from] RecordError),
}

impl LogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LogError::Io {
            path: path.into(),
            source,
        }
    }
}
