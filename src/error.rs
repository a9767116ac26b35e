//! Error taxonomy for per-file processing.
//!
//! Row-quality problems never surface here; they are handled by quarantining
//! inside validation. Everything in this enum is fatal for the file being
//! processed (after retries, where applicable) and routes it to the failure
//! area.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::io;

#[derive(Debug)]
pub enum PipelineError {
    Io(io::Error),
    Csv(csv::Error),
    /// Header is missing one or more required columns.
    MissingColumns(Vec<String>),
    /// A surviving row carries a timestamp no accepted format can parse.
    Timestamp { value: String },
    /// A surviving row carries a non-numeric measurement outside the
    /// temperature column (those are quarantined instead).
    Number { column: &'static str, value: String },
    /// A surviving row carries an unparseable motion/light flag.
    Flag { column: &'static str, value: String },
    Db(DieselError),
    /// Neither insert nor fallback lookup produced an id for the file name.
    MissingFileId(String),
}

impl PipelineError {
    /// Transient infrastructure faults worth another attempt. Integrity
    /// errors (constraint violations and the like) are never retried.
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Db(DieselError::DatabaseError(kind, _)) => matches!(
                kind,
                DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::SerializationFailure
            ),
            _ => false,
        }
    }
}

impl core::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PipelineError::Io(e) => write!(f, "io error: {}", e),
            PipelineError::Csv(e) => write!(f, "csv error: {}", e),
            PipelineError::MissingColumns(cols) => {
                write!(f, "missing required column(s): {}", cols.join(", "))
            }
            PipelineError::Timestamp { value } => write!(f, "unparseable timestamp: {:?}", value),
            PipelineError::Number { column, value } => {
                write!(f, "non-numeric {} value: {:?}", column, value)
            }
            PipelineError::Flag { column, value } => {
                write!(f, "unparseable {} flag: {:?}", column, value)
            }
            PipelineError::Db(e) => write!(f, "database error: {}", e),
            PipelineError::MissingFileId(name) => {
                write!(f, "no file id obtainable for {:?} (insert and lookup both empty)", name)
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Io(e) => Some(e),
            PipelineError::Csv(e) => Some(e),
            PipelineError::Db(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PipelineError {
    fn from(value: io::Error) -> Self {
        PipelineError::Io(value)
    }
}

impl From<csv::Error> for PipelineError {
    fn from(value: csv::Error) -> Self {
        PipelineError::Csv(value)
    }
}

impl From<DieselError> for PipelineError {
    fn from(value: DieselError) -> Self {
        PipelineError::Db(value)
    }
}
