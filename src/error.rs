use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LdaError>;

#[derive(Debug, Error)]
pub enum LdaError {
    /// Rejected before any sampling state is allocated.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The unnormalized full conditional of a token had no usable mass.
    #[error("degenerate sampling weights for token ({document}, {position}): total mass {total}")]
    ArithmeticDegeneracy {
        document: usize,
        position: usize,
        total: f64,
    },

    #[error("run cancelled after {completed_sweeps} sweeps")]
    Cancelled { completed_sweeps: usize },

    /// Every sweep of the schedule has already run.
    #[error("all {iterations} scheduled sweeps have already run")]
    ScheduleExhausted { iterations: usize },

    #[error("term id {term} at ({document}, {position}) is outside the vocabulary of size {vocabulary_size}")]
    TermOutOfRange {
        document: usize,
        position: usize,
        term: usize,
        vocabulary_size: usize,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid model JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl LdaError {
    pub(crate) fn config<S: Into<String>>(message: S) -> LdaError {
        LdaError::Config(message.into())
    }

    pub(crate) fn io<P: Into<PathBuf>>(path: P, source: io::Error) -> LdaError {
        LdaError::Io {
            path: path.into(),
            source,
        }
    }
}
