use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot access {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed corpus, snapshot or word-map input.
    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The unnormalized posterior of a sampling step has no usable mass.
    /// Cannot happen with positive hyperparameters, so it aborts the run.
    #[error("degenerate posterior while sampling {unit}: cumulative weight {total}")]
    Degenerate { unit: &'static str, total: f64 },
}

impl Error {
    pub(crate) fn malformed<S: Into<String>>(line: usize, message: S) -> Error {
        Error::Malformed {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn file<P: Into<PathBuf>>(path: P, source: io::Error) -> Error {
        Error::File {
            path: path.into(),
            source,
        }
    }
}
