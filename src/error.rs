use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for corpus transforms, dictionary building, and artifact persistence.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error(
        "line count mismatch for '{path}': corpus has {corpus_lines} lines but {id_lines} ids were supplied"
    )]
    AlignmentMismatch {
        path: PathBuf,
        corpus_lines: usize,
        id_lines: usize,
    },
    #[error("artifact '{artifact}' failed shape validation: {details}")]
    ArtifactShape { artifact: String, details: String },
    #[error("malformed dictionary row {row}: {details}")]
    DictionaryFormat { row: usize, details: String },
    #[error("unknown scoring method '{0}'")]
    UnknownMethod(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("artifact serialization failure: {0}")]
    Serialize(#[from] serde_cbor::Error),
}

pub type Result<T> = std::result::Result<T, ScoreError>;
