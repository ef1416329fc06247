use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no chunks to index: the corpus produced no text")]
    EmptyCorpus,

    #[error("no index found at {}; build it first", .0.display())]
    IndexNotFound(PathBuf),

    #[error("index at {} has entries without `{field}`; rebuild the index", .path.display())]
    SchemaMismatch { path: PathBuf, field: String },

    #[error("generation service failed: {0}")]
    UpstreamService(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding failed: {0:#}")]
    Embedding(anyhow::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
