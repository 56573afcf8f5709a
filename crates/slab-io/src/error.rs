//! Error types for slab-io

use std::path::PathBuf;

use slab_model::ModelError;
use slab_text::LocateError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IoError>;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("No source node is correlated with a target node")]
    NoCorrelatedNodes,

    #[error("No stiffness id left after {last}")]
    StiffnessIdOverflow { last: i32 },

    #[error("Locate error: {0}")]
    Locate(#[from] LocateError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: Box<IoError>,
    },
}
