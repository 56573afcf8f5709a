//! Error types for slab-solver

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolverError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    #[error("Element {element} references missing node {node}")]
    MissingNode { element: i32, node: i32 },

    #[error("Element {element} has {count} nodes, area needs 3 or 4")]
    UnsupportedNodeCount { element: i32, count: usize },

    #[error("Source node {node} matches several target nodes within tolerance: {candidates:?}")]
    AmbiguousMatch { node: i32, candidates: Vec<i32> },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
