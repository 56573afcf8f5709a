//! Error types for slab-model

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("{kind} id must be positive, got {id}")]
    InvalidId { kind: &'static str, id: i32 },

    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: i32 },

    #[error("{kind} {id}: {reason}")]
    InvalidNodeList {
        kind: &'static str,
        id: i32,
        reason: String,
    },
}
