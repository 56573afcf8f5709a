//! File-side support for slab bedding transfer.
//!
//! This crate provides:
//! - **Patcher**: writes stiffness, support element and bedding records into
//!   the target model file, with a timestamped backup
//! - **Report**: plain-text summary of correlation, rigidity and coefficients
//! - **JSON model input**: serde rows for both models and the stress table

pub mod error;
mod input;
mod patch;
mod records;
mod report;

pub use error::{IoError, Result};
pub use input::{
    ElementRow, ModelData, ModelInput, NodeRow, SourceNodeRow, StressRow, load_model_input,
    save_model_input,
};
pub use patch::{
    BACKUP_STAMP_FORMAT, PatchOptions, PatchOutcome, Patcher, backup_path_for, create_backup,
};
pub use records::{
    DEFAULT_MATERIAL_BLOCK, DEFAULT_MATERIAL_ID, GeneratedRecords, PatchInput,
    SUPPORT_ELEMENT_TYPE, bedding_record, stiffness_record, support_element_record,
};
pub use report::generate_report;
