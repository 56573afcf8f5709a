//! Correlation, clustering and rigidity stages for slab bedding transfer.
//!
//! This crate provides:
//! - **Correlation**: source → target node matching by position and element
//!   matching by translated node sets
//! - **Stress assignment**: per-element stress and bedding coefficient
//! - **Clustering**: connected groups of elements (plaques)
//! - **Rigidity**: per-plaque support stiffness from element areas
//! - **Pipeline**: the stages above in sequence

pub mod cluster;
pub mod correlate;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod rigidity;
pub mod stress;

pub use cluster::{Clustering, cluster};
pub use correlate::{
    Correlation, CorrelationTable, CoveragePolicy, ElementCorrelation, MatchPolicy,
    NodeCorrelation, correlate_elements, correlate_nodes,
};
pub use error::{Result, SolverError};
pub use geometry::{element_area, quadrilateral_area, triangle_area};
pub use pipeline::{DEFAULT_TOLERANCE, Pipeline, PipelineConfig, PipelineOutput};
pub use rigidity::{REDUCTION_FACTOR, average_bedding_coefficient, compute_rigidities};
pub use stress::{Bedding, BeddingField, MIN_DISPLACEMENT, assign_stresses};
