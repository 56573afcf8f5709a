//! Correlation, stress assignment and rigidity stages run in sequence.
//!
//! Each stage returns its own table; none of them touches the input models.

use log::info;
use serde::{Deserialize, Serialize};
use slab_model::{ModelSummary, SourceModel, StressRecord, TargetModel};

use crate::cluster::Clustering;
use crate::correlate::{
    CoveragePolicy, ElementCorrelation, MatchPolicy, NodeCorrelation, correlate_elements,
    correlate_nodes,
};
use crate::error::Result;
use crate::rigidity::compute_rigidities;
use crate::stress::{BeddingField, assign_stresses};

/// Default per-axis node matching tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1e-3;

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Per-axis coordinate tolerance for node matching
    pub tolerance: f64,
    /// Candidate selection when several target nodes match
    pub policy: MatchPolicy,
    /// Node coverage required for element matching
    pub coverage: CoveragePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            policy: MatchPolicy::default(),
            coverage: CoveragePolicy::default(),
        }
    }
}

/// Tables produced by one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub summary: ModelSummary,
    pub nodes: NodeCorrelation,
    pub elements: ElementCorrelation,
    pub bedding: BeddingField,
    pub clustering: Clustering,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(
        &self,
        source: &SourceModel,
        target: &TargetModel,
        stresses: &[StressRecord],
    ) -> Result<PipelineOutput> {
        let summary = ModelSummary::from_models(source, target);
        info!(
            "source: {} nodes, {} elements; target: {} nodes, {} elements",
            summary.source_nodes,
            summary.source_elements,
            summary.target_nodes,
            summary.target_elements
        );

        let nodes = correlate_nodes(
            &source.nodes,
            &target.nodes,
            self.config.tolerance,
            self.config.policy,
        )?;
        info!(
            "correlated {} of {} nodes ({} policy, tolerance {})",
            nodes.matched_count(),
            nodes.len(),
            self.config.policy,
            self.config.tolerance
        );

        let elements = correlate_elements(source, target, &nodes, self.config.coverage);
        info!(
            "correlated {} of {} elements",
            elements.matched_count(),
            elements.len()
        );

        let bedding = assign_stresses(&source.elements, stresses);
        info!(
            "bedding coefficients for {} of {} elements from {} stress records",
            bedding.assigned_count(),
            bedding.len(),
            stresses.len()
        );

        let clustering = compute_rigidities(source, &bedding)?;

        Ok(PipelineOutput {
            summary,
            nodes,
            elements,
            bedding,
            clustering,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
