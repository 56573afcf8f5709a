//! Record lines generated for the target model file.

use std::ops::RangeInclusive;

use slab_model::{SourceModel, TargetModel};
use slab_solver::PipelineOutput;

use crate::error::{IoError, Result};

/// Element type number of a single-node elastic support.
pub const SUPPORT_ELEMENT_TYPE: i32 = 56;

/// Material id of [`DEFAULT_MATERIAL_BLOCK`].
pub const DEFAULT_MATERIAL_ID: i32 = 1;

/// Material lines a newly created stiffness section starts with.
pub const DEFAULT_MATERIAL_BLOCK: [&str; 3] =
    ["1 S0 1.05541e+006 20 40/", " 0 RO 0.2/", " 0 Mu 0.2/"];

/// Models and pipeline tables a patch or report is generated from.
#[derive(Debug, Clone, Copy)]
pub struct PatchInput<'a> {
    pub source: &'a SourceModel,
    pub target: &'a TargetModel,
    pub output: &'a PipelineOutput,
}

impl<'a> PatchInput<'a> {
    pub fn new(source: &'a SourceModel, target: &'a TargetModel, output: &'a PipelineOutput) -> Self {
        Self {
            source,
            target,
            output,
        }
    }

    /// `(target node id, rigidity)` of every correlated node whose plaque has a
    /// positive rigidity, in source node order.
    pub fn node_stiffnesses(&self) -> Vec<(i32, f64)> {
        self.output
            .nodes
            .pairs()
            .filter_map(|(source, target)| {
                let plaque = self.output.clustering.plaque_of_node(source)?;
                (plaque.rigidity > 0.0).then(|| (self.target.nodes[target].id, plaque.rigidity))
            })
            .collect()
    }

    /// `(target element id, coefficient)` of every correlated element with a
    /// positive bedding coefficient, in source element order.
    pub fn element_coefficients(&self) -> Vec<(i32, f64)> {
        self.output
            .elements
            .pairs()
            .filter_map(|(source, target)| {
                let coefficient = self.output.bedding.coefficient(source)?;
                (coefficient > 0.0).then(|| (self.target.elements[target].id, coefficient))
            })
            .collect()
    }
}

pub fn stiffness_record(id: i32, rigidity: f64) -> String {
    format!("{id} {rigidity:.4} {rigidity:.4} 0 0 0 0 /")
}

pub fn support_element_record(stiffness_id: i32, node_id: i32) -> String {
    format!("{SUPPORT_ELEMENT_TYPE} {stiffness_id} {node_id} /")
}

pub fn bedding_record(element_id: i32, coefficient: f64) -> String {
    format!("{element_id} {coefficient:.3} 0 0 0 /")
}

/// Lines to insert, grouped by destination section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedRecords {
    pub stiffness: Vec<String>,
    pub supports: Vec<String>,
    pub bedding: Vec<String>,
    pub stiffness_ids: Option<RangeInclusive<i32>>,
}

impl GeneratedRecords {
    /// Build all record lines; stiffness ids continue after `last_stiffness_id`.
    pub fn generate(input: &PatchInput<'_>, last_stiffness_id: i32) -> Result<Self> {
        let mut records = Self::default();
        let mut last_id = last_stiffness_id;
        for (node_id, rigidity) in input.node_stiffnesses() {
            let id = last_id
                .checked_add(1)
                .ok_or(IoError::StiffnessIdOverflow { last: last_id })?;
            records.stiffness.push(stiffness_record(id, rigidity));
            records.supports.push(support_element_record(id, node_id));
            last_id = id;
        }
        if last_id > last_stiffness_id {
            records.stiffness_ids = Some(last_stiffness_id + 1..=last_id);
        }
        records.bedding = input
            .element_coefficients()
            .into_iter()
            .map(|(element_id, coefficient)| bedding_record(element_id, coefficient))
            .collect();
        Ok(records)
    }

    pub fn is_empty(&self) -> bool {
        self.stiffness.is_empty() && self.bedding.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_stiffness_record() {
        assert_eq!(
            stiffness_record(1, 123.456_7),
            "1 123.4567 123.4567 0 0 0 0 /"
        );
        assert_eq!(stiffness_record(12, 35.0), "12 35.0000 35.0000 0 0 0 0 /");
    }

    #[test]
    fn formats_support_element_record() {
        assert_eq!(support_element_record(5, 100), "56 5 100 /");
    }

    #[test]
    fn formats_bedding_record() {
        assert_eq!(bedding_record(500, 123.456), "500 123.456 0 0 0 /");
        assert_eq!(bedding_record(7, 50.0), "7 50.000 0 0 0 /");
    }
}
