//! JSON model input consumed by the command line.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use slab_model::{
    SourceModel, SourceNode, StressRecord, TargetElement, TargetModel, TargetNode,
};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceNodeRow {
    pub id: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub displacement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRow {
    pub id: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Element row; zero entries in `nodes` are padding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRow {
    pub id: i32,
    pub nodes: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressRow {
    pub solid_id: i32,
    pub nodes: Vec<i32>,
    pub stress: f64,
}

/// Raw rows of both models and the stress table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInput {
    pub source_nodes: Vec<SourceNodeRow>,
    pub target_nodes: Vec<NodeRow>,
    pub source_elements: Vec<ElementRow>,
    pub target_elements: Vec<ElementRow>,
    pub stresses: Vec<StressRow>,
}

/// Validated models built from a [`ModelInput`].
#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub source: SourceModel,
    pub target: TargetModel,
    pub stresses: Vec<StressRecord>,
}

impl ModelInput {
    /// Build arenas from the rows. Source nodes are added before source
    /// elements so element displacements see every node.
    pub fn build(&self) -> slab_model::Result<ModelData> {
        let mut source = SourceModel::new();
        for row in &self.source_nodes {
            source.add_node(SourceNode::new(row.id, row.x, row.y, row.z, row.displacement))?;
        }
        for row in &self.source_elements {
            source.add_element(row.id, &row.nodes)?;
        }

        let mut target = TargetModel::new();
        for row in &self.target_nodes {
            target.add_node(TargetNode::new(row.id, row.x, row.y, row.z))?;
        }
        for row in &self.target_elements {
            target.add_element(TargetElement::new(row.id, &row.nodes)?)?;
        }

        let stresses = self
            .stresses
            .iter()
            .map(|row| StressRecord::new(row.solid_id, &row.nodes, row.stress))
            .collect::<slab_model::Result<Vec<_>>>()?;

        let dangling = source.dangling_references();
        if !dangling.is_empty() {
            warn!(
                "{} source element node references point to missing nodes",
                dangling.len()
            );
            for (element, node) in &dangling {
                debug!("source element {element} references missing node {node}");
            }
        }

        Ok(ModelData {
            source,
            target,
            stresses,
        })
    }
}

pub fn save_model_input(path: impl AsRef<Path>, input: &ModelInput) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let bytes = serde_json::to_vec_pretty(input)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn load_model_input(path: impl AsRef<Path>) -> Result<ModelInput> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}
