//! Source/target model entities shared by the correlation, clustering and
//! patching stages.
//!
//! Core records are immutable after construction. Derived data (correlation
//! links, plaque membership, bedding coefficients) lives in separate tables
//! produced by the stage that owns it, keyed by `Idx<T>`.

mod arena;
mod error;

use std::collections::HashSet;

pub use arena::{Arena, Idx, Keyed};
pub use error::{ModelError, Result};

/// Most node slots an element row can carry (quadrilateral).
pub const MAX_ELEMENT_NODES: usize = 4;
/// Fewest distinct nodes an element may keep after padding removal.
pub const MIN_ELEMENT_NODES: usize = 2;
/// Most node slots a volumetric stress record can carry.
pub const MAX_STRESS_NODES: usize = 8;

/// A node of the analysis (source) model.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceNode {
    pub id: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Nodal displacement used to derive bedding coefficients
    pub displacement: f64,
}

impl SourceNode {
    pub fn new(id: i32, x: f64, y: f64, z: f64, displacement: f64) -> Self {
        Self {
            id,
            x,
            y,
            z,
            displacement,
        }
    }

    pub fn coords(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl Keyed for SourceNode {
    const KIND: &'static str = "source node";

    fn key(&self) -> i32 {
        self.id
    }
}

/// A node of the target model.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetNode {
    pub id: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl TargetNode {
    pub fn new(id: i32, x: f64, y: f64, z: f64) -> Self {
        Self { id, x, y, z }
    }

    pub fn coords(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl Keyed for TargetNode {
    const KIND: &'static str = "target node";

    fn key(&self) -> i32 {
        self.id
    }
}

/// A plate element of the source model.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceElement {
    pub id: i32,
    nodes: Vec<i32>,
    displacement: f64,
}

impl SourceElement {
    /// Build an element from a raw node row, averaging the displacement of the
    /// nodes that exist in `nodes`.
    pub fn new(id: i32, raw_nodes: &[i32], nodes: &Arena<SourceNode>) -> Result<Self> {
        let node_ids = normalize_node_ids(
            Self::KIND,
            id,
            raw_nodes,
            MIN_ELEMENT_NODES,
            MAX_ELEMENT_NODES,
        )?;
        let known: Vec<f64> = node_ids
            .iter()
            .filter_map(|&node_id| nodes.by_id(node_id))
            .map(|node| node.displacement)
            .collect();
        let displacement = if known.is_empty() {
            0.0
        } else {
            known.iter().sum::<f64>() / known.len() as f64
        };
        Ok(Self {
            id,
            nodes: node_ids,
            displacement,
        })
    }

    /// Build an element with an explicitly known displacement.
    pub fn with_displacement(id: i32, raw_nodes: &[i32], displacement: f64) -> Result<Self> {
        let nodes = normalize_node_ids(
            Self::KIND,
            id,
            raw_nodes,
            MIN_ELEMENT_NODES,
            MAX_ELEMENT_NODES,
        )?;
        Ok(Self {
            id,
            nodes,
            displacement,
        })
    }

    /// Node ids in their listed order.
    pub fn nodes(&self) -> &[i32] {
        &self.nodes
    }

    pub fn displacement(&self) -> f64 {
        self.displacement
    }

    pub fn sorted_nodes(&self) -> Vec<i32> {
        sorted(&self.nodes)
    }
}

impl Keyed for SourceElement {
    const KIND: &'static str = "source element";

    fn key(&self) -> i32 {
        self.id
    }
}

/// A plate element of the target model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetElement {
    pub id: i32,
    nodes: Vec<i32>,
}

impl TargetElement {
    pub fn new(id: i32, raw_nodes: &[i32]) -> Result<Self> {
        let nodes = normalize_node_ids(
            Self::KIND,
            id,
            raw_nodes,
            MIN_ELEMENT_NODES,
            MAX_ELEMENT_NODES,
        )?;
        Ok(Self { id, nodes })
    }

    pub fn nodes(&self) -> &[i32] {
        &self.nodes
    }

    pub fn sorted_nodes(&self) -> Vec<i32> {
        sorted(&self.nodes)
    }
}

impl Keyed for TargetElement {
    const KIND: &'static str = "target element";

    fn key(&self) -> i32 {
        self.id
    }
}

/// Stress sampled on a volumetric source entity. Only used as a lookup key
/// when assigning stresses to plate elements.
#[derive(Debug, Clone, PartialEq)]
pub struct StressRecord {
    pub solid_id: i32,
    nodes: Vec<i32>,
    pub stress: f64,
}

impl StressRecord {
    pub fn new(solid_id: i32, raw_nodes: &[i32], stress: f64) -> Result<Self> {
        let nodes = normalize_node_ids("stress record", solid_id, raw_nodes, 1, MAX_STRESS_NODES)?;
        Ok(Self {
            solid_id,
            nodes,
            stress,
        })
    }

    pub fn nodes(&self) -> &[i32] {
        &self.nodes
    }
}

/// A maximal connected cluster of source elements (a contiguous slab).
#[derive(Debug, Clone, PartialEq)]
pub struct Plaque {
    /// Sequential id, starting at 1 in discovery order
    pub id: i32,
    /// Member elements in arena order
    pub elements: Vec<Idx<SourceElement>>,
    /// Distinct nodes touched by the members, in first-appearance order
    pub nodes: Vec<Idx<SourceNode>>,
    /// Support stiffness shared by every node of the plaque
    pub rigidity: f64,
}

impl Plaque {
    pub fn new(id: i32) -> Self {
        Self {
            id,
            elements: Vec::new(),
            nodes: Vec::new(),
            rigidity: 0.0,
        }
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }
}

/// Nodes and elements exported by the analysis tool.
#[derive(Debug, Clone, Default)]
pub struct SourceModel {
    pub nodes: Arena<SourceNode>,
    pub elements: Arena<SourceElement>,
}

impl SourceModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: SourceNode) -> Result<Idx<SourceNode>> {
        self.nodes.insert(node)
    }

    /// Add an element from a raw node row; displacement is derived from the
    /// nodes already present.
    pub fn add_element(&mut self, id: i32, raw_nodes: &[i32]) -> Result<Idx<SourceElement>> {
        let element = SourceElement::new(id, raw_nodes, &self.nodes)?;
        self.elements.insert(element)
    }

    /// `(element id, node id)` pairs for element nodes absent from the model.
    pub fn dangling_references(&self) -> Vec<(i32, i32)> {
        self.elements
            .values()
            .flat_map(|element| {
                element
                    .nodes()
                    .iter()
                    .filter(|&&node_id| !self.nodes.contains_id(node_id))
                    .map(move |&node_id| (element.id, node_id))
            })
            .collect()
    }
}

/// Nodes and elements of the model being patched.
#[derive(Debug, Clone, Default)]
pub struct TargetModel {
    pub nodes: Arena<TargetNode>,
    pub elements: Arena<TargetElement>,
}

impl TargetModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: TargetNode) -> Result<Idx<TargetNode>> {
        self.nodes.insert(node)
    }

    pub fn add_element(&mut self, element: TargetElement) -> Result<Idx<TargetElement>> {
        self.elements.insert(element)
    }
}

/// Entity counts and extent of a source/target model pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub source_nodes: usize,
    pub source_elements: usize,
    pub target_nodes: usize,
    pub target_elements: usize,
    pub triangles: usize,
    pub quadrilaterals: usize,
    /// Axis-aligned bounds of the source nodes, `None` for an empty model
    pub bounds: Option<([f64; 3], [f64; 3])>,
}

impl ModelSummary {
    pub fn from_models(source: &SourceModel, target: &TargetModel) -> Self {
        let mut triangles = 0usize;
        let mut quadrilaterals = 0usize;
        for element in source.elements.values() {
            match element.nodes().len() {
                3 => triangles += 1,
                4 => quadrilaterals += 1,
                _ => {}
            }
        }

        let bounds = source
            .nodes
            .values()
            .fold(None, |acc: Option<([f64; 3], [f64; 3])>, node| {
                let p = node.coords();
                Some(match acc {
                    None => (p, p),
                    Some((mut lo, mut hi)) => {
                        for axis in 0..3 {
                            lo[axis] = f64::min(lo[axis], p[axis]);
                            hi[axis] = f64::max(hi[axis], p[axis]);
                        }
                        (lo, hi)
                    }
                })
            });

        Self {
            source_nodes: source.nodes.len(),
            source_elements: source.elements.len(),
            target_nodes: target.nodes.len(),
            target_elements: target.elements.len(),
            triangles,
            quadrilaterals,
            bounds,
        }
    }
}

/// Strip zero padding and check the remaining ids are positive, distinct and
/// within `min..=max`.
fn normalize_node_ids(
    kind: &'static str,
    id: i32,
    raw: &[i32],
    min: usize,
    max: usize,
) -> Result<Vec<i32>> {
    let invalid = |reason: String| ModelError::InvalidNodeList { kind, id, reason };

    let nodes: Vec<i32> = raw.iter().copied().filter(|&n| n != 0).collect();
    if let Some(negative) = nodes.iter().find(|&&n| n < 0) {
        return Err(invalid(format!("negative node id {negative}")));
    }
    let mut seen = HashSet::with_capacity(nodes.len());
    if let Some(dup) = nodes.iter().find(|&&n| !seen.insert(n)) {
        return Err(invalid(format!("node {dup} listed twice")));
    }
    if nodes.len() < min || nodes.len() > max {
        return Err(invalid(format!(
            "expected {min} to {max} nodes, got {}",
            nodes.len()
        )));
    }
    Ok(nodes)
}

fn sorted(ids: &[i32]) -> Vec<i32> {
    let mut out = ids.to_vec();
    out.sort_unstable();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_nodes() -> Arena<SourceNode> {
        Arena::try_from_iter([
            SourceNode::new(1, 0.0, 0.0, 0.0, 0.1),
            SourceNode::new(2, 1.0, 0.0, 0.0, 0.2),
            SourceNode::new(3, 1.0, 1.0, 0.0, 0.3),
            SourceNode::new(4, 0.0, 1.0, 0.0, 0.4),
        ])
        .expect("nodes")
    }

    #[test]
    fn element_strips_padding_and_averages_displacement() {
        let nodes = square_nodes();
        let element = SourceElement::new(10, &[1, 2, 3, 0], &nodes).expect("triangle");
        assert_eq!(element.nodes(), &[1, 2, 3]);
        assert!((element.displacement() - 0.2).abs() < 1e-12);

        let quad = SourceElement::new(11, &[4, 3, 2, 1], &nodes).expect("quad");
        assert_eq!(quad.sorted_nodes(), vec![1, 2, 3, 4]);
        assert!((quad.displacement() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn element_displacement_ignores_unknown_nodes() {
        let nodes = square_nodes();
        let element = SourceElement::new(12, &[1, 99, 3], &nodes).expect("element");
        assert!((element.displacement() - 0.2).abs() < 1e-12);

        let orphan = SourceElement::new(13, &[97, 98, 99], &nodes).expect("element");
        assert_eq!(orphan.displacement(), 0.0);
    }

    #[test]
    fn element_rejects_invalid_node_lists() {
        let nodes = square_nodes();
        let too_few = SourceElement::new(1, &[1, 0, 0, 0], &nodes).expect_err("one node");
        assert!(too_few.to_string().contains("source element 1"));

        let dup = SourceElement::new(2, &[1, 2, 2], &nodes).expect_err("duplicate");
        assert!(dup.to_string().contains("listed twice"));

        let negative = TargetElement::new(3, &[1, -2, 3]).expect_err("negative");
        assert!(negative.to_string().contains("negative node id -2"));

        let too_many = TargetElement::new(4, &[1, 2, 3, 4, 5]).expect_err("five nodes");
        assert!(too_many.to_string().contains("got 5"));
    }

    #[test]
    fn stress_record_accepts_up_to_eight_nodes() {
        let record = StressRecord::new(7, &[1, 2, 3, 4, 5, 6, 0, 0], 12.5).expect("record");
        assert_eq!(record.nodes().len(), 6);
        assert!(StressRecord::new(8, &[1, 2, 3, 4, 5, 6, 7, 8, 9], 1.0).is_err());
    }

    #[test]
    fn source_model_reports_dangling_references() {
        let mut model = SourceModel::new();
        model.nodes = square_nodes();
        model.add_element(1, &[1, 2, 3, 4]).expect("quad");
        model.add_element(2, &[3, 4, 50]).expect("triangle");

        assert_eq!(model.dangling_references(), vec![(2, 50)]);
    }

    #[test]
    fn summarizes_model_pair() {
        let mut source = SourceModel::new();
        source.nodes = square_nodes();
        source.add_element(1, &[1, 2, 3, 4]).expect("quad");
        source.add_element(2, &[1, 2, 3]).expect("triangle");

        let mut target = TargetModel::new();
        target
            .add_node(TargetNode::new(100, 0.0, 0.0, 0.0))
            .expect("target node");

        let s = ModelSummary::from_models(&source, &target);
        assert_eq!(s.source_nodes, 4);
        assert_eq!(s.source_elements, 2);
        assert_eq!(s.target_nodes, 1);
        assert_eq!(s.target_elements, 0);
        assert_eq!(s.triangles, 1);
        assert_eq!(s.quadrilaterals, 1);
        assert_eq!(s.bounds, Some(([0.0, 0.0, 0.0], [1.0, 1.0, 0.0])));
    }

    #[test]
    fn empty_model_has_no_bounds() {
        let s = ModelSummary::from_models(&SourceModel::new(), &TargetModel::new());
        assert_eq!(s.source_nodes, 0);
        assert_eq!(s.bounds, None);
    }
}
