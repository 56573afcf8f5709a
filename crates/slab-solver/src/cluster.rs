//! Connectivity clustering of source elements into plaques.

use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;
use slab_model::{Idx, Plaque, SourceElement, SourceModel, SourceNode};

/// Plaques of a source model plus element and node back-links.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clustering {
    plaques: Vec<Plaque>,
    element_plaque: Vec<usize>,
    node_plaque: Vec<Option<usize>>,
}

impl Clustering {
    pub fn plaques(&self) -> &[Plaque] {
        &self.plaques
    }

    pub fn len(&self) -> usize {
        self.plaques.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plaques.is_empty()
    }

    pub fn plaque_of_element(&self, element: Idx<SourceElement>) -> Option<&Plaque> {
        let slot = *self.element_plaque.get(element.index())?;
        self.plaques.get(slot)
    }

    /// Plaque touching `node`, `None` for nodes no element references.
    pub fn plaque_of_node(&self, node: Idx<SourceNode>) -> Option<&Plaque> {
        let slot = (*self.node_plaque.get(node.index())?)?;
        self.plaques.get(slot)
    }

    pub(crate) fn plaques_mut(&mut self) -> &mut [Plaque] {
        &mut self.plaques
    }
}

/// Partition the elements of `model` into maximal groups connected through
/// shared node ids.
///
/// Seeds are taken in element order, so plaque ids follow the position of
/// each plaque's first element.
pub fn cluster(model: &SourceModel) -> Clustering {
    let elements = &model.elements;

    let mut by_node: HashMap<i32, Vec<Idx<SourceElement>>> = HashMap::new();
    for (idx, element) in elements.iter() {
        for &node in element.nodes() {
            by_node.entry(node).or_default().push(idx);
        }
    }

    let mut visited = vec![false; elements.len()];
    let mut element_plaque = vec![0usize; elements.len()];
    let mut node_plaque = vec![None; model.nodes.len()];
    let mut plaques = Vec::new();
    let mut queue = VecDeque::new();

    for seed in elements.indices() {
        if visited[seed.index()] {
            continue;
        }
        let slot = plaques.len();
        let mut plaque = Plaque::new(slot as i32 + 1);

        visited[seed.index()] = true;
        queue.push_back(seed);
        while let Some(current) = queue.pop_front() {
            plaque.elements.push(current);
            for node in elements[current].nodes() {
                for &neighbour in by_node.get(node).into_iter().flatten() {
                    if !visited[neighbour.index()] {
                        visited[neighbour.index()] = true;
                        queue.push_back(neighbour);
                    }
                }
            }
        }
        plaque.elements.sort_unstable();

        let mut seen = HashSet::new();
        for &member in &plaque.elements {
            element_plaque[member.index()] = slot;
            for &node_id in elements[member].nodes() {
                if let Some(node) = model.nodes.find(node_id)
                    && seen.insert(node)
                {
                    node_plaque[node.index()] = Some(slot);
                    plaque.nodes.push(node);
                }
            }
        }

        debug!(
            "plaque {}: {} elements, {} nodes",
            plaque.id,
            plaque.elements.len(),
            plaque.nodes.len()
        );
        plaques.push(plaque);
    }

    Clustering {
        plaques,
        element_plaque,
        node_plaque,
    }
}
