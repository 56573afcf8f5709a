//! Stress assignment and bedding coefficients.

use std::collections::HashMap;

use log::{debug, warn};
use slab_model::{Arena, Idx, SourceElement, StressRecord};

/// Displacements at or below this magnitude give no bedding coefficient.
pub const MIN_DISPLACEMENT: f64 = 1e-12;

/// Shared node count for a stress record to apply to a plate element.
pub const MIN_SHARED_NODES: usize = 3;

/// Stress and bedding coefficient of one source element.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bedding {
    pub stress: Option<f64>,
    pub coefficient: Option<f64>,
}

/// Per source element bedding data, indexed by element arena position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeddingField {
    entries: Vec<Bedding>,
}

impl BeddingField {
    /// Field built from known coefficients, one per element in arena order.
    pub fn from_coefficients(coefficients: impl IntoIterator<Item = Option<f64>>) -> Self {
        let entries = coefficients
            .into_iter()
            .map(|coefficient| Bedding {
                stress: None,
                coefficient,
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, element: Idx<SourceElement>) -> Bedding {
        self.entries
            .get(element.index())
            .copied()
            .unwrap_or_default()
    }

    pub fn coefficient(&self, element: Idx<SourceElement>) -> Option<f64> {
        self.get(element).coefficient
    }

    pub fn stress(&self, element: Idx<SourceElement>) -> Option<f64> {
        self.get(element).stress
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Elements that received a coefficient.
    pub fn assigned_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.coefficient.is_some())
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Idx<SourceElement>, Bedding)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (Idx::from_index(i), *entry))
    }
}

/// Give every element the stress of the first record sharing at least
/// three of its nodes, and derive its bedding coefficient.
pub fn assign_stresses(elements: &Arena<SourceElement>, records: &[StressRecord]) -> BeddingField {
    let mut by_node: HashMap<i32, Vec<usize>> = HashMap::new();
    for (position, record) in records.iter().enumerate() {
        for &node in record.nodes() {
            by_node.entry(node).or_default().push(position);
        }
    }

    let mut entries = Vec::with_capacity(elements.len());
    let mut skipped = 0usize;
    for element in elements.values() {
        let mut shared: HashMap<usize, usize> = HashMap::new();
        for node in element.nodes() {
            for &position in by_node.get(node).into_iter().flatten() {
                *shared.entry(position).or_default() += 1;
            }
        }
        let record = shared
            .into_iter()
            .filter(|&(_, count)| count >= MIN_SHARED_NODES)
            .map(|(position, _)| position)
            .min()
            .map(|position| &records[position]);

        let Some(record) = record else {
            debug!("source element {} has no stress record", element.id);
            entries.push(Bedding::default());
            continue;
        };

        let displacement = element.displacement();
        let coefficient = if displacement.abs() > MIN_DISPLACEMENT {
            Some(record.stress / displacement)
        } else {
            warn!(
                "source element {} has zero displacement, bedding coefficient skipped",
                element.id
            );
            skipped += 1;
            None
        };
        entries.push(Bedding {
            stress: Some(record.stress),
            coefficient,
        });
    }

    let field = BeddingField { entries };
    debug!(
        "bedding coefficients assigned to {} of {} elements ({skipped} with zero displacement)",
        field.assigned_count(),
        field.len()
    );
    field
}

#[cfg(test)]
mod tests {
    use super::*;
    use slab_model::SourceNode;

    fn elements() -> Arena<SourceElement> {
        let nodes = Arena::try_from_iter([
            SourceNode::new(1, 0.0, 0.0, 0.0, 0.02),
            SourceNode::new(2, 1.0, 0.0, 0.0, 0.02),
            SourceNode::new(3, 1.0, 1.0, 0.0, 0.02),
            SourceNode::new(4, 0.0, 1.0, 0.0, 0.02),
            SourceNode::new(5, 2.0, 0.0, 0.0, 0.0),
            SourceNode::new(6, 2.0, 1.0, 0.0, 0.0),
        ])
        .expect("nodes");
        Arena::try_from_iter([
            SourceElement::new(10, &[1, 2, 3, 4], &nodes).expect("quad"),
            SourceElement::new(11, &[2, 5, 6], &nodes).expect("triangle"),
            SourceElement::new(12, &[3, 6, 4], &nodes).expect("triangle"),
        ])
        .expect("elements")
    }

    #[test]
    fn first_record_sharing_three_nodes_wins() {
        let elements = elements();
        let records = vec![
            StressRecord::new(900, &[1, 2, 7, 8], 5.0).expect("two shared"),
            StressRecord::new(901, &[1, 2, 3, 9, 10, 11, 12, 13], 2.0).expect("three shared"),
            StressRecord::new(902, &[1, 2, 3, 4], 8.0).expect("four shared"),
        ];
        let field = assign_stresses(&elements, &records);
        let quad = elements.find(10).expect("quad");

        assert_eq!(field.stress(quad), Some(2.0));
        let coefficient = field.coefficient(quad).expect("coefficient");
        assert!((coefficient - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_displacement_leaves_coefficient_empty() {
        let elements = elements();
        let records = vec![StressRecord::new(900, &[2, 5, 6], 3.0).expect("record")];
        let field = assign_stresses(&elements, &records);
        let triangle = elements.find(11).expect("triangle");

        // Nodes 5 and 6 have no displacement, node 2 does: mean is nonzero.
        assert!(field.coefficient(triangle).is_some());

        let flat = Arena::try_from_iter([SourceElement::with_displacement(20, &[5, 6, 7], 0.0)
            .expect("element")])
        .expect("arena");
        let records = vec![StressRecord::new(901, &[5, 6, 7], 3.0).expect("record")];
        let field = assign_stresses(&flat, &records);
        let only = flat.find(20).expect("element");
        assert_eq!(field.stress(only), Some(3.0));
        assert_eq!(field.coefficient(only), None);
    }

    #[test]
    fn elements_without_record_stay_empty() {
        let elements = elements();
        let field = assign_stresses(&elements, &[]);
        assert_eq!(field.len(), 3);
        assert_eq!(field.assigned_count(), 0);
        assert_eq!(field.get(elements.find(12).expect("e12")), Bedding::default());
    }
}
