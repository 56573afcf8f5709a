//! Per-plaque support rigidity.

use log::{debug, info};
use slab_model::SourceModel;

use crate::cluster::{Clustering, cluster};
use crate::error::{Result, SolverError};
use crate::geometry::element_area;
use crate::stress::BeddingField;

/// Fixed reduction applied to every plaque rigidity.
pub const REDUCTION_FACTOR: f64 = 0.7;

/// Mean of the coefficients, elements without one counting as 0.
pub fn average_bedding_coefficient(values: impl IntoIterator<Item = Option<f64>>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| {
            (sum + value.unwrap_or(0.0), count + 1)
        });
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Cluster `model` into plaques and give each plaque its rigidity:
/// total area times mean bedding coefficient, reduced by
/// [`REDUCTION_FACTOR`] and divided by the plaque's element count.
pub fn compute_rigidities(model: &SourceModel, bedding: &BeddingField) -> Result<Clustering> {
    if model.nodes.is_empty() {
        return Err(SolverError::EmptyInput("source model has no nodes"));
    }
    if model.elements.is_empty() {
        return Err(SolverError::EmptyInput("source model has no elements"));
    }

    let mut clustering = cluster(model);
    for plaque in clustering.plaques_mut() {
        let mut area = 0.0;
        for &member in &plaque.elements {
            area += element_area(&model.elements[member], &model.nodes)?;
        }
        let coefficient = average_bedding_coefficient(
            plaque
                .elements
                .iter()
                .map(|&member| bedding.coefficient(member)),
        );
        plaque.rigidity = area * coefficient * REDUCTION_FACTOR / plaque.elements.len() as f64;
        debug!(
            "plaque {}: area {area:.4}, mean coefficient {coefficient:.3}, rigidity {:.4}",
            plaque.id, plaque.rigidity
        );
    }

    info!(
        "computed rigidity for {} plaques over {} elements",
        clustering.len(),
        model.elements.len()
    );
    Ok(clustering)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slab_model::SourceNode;

    fn square() -> SourceModel {
        let mut model = SourceModel::new();
        for (id, x, y) in [(1, 0.0, 0.0), (2, 1.0, 0.0), (3, 1.0, 1.0), (4, 0.0, 1.0)] {
            model
                .add_node(SourceNode::new(id, x, y, 0.0, 0.01))
                .expect("node");
        }
        model
    }

    #[test]
    fn averages_with_missing_as_zero() {
        assert_eq!(average_bedding_coefficient(std::iter::empty()), 0.0);
        assert_eq!(average_bedding_coefficient([Some(10.0), None]), 5.0);
        assert_eq!(average_bedding_coefficient([Some(1.0), Some(2.0), Some(3.0)]), 2.0);
    }

    #[test]
    fn unit_square_with_coefficient_50() {
        let mut model = square();
        model.add_element(1, &[1, 2, 3, 4]).expect("quad");
        let bedding = BeddingField::from_coefficients([Some(50.0)]);

        let clustering = compute_rigidities(&model, &bedding).expect("rigidity");
        assert_eq!(clustering.len(), 1);
        assert!((clustering.plaques()[0].rigidity - 35.0).abs() < 1e-5);
    }

    #[test]
    fn splitting_a_quad_halves_rigidity() {
        let mut quad = square();
        quad.add_element(1, &[1, 2, 3, 4]).expect("quad");
        let one = compute_rigidities(&quad, &BeddingField::from_coefficients([Some(100.0)]))
            .expect("quad rigidity");
        assert!((one.plaques()[0].rigidity - 70.0).abs() < 1e-9);

        let mut split = square();
        split.add_element(1, &[1, 2, 3]).expect("triangle");
        split.add_element(2, &[1, 3, 4]).expect("triangle");
        let two = compute_rigidities(
            &split,
            &BeddingField::from_coefficients([Some(100.0), Some(100.0)]),
        )
        .expect("split rigidity");
        assert_eq!(two.len(), 1);
        assert!((two.plaques()[0].rigidity - 35.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_empty_models() {
        let empty = SourceModel::new();
        assert!(matches!(
            compute_rigidities(&empty, &BeddingField::default()),
            Err(SolverError::EmptyInput(_))
        ));
        assert!(matches!(
            compute_rigidities(&square(), &BeddingField::default()),
            Err(SolverError::EmptyInput(_))
        ));
    }
}
