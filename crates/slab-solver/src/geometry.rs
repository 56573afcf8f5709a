//! Plate element areas.

use nalgebra::Vector3;
use slab_model::{Arena, SourceElement, SourceNode};

use crate::error::{Result, SolverError};

fn position(node: &SourceNode) -> Vector3<f64> {
    Vector3::new(node.x, node.y, node.z)
}

/// Area of a triangle by Heron's formula on its side lengths.
///
/// Rounding can push the radicand of a degenerate triangle slightly below
/// zero; it is clamped so collinear points give 0.
pub fn triangle_area(a: &Vector3<f64>, b: &Vector3<f64>, c: &Vector3<f64>) -> f64 {
    let ab = (b - a).norm();
    let bc = (c - b).norm();
    let ca = (a - c).norm();
    let s = (ab + bc + ca) / 2.0;
    (s * (s - ab) * (s - bc) * (s - ca)).max(0.0).sqrt()
}

/// Area of a quadrilateral split along the diagonal `a`-`c`.
pub fn quadrilateral_area(
    a: &Vector3<f64>,
    b: &Vector3<f64>,
    c: &Vector3<f64>,
    d: &Vector3<f64>,
) -> f64 {
    triangle_area(a, b, c) + triangle_area(a, c, d)
}

/// Area of a triangular or quadrilateral source element.
pub fn element_area(element: &SourceElement, nodes: &Arena<SourceNode>) -> Result<f64> {
    let points = element
        .nodes()
        .iter()
        .map(|&id| {
            nodes
                .by_id(id)
                .map(position)
                .ok_or(SolverError::MissingNode {
                    element: element.id,
                    node: id,
                })
        })
        .collect::<Result<Vec<_>>>()?;

    match points.as_slice() {
        [a, b, c] => Ok(triangle_area(a, b, c)),
        [a, b, c, d] => Ok(quadrilateral_area(a, b, c, d)),
        other => Err(SolverError::UnsupportedNodeCount {
            element: element.id,
            count: other.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes() -> Arena<SourceNode> {
        Arena::try_from_iter([
            SourceNode::new(1, 0.0, 0.0, 0.0, 0.0),
            SourceNode::new(2, 1.0, 0.0, 0.0, 0.0),
            SourceNode::new(3, 1.0, 1.0, 0.0, 0.0),
            SourceNode::new(4, 0.0, 1.0, 0.0, 0.0),
            SourceNode::new(5, 3.0, 0.0, 0.0, 0.0),
            SourceNode::new(6, 0.0, 4.0, 0.0, 0.0),
            SourceNode::new(7, 2.0, 0.0, 0.0, 0.0),
        ])
        .expect("nodes")
    }

    fn element(id: i32, ids: &[i32]) -> SourceElement {
        SourceElement::with_displacement(id, ids, 0.0).expect("element")
    }

    #[test]
    fn unit_square_has_unit_area() {
        let area = element_area(&element(1, &[1, 2, 3, 4]), &nodes()).expect("area");
        assert!((area - 1.0).abs() < 1e-12, "got {area}");
    }

    #[test]
    fn right_triangle_3_4_5() {
        let area = element_area(&element(2, &[1, 5, 6]), &nodes()).expect("area");
        assert!((area - 6.0).abs() < 1e-12, "got {area}");
    }

    #[test]
    fn collinear_points_have_zero_area() {
        let area = element_area(&element(3, &[1, 2, 7]), &nodes()).expect("area");
        assert_eq!(area, 0.0);

        let a = Vector3::new(0.1, 0.1, 0.1);
        let b = Vector3::new(0.2, 0.2, 0.2);
        let c = Vector3::new(0.3, 0.3, 0.3);
        assert!(triangle_area(&a, &b, &c).abs() < 1e-9);
    }

    #[test]
    fn missing_node_names_element_and_node() {
        let err = element_area(&element(9, &[1, 2, 42]), &nodes()).expect_err("missing");
        assert_eq!(err, SolverError::MissingNode { element: 9, node: 42 });
    }

    #[test]
    fn two_node_element_is_unsupported() {
        let err = element_area(&element(8, &[1, 2]), &nodes()).expect_err("line");
        assert_eq!(
            err,
            SolverError::UnsupportedNodeCount {
                element: 8,
                count: 2
            }
        );
    }
}
