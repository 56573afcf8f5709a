//! Plain-text summary of a pipeline run against the target model.

use chrono::Local;

use crate::records::PatchInput;

/// Human-readable summary of what a patch would write.
pub fn generate_report(input: &PatchInput<'_>) -> String {
    let output = input.output;
    let summary = &output.summary;
    let stiffnesses = input.node_stiffnesses();
    let coefficients = input.element_coefficients();

    let mut out = Vec::new();
    out.push("=== SLAB BEDDING TRANSFER REPORT ===".to_string());
    out.push(format!("Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S")));
    out.push(String::new());

    out.push("1. NODES AND STIFFNESS:".to_string());
    out.push(format!("   Total nodes: {}", summary.source_nodes));
    out.push(format!("   Target nodes: {}", summary.target_nodes));
    out.push(format!(
        "   Source node ids: {}",
        id_range(input.source.nodes.values().map(|node| node.id))
    ));
    out.push(format!(
        "   Correlated nodes: {}",
        coverage(output.nodes.matched_count(), output.nodes.len())
    ));
    out.push(format!(
        "   Correlated target node ids: {}",
        id_range(
            output
                .nodes
                .pairs()
                .map(|(_, target)| input.target.nodes[target].id)
        )
    ));
    out.push(format!("   Nodes with stiffness: {}", stiffnesses.len()));
    out.push(format!(
        "   Rigidity range: {}",
        range(stiffnesses.iter().map(|&(_, r)| r), 4)
    ));
    out.push(String::new());

    out.push("2. ELEMENTS AND BEDDING COEFFICIENTS:".to_string());
    out.push(format!("   Total elements: {}", summary.source_elements));
    out.push(format!(
        "   Triangles / quadrilaterals: {} / {}",
        summary.triangles, summary.quadrilaterals
    ));
    out.push(format!("   Target elements: {}", summary.target_elements));
    out.push(format!(
        "   Correlated elements: {}",
        coverage(output.elements.matched_count(), output.elements.len())
    ));
    out.push(format!(
        "   Correlated target element ids: {}",
        id_range(
            output
                .elements
                .pairs()
                .map(|(_, target)| input.target.elements[target].id)
        )
    ));
    out.push(format!("   Elements with coefficient: {}", coefficients.len()));
    out.push(format!(
        "   Coefficient range: {}",
        range(coefficients.iter().map(|&(_, c)| c), 3)
    ));
    out.push(String::new());

    let plaques = output.clustering.plaques();
    out.push("3. PLAQUES:".to_string());
    out.push(format!("   Total plaques: {}", plaques.len()));
    for plaque in plaques {
        out.push(format!(
            "   Plaque {}: {} elements, {} nodes, rigidity {:.4}",
            plaque.id,
            plaque.element_count(),
            plaque.nodes.len(),
            plaque.rigidity
        ));
    }
    out.push(String::new());
    out.join("\n")
}

fn coverage(matched: usize, total: usize) -> String {
    if total == 0 {
        return "0 of 0".to_string();
    }
    format!(
        "{matched} of {total} ({:.1}%)",
        matched as f64 * 100.0 / total as f64
    )
}

fn range(values: impl Iterator<Item = f64>, precision: usize) -> String {
    let bounds = values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    });
    match bounds {
        Some((lo, hi)) => format!("{lo:.precision$} .. {hi:.precision$}"),
        None => "n/a".to_string(),
    }
}

fn id_range(ids: impl Iterator<Item = i32>) -> String {
    let bounds = ids.fold(None, |acc: Option<(i32, i32)>, id| match acc {
        None => Some((id, id)),
        Some((lo, hi)) => Some((lo.min(id), hi.max(id))),
    });
    match bounds {
        Some((lo, hi)) => format!("{lo} .. {hi}"),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_ranges_and_coverage() {
        assert_eq!(range([3.0, 1.5, 2.0].into_iter(), 2), "1.50 .. 3.00");
        assert_eq!(range(std::iter::empty(), 2), "n/a");
        assert_eq!(coverage(1, 4), "1 of 4 (25.0%)");
        assert_eq!(coverage(0, 0), "0 of 0");
        assert_eq!(id_range([104, 101, 103].into_iter()), "101 .. 104");
        assert_eq!(id_range(std::iter::empty()), "n/a");
    }
}
