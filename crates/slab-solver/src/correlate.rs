//! Correlation of source entities with target entities.
//!
//! Nodes are matched by position inside a per-axis tolerance box, elements by
//! the set of target node ids their correlated nodes translate to.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use slab_model::{
    Arena, Idx, Keyed, SourceElement, SourceModel, SourceNode, TargetElement, TargetModel,
    TargetNode,
};

use crate::error::{Result, SolverError};

/// Which candidate wins when several target nodes fall inside the tolerance box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// First candidate in target order
    First,
    /// Candidate closest in Euclidean distance, target order breaks ties
    #[default]
    Nearest,
    /// More than one candidate is an error
    Unique,
}

impl FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(MatchPolicy::First),
            "nearest" => Ok(MatchPolicy::Nearest),
            "unique" => Ok(MatchPolicy::Unique),
            other => Err(format!(
                "unknown match policy '{other}' (expected first, nearest or unique)"
            )),
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchPolicy::First => "first",
            MatchPolicy::Nearest => "nearest",
            MatchPolicy::Unique => "unique",
        };
        f.write_str(name)
    }
}

/// How many of a source element's nodes must be correlated before its node
/// set is compared with target elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoveragePolicy {
    /// Every node
    #[default]
    Full,
    /// Any non-empty subset; the correlated subset alone is compared
    Partial,
}

/// Link from a source entity to a target entity.
pub enum Correlation<T> {
    Matched(Idx<T>),
    Unmatched,
}

impl<T> Correlation<T> {
    pub fn matched(self) -> Option<Idx<T>> {
        match self {
            Correlation::Matched(idx) => Some(idx),
            Correlation::Unmatched => None,
        }
    }

    pub fn is_matched(self) -> bool {
        matches!(self, Correlation::Matched(_))
    }
}

impl<T: Keyed> Correlation<T> {
    /// External id of the linked entity, 0 when unmatched.
    pub fn target_id(self, targets: &Arena<T>) -> i32 {
        self.matched().map_or(0, |idx| targets[idx].key())
    }
}

impl<T> Clone for Correlation<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Correlation<T> {}

impl<T> PartialEq for Correlation<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Correlation::Matched(a), Correlation::Matched(b)) => a == b,
            (Correlation::Unmatched, Correlation::Unmatched) => true,
            _ => false,
        }
    }
}

impl<T> Eq for Correlation<T> {}

impl<T> fmt::Debug for Correlation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Correlation::Matched(idx) => write!(f, "Matched({idx:?})"),
            Correlation::Unmatched => f.write_str("Unmatched"),
        }
    }
}

/// Per-entity links from one source arena into a target arena, indexed by
/// source arena position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationTable<S, T> {
    links: Vec<Correlation<T>>,
    _source: std::marker::PhantomData<fn() -> S>,
}

impl<S, T> CorrelationTable<S, T> {
    fn from_links(links: Vec<Correlation<T>>) -> Self {
        Self {
            links,
            _source: std::marker::PhantomData,
        }
    }

    pub fn get(&self, source: Idx<S>) -> Correlation<T> {
        self.links
            .get(source.index())
            .copied()
            .unwrap_or(Correlation::Unmatched)
    }

    pub fn target_of(&self, source: Idx<S>) -> Option<Idx<T>> {
        self.get(source).matched()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn matched_count(&self) -> usize {
        self.links.iter().filter(|link| link.is_matched()).count()
    }

    pub fn unmatched_count(&self) -> usize {
        self.len() - self.matched_count()
    }

    /// Matched pairs in source arena order.
    pub fn pairs(&self) -> impl Iterator<Item = (Idx<S>, Idx<T>)> + '_ {
        self.links
            .iter()
            .enumerate()
            .filter_map(|(i, link)| link.matched().map(|t| (Idx::from_index(i), t)))
    }
}

pub type NodeCorrelation = CorrelationTable<SourceNode, TargetNode>;
pub type ElementCorrelation = CorrelationTable<SourceElement, TargetElement>;

/// Correlate every source node with a target node at the same position.
///
/// A target node is a candidate when each coordinate differs by at most
/// `tolerance`.
pub fn correlate_nodes(
    source: &Arena<SourceNode>,
    target: &Arena<TargetNode>,
    tolerance: f64,
    policy: MatchPolicy,
) -> Result<NodeCorrelation> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(SolverError::InvalidConfig(format!(
            "tolerance must be a non-negative number, got {tolerance}"
        )));
    }

    let mut links = Vec::with_capacity(source.len());
    for node in source.values() {
        let link = match_node(node, target, tolerance, policy)?;
        if !link.is_matched() {
            debug!("source node {} has no target node within {tolerance}", node.id);
        }
        links.push(link);
    }

    let table = NodeCorrelation::from_links(links);
    let unmatched = table.unmatched_count();
    if unmatched > 0 {
        warn!(
            "{unmatched} of {} source nodes have no target counterpart",
            table.len()
        );
    }
    Ok(table)
}

fn match_node(
    node: &SourceNode,
    target: &Arena<TargetNode>,
    tolerance: f64,
    policy: MatchPolicy,
) -> Result<Correlation<TargetNode>> {
    let within = |t: &TargetNode| {
        (node.x - t.x).abs() <= tolerance
            && (node.y - t.y).abs() <= tolerance
            && (node.z - t.z).abs() <= tolerance
    };
    let mut candidates = target.iter().filter(|(_, t)| within(t));

    let found = match policy {
        MatchPolicy::First => candidates.next().map(|(idx, _)| idx),
        MatchPolicy::Nearest => {
            let mut best: Option<(Idx<TargetNode>, f64)> = None;
            for (idx, t) in candidates {
                let d2 = (node.x - t.x).powi(2) + (node.y - t.y).powi(2) + (node.z - t.z).powi(2);
                if best.is_none_or(|(_, best_d2)| d2 < best_d2) {
                    best = Some((idx, d2));
                }
            }
            best.map(|(idx, _)| idx)
        }
        MatchPolicy::Unique => {
            let all: Vec<(Idx<TargetNode>, &TargetNode)> = candidates.collect();
            if all.len() > 1 {
                return Err(SolverError::AmbiguousMatch {
                    node: node.id,
                    candidates: all.iter().map(|(_, t)| t.id).collect(),
                });
            }
            all.first().map(|(idx, _)| *idx)
        }
    };

    Ok(found.map_or(Correlation::Unmatched, Correlation::Matched))
}

/// Correlate source elements with target elements through their nodes.
pub fn correlate_elements(
    source: &SourceModel,
    target: &TargetModel,
    nodes: &NodeCorrelation,
    coverage: CoveragePolicy,
) -> ElementCorrelation {
    let mut by_nodes: HashMap<Vec<i32>, Idx<TargetElement>> =
        HashMap::with_capacity(target.elements.len());
    for (idx, element) in target.elements.iter() {
        by_nodes.entry(element.sorted_nodes()).or_insert(idx);
    }

    let links: Vec<Correlation<TargetElement>> = source
        .elements
        .values()
        .map(|element| {
            let mut translated: Vec<i32> = element
                .nodes()
                .iter()
                .filter_map(|&id| source.nodes.find(id))
                .filter_map(|idx| nodes.target_of(idx))
                .map(|t| target.nodes[t].id)
                .collect();

            let complete = translated.len() == element.nodes().len();
            if translated.is_empty() || (coverage == CoveragePolicy::Full && !complete) {
                debug!(
                    "source element {}: {} of {} nodes correlated",
                    element.id,
                    translated.len(),
                    element.nodes().len()
                );
                return Correlation::Unmatched;
            }

            translated.sort_unstable();
            by_nodes
                .get(&translated)
                .copied()
                .map_or(Correlation::Unmatched, Correlation::Matched)
        })
        .collect();

    let table = ElementCorrelation::from_links(links);
    let unmatched = table.unmatched_count();
    if unmatched > 0 {
        warn!(
            "{unmatched} of {} source elements have no target counterpart",
            table.len()
        );
    }
    table
}
