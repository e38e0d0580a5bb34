//! # Unit Conversion Graph
//!
//! Resolves a multiplicative factor between two units of one tenant.
//!
//! ## Resolution Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve(from, to)                                                      │
//! │                                                                         │
//! │  1. from == to             ──► 1.0                                      │
//! │  2. declared from → to     ──► factor                                   │
//! │  3. declared to → from     ──► 1 / factor                               │
//! │  4. breadth-first search over the undirected view                       │
//! │       (each declared edge usable both ways, visited set guards cycles)  │
//! │                            ──► product of the factors along the path    │
//! │  5. otherwise              ──► None  ("no conversion", not an error)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A factor `F` from `a` to `b` means `1 a = F b`, so
//! `quantity_in_b = quantity_in_a * F`. The resolver never rounds.
//!
//! ## Lifetimes
//! - [`ConversionGraph`]: immutable snapshot of a tenant's edges, shareable
//!   behind an `Arc` and rebuilt whenever the edges change.
//! - [`GraphHandle`]: one per logical operation (a page load, a sale); wraps
//!   a snapshot and memoises every pair it has resolved.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::quantity::Quantity;

// =============================================================================
// Edges
// =============================================================================

/// A declared factor between two units: `1 unit_from = factor unit_to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ConversionEdge {
    pub tenant_id: String,
    pub unit_from: String,
    pub unit_to: String,
    pub factor: f64,
}

impl ConversionEdge {
    pub fn new(
        tenant_id: impl Into<String>,
        unit_from: impl Into<String>,
        unit_to: impl Into<String>,
        factor: f64,
    ) -> Self {
        ConversionEdge {
            tenant_id: tenant_id.into(),
            unit_from: unit_from.into(),
            unit_to: unit_to.into(),
            factor,
        }
    }

    /// True when the edge can take part in a graph.
    pub fn is_usable(&self) -> bool {
        self.factor.is_finite() && self.factor > 0.0 && self.unit_from != self.unit_to
    }
}

// =============================================================================
// Factor Source
// =============================================================================

/// Anything that can answer "how many `to` in one `from`".
///
/// Pricing is written against this trait so it can run on a bare graph, a
/// memoising handle, or a fixed table in tests.
pub trait FactorSource {
    /// Returns the factor, or `None` when the units are not connected.
    fn factor(&self, from: &str, to: &str) -> Option<f64>;
}

// =============================================================================
// Conversion Graph
// =============================================================================

/// Weighted graph over a tenant's units.
#[derive(Debug, Clone, Default)]
pub struct ConversionGraph {
    /// Declared edges as stored: `declared[from][to] = factor`.
    declared: HashMap<String, HashMap<String, f64>>,
    /// Undirected view: every declared edge plus its inverse.
    adjacency: HashMap<String, Vec<(String, f64)>>,
    skipped: usize,
}

impl ConversionGraph {
    /// Builds a graph from edge rows.
    ///
    /// Unusable edges (factor ≤ 0, non-finite, self loops) are skipped and
    /// counted. When the same ordered pair is declared twice the first row
    /// wins.
    pub fn build(edges: impl IntoIterator<Item = ConversionEdge>) -> Self {
        let mut graph = ConversionGraph::default();

        for edge in edges {
            if !edge.is_usable() {
                graph.skipped += 1;
                continue;
            }

            let targets = graph.declared.entry(edge.unit_from.clone()).or_default();
            if targets.contains_key(&edge.unit_to) {
                graph.skipped += 1;
                continue;
            }
            targets.insert(edge.unit_to.clone(), edge.factor);

            graph
                .adjacency
                .entry(edge.unit_from.clone())
                .or_default()
                .push((edge.unit_to.clone(), edge.factor));
            graph
                .adjacency
                .entry(edge.unit_to)
                .or_default()
                .push((edge.unit_from, 1.0 / edge.factor));
        }

        graph
    }

    /// Resolves the factor from `from` to `to`.
    ///
    /// ```rust
    /// use ventas_core::conversion::{ConversionEdge, ConversionGraph};
    ///
    /// let graph = ConversionGraph::build(vec![
    ///     ConversionEdge::new("t1", "a", "b", 2.0),
    ///     ConversionEdge::new("t1", "b", "c", 3.0),
    /// ]);
    /// assert_eq!(graph.resolve("a", "c"), Some(6.0));
    /// assert_eq!(graph.resolve("a", "z"), None);
    /// ```
    pub fn resolve(&self, from: &str, to: &str) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }

        if let Some(factor) = self.declared.get(from).and_then(|t| t.get(to)) {
            return Some(*factor);
        }

        if let Some(factor) = self.declared.get(to).and_then(|t| t.get(from)) {
            return Some(1.0 / *factor);
        }

        self.search(from, to)
    }

    /// Breadth-first search multiplying factors along the path.
    fn search(&self, from: &str, to: &str) -> Option<f64> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<(&str, f64)> = VecDeque::new();

        visited.insert(from);
        queue.push_back((from, 1.0));

        while let Some((unit, accumulated)) = queue.pop_front() {
            let Some(neighbours) = self.adjacency.get(unit) else {
                continue;
            };
            for (next, factor) in neighbours {
                let composed = accumulated * factor;
                if next == to {
                    return Some(composed);
                }
                if visited.insert(next.as_str()) {
                    queue.push_back((next.as_str(), composed));
                }
            }
        }

        None
    }

    /// Number of usable declared edges.
    pub fn edge_count(&self) -> usize {
        self.declared.values().map(HashMap::len).sum()
    }

    /// Number of rows rejected while building.
    pub fn skipped_edges(&self) -> usize {
        self.skipped
    }

    /// True when no usable edge was loaded.
    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }
}

impl FactorSource for ConversionGraph {
    fn factor(&self, from: &str, to: &str) -> Option<f64> {
        self.resolve(from, to)
    }
}

// =============================================================================
// Graph Handle
// =============================================================================

/// Per-operation view of a tenant's graph.
///
/// The first lookup of a pair runs the resolver; later lookups of the same
/// pair (including "no path" answers) come from the memo. The snapshot is
/// never mutated, so a handle can be dropped and rebuilt at any time.
#[derive(Debug)]
pub struct GraphHandle {
    tenant_id: String,
    generation: i64,
    graph: Arc<ConversionGraph>,
    resolved: Mutex<HashMap<(String, String), Option<f64>>>,
}

impl GraphHandle {
    pub fn new(tenant_id: impl Into<String>, generation: i64, graph: Arc<ConversionGraph>) -> Self {
        GraphHandle {
            tenant_id: tenant_id.into(),
            generation,
            graph,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Edge generation the snapshot was built from.
    pub fn generation(&self) -> i64 {
        self.generation
    }

    pub fn graph(&self) -> &ConversionGraph {
        &self.graph
    }

    /// Resolves through the memo.
    pub fn resolve(&self, from: &str, to: &str) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }

        // The memo only ever holds pure results, so a poisoned lock is safe
        // to keep using.
        let mut memo = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (from.to_string(), to.to_string());
        if let Some(cached) = memo.get(&key) {
            return *cached;
        }

        let factor = self.graph.resolve(from, to);
        memo.insert(key, factor);
        factor
    }

    /// Number of distinct pairs resolved so far.
    pub fn memoized_pairs(&self) -> usize {
        self.resolved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl FactorSource for GraphHandle {
    fn factor(&self, from: &str, to: &str) -> Option<f64> {
        self.resolve(from, to)
    }
}

// =============================================================================
// Conversion Outcome
// =============================================================================

/// How a quantity or price was carried into the target unit.
///
/// `Unconverted` is the degraded path: no conversion path existed and the
/// value was used as-is. It is surfaced to the caller as a warning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionOutcome {
    /// Source and target unit are the same.
    Identity,
    /// A factor was found and applied.
    Converted { factor: f64 },
    /// No path; the value was used unconverted.
    Unconverted,
}

impl ConversionOutcome {
    /// Outcome of a factor lookup between two units.
    pub fn from_lookup(from: &str, to: &str, factor: Option<f64>) -> Self {
        if from == to {
            return ConversionOutcome::Identity;
        }
        match factor {
            Some(factor) => ConversionOutcome::Converted { factor },
            None => ConversionOutcome::Unconverted,
        }
    }

    /// Factor to apply (1.0 for identity and for the degraded path).
    pub fn factor(&self) -> f64 {
        match self {
            ConversionOutcome::Converted { factor } => *factor,
            ConversionOutcome::Identity | ConversionOutcome::Unconverted => 1.0,
        }
    }

    /// True for the degraded "no path" outcome.
    pub fn is_degraded(&self) -> bool {
        matches!(self, ConversionOutcome::Unconverted)
    }
}

/// A quantity carried into another unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ConvertedQuantity {
    #[ts(type = "number")]
    pub quantity: Quantity,
    pub outcome: ConversionOutcome,
}

/// Converts `quantity` from one unit to another.
///
/// With no path the quantity comes back unchanged and the outcome says so.
/// A converted quantity too large to represent is a validation error.
///
/// ```rust
/// use ventas_core::conversion::{convert_quantity, ConversionEdge, ConversionGraph};
/// use ventas_core::Quantity;
///
/// let graph = ConversionGraph::build(vec![ConversionEdge::new("t1", "box", "unit", 12.0)]);
/// let converted = convert_quantity(&graph, Quantity::from_units(2), "box", "unit").unwrap();
/// assert_eq!(converted.quantity, Quantity::from_units(24));
/// ```
pub fn convert_quantity<S: FactorSource + ?Sized>(
    source: &S,
    quantity: Quantity,
    from: &str,
    to: &str,
) -> CoreResult<ConvertedQuantity> {
    let outcome = ConversionOutcome::from_lookup(from, to, source.factor(from, to));
    let quantity = match outcome {
        ConversionOutcome::Converted { factor } => quantity
            .checked_convert(factor)
            .ok_or_else(|| ValidationError::too_large("quantity"))?,
        ConversionOutcome::Identity | ConversionOutcome::Unconverted => quantity,
    };
    Ok(ConvertedQuantity { quantity, outcome })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: &str, to: &str, factor: f64) -> ConversionEdge {
        ConversionEdge::new("t1", from, to, factor)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identity_without_edges() {
        let graph = ConversionGraph::build(Vec::new());
        assert_eq!(graph.resolve("kg", "kg"), Some(1.0));
        assert_eq!(graph.resolve("anything", "anything"), Some(1.0));
    }

    #[test]
    fn test_direct_and_inverse() {
        let graph = ConversionGraph::build(vec![edge("kg", "lb", 2.20462)]);
        assert_eq!(graph.resolve("kg", "lb"), Some(2.20462));
        let inverse = graph.resolve("lb", "kg").unwrap();
        assert!(close(inverse, 1.0 / 2.20462));
    }

    #[test]
    fn test_direct_wins_over_inverse() {
        let graph = ConversionGraph::build(vec![edge("a", "b", 2.0), edge("b", "a", 0.4)]);
        assert_eq!(graph.resolve("a", "b"), Some(2.0));
        assert_eq!(graph.resolve("b", "a"), Some(0.4));
    }

    #[test]
    fn test_multi_hop_composition() {
        let graph = ConversionGraph::build(vec![edge("a", "b", 2.0), edge("b", "c", 3.0)]);
        assert!(close(graph.resolve("a", "c").unwrap(), 6.0));
        assert!(close(graph.resolve("c", "a").unwrap(), 1.0 / 6.0));
    }

    #[test]
    fn test_multi_hop_against_declared_direction() {
        // g → kg declared as 0.001, lb → kg declared as 0.45359237
        let graph = ConversionGraph::build(vec![
            edge("g", "kg", 0.001),
            edge("lb", "kg", 0.453_592_37),
        ]);
        let lb_to_g = graph.resolve("lb", "g").unwrap();
        assert!(close(lb_to_g, 453.592_37));
    }

    #[test]
    fn test_no_path_is_none() {
        let graph = ConversionGraph::build(vec![edge("kg", "lb", 2.20462), edge("m", "ft", 3.28084)]);
        assert_eq!(graph.resolve("kg", "m"), None);
        assert_eq!(graph.resolve("unknown", "kg"), None);
    }

    #[test]
    fn test_cycle_terminates() {
        let graph = ConversionGraph::build(vec![
            edge("a", "b", 2.0),
            edge("b", "c", 3.0),
            edge("c", "a", 1.0 / 6.0),
        ]);
        // Every route around the cycle agrees: a→c is 2 × 3 = 6
        assert!(close(graph.resolve("a", "c").unwrap(), 6.0));
        assert!(close(graph.resolve("c", "a").unwrap(), 1.0 / 6.0));
        assert!(close(graph.resolve("c", "b").unwrap(), 1.0 / 3.0));
        assert!(close(graph.resolve("b", "a").unwrap(), 0.5));
        assert_eq!(graph.resolve("a", "z"), None);
    }

    #[test]
    fn test_unusable_edges_skipped() {
        let graph = ConversionGraph::build(vec![
            edge("a", "b", 0.0),
            edge("a", "c", -1.0),
            edge("a", "d", f64::NAN),
            edge("a", "a", 5.0),
            edge("a", "e", 4.0),
            edge("a", "e", 9.0),
        ]);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.skipped_edges(), 5);
        assert_eq!(graph.resolve("a", "b"), None);
        assert_eq!(graph.resolve("a", "e"), Some(4.0));
    }

    #[test]
    fn test_handle_memoizes_pairs() {
        let graph = Arc::new(ConversionGraph::build(vec![
            edge("a", "b", 2.0),
            edge("b", "c", 3.0),
        ]));
        let handle = GraphHandle::new("t1", 7, graph);

        assert_eq!(handle.memoized_pairs(), 0);
        let first = handle.resolve("a", "c");
        let second = handle.resolve("a", "c");
        assert_eq!(first, second);
        assert_eq!(handle.memoized_pairs(), 1);

        assert_eq!(handle.resolve("a", "z"), None);
        assert_eq!(handle.resolve("a", "z"), None);
        assert_eq!(handle.memoized_pairs(), 2);

        // identity never touches the memo
        assert_eq!(handle.resolve("c", "c"), Some(1.0));
        assert_eq!(handle.memoized_pairs(), 2);
        assert_eq!(handle.generation(), 7);
        assert_eq!(handle.tenant_id(), "t1");
    }

    #[test]
    fn test_convert_quantity_outcomes() {
        let graph = ConversionGraph::build(vec![edge("kg", "lb", 2.20462)]);

        let same = convert_quantity(&graph, Quantity::from_units(3), "kg", "kg").unwrap();
        assert_eq!(same.outcome, ConversionOutcome::Identity);
        assert_eq!(same.quantity, Quantity::from_units(3));

        let lb = convert_quantity(&graph, Quantity::from_units(5), "lb", "kg").unwrap();
        assert_eq!(lb.quantity, Quantity::from_milli(2_268));
        assert!(!lb.outcome.is_degraded());

        let gap = convert_quantity(&graph, Quantity::from_units(5), "m", "kg").unwrap();
        assert_eq!(gap.outcome, ConversionOutcome::Unconverted);
        assert_eq!(gap.quantity, Quantity::from_units(5));
        assert!(gap.outcome.is_degraded());
    }

    #[test]
    fn test_convert_quantity_out_of_range() {
        let graph = ConversionGraph::build(vec![edge("ton", "g", 1_000_000.0)]);
        let tons = Quantity::from_milli(i64::MAX / 1000);

        let err = convert_quantity(&graph, tons, "ton", "g").unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoreError::Validation(ValidationError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_outcome_serializes_with_kind_tag() {
        let json = serde_json::to_value(ConversionOutcome::Converted { factor: 2.0 }).unwrap();
        assert_eq!(json["kind"], "converted");
        assert_eq!(json["factor"], 2.0);
        let json = serde_json::to_value(ConversionOutcome::Unconverted).unwrap();
        assert_eq!(json["kind"], "unconverted");
    }
}
