//! Same-kind contact graph and merge resolution.
//!
//! During one physics step every same-kind touching pair is recorded in a
//! [`ContactGraph`]. Once the step has returned, [`resolve`] partitions the
//! touched fruit into connected components and picks one merge per
//! component: the two lowest fruit. Larger clusters are worked off one merge
//! per step, the remaining members touch again on the next step.
//!
//! # Determinism
//!
//! Fruit are ranked by their first appearance in the recorded pairs.
//! Components are emitted in that order, their members are listed in that
//! order, and the vertical sort is stable, so height ties resolve by
//! recording order.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::FruitHost;
use crate::kind::{FruitId, FruitKind, Position};
use crate::CollisionError;

// ---------------------------------------------------------------------------
// ContactGraph
// ---------------------------------------------------------------------------

/// Same-kind contacts recorded during one step.
#[derive(Debug, Clone, Default)]
pub struct ContactGraph {
    pairs: Vec<(FruitId, FruitId)>,
}

impl ContactGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an undirected edge between two touching same-kind fruit.
    pub fn record(&mut self, a: FruitId, b: FruitId) {
        self.pairs.push((a, b));
    }

    /// Recorded pairs in recording order.
    pub fn pairs(&self) -> &[(FruitId, FruitId)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    /// Connected components over the fruit that appear in a recorded pair.
    ///
    /// Two fruit share a component iff a path of recorded contacts joins
    /// them. Every component holds at least two fruit unless a fruit was
    /// recorded touching itself.
    pub fn components(&self) -> Vec<Vec<FruitId>> {
        if self.pairs.is_empty() {
            return Vec::new();
        }

        // Adjacency lists plus first-appearance order.
        let mut order: Vec<FruitId> = Vec::new();
        let mut adjacency: HashMap<FruitId, Vec<FruitId>> = HashMap::new();
        for &(a, b) in &self.pairs {
            for fruit in [a, b] {
                adjacency.entry(fruit).or_insert_with(|| {
                    order.push(fruit);
                    Vec::new()
                });
            }
            if a != b {
                adjacency.entry(a).or_default().push(b);
                adjacency.entry(b).or_default().push(a);
            }
        }
        let rank: HashMap<FruitId, usize> =
            order.iter().enumerate().map(|(i, &f)| (f, i)).collect();

        let mut visited: HashSet<FruitId> = HashSet::with_capacity(order.len());
        let mut components = Vec::new();
        for &origin in &order {
            if !visited.insert(origin) {
                continue;
            }
            let mut component = vec![origin];
            let mut frontier = VecDeque::from([origin]);
            while let Some(current) = frontier.pop_front() {
                for &next in &adjacency[&current] {
                    if visited.insert(next) {
                        component.push(next);
                        frontier.push_back(next);
                    }
                }
            }
            component.sort_by_key(|f| rank[f]);
            components.push(component);
        }
        components
    }
}

// ---------------------------------------------------------------------------
// MergeDecision
// ---------------------------------------------------------------------------

/// The merge chosen for one connected component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeDecision {
    /// Lowest fruit of the component; it explodes.
    pub exploded: FruitId,
    /// Second-lowest fruit; it slides onto the exploded one.
    pub absorbed: FruitId,
    /// Kind shared by both fruit.
    pub kind: FruitKind,
    /// Kind of the fruit spawned in their place.
    pub spawn_kind: FruitKind,
    /// World position of `exploded`, captured before any transition runs.
    pub position: Position,
}

/// Pick the merge for a single component.
///
/// Members are sorted by height (lowest first, stable) and the two lowest are
/// merged. Returns `Ok(None)` for a component of fewer than two fruit.
pub fn resolve_component<H: FruitHost + ?Sized>(
    component: &[FruitId],
    host: &H,
) -> Result<Option<MergeDecision>, CollisionError> {
    if component.len() < 2 {
        debug!(?component, "single-fruit component ignored");
        return Ok(None);
    }

    let mut located = Vec::with_capacity(component.len());
    for &fruit in component {
        let position = host
            .position(fruit)
            .ok_or(CollisionError::UnknownFruit(fruit))?;
        located.push((fruit, position));
    }
    located.sort_by(|a, b| a.1.y.total_cmp(&b.1.y));

    let (f0, p0) = located[0];
    let (f1, _) = located[1];
    let kind_0 = host.kind(f0).ok_or(CollisionError::UnknownFruit(f0))?;
    let kind_1 = host.kind(f1).ok_or(CollisionError::UnknownFruit(f1))?;
    if kind_0 != kind_1 {
        return Err(CollisionError::KindMismatch {
            a: f0,
            kind_a: kind_0,
            b: f1,
            kind_b: kind_1,
        });
    }

    Ok(Some(MergeDecision {
        exploded: f0,
        absorbed: f1,
        kind: kind_0,
        spawn_kind: kind_0.merged(),
        position: p0,
    }))
}

/// Resolve every component of `graph` into at most one merge each.
pub fn resolve<H: FruitHost + ?Sized>(
    graph: &ContactGraph,
    host: &H,
) -> Result<Vec<MergeDecision>, CollisionError> {
    let mut decisions = Vec::new();
    for component in graph.components() {
        if let Some(decision) = resolve_component(&component, host)? {
            debug!(
                exploded = %decision.exploded,
                absorbed = %decision.absorbed,
                component_size = component.len(),
                spawn_kind = decision.spawn_kind.get(),
                "merge resolved"
            );
            decisions.push(decision);
        }
    }
    Ok(decisions)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Static fruit table: id -> (kind, position).
    struct Table(HashMap<FruitId, (FruitKind, Position)>);

    impl Table {
        fn new(entries: &[(u64, u8, f64)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|&(id, kind, y)| {
                        (
                            FruitId(id),
                            (FruitKind::new(kind).unwrap(), Position::new(id as f64, y)),
                        )
                    })
                    .collect(),
            )
        }
    }

    impl FruitHost for Table {
        fn kind(&self, fruit: FruitId) -> Option<FruitKind> {
            self.0.get(&fruit).map(|e| e.0)
        }
        fn position(&self, fruit: FruitId) -> Option<Position> {
            self.0.get(&fruit).map(|e| e.1)
        }
        fn explode(&mut self, _fruit: FruitId) {}
        fn merge_to(&mut self, _fruit: FruitId, _dest: Position) {}
        fn blink(&mut self, _fruit: FruitId, _activate: bool, _delay: Option<f64>) {}
        fn normal(&mut self, _fruit: FruitId) {}
    }

    #[test]
    fn empty_graph_has_no_components() {
        assert!(ContactGraph::new().components().is_empty());
    }

    #[test]
    fn chain_forms_one_component() {
        let mut g = ContactGraph::new();
        g.record(FruitId(1), FruitId(2));
        g.record(FruitId(3), FruitId(2));
        assert_eq!(g.components(), vec![vec![FruitId(1), FruitId(2), FruitId(3)]]);
    }

    #[test]
    fn disjoint_pairs_form_separate_components() {
        let mut g = ContactGraph::new();
        g.record(FruitId(5), FruitId(6));
        g.record(FruitId(1), FruitId(2));
        let comps = g.components();
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0], vec![FruitId(5), FruitId(6)]);
        assert_eq!(comps[1], vec![FruitId(1), FruitId(2)]);
    }

    #[test]
    fn duplicate_pairs_do_not_duplicate_members() {
        let mut g = ContactGraph::new();
        g.record(FruitId(1), FruitId(2));
        g.record(FruitId(2), FruitId(1));
        g.record(FruitId(1), FruitId(2));
        assert_eq!(g.components(), vec![vec![FruitId(1), FruitId(2)]]);
    }

    #[test]
    fn three_fruit_cluster_merges_two_lowest() {
        // Fruit 10 at y=10 touches 5 at y=5; 5 touches 0 at y=0.
        let host = Table::new(&[(10, 1, 10.0), (5, 1, 5.0), (20, 1, 0.0)]);
        let mut g = ContactGraph::new();
        g.record(FruitId(10), FruitId(5));
        g.record(FruitId(5), FruitId(20));

        let decisions = resolve(&g, &host).unwrap();
        assert_eq!(decisions.len(), 1);
        let d = &decisions[0];
        assert_eq!(d.exploded, FruitId(20));
        assert_eq!(d.absorbed, FruitId(5));
        assert_eq!(d.spawn_kind.get(), 2);
        assert_eq!(d.position, Position::new(20.0, 0.0));
    }

    #[test]
    fn height_ties_keep_recording_order() {
        let host = Table::new(&[(7, 3, 1.0), (4, 3, 1.0), (9, 3, 1.0)]);
        let mut g = ContactGraph::new();
        g.record(FruitId(7), FruitId(4));
        g.record(FruitId(4), FruitId(9));
        let d = resolve(&g, &host).unwrap().remove(0);
        assert_eq!(d.exploded, FruitId(7));
        assert_eq!(d.absorbed, FruitId(4));
    }

    #[test]
    fn max_kind_merge_is_capped() {
        let max = FruitKind::MAX.get();
        let host = Table::new(&[(1, max, 0.0), (2, max, 3.0)]);
        let mut g = ContactGraph::new();
        g.record(FruitId(1), FruitId(2));
        let d = resolve(&g, &host).unwrap().remove(0);
        assert_eq!(d.spawn_kind, FruitKind::MAX);
    }

    #[test]
    fn kind_mismatch_is_an_error() {
        let host = Table::new(&[(1, 2, 0.0), (2, 3, 1.0)]);
        let mut g = ContactGraph::new();
        g.record(FruitId(1), FruitId(2));
        let err = resolve(&g, &host).unwrap_err();
        assert!(matches!(err, CollisionError::KindMismatch { .. }));
    }

    #[test]
    fn unknown_fruit_is_an_error() {
        let host = Table::new(&[(1, 2, 0.0)]);
        let mut g = ContactGraph::new();
        g.record(FruitId(1), FruitId(99));
        assert_eq!(
            resolve(&g, &host).unwrap_err(),
            CollisionError::UnknownFruit(FruitId(99))
        );
    }

    #[test]
    fn self_contact_is_ignored() {
        let host = Table::new(&[(1, 2, 0.0)]);
        let mut g = ContactGraph::new();
        g.record(FruitId(1), FruitId(1));
        assert_eq!(g.components(), vec![vec![FruitId(1)]]);
        assert!(resolve(&g, &host).unwrap().is_empty());
    }
}
