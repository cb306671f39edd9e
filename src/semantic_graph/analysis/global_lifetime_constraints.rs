//! Component L's lifetime-dependency-edge computation: for every pair of an
//! argument-derived and a result-derived borrow ID, checks whether the
//! former's witness set is a subset of the latter's, per §4.I's "Function
//! instantiation" paragraph.
//!
//! Grounded on the teacher's `global_lifetime_constraints` module (cross-
//! function lifetime constraint propagation), collapsed to the single
//! subset-of-borrow-witnesses rule the spec calls for.

use crate::ir::types::BorrowMap;
use crate::semantic_graph::analysis::lifetime_analyzer::Lifetime;
use crate::semantic_graph::analysis::lifetime_solver::OutlivesGraph;
use crate::tast::id_types::BorrowId;
use indexmap::IndexSet;

/// The outlives edges `'l{from} : 'l{to}` discovered for one function
/// instantiation.
#[derive(Debug, Clone, Default)]
pub struct LifetimeDependencyEdges {
    pub edges: IndexSet<(Lifetime, Lifetime)>,
}

impl LifetimeDependencyEdges {
    /// `from_ids` are the borrow IDs an argument's ownership var depends
    /// on; `to_ids` are the result's. Emits `'l{from} : 'l{to}` whenever
    /// `borrow_map`'s witness set for `from` is a subset of the one for
    /// `to` — a missing (never-minted) borrow ID's witness set is treated
    /// as empty, which is a subset of anything.
    pub fn compute(borrow_map: &BorrowMap, from_ids: &[BorrowId], to_ids: &[BorrowId]) -> Self {
        let mut edges = IndexSet::new();
        for &from in from_ids {
            for &to in to_ids {
                if Self::witnesses_subset(borrow_map, from, to) {
                    edges.insert((Lifetime::of(from), Lifetime::of(to)));
                }
            }
        }
        Self { edges }
    }

    /// Folds the computed edges into an `OutlivesGraph` for reachability
    /// queries and cycle collapsing.
    pub fn into_outlives_graph(&self) -> OutlivesGraph {
        let mut graph = OutlivesGraph::new();
        for &(from, to) in &self.edges {
            graph.add_edge(from, to);
        }
        graph
    }

    fn witnesses_subset(borrow_map: &BorrowMap, from: BorrowId, to: BorrowId) -> bool {
        match borrow_map.kinds(from) {
            None => true,
            Some(from_set) => match borrow_map.kinds(to) {
                None => from_set.is_empty(),
                Some(to_set) => from_set.iter().all(|w| to_set.contains(w)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::{BorrowKind, Path, TempVar};

    #[test]
    fn identical_single_witness_borrows_are_mutually_subset() {
        let mut bm = BorrowMap::new();
        let a = BorrowId::from_raw(0);
        let b = BorrowId::from_raw(1);
        bm.insert(a, BorrowKind::Local(Path::whole(TempVar::local(0))));
        bm.insert(b, BorrowKind::Local(Path::whole(TempVar::local(0))));
        let edges = LifetimeDependencyEdges::compute(&bm, &[a], &[b]);
        assert!(edges.edges.contains(&(Lifetime::of(a), Lifetime::of(b))));
    }

    #[test]
    fn disjoint_witnesses_emit_no_edge() {
        let mut bm = BorrowMap::new();
        let a = BorrowId::from_raw(0);
        let b = BorrowId::from_raw(1);
        bm.insert(a, BorrowKind::Local(Path::whole(TempVar::local(0))));
        bm.insert(b, BorrowKind::Local(Path::whole(TempVar::local(1))));
        let edges = LifetimeDependencyEdges::compute(&bm, &[a], &[b]);
        assert!(edges.edges.is_empty());
    }
}
