//! `UnionFind<Lifetime>` and `OutlivesGraph` — the two structures Component
//! L's lifetime lifting operates over once every borrow ID has been tagged
//! `'l{borrow_id}` (see `lifetime_analyzer`).
//!
//! Grounded on the teacher's `LifetimeConstraintSolver` (union-find +
//! outlives graph + SCC cycle detection), collapsed to the two data
//! structures `global_lifetime_constraints`'s edge computation actually
//! needs: merge-by-equality and directed reachability. `UnionFind` reuses
//! `tast::constraint_solver::Substitution`'s generic union-find rather than
//! reimplementing path compression a second time.

use crate::semantic_graph::analysis::lifetime_analyzer::Lifetime;
use crate::tast::constraint_solver::Substitution;
use indexmap::{IndexMap, IndexSet};

/// Union-find over lifetime tags, for merging two lifetimes a caller's
/// instantiation forces equal (e.g. an outlives cycle `'la : 'lb` and
/// `'lb : 'la`).
#[derive(Debug, Clone, Default)]
pub struct UnionFind {
    inner: Substitution<Lifetime>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn union(&mut self, a: Lifetime, b: Lifetime) -> bool {
        self.inner.union(a, b)
    }

    pub fn find(&mut self, a: Lifetime) -> Lifetime {
        self.inner.find(a)
    }

    pub fn same_class(&mut self, a: Lifetime, b: Lifetime) -> bool {
        self.inner.same_class(a, b)
    }
}

/// Directed `'la : 'lb` ("`'la` outlives `'lb`") edges — §4.I's
/// lifetime-dependency edges before any union-find merging is applied.
#[derive(Debug, Clone, Default)]
pub struct OutlivesGraph {
    edges: IndexMap<Lifetime, IndexSet<Lifetime>>,
}

impl OutlivesGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, from: Lifetime, to: Lifetime) {
        self.edges.entry(from).or_default().insert(to);
    }

    /// `true` if `from` directly or transitively outlives `to`.
    pub fn outlives(&self, from: Lifetime, to: Lifetime) -> bool {
        if from == to {
            return true;
        }
        let mut stack = vec![from];
        let mut seen = IndexSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(succ) = self.edges.get(&current) {
                if succ.contains(&to) {
                    return true;
                }
                stack.extend(succ.iter().copied());
            }
        }
        false
    }

    /// Every lifetime pair in a cycle (`'la : 'lb` and `'lb : 'la`, directly
    /// or transitively) must be unified — §4.I's outlives relation is only
    /// meaningful as a partial order once cycles are collapsed.
    pub fn collapse_cycles(&self, union_find: &mut UnionFind) {
        let nodes: Vec<Lifetime> = self.edges.keys().copied().collect();
        for &a in &nodes {
            for &b in &nodes {
                if a != b && self.outlives(a, b) && self.outlives(b, a) {
                    union_find.union(a, b);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tast::id_types::BorrowId;

    #[test]
    fn direct_edge_outlives() {
        let mut g = OutlivesGraph::new();
        let a = Lifetime::of(BorrowId::from_raw(0));
        let b = Lifetime::of(BorrowId::from_raw(1));
        g.add_edge(a, b);
        assert!(g.outlives(a, b));
        assert!(!g.outlives(b, a));
    }

    #[test]
    fn transitive_edge_outlives() {
        let mut g = OutlivesGraph::new();
        let (a, b, c) = (
            Lifetime::of(BorrowId::from_raw(0)),
            Lifetime::of(BorrowId::from_raw(1)),
            Lifetime::of(BorrowId::from_raw(2)),
        );
        g.add_edge(a, b);
        g.add_edge(b, c);
        assert!(g.outlives(a, c));
    }

    #[test]
    fn cycle_collapses_into_one_union_find_class() {
        let mut g = OutlivesGraph::new();
        let (a, b) = (
            Lifetime::of(BorrowId::from_raw(0)),
            Lifetime::of(BorrowId::from_raw(1)),
        );
        g.add_edge(a, b);
        g.add_edge(b, a);
        let mut uf = UnionFind::new();
        g.collapse_cycles(&mut uf);
        assert!(uf.same_class(a, b));
    }
}
