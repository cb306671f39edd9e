//! Shared ownership data model underpinning Components E, F, G, and I: the
//! resolution lattice for an ownership variable, and the forbidden-borrow
//! sets the ownership inference engine validates new borrows against.

use crate::ir::types::Path;
use crate::tast::id_types::OwnershipVar;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// The closed lattice an ownership variable resolves to (§4.I). Defined in
/// `ir::types` (an `Instruction` field needs it without `ir` depending
/// upward on `semantic_graph`); re-exported here since this is where every
/// existing caller in this module tree looks for it.
pub use crate::ir::types::Ownership;

/// `ownership_var -> { paths witnessed before this var becomes live }` —
/// published by the forbidden-borrow engine (§4.G) and consulted by
/// ownership inference (§4.I) before promoting a slot to `Borrow`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForbiddenBorrows {
    forbidden: IndexMap<OwnershipVar, IndexSet<Path>>,
}

impl ForbiddenBorrows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn union_in(&mut self, var: OwnershipVar, paths: impl IntoIterator<Item = Path>) {
        self.forbidden.entry(var).or_default().extend(paths);
    }

    pub fn forbidden_for(&self, var: OwnershipVar) -> Option<&IndexSet<Path>> {
        self.forbidden.get(&var)
    }

    /// `true` if any path in `candidate` appears in `var`'s forbidden set —
    /// the check ownership inference runs before committing a new borrow.
    pub fn conflicts(&self, var: OwnershipVar, candidate: &IndexSet<Path>) -> bool {
        match self.forbidden.get(&var) {
            Some(forbidden) => candidate.iter().any(|p| forbidden.contains(p)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::TempVar;

    #[test]
    fn conflict_detected_when_candidate_path_was_forbidden() {
        let mut fb = ForbiddenBorrows::new();
        let v = OwnershipVar::from_raw(0);
        let p = Path::whole(TempVar::local(0));
        fb.union_in(v, [p.clone()]);
        let mut candidate = IndexSet::new();
        candidate.insert(p);
        assert!(fb.conflicts(v, &candidate));
    }

    #[test]
    fn no_conflict_for_unseen_var() {
        let fb = ForbiddenBorrows::new();
        let candidate = IndexSet::new();
        assert!(!fb.conflicts(OwnershipVar::from_raw(0), &candidate));
    }
}
