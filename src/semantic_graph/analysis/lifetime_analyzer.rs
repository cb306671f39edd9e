//! The lifetime tag Component L lifts each borrow ID into under a concrete
//! function instantiation (§4.I's "Function instantiation" paragraph:
//! "lift each into a lifetime `'l{borrow_id}`").
//!
//! Grounded on the teacher's `LifetimeAnalyzer`/`LifetimeId` shape,
//! collapsed from a full constraint-generation-and-solving analyzer down to
//! the tag type `lifetime_solver`'s `OutlivesGraph`/`UnionFind` and
//! `global_lifetime_constraints`'s edge computation operate over.

use crate::tast::id_types::BorrowId;

/// `'l{borrow_id}` — a monomorphized function's per-borrow lifetime tag.
/// Defined in `ir::types` (an `Instruction`/`Function` field needs it);
/// re-exported here since this is where every existing caller in this
/// module tree looks for it.
pub use crate::ir::types::Lifetime;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetime_displays_with_the_l_prefix() {
        let l = Lifetime::of(BorrowId::from_raw(3));
        assert_eq!(l.to_string(), "'l3");
    }
}
