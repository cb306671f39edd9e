//! Component A — identifiers & allocators.
//!
//! Holds the three monotone counters (`next_ownership`, `next_group`,
//! `next_borrow`) that every other engine draws fresh identifiers from.
//! Allocators are cheap to clone (each counter is a `Cell<u32>` snapshot)
//! and comparable by counter state, so a callee's allocator state can be
//! threaded into a caller's instantiation without reaching for a global.

use crate::tast::id_types::{BorrowId, GroupVar, IdGenerator, OwnershipVar};
use serde::{Deserialize, Serialize};

/// A `(ownership_var, group_var)` pair. Every instruction, every bound
/// variable, and every function-signature slot carries one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeVariableInfo {
    pub ownership_var: OwnershipVar,
    pub group_var: GroupVar,
}

impl TypeVariableInfo {
    pub fn new(ownership_var: OwnershipVar, group_var: GroupVar) -> Self {
        Self {
            ownership_var,
            group_var,
        }
    }
}

impl std::fmt::Display for TypeVariableInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.ownership_var, self.group_var)
    }
}

/// Per-run allocator for ownership vars, group vars, and local borrow IDs.
///
/// Threaded explicitly through every engine rather than kept as process-wide
/// state — the reference implementation's module-level counter is exactly
/// the mutable global this type replaces (see design notes on allocator
/// threading).
#[derive(Debug, Default)]
pub struct IdAllocator {
    next_ownership: IdGenerator<OwnershipVar>,
    next_group: IdGenerator<GroupVar>,
    next_borrow: IdGenerator<BorrowId>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_ownership(&self) -> OwnershipVar {
        self.next_ownership.next()
    }

    pub fn next_group(&self) -> GroupVar {
        self.next_group.next()
    }

    pub fn next_borrow(&self) -> BorrowId {
        self.next_borrow.next()
    }

    /// Allocates a fresh `(ownership_var, group_var)` pair.
    pub fn next_tvi(&self) -> TypeVariableInfo {
        TypeVariableInfo::new(self.next_ownership(), self.next_group())
    }

    pub fn ownership_count(&self) -> u32 {
        self.next_ownership.count()
    }

    pub fn group_count(&self) -> u32 {
        self.next_group.count()
    }

    pub fn borrow_count(&self) -> u32 {
        self.next_borrow.count()
    }
}

/// Snapshot of counter state, used when instantiating a callee profile into
/// a caller's allocator space (see `ir::monomorphize`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorState {
    pub ownership: u32,
    pub group: u32,
    pub borrow: u32,
}

impl IdAllocator {
    pub fn snapshot(&self) -> AllocatorState {
        AllocatorState {
            ownership: self.ownership_count(),
            group: self.group_count(),
            borrow: self.borrow_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_tvi_allocates_both_vars_in_lockstep() {
        let alloc = IdAllocator::new();
        let a = alloc.next_tvi();
        let b = alloc.next_tvi();
        assert_ne!(a.ownership_var, b.ownership_var);
        assert_ne!(a.group_var, b.group_var);
        assert_eq!(a.ownership_var.as_raw(), 0);
        assert_eq!(b.ownership_var.as_raw(), 1);
    }

    #[test]
    fn counters_are_independent() {
        let alloc = IdAllocator::new();
        alloc.next_ownership();
        alloc.next_ownership();
        alloc.next_group();
        assert_eq!(alloc.ownership_count(), 2);
        assert_eq!(alloc.group_count(), 1);
        assert_eq!(alloc.borrow_count(), 0);
    }
}
