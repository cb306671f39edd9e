//! Strongly-typed identifiers for the ownership/borrow inference core.
//!
//! Each ID type is a lightweight wrapper around `u32` that prevents mixing
//! up ownership variables, group variables, and borrow IDs at compile time.
//! Generation is single-threaded (a `Cell<u32>` counter, not an atomic) —
//! the core makes no concurrency guarantees and an atomic would be a
//! misleading signal otherwise.

use std::cell::Cell;
use std::fmt;

/// Trait for ID types that can be created and validated.
pub trait IdType: Copy + Clone + PartialEq + Eq + std::hash::Hash + fmt::Debug {
    fn from_raw(raw: u32) -> Self;
    fn as_raw(self) -> u32;
    fn is_valid(self) -> bool;
    fn invalid() -> Self;

    fn first() -> Self {
        Self::from_raw(0)
    }

    fn next(self) -> Self {
        Self::from_raw(self.as_raw().wrapping_add(1))
    }
}

macro_rules! define_id_type {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn as_raw(self) -> u32 {
                self.0
            }

            pub const fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }

            pub const fn invalid() -> Self {
                Self(u32::MAX)
            }

            pub const fn first() -> Self {
                Self(0)
            }

            pub const fn next(self) -> Self {
                Self(self.0.wrapping_add(1))
            }
        }

        impl IdType for $name {
            fn from_raw(raw: u32) -> Self {
                Self::from_raw(raw)
            }
            fn as_raw(self) -> u32 {
                self.as_raw()
            }
            fn is_valid(self) -> bool {
                self.is_valid()
            }
            fn invalid() -> Self {
                Self::invalid()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}{}", stringify!($name).chars().next().unwrap().to_ascii_lowercase(), self.0)
                } else {
                    write!(f, "{}(<invalid>)", stringify!($name))
                }
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self::from_raw(raw)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> u32 {
                id.as_raw()
            }
        }
    };
}

define_id_type! {
    /// The ownership mode of a value slot: an unknown resolved by
    /// `OwnershipInferenceEngine` to `Owner | Borrow(BorrowId) | Unknown`.
    OwnershipVar
}

define_id_type! {
    /// An aliasing-equivalence-class token: the set of value slots that
    /// share a single owner.
    GroupVar
}

define_id_type! {
    /// A concrete borrow: a witness of one or more local/external origins.
    BorrowId
}

/// Per-run counter for one ID type. Not thread-safe by design — the core
/// is single-threaded and deterministic (see crate-level concurrency notes).
#[derive(Debug)]
pub struct IdGenerator<T: IdType> {
    next_id: Cell<u32>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: IdType> IdGenerator<T> {
    pub const fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            _phantom: std::marker::PhantomData,
        }
    }

    pub const fn with_start(start_id: u32) -> Self {
        Self {
            next_id: Cell::new(start_id),
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn next(&self) -> T {
        let raw_id = self.next_id.get();
        if raw_id == u32::MAX {
            panic!(
                "ID generator overflow: exhausted all valid IDs for {}",
                std::any::type_name::<T>()
            );
        }
        self.next_id.set(raw_id + 1);
        T::from_raw(raw_id)
    }

    pub fn peek_next(&self) -> T {
        T::from_raw(self.next_id.get())
    }

    pub fn count(&self) -> u32 {
        self.next_id.get()
    }
}

impl<T: IdType> Clone for IdGenerator<T> {
    fn clone(&self) -> Self {
        Self {
            next_id: Cell::new(self.next_id.get()),
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: IdType> Default for IdGenerator<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fast-hashing, insertion-order-preserving collections keyed by ID types.
/// Plain `fxhash`-backed `HashMap`/`HashSet` where iteration order does not
/// drive fresh-ID allocation; callers that need deterministic iteration use
/// `indexmap::IndexMap`/`IndexSet` instead (see `ir` and `semantic_graph`).
pub mod collections {
    use super::*;
    use fxhash::FxBuildHasher;
    use std::collections::{HashMap, HashSet};

    pub type IdMap<K, V> = HashMap<K, V, FxBuildHasher>;
    pub type IdSet<T> = HashSet<T, FxBuildHasher>;

    pub fn new_id_map<K: IdType, V>() -> IdMap<K, V> {
        HashMap::default()
    }

    pub fn new_id_set<T: IdType>() -> IdSet<T> {
        HashSet::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_compare_and_hash_by_raw_value() {
        let a = OwnershipVar::from_raw(1);
        let b = OwnershipVar::from_raw(1);
        let c = OwnershipVar::from_raw(2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn invalid_sentinel_is_u32_max() {
        assert!(!GroupVar::invalid().is_valid());
        assert_eq!(GroupVar::invalid().as_raw(), u32::MAX);
    }

    #[test]
    fn generator_allocates_in_order_starting_at_zero() {
        let gen = IdGenerator::<BorrowId>::new();
        let a = gen.next();
        let b = gen.next();
        let c = gen.next();
        assert_eq!((a.as_raw(), b.as_raw(), c.as_raw()), (0, 1, 2));
        assert_eq!(gen.count(), 3);
    }

    #[test]
    fn peek_next_does_not_consume() {
        let gen = IdGenerator::<OwnershipVar>::new();
        let peek = gen.peek_next();
        let actual = gen.next();
        assert_eq!(peek, actual);
    }

    #[test]
    fn display_uses_lowercase_prefix() {
        assert_eq!(format!("{}", BorrowId::from_raw(3)), "b3");
        assert_eq!(format!("{}", OwnershipVar::from_raw(7)), "o7");
    }
}
