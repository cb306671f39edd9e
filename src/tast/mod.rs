//! Component F's data model and identifier machinery. The teacher's much
//! larger `tast` (typed-AST: classes, scopes, namespaces, the full type
//! checker) has no counterpart here — this core receives an already
//! resolved and type-checked IR (§6) — so only the two modules Equality
//! actually builds on survive the trim.

pub mod constraint_solver;
pub mod id_types;

pub use id_types::*;
