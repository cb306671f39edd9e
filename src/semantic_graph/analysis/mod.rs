//! The four per-function analyses the profile builder (§4.K) and
//! monomorphizer (§4.L) run in sequence: forbidden borrows (G), ownership
//! inference (I), and the lifetime machinery (J/L) that rides on top of
//! ownership inference's borrow IDs.

pub mod analysis_engine;
pub mod escape_analyzer;
pub mod global_lifetime_constraints;
pub mod lifetime_analyzer;
pub mod lifetime_solver;
pub mod ownership_analyzer;

pub use analysis_engine::{ProfileBuilder, ProfileStore};
pub use escape_analyzer::ForbiddenBorrowEngine;
pub use global_lifetime_constraints::LifetimeDependencyEdges;
pub use lifetime_analyzer::Lifetime;
pub use lifetime_solver::{OutlivesGraph, UnionFind};
pub use ownership_analyzer::OwnershipInferenceEngine;
