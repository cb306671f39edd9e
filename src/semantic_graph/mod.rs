//! Components D, G, H, K, L — the control-flow graph, data-flow/forbidden-
//! borrow analyses driven over it, and the whole-program passes (profile
//! store builder, monomorphizer) that sit on top.

pub mod analysis;
pub mod builder;
pub mod call_graph;
pub mod cfg;
pub mod dfg;
pub mod dfg_builder;
pub mod ownership_graph;

pub use builder::CfgBuilder;
pub use call_graph::CallGraph;
pub use cfg::{ControlFlowGraph, EdgeIndex, NodeKey};
pub use dfg::DataFlowDependencyGraph;
pub use ownership_graph::{ForbiddenBorrows, Ownership};
