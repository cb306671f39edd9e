//! The instruction-level dependency map shared by the forbidden-borrow
//! engine (§4.G) and the data-flow path engine (§4.H): "this instruction's
//! value cannot be known until these others are".
//!
//! Grounded on the teacher's `DataFlowGraph`/def-use-chain shape, collapsed
//! from full SSA value numbering down to the single relation both
//! downstream engines actually consume — an edge list keyed by
//! `InstructionId`, fed to the same `dependency_graph::tarjan_scc` the
//! call-graph builder uses.

use crate::ir::blocks::Body;
use crate::ir::instructions::{InstructionId, InstructionKind};
use crate::ir::types::TempVar;
use indexmap::IndexMap;

/// `instruction -> [instructions it depends on]`, in the sense of §4.G:
/// `ValueRef` depends on its `bind_id`; `Bind` depends on its `rhs`;
/// `NamedFunctionCall`/`DynamicFunctionCall`/`MethodCall`/`Tuple` depend on
/// the definition sites of their argument temporaries; `If` depends on both
/// arms' last-real instructions; `BlockRef` depends on the referenced
/// block's last-real instruction.
#[derive(Debug, Clone, Default)]
pub struct DataFlowDependencyGraph {
    pub edges: IndexMap<InstructionId, Vec<InstructionId>>,
}

impl DataFlowDependencyGraph {
    pub fn build(body: &Body) -> Self {
        let def_sites = Self::def_sites(body);
        let mut edges: IndexMap<InstructionId, Vec<InstructionId>> = IndexMap::new();

        for instr in body.iter_instructions() {
            let mut deps = Vec::new();
            match &instr.kind {
                InstructionKind::Bind { rhs, .. } => deps.push(*rhs),
                InstructionKind::ValueRef { bind_id, .. } => deps.push(*bind_id),
                InstructionKind::NamedFunctionCall { args, .. }
                | InstructionKind::DynamicFunctionCall { args, .. }
                | InstructionKind::Tuple { args } => {
                    for a in args {
                        if let Some(site) = def_sites.get(a) {
                            deps.push(*site);
                        }
                    }
                }
                InstructionKind::MethodCall { receiver, args, .. } => {
                    if let Some(site) = def_sites.get(receiver) {
                        deps.push(*site);
                    }
                    for a in args {
                        if let Some(site) = def_sites.get(a) {
                            deps.push(*site);
                        }
                    }
                }
                InstructionKind::MemberAccess { receiver, .. } => {
                    if let Some(site) = def_sites.get(receiver) {
                        deps.push(*site);
                    }
                }
                InstructionKind::If {
                    true_branch,
                    false_branch,
                    ..
                } => {
                    if let Some(i) = body.block(*true_branch).last_real() {
                        deps.push(i.id);
                    }
                    if let Some(i) = body.block(*false_branch).last_real() {
                        deps.push(i.id);
                    }
                }
                InstructionKind::BlockRef { block } => {
                    if let Some(i) = body.block(*block).last_real() {
                        deps.push(i.id);
                    }
                }
                _ => {}
            }
            edges.insert(instr.id, deps);
        }

        Self { edges }
    }

    /// Maps each `TempVar` to the instruction that most recently defines it
    /// (a `Bind` or a `ValueRef` naming it) — sufficient for the bind-before-
    /// use IR the core receives, where a variable is renamed fresh at each
    /// binding site.
    fn def_sites(body: &Body) -> IndexMap<TempVar, InstructionId> {
        let mut sites = IndexMap::new();
        for instr in body.iter_instructions() {
            match &instr.kind {
                InstructionKind::Bind { name, .. } => {
                    sites.insert(name.clone(), instr.id);
                }
                InstructionKind::ValueRef { name, .. } => {
                    sites.insert(name.clone(), instr.id);
                }
                _ => {}
            }
        }
        sites
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdAllocator;
    use crate::ir::builder::build_identity_function;
    use crate::ir::types::QualifiedName;

    #[test]
    fn value_ref_depends_on_its_bind_site() {
        let alloc = IdAllocator::new();
        let f = build_identity_function(QualifiedName::function("m", "f"), &alloc);
        let dep_graph = DataFlowDependencyGraph::build(&f.body);
        let value_ref = f
            .body
            .iter_instructions()
            .find(|i| matches!(i.kind, InstructionKind::ValueRef { .. }))
            .unwrap();
        let bind = f
            .body
            .iter_instructions()
            .find(|i| matches!(i.kind, InstructionKind::Bind { .. }))
            .unwrap();
        assert_eq!(dep_graph.edges.get(&value_ref.id).unwrap(), &vec![bind.id]);
    }
}
