//! Component K's call-graph SCC input.
//!
//! Dependency edges are every *non-ctor, non-unit* `NamedFunctionCall`
//! target reachable from a function's body — the same edge relation
//! `dependency_graph::tarjan_scc` expects, keyed by `QualifiedName` so a
//! function's SCC group can be looked up directly against `Program`.
//!
//! Grounded on the teacher's `CallGraph` (direct/reverse call maps plus
//! recursion info), collapsed from a full call-site-indexed graph down to
//! the single edge relation the profile builder needs to decompose into
//! SCCs.

use crate::dependency_graph::tarjan_scc;
use crate::ir::instructions::InstructionKind;
use crate::ir::modules::Program;
use crate::ir::types::QualifiedName;
use indexmap::IndexMap;

/// `caller -> [callee]` plus the SCC decomposition of that relation, in
/// leaf-first (reverse-topological) order — the exact order the profile
/// builder's fixed point walks.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    pub edges: IndexMap<QualifiedName, Vec<QualifiedName>>,
    pub sccs: Vec<Vec<QualifiedName>>,
}

impl CallGraph {
    pub fn build(program: &Program) -> Self {
        let mut edges: IndexMap<QualifiedName, Vec<QualifiedName>> = IndexMap::new();
        for (name, function) in &program.functions {
            let mut callees = Vec::new();
            for instr in function.body.iter_instructions() {
                if let InstructionKind::NamedFunctionCall { name: callee, ctor: false, .. } = &instr.kind {
                    if !callee.is_unit() {
                        callees.push(callee.clone());
                    }
                }
            }
            edges.insert(name.clone(), callees);
        }
        let sccs = tarjan_scc(&edges);
        Self { edges, sccs }
    }

    /// `true` if `name`'s own SCC group has more than one member, or
    /// contains a direct self-edge — either way Equality must treat the
    /// group as recursive rather than running a single singleton pass.
    pub fn is_recursive(&self, name: &QualifiedName) -> bool {
        self.sccs
            .iter()
            .find(|scc| scc.contains(name))
            .map(|scc| scc.len() > 1 || self.edges.get(name).map(|c| c.contains(name)).unwrap_or(false))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdAllocator;
    use crate::ir::builder::build_identity_function;

    #[test]
    fn identity_only_program_has_one_singleton_scc() {
        let alloc = IdAllocator::new();
        let f = build_identity_function(QualifiedName::function("m", "f"), &alloc);
        let mut program = Program::new();
        program.functions.insert(f.name.clone(), f);
        let call_graph = CallGraph::build(&program);
        assert_eq!(call_graph.sccs.len(), 1);
        assert!(!call_graph.is_recursive(&QualifiedName::function("m", "f")));
    }
}
