//! Component G — the forbidden-borrow engine.
//!
//! For every ownership variable, publishes the set of paths witnessed
//! before it becomes live: a later borrow of one of those paths would
//! alias a value the ownership variable's owner is still responsible for,
//! so ownership inference must reject it and fall back to `Owner`.
//!
//! Grounded on the teacher's `EscapeAnalyzer`/`AllocationTracker` shape
//! (a per-function walk accumulating a witness map keyed by variable),
//! generalized from heap-allocation escape tracking to path-forbiddenness
//! over the borrow-path analyzer's witnessed moves.

use crate::ids::TypeVariableInfo;
use crate::ir::blocks::Body;
use crate::ir::drop_analysis::BorrowPathOutcome;
use crate::ir::instructions::InstructionKind;
use crate::ir::types::Path;
use crate::semantic_graph::ownership_graph::ForbiddenBorrows;

pub struct ForbiddenBorrowEngine;

impl ForbiddenBorrowEngine {
    /// Walks `body` in program order (a valid dependency order for the
    /// bind-before-use IR this core receives) and unions each instruction's
    /// witnessed pre-paths into the forbidden set of every ownership
    /// variable the instruction's own slot and recorded members touch.
    pub fn analyze(body: &Body, borrow_paths: &BorrowPathOutcome) -> ForbiddenBorrows {
        let mut forbidden = ForbiddenBorrows::new();

        for block in &body.blocks {
            for instr in &block.instructions {
                let witnessed: Vec<Path> = borrow_paths
                    .moves_by_instruction
                    .get(&instr.id)
                    .cloned()
                    .unwrap_or_default();
                if witnessed.is_empty() {
                    continue;
                }

                let mut relevant: Vec<_> = instr.members.iter().map(|m| m.info).collect();
                relevant.push(instr.tv_info);
                if let InstructionKind::ValueRef { bind_id, .. } = &instr.kind {
                    let bound = body.instruction(*bind_id);
                    relevant.push(bound.tv_info);
                }

                for tvi in dedup(relevant) {
                    forbidden.union_in(tvi.ownership_var, witnessed.clone());
                }
            }
        }

        forbidden
    }
}

fn dedup(mut vars: Vec<TypeVariableInfo>) -> Vec<TypeVariableInfo> {
    vars.sort_by_key(|tv| (tv.ownership_var.as_raw(), tv.group_var.as_raw()));
    vars.dedup();
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdAllocator;
    use crate::ir::builder::build_identity_function;
    use crate::ir::instructions::InstructionKind;
    use crate::ir::types::{QualifiedName, TempVar};
    use indexmap::{IndexMap, IndexSet};

    #[test]
    fn instruction_with_no_witnessed_moves_gets_no_forbidden_entry() {
        let alloc = IdAllocator::new();
        let f = build_identity_function(QualifiedName::function("m", "f"), &alloc);
        let outcome = BorrowPathOutcome::default();
        let forbidden = ForbiddenBorrowEngine::analyze(&f.body, &outcome);
        let arg0_ownership = f.args[0].ownership_var;
        assert!(forbidden.forbidden_for(arg0_ownership).is_none());
    }

    #[test]
    fn witnessed_move_on_an_instruction_forbids_its_own_var() {
        let alloc = IdAllocator::new();
        let f = build_identity_function(QualifiedName::function("m", "g"), &alloc);
        let value_ref = f
            .body
            .blocks
            .iter()
            .flat_map(|b| b.instructions.iter())
            .find(|i| matches!(i.kind, InstructionKind::ValueRef { .. }))
            .unwrap();
        let mut moves_by_instruction = IndexMap::new();
        moves_by_instruction.insert(value_ref.id, vec![Path::whole(TempVar::arg(0))]);
        let outcome = BorrowPathOutcome {
            borrow_sites: IndexSet::new(),
            cancelled_drops: IndexSet::new(),
            moves_by_instruction,
        };
        let forbidden = ForbiddenBorrowEngine::analyze(&f.body, &outcome);
        assert!(forbidden
            .forbidden_for(value_ref.tv_info.ownership_var)
            .is_some());
    }
}
