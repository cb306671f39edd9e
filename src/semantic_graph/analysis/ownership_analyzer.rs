//! Component I — ownership inference.
//!
//! Constraint-based, one closed lattice `{Owner, Borrow(id), Unknown}` (see
//! `ownership_graph::Ownership`). Walks a function's instructions in
//! program order — the same dependency-order stand-in `escape_analyzer`
//! uses, since the bind-before-use IR this core receives is already close
//! to topologically sorted for the single-function case these engines run
//! over — pinning `CtorConstraint` sources to `Owner` and resolving each
//! `ValueRef`'s `FieldAccessConstraint` against its member chain, the
//! forbidden-borrow set, and any borrow already recorded for its var.
//!
//! Grounded on `semantic_graph::analysis::ownership_analyzer`'s shape (a
//! stateful analyzer type wrapping a `Stats` struct and a cache), replacing
//! SSA move/borrow-conflict detection with the constraint lattice
//! `original_source/Compiler/Ownership/Inference.py` resolves.

use crate::ids::{IdAllocator, TypeVariableInfo};
use crate::ir::functions::Function;
use crate::ir::instructions::{InstructionId, InstructionKind};
use crate::ir::types::{BorrowKind, BorrowMap, DataFlowProfile, MemberInfo, Path, QualifiedName};
use crate::semantic_graph::ownership_graph::{ForbiddenBorrows, Ownership};
use crate::tast::id_types::OwnershipVar;
use crate::error_codes::{CoreError, CoreResult};
use indexmap::{IndexMap, IndexSet};

/// One recorded `FieldAccessConstraint`, kept around for the post-pass
/// clone decision (§4.I's "Clone decision").
#[derive(Debug, Clone)]
struct RecordedConstraint {
    instruction_id: crate::ir::instructions::InstructionId,
    var: OwnershipVar,
    final_ownership: Ownership,
    requested_borrow: bool,
}

/// Per-function outcome: every ownership var's resolved lattice value, the
/// borrow map minted along the way, and the instructions where a clone had
/// to be inserted.
#[derive(Debug, Clone, Default)]
pub struct OwnershipOutcome {
    pub assignments: IndexMap<OwnershipVar, Ownership>,
    pub borrow_map: BorrowMap,
    pub clone_sites: IndexSet<crate::ir::instructions::InstructionId>,
}

impl OwnershipOutcome {
    /// `unpackOwners`: anything with no recorded opinion is pinned `Owner`.
    pub fn resolve(&self, var: OwnershipVar) -> Ownership {
        self.assignments.get(&var).copied().unwrap_or(Ownership::Owner)
    }
}

pub struct OwnershipInferenceEngine;

impl OwnershipInferenceEngine {
    pub fn analyze(
        function: &Function,
        forbidden: &ForbiddenBorrows,
        classes: &IndexMap<QualifiedName, crate::ir::functions::Class>,
        alloc: &IdAllocator,
        callsite_profiles: &IndexMap<InstructionId, DataFlowProfile>,
    ) -> CoreResult<OwnershipOutcome> {
        let mut out = OwnershipOutcome::default();
        let mut constraints: Vec<RecordedConstraint> = Vec::new();

        // External borrows: pinned before any in-function constraint runs.
        for eb in &function.external_borrows {
            out.borrow_map.insert(eb.borrow_id, BorrowKind::External(*eb));
            out.assignments.insert(eb.ownership_var, Ownership::Borrow(eb.borrow_id));
        }

        for block in &function.body.blocks {
            for instr in &block.instructions {
                if instr.kind.is_ctor_constraint_source() {
                    out.assignments
                        .entry(instr.tv_info.ownership_var)
                        .or_insert(Ownership::Owner);
                    continue;
                }

                let InstructionKind::ValueRef { borrow, .. } = &instr.kind else {
                    continue;
                };
                let var = instr.tv_info.ownership_var;
                let final_ownership = Self::resolve_chain(&out, &instr.members);

                let path = instr.value_ref_path().unwrap_or_else(|| {
                    Path::whole(crate::ir::types::TempVar::local(0))
                });
                let mut candidate: IndexSet<Path> = IndexSet::new();
                candidate.insert(path.clone());

                let assigned = match final_ownership {
                    Ownership::Unknown => Ownership::Unknown,
                    Ownership::Owner if *borrow => {
                        if forbidden.conflicts(var, &candidate) {
                            Ownership::Owner
                        } else {
                            let fresh = alloc.next_borrow();
                            out.borrow_map.insert(fresh, BorrowKind::Local(path));
                            Ownership::Borrow(fresh)
                        }
                    }
                    Ownership::Owner => Ownership::Owner,
                    Ownership::Borrow(b) => {
                        if forbidden.conflicts(var, &candidate) {
                            Ownership::Owner
                        } else {
                            match out.assignments.get(&var) {
                                Some(Ownership::Borrow(prev)) if *prev != b => {
                                    let fresh = alloc.next_borrow();
                                    out.borrow_map.merge(fresh, b, *prev);
                                    Ownership::Borrow(fresh)
                                }
                                _ => Ownership::Borrow(b),
                            }
                        }
                    }
                };
                out.assignments.insert(var, assigned);

                constraints.push(RecordedConstraint {
                    instruction_id: instr.id,
                    var,
                    final_ownership,
                    requested_borrow: *borrow,
                });
            }
        }

        // Bullet 3: a retained per-callsite profile's data-flow paths name
        // argument roots this function's own constraint walk above never
        // saw directly (the callee reads them, not this body) — fold each
        // one in as a synthetic `FieldAccessConstraint` so a borrow flowing
        // out of a call's argument into its result is still visible to the
        // clone decision below. No forbidden-borrow check runs here: a
        // synthetic constraint has no candidate `Path` of its own to check
        // against (the access happened inside the callee), so the check
        // would either always pass or always fail depending on what we
        // made up for it.
        for (call_id, profile) in callsite_profiles {
            let call_var = function.body.instruction(*call_id).tv_info.ownership_var;
            for path in &profile.paths {
                let final_ownership = Self::resolve_chain(&out, &path.src);
                let Ownership::Borrow(b) = final_ownership else {
                    continue;
                };
                let assigned = match out.assignments.get(&call_var) {
                    Some(Ownership::Borrow(prev)) if *prev != b => {
                        let fresh = alloc.next_borrow();
                        out.borrow_map.merge(fresh, b, *prev);
                        Ownership::Borrow(fresh)
                    }
                    _ => Ownership::Borrow(b),
                };
                out.assignments.insert(call_var, assigned);
                constraints.push(RecordedConstraint {
                    instruction_id: *call_id,
                    var: call_var,
                    final_ownership,
                    requested_borrow: false,
                });
            }
        }

        for c in &constraints {
            let assigned = out.resolve(c.var);
            let needs_clone = match (c.final_ownership, assigned) {
                (Ownership::Owner, Ownership::Owner) => c.requested_borrow,
                (Ownership::Borrow(_), Ownership::Owner) => true,
                _ => false,
            };
            if !needs_clone {
                continue;
            }
            if let Some(class_name) = function.body.instruction(c.instruction_id).ty.as_ref() {
                if let Some(class) = classes.get(class_name) {
                    if !class.derives_clone {
                        return Err(CoreError::CloneRequired {
                            function: function.name.clone(),
                            site: c.instruction_id,
                            class_name: class_name.clone(),
                        });
                    }
                }
            }
            out.clone_sites.insert(c.instruction_id);
        }

        Ok(out)
    }

    /// Step 1-2 of the `FieldAccessConstraint` rule: walk the member chain
    /// root-first (`members` is recorded leaf-out, so iterate in reverse)
    /// and stop at the first non-`Owner` parent.
    fn resolve_chain(out: &OwnershipOutcome, members: &[MemberInfo]) -> Ownership {
        for m in members.iter().rev() {
            match out.resolve(m.info.ownership_var) {
                Ownership::Owner => continue,
                other => return other,
            }
        }
        Ownership::Owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::build_identity_function;
    use indexmap::IndexMap;

    #[test]
    fn identity_function_pins_everything_to_owner() {
        let alloc = IdAllocator::new();
        let f = build_identity_function(QualifiedName::function("m", "f"), &alloc);
        let forbidden = ForbiddenBorrows::new();
        let classes = IndexMap::new();
        let callsite_profiles = IndexMap::new();
        let outcome =
            OwnershipInferenceEngine::analyze(&f, &forbidden, &classes, &alloc, &callsite_profiles).unwrap();
        assert_eq!(outcome.resolve(f.args[0].ownership_var), Ownership::Owner);
        assert!(outcome.clone_sites.is_empty());
    }

    #[test]
    fn external_borrow_is_pinned_before_any_constraint_runs() {
        let alloc = IdAllocator::new();
        let mut f = build_identity_function(QualifiedName::function("m", "g"), &alloc);
        let borrow_id = alloc.next_borrow();
        f.external_borrows.push(crate::ir::types::ExternalBorrow {
            ownership_var: f.args[0].ownership_var,
            borrow_id,
        });
        let forbidden = ForbiddenBorrows::new();
        let classes = IndexMap::new();
        let callsite_profiles = IndexMap::new();
        let outcome =
            OwnershipInferenceEngine::analyze(&f, &forbidden, &classes, &alloc, &callsite_profiles).unwrap();
        assert_eq!(
            outcome.resolve(f.args[0].ownership_var),
            Ownership::Borrow(borrow_id)
        );
    }
}
