//! Component J — the normalizer.
//!
//! Canonicalizes a published signature so that two call sites producing the
//! same shape compare and hash equal: selects the members relevant to the
//! caller (those resolved `Borrow`, plus `Owner` ones too when
//! `only_borrow` is `false`), then renumbers every ownership var, group
//! var, and borrow ID in first-use order (args, members, result, borrows).
//!
//! Grounded on `semantic_graph::analysis::lifetime_solver`'s union-find
//! renumbering idiom (a local remap table built while walking in a fixed
//! order), repurposed here for plain bijective renumbering rather than
//! outlives-constraint resolution, and on `ir::monomorphize`'s idea of
//! keying a cache entry by a canonical instantiation shape.

use crate::ids::TypeVariableInfo;
use crate::ir::types::{
    ClassInstantiationSignature, DataFlowPath, DataFlowProfile, ExternalBorrow,
    FunctionOwnershipSignature, MemberInfo,
};
use crate::semantic_graph::analysis::ownership_analyzer::OwnershipOutcome;
use crate::semantic_graph::ownership_graph::Ownership;
use crate::tast::id_types::{BorrowId, GroupVar, IdType, OwnershipVar};
use indexmap::IndexMap;

/// First-use renumbering table, shared across a signature and (when
/// present) its data-flow paths so both stay consistent under the same
/// remap.
#[derive(Debug, Default)]
struct RenumberTable {
    ownership: IndexMap<OwnershipVar, OwnershipVar>,
    group: IndexMap<GroupVar, GroupVar>,
    borrow: IndexMap<BorrowId, BorrowId>,
}

impl RenumberTable {
    fn ownership(&mut self, v: OwnershipVar) -> OwnershipVar {
        let next = self.ownership.len() as u32;
        *self
            .ownership
            .entry(v)
            .or_insert_with(|| OwnershipVar::from_raw(next))
    }

    fn group(&mut self, v: GroupVar) -> GroupVar {
        let next = self.group.len() as u32;
        *self.group.entry(v).or_insert_with(|| GroupVar::from_raw(next))
    }

    fn borrow(&mut self, v: BorrowId) -> BorrowId {
        let next = self.borrow.len() as u32;
        *self.borrow.entry(v).or_insert_with(|| BorrowId::from_raw(next))
    }

    fn tvi(&mut self, tv: TypeVariableInfo) -> TypeVariableInfo {
        TypeVariableInfo::new(self.ownership(tv.ownership_var), self.group(tv.group_var))
    }

    fn member(&mut self, m: MemberInfo) -> MemberInfo {
        MemberInfo::new(self.group(m.root), m.field_index, self.tvi(m.info))
    }

    fn external_borrow(&mut self, eb: ExternalBorrow) -> ExternalBorrow {
        ExternalBorrow {
            ownership_var: self.ownership(eb.ownership_var),
            borrow_id: self.borrow(eb.borrow_id),
        }
    }
}

pub struct Normalizer;

impl Normalizer {
    /// Selects relevant members then renumbers `sig` against a fresh
    /// table walked in arg/member/result/borrow order.
    pub fn normalize_function_signature(
        sig: &FunctionOwnershipSignature,
        outcome: &OwnershipOutcome,
        only_borrow: bool,
    ) -> FunctionOwnershipSignature {
        let mut table = RenumberTable::default();
        Self::normalize_signature_with(sig, outcome, only_borrow, &mut table)
    }

    /// Normalizes a profile's signature and its data-flow paths under one
    /// shared table, so `path.arg`/`path.result` remain the *same* vars as
    /// `signature.args`/`signature.result` after renumbering.
    pub fn normalize_function_profile(
        profile: &DataFlowProfile,
        outcome: &OwnershipOutcome,
        only_borrow: bool,
    ) -> DataFlowProfile {
        let mut table = RenumberTable::default();
        let signature =
            Self::normalize_signature_with(&profile.signature, outcome, only_borrow, &mut table);
        let paths = profile
            .paths
            .iter()
            .map(|p| DataFlowPath {
                arg: table.tvi(p.arg),
                result: table.tvi(p.result),
                index: p.index,
                src: p.src.iter().map(|m| table.member(*m)).collect(),
                dest: p.dest.iter().map(|m| table.member(*m)).collect(),
            })
            .collect();
        DataFlowProfile { paths, signature }
    }

    pub fn normalize_class_signature(sig: &ClassInstantiationSignature) -> ClassInstantiationSignature {
        let mut table = RenumberTable::default();
        let root = table.tvi(sig.root);
        let members = Self::sorted_deduped(&sig.members)
            .into_iter()
            .map(|m| table.member(m))
            .collect();
        let borrows = sig.borrows.iter().map(|b| table.external_borrow(*b)).collect();
        ClassInstantiationSignature {
            name: sig.name.clone(),
            root,
            members,
            borrows,
        }
    }

    fn normalize_signature_with(
        sig: &FunctionOwnershipSignature,
        outcome: &OwnershipOutcome,
        only_borrow: bool,
        table: &mut RenumberTable,
    ) -> FunctionOwnershipSignature {
        let args: Vec<TypeVariableInfo> = sig.args.iter().map(|a| table.tvi(*a)).collect();

        let relevant = Self::relevant_members(&sig.members, outcome, only_borrow);
        let members: Vec<MemberInfo> = Self::sorted_deduped(&relevant)
            .into_iter()
            .map(|m| table.member(m))
            .collect();

        let result = table.tvi(sig.result);
        let borrows: Vec<ExternalBorrow> =
            sig.borrows.iter().map(|b| table.external_borrow(*b)).collect();
        let owners: Vec<OwnershipVar> = sig.owners.iter().map(|o| table.ownership(*o)).collect();

        FunctionOwnershipSignature {
            name: sig.name.clone(),
            args,
            result,
            members,
            borrows,
            owners,
        }
    }

    /// Step 1 of §4.J: keep a member iff its own ownership var resolves to
    /// `Borrow` (always kept) or to `Owner` (kept only when `only_borrow`
    /// is `false`). A member resolved `Unknown` — never revisited past this
    /// component's single-pass simplification — is dropped either way.
    fn relevant_members(
        members: &[MemberInfo],
        outcome: &OwnershipOutcome,
        only_borrow: bool,
    ) -> Vec<MemberInfo> {
        members
            .iter()
            .filter(|m| match outcome.resolve(m.info.ownership_var) {
                Ownership::Borrow(_) => true,
                Ownership::Owner => !only_borrow,
                Ownership::Unknown => false,
            })
            .copied()
            .collect()
    }

    /// Depth-first, field-index-sorted, deduplicated by `(root, field_index)`.
    fn sorted_deduped(members: &[MemberInfo]) -> Vec<MemberInfo> {
        let mut out: Vec<MemberInfo> = Vec::new();
        let mut seen = IndexMap::new();
        let mut sorted = members.to_vec();
        sorted.sort_by_key(|m| (m.root.as_raw(), m.field_index));
        for m in sorted {
            if seen.insert(m.key(), ()).is_none() {
                out.push(m);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::QualifiedName;

    fn tvi(o: u32, g: u32) -> TypeVariableInfo {
        TypeVariableInfo::new(OwnershipVar::from_raw(o), GroupVar::from_raw(g))
    }

    #[test]
    fn two_signatures_with_different_raw_ids_but_same_shape_normalize_equal() {
        let outcome = OwnershipOutcome::default();
        let sig_a = FunctionOwnershipSignature::new(
            QualifiedName::function("m", "f"),
            vec![tvi(5, 5)],
            tvi(6, 6),
        );
        let sig_b = FunctionOwnershipSignature::new(
            QualifiedName::function("m", "f"),
            vec![tvi(100, 100)],
            tvi(101, 101),
        );
        let norm_a = Normalizer::normalize_function_signature(&sig_a, &outcome, false);
        let norm_b = Normalizer::normalize_function_signature(&sig_b, &outcome, false);
        assert_eq!(norm_a, norm_b);
    }

    #[test]
    fn only_borrow_drops_owner_resolved_members() {
        let mut outcome = OwnershipOutcome::default();
        let owner_var = OwnershipVar::from_raw(1);
        let borrow_var = OwnershipVar::from_raw(2);
        outcome.assignments.insert(owner_var, Ownership::Owner);
        outcome
            .assignments
            .insert(borrow_var, Ownership::Borrow(crate::tast::id_types::BorrowId::from_raw(0)));

        let root = GroupVar::from_raw(0);
        let members = vec![
            MemberInfo::new(root, 0, TypeVariableInfo::new(owner_var, GroupVar::from_raw(1))),
            MemberInfo::new(root, 1, TypeVariableInfo::new(borrow_var, GroupVar::from_raw(2))),
        ];
        let mut sig = FunctionOwnershipSignature::new(
            QualifiedName::function("m", "f"),
            vec![],
            tvi(9, 9),
        );
        sig.members = members;

        let normalized = Normalizer::normalize_function_signature(&sig, &outcome, true);
        assert_eq!(normalized.members.len(), 1);
    }
}
