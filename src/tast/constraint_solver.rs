//! Component F — the equality engine: a union-find substitution over
//! `OwnershipVar`/`GroupVar` slots, plus the pass that walks a `Body` and
//! unifies the slots an instruction's semantics require to agree.
//!
//! Grounded on the teacher's `UnificationTable` (path compression + union by
//! rank over a `parents`/`ranks` map), generalized from a single
//! `UnificationVar` space to the two independent id spaces the ownership
//! model tracks (an ownership slot and its aliasing group are unified
//! separately — two values can share a group without sharing an ownership
//! decision, e.g. two borrows of the same root).

use crate::ids::{IdAllocator, TypeVariableInfo};
use crate::ir::blocks::Body;
use crate::ir::instructions::{Instruction, InstructionId, InstructionKind};
use crate::ir::types::{DataFlowProfile, ExternalBorrow, MemberInfo, QualifiedName, TempVar};
use crate::tast::id_types::{collections::IdMap, GroupVar, IdType, OwnershipVar};
use indexmap::IndexMap;

/// Union-find over one id space, with path compression and union by rank.
/// Generic so it backs both the ownership-var and group-var substitutions
/// with the same code.
#[derive(Debug, Clone, Default)]
pub struct Substitution<T: IdType> {
    parent: IdMap<T, T>,
    rank: IdMap<T, u32>,
}

impl<T: IdType> Substitution<T> {
    pub fn new() -> Self {
        Self {
            parent: IdMap::default(),
            rank: IdMap::default(),
        }
    }

    fn ensure(&mut self, var: T) {
        self.parent.entry(var).or_insert(var);
        self.rank.entry(var).or_insert(0);
    }

    /// Finds the canonical representative of `var`'s equivalence class,
    /// compressing the path as it walks up.
    pub fn find(&mut self, var: T) -> T {
        self.ensure(var);
        let parent = self.parent[&var];
        if parent == var {
            var
        } else {
            let root = self.find(parent);
            self.parent.insert(var, root);
            root
        }
    }

    /// Unifies `a` and `b`'s equivalence classes. Returns `false` if they
    /// were already the same class.
    pub fn union(&mut self, a: T, b: T) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return false;
        }
        let rank_a = self.rank[&root_a];
        let rank_b = self.rank[&root_b];
        if rank_a < rank_b {
            self.parent.insert(root_a, root_b);
        } else if rank_a > rank_b {
            self.parent.insert(root_b, root_a);
        } else {
            self.parent.insert(root_b, root_a);
            self.rank.insert(root_a, rank_a + 1);
        }
        true
    }

    pub fn same_class(&mut self, a: T, b: T) -> bool {
        self.find(a) == self.find(b)
    }
}

/// The joint substitution over both id spaces a `TypeVariableInfo` carries.
#[derive(Debug, Clone, Default)]
pub struct TypeVarSubstitution {
    pub ownership: Substitution<OwnershipVar>,
    pub group: Substitution<GroupVar>,
}

impl TypeVarSubstitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unify(&mut self, a: TypeVariableInfo, b: TypeVariableInfo) {
        self.ownership.union(a.ownership_var, b.ownership_var);
        self.group.union(a.group_var, b.group_var);
    }

    /// Canonical `(ownership_var, group_var)` pair for `tv` under the
    /// current substitution.
    pub fn resolve(&mut self, tv: TypeVariableInfo) -> TypeVariableInfo {
        TypeVariableInfo {
            ownership_var: self.ownership.find(tv.ownership_var),
            group_var: self.group.find(tv.group_var),
        }
    }
}

/// Walks a function body's instructions, running the four-phase pass §4.F
/// describes:
///
/// - **Initialize**: emits the `MemberInfo` chain a field-access `ValueRef`
///   or a constructor call implies (every instruction already carries its
///   own `TypeVariableInfo`, allocated at construction time).
/// - **Merge**: unifies the slots an instruction's semantics require to
///   agree — a `Bind` site and the instruction it names, a whole-value
///   `ValueRef` and the binding it reads, a ctor call's argument slots and
///   its emitted members, a non-ctor call's argument/result slots against a
///   freshly instantiated copy of the callee's published profile, an `If`'s
///   two arms, a `BlockRef`'s target, and a loop's carried variable across
///   its `init` and per-iteration `var` slots.
/// - **Member merge**: a fixed point over every `(root, field_index)` key
///   across every instruction's members and every retained per-callsite
///   profile's signature members, unifying every slot that lands in the
///   same bucket.
/// - **Finalize**: rewrites every instruction's `tv_info`/`members` and
///   every retained profile's signature/paths under the resulting
///   substitution, so downstream passes (G, H, I, J) see already-canonical
///   slots.
///
/// Grounded on the teacher's multi-pass unification driver (seed then walk
/// to a fixed point over a mutable IR), generalized from one flat constraint
/// list to this core's body-shaped, member-chain-aware constraint set.
pub struct EqualityEngine;

impl EqualityEngine {
    /// `profiles` is every callee profile already published and available to
    /// this call (the call-graph's leaf-first order guarantees a non-
    /// recursive callee is always present; a profile missing here for a
    /// call this body actually makes is simply skipped — it is either an
    /// in-progress recursive peer not yet stable, per the documented
    /// simplification in `analysis_engine`, or a caller invoking `solve`
    /// without threading a store at all).
    ///
    /// Returns the substitution (already applied to `body` by Finalize) and
    /// the per-callsite instantiated profile retained for every non-ctor
    /// `NamedFunctionCall`, keyed by that call's own `InstructionId` — the
    /// input Component I's synthetic `FieldAccessConstraint`s (§4.I bullet
    /// 3) are built from.
    pub fn solve(
        body: &mut Body,
        alloc: &IdAllocator,
        profiles: &IndexMap<QualifiedName, DataFlowProfile>,
    ) -> (TypeVarSubstitution, IndexMap<InstructionId, DataFlowProfile>) {
        let mut subst = TypeVarSubstitution::new();
        let mut callsite_profiles: IndexMap<InstructionId, DataFlowProfile> = IndexMap::new();

        Self::initialize(body, alloc);
        Self::merge(body, alloc, profiles, &mut subst, &mut callsite_profiles);
        Self::member_merge_fixed_point(body, &callsite_profiles, &mut subst);
        Self::finalize(body, &mut subst, &mut callsite_profiles);

        (subst, callsite_profiles)
    }

    /// Emits the `MemberInfo`s a field-access `ValueRef` or a ctor call
    /// implies. Every other instruction's `members` stays empty — nothing
    /// else projects or constructs a field.
    fn initialize(body: &mut Body, alloc: &IdAllocator) {
        for block in &mut body.blocks {
            for instr in &mut block.instructions {
                match &instr.kind {
                    InstructionKind::ValueRef { indices, .. } if !indices.is_empty() => {
                        instr.members = Self::field_chain(indices, instr.tv_info, alloc);
                    }
                    InstructionKind::NamedFunctionCall { name, ctor: true, args } => {
                        instr.ty = Some(name.clone());
                        instr.members = args
                            .iter()
                            .enumerate()
                            .map(|(i, _)| MemberInfo::new(instr.tv_info.group_var, i as u32, alloc.next_tvi()))
                            .collect();
                    }
                    _ => {}
                }
            }
        }
        // ValueRef/Bind whole-value chains inherit their source's class —
        // a second pass, since the source's `ty` may have been set above in
        // the same sweep but at a later block index.
        for _ in 0..2 {
            let snapshot: Vec<(InstructionId, Option<QualifiedName>)> = body
                .iter_instructions()
                .map(|i| (i.id, Self::inherited_ty(body, i)))
                .collect();
            for (id, ty) in snapshot {
                if ty.is_some() {
                    body.instruction_mut(id).ty = ty;
                }
            }
        }
    }

    fn inherited_ty(body: &Body, instr: &Instruction) -> Option<QualifiedName> {
        if instr.ty.is_some() {
            return instr.ty.clone();
        }
        match &instr.kind {
            InstructionKind::Bind { rhs, .. } => body.instruction(*rhs).ty.clone(),
            InstructionKind::ValueRef { bind_id, fields, .. } if fields.is_empty() => {
                body.instruction(*bind_id).ty.clone()
            }
            _ => None,
        }
    }

    /// One `MemberInfo` per field level, root-first: level 0 is rooted at
    /// `bind_id`'s own group var, the terminal level's `info` is the
    /// instruction's own `tv_info` (binding the projection's result to it).
    /// Stored leaf-first (reversed) so `ownership_analyzer::resolve_chain`'s
    /// existing root-first walk (`members.iter().rev()`) is correct.
    fn field_chain(
        indices: &[u32],
        own_tvi: TypeVariableInfo,
        alloc: &IdAllocator,
    ) -> Vec<MemberInfo> {
        // The root of level 0 is filled in once `merge` resolves `bind_id`'s
        // live group var; a placeholder keeps this pass a pure function of
        // the field-index shape.
        let mut chain = Vec::with_capacity(indices.len());
        let mut current_root_placeholder = GroupVar::invalid();
        for (level, &field_index) in indices.iter().enumerate() {
            let info = if level + 1 == indices.len() {
                own_tvi
            } else {
                alloc.next_tvi()
            };
            chain.push(MemberInfo::new(current_root_placeholder, field_index, info));
            current_root_placeholder = info.group_var;
        }
        chain.reverse();
        chain
    }

    /// Single forward pass over every block (If/Loop arms are just other
    /// blocks in the same flat `body.blocks`, already reachable this way —
    /// no separate structural recursion needed).
    fn merge(
        body: &mut Body,
        alloc: &IdAllocator,
        profiles: &IndexMap<QualifiedName, DataFlowProfile>,
        subst: &mut TypeVarSubstitution,
        callsite_profiles: &mut IndexMap<InstructionId, DataFlowProfile>,
    ) {
        // Field-chain roots are resolved here (not in `initialize`) because
        // the root group var is the *current* group var of `bind_id`'s
        // instruction, which Merge may still go on to unify further.
        let ids: Vec<InstructionId> = body.iter_instructions().map(|i| i.id).collect();
        for id in &ids {
            let kind = body.instruction(*id).kind.clone();
            match kind {
                InstructionKind::ValueRef { bind_id, indices, .. } if !indices.is_empty() => {
                    let root_group = body.instruction(bind_id).tv_info.group_var;
                    if let Some(first) = body.instruction_mut(*id).members.first_mut() {
                        first.root = root_group;
                    }
                }
                InstructionKind::Bind { rhs, .. } => {
                    let rhs_tvi = body.instruction(rhs).tv_info;
                    subst.unify(body.instruction(*id).tv_info, rhs_tvi);
                }
                InstructionKind::ValueRef { bind_id, fields, .. } if fields.is_empty() => {
                    let bind_tvi = body.instruction(bind_id).tv_info;
                    subst.unify(body.instruction(*id).tv_info, bind_tvi);
                }
                InstructionKind::NamedFunctionCall { ctor: true, args, .. } => {
                    let members = body.instruction(*id).members.clone();
                    for (i, arg) in args.iter().enumerate() {
                        if let (Some(member), Some(arg_instr)) = (members.get(i), Self::find_binding(body, arg)) {
                            subst.unify(arg_instr, member.info);
                        }
                    }
                }
                InstructionKind::NamedFunctionCall { name, ctor: false, args } if !name.is_unit() => {
                    let Some(profile) = profiles.get(&name) else {
                        continue;
                    };
                    let instantiated = Self::instantiate_profile(profile, alloc);
                    let own_tvi = body.instruction(*id).tv_info;
                    for (i, arg) in args.iter().enumerate() {
                        if let (Some(&callee_arg), Some(arg_instr)) =
                            (instantiated.signature.args.get(i), Self::find_binding(body, arg))
                        {
                            subst.unify(arg_instr, callee_arg);
                        }
                    }
                    subst.unify(own_tvi, instantiated.signature.result);
                    for path in &instantiated.paths {
                        if let Some(arg_var) = args.get(path.index).and_then(|a| Self::find_binding(body, a)) {
                            subst.unify(arg_var, path.arg);
                        }
                        subst.unify(own_tvi, path.result);
                    }
                    callsite_profiles.insert(*id, instantiated);
                }
                InstructionKind::If { true_branch, false_branch, .. } => {
                    let own_tvi = body.instruction(*id).tv_info;
                    if let Some(t) = body.block(true_branch).last_real().map(|i| i.tv_info) {
                        subst.unify(own_tvi, t);
                    }
                    if let Some(f) = body.block(false_branch).last_real().map(|i| i.tv_info) {
                        subst.unify(own_tvi, f);
                    }
                }
                InstructionKind::BlockRef { block } => {
                    let own_tvi = body.instruction(*id).tv_info;
                    if let Some(target) = body.block(block).last_real().map(|i| i.tv_info) {
                        subst.unify(own_tvi, target);
                    }
                }
                InstructionKind::Loop { var, init, .. } => {
                    if let (Some(v), Some(i)) = (Self::find_binding(body, &var), Self::find_binding(body, &init)) {
                        subst.unify(v, i);
                    }
                }
                _ => {}
            }
        }
    }

    /// Fixed point over every `(root, field_index)` bucket visible to this
    /// call: each instruction's own `members` plus every retained
    /// per-callsite profile's signature members. Repeats until a pass
    /// unifies nothing new.
    fn member_merge_fixed_point(
        body: &Body,
        callsite_profiles: &IndexMap<InstructionId, DataFlowProfile>,
        subst: &mut TypeVarSubstitution,
    ) {
        loop {
            let extra: Vec<&[MemberInfo]> = callsite_profiles
                .values()
                .map(|p| p.signature.members.as_slice())
                .collect();
            let mut buckets: IndexMap<(GroupVar, u32), Vec<TypeVariableInfo>> = IndexMap::new();
            for m in body.all_members(&extra) {
                let root = subst.group.find(m.root);
                buckets.entry((root, m.field_index)).or_default().push(m.info);
            }

            let mut changed = false;
            for infos in buckets.values() {
                for info in infos.iter().skip(1) {
                    let o = subst.ownership.union(infos[0].ownership_var, info.ownership_var);
                    let g = subst.group.union(infos[0].group_var, info.group_var);
                    changed |= o || g;
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// Rewrites every instruction's `tv_info`/`members` and every retained
    /// profile's signature/paths under the final substitution.
    fn finalize(
        body: &mut Body,
        subst: &mut TypeVarSubstitution,
        callsite_profiles: &mut IndexMap<InstructionId, DataFlowProfile>,
    ) {
        for block in &mut body.blocks {
            for instr in &mut block.instructions {
                instr.tv_info = subst.resolve(instr.tv_info);
                for m in &mut instr.members {
                    m.root = subst.group.find(m.root);
                    m.info = subst.resolve(m.info);
                }
            }
        }
        for profile in callsite_profiles.values_mut() {
            profile.signature.args = profile.signature.args.iter().map(|a| subst.resolve(*a)).collect();
            profile.signature.result = subst.resolve(profile.signature.result);
            profile.signature.members = profile
                .signature
                .members
                .iter()
                .map(|m| MemberInfo::new(subst.group.find(m.root), m.field_index, subst.resolve(m.info)))
                .collect();
            for p in &mut profile.paths {
                p.arg = subst.resolve(p.arg);
                p.result = subst.resolve(p.result);
            }
        }
    }

    fn find_binding(body: &Body, var: &TempVar) -> Option<TypeVariableInfo> {
        body.iter_instructions()
            .find(|i| match &i.kind {
                InstructionKind::Bind { name, .. } => name == var,
                InstructionKind::ValueRef { name, .. } => name == var,
                _ => false,
            })
            .map(|i| i.tv_info)
    }

    /// Deep-copies a published profile into the caller's allocator space:
    /// every `OwnershipVar`/`GroupVar` it mentions is replaced by a fresh
    /// one, consistently, so unifying the copy against the call site never
    /// leaks into the callee's own published signature.
    fn instantiate_profile(profile: &DataFlowProfile, alloc: &IdAllocator) -> DataFlowProfile {
        let mut omap: IdMap<OwnershipVar, OwnershipVar> = IdMap::default();
        let mut gmap: IdMap<GroupVar, GroupVar> = IdMap::default();

        let args = profile
            .signature
            .args
            .iter()
            .map(|a| Self::remap_tvi(*a, &mut omap, &mut gmap, alloc))
            .collect();
        let result = Self::remap_tvi(profile.signature.result, &mut omap, &mut gmap, alloc);
        let members = profile
            .signature
            .members
            .iter()
            .map(|m| Self::remap_member(m, &mut omap, &mut gmap, alloc))
            .collect();
        let borrows: Vec<ExternalBorrow> = profile
            .signature
            .borrows
            .iter()
            .map(|b| ExternalBorrow {
                ownership_var: *omap.entry(b.ownership_var).or_insert_with(|| alloc.next_ownership()),
                borrow_id: b.borrow_id,
            })
            .collect();
        let owners = profile
            .signature
            .owners
            .iter()
            .map(|o| *omap.entry(*o).or_insert_with(|| alloc.next_ownership()))
            .collect();

        let mut signature = crate::ir::types::FunctionOwnershipSignature::new(
            profile.signature.name.clone(),
            args,
            result,
        );
        signature.members = members;
        signature.borrows = borrows;
        signature.owners = owners;

        let paths = profile
            .paths
            .iter()
            .map(|p| crate::ir::types::DataFlowPath {
                arg: Self::remap_tvi(p.arg, &mut omap, &mut gmap, alloc),
                result: Self::remap_tvi(p.result, &mut omap, &mut gmap, alloc),
                index: p.index,
                src: p
                    .src
                    .iter()
                    .map(|m| Self::remap_member(m, &mut omap, &mut gmap, alloc))
                    .collect(),
                dest: p
                    .dest
                    .iter()
                    .map(|m| Self::remap_member(m, &mut omap, &mut gmap, alloc))
                    .collect(),
            })
            .collect();

        DataFlowProfile { paths, signature }
    }

    fn remap_group(
        g: GroupVar,
        gmap: &mut IdMap<GroupVar, GroupVar>,
        alloc: &IdAllocator,
    ) -> GroupVar {
        *gmap.entry(g).or_insert_with(|| alloc.next_group())
    }

    fn remap_tvi(
        tvi: TypeVariableInfo,
        omap: &mut IdMap<OwnershipVar, OwnershipVar>,
        gmap: &mut IdMap<GroupVar, GroupVar>,
        alloc: &IdAllocator,
    ) -> TypeVariableInfo {
        let o = *omap.entry(tvi.ownership_var).or_insert_with(|| alloc.next_ownership());
        let g = Self::remap_group(tvi.group_var, gmap, alloc);
        TypeVariableInfo::new(o, g)
    }

    fn remap_member(
        m: &MemberInfo,
        omap: &mut IdMap<OwnershipVar, OwnershipVar>,
        gmap: &mut IdMap<GroupVar, GroupVar>,
        alloc: &IdAllocator,
    ) -> MemberInfo {
        let root = Self::remap_group(m.root, gmap, alloc);
        let info = Self::remap_tvi(m.info, omap, gmap, alloc);
        MemberInfo::new(root, m.field_index, info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::BodyBuilder;
    use crate::tast::id_types::BorrowId;

    #[test]
    fn union_merges_two_singleton_classes() {
        let mut s: Substitution<OwnershipVar> = Substitution::new();
        let a = OwnershipVar::from_raw(0);
        let b = OwnershipVar::from_raw(1);
        assert!(!s.same_class(a, b));
        assert!(s.union(a, b));
        assert!(s.same_class(a, b));
    }

    #[test]
    fn union_is_idempotent_once_merged() {
        let mut s: Substitution<GroupVar> = Substitution::new();
        let a = GroupVar::from_raw(0);
        let b = GroupVar::from_raw(1);
        s.union(a, b);
        assert!(!s.union(a, b));
    }

    #[test]
    fn find_on_an_unseen_var_returns_itself() {
        let mut s: Substitution<BorrowId> = Substitution::new();
        let a = BorrowId::from_raw(5);
        assert_eq!(s.find(a), a);
    }

    #[test]
    fn transitive_unions_collapse_into_one_class() {
        let mut s: Substitution<OwnershipVar> = Substitution::new();
        let (a, b, c) = (
            OwnershipVar::from_raw(0),
            OwnershipVar::from_raw(1),
            OwnershipVar::from_raw(2),
        );
        s.union(a, b);
        s.union(b, c);
        assert!(s.same_class(a, c));
    }

    #[test]
    fn type_var_substitution_unifies_both_spaces_together() {
        let mut subst = TypeVarSubstitution::new();
        let a = TypeVariableInfo::new(OwnershipVar::from_raw(0), GroupVar::from_raw(0));
        let b = TypeVariableInfo::new(OwnershipVar::from_raw(1), GroupVar::from_raw(1));
        subst.unify(a, b);
        assert_eq!(subst.resolve(a), subst.resolve(b));
    }

    #[test]
    fn bind_and_whole_value_ref_land_in_the_same_class() {
        let alloc = IdAllocator::new();
        let mut b = BodyBuilder::new(&alloc);
        let bind_id = b.push(InstructionKind::Bind {
            name: TempVar::arg(0),
            rhs: InstructionId::new(0, 0),
        });
        let value_ref_id = b.push(InstructionKind::ValueRef {
            name: TempVar::arg(0),
            bind_id,
            fields: vec![],
            indices: vec![],
            borrow: false,
            move_: true,
            clone: false,
        });
        let mut body = b.finish();
        let profiles = IndexMap::new();
        let (_subst, callsites) = EqualityEngine::solve(&mut body, &alloc, &profiles);

        assert!(callsites.is_empty());
        assert_eq!(
            body.instruction(bind_id).tv_info,
            body.instruction(value_ref_id).tv_info
        );
    }

    #[test]
    fn ctor_call_tags_its_class_and_unifies_args_with_members() {
        let alloc = IdAllocator::new();
        let mut b = BodyBuilder::new(&alloc);
        let arg_bind = b.push(InstructionKind::Bind {
            name: TempVar::arg(0),
            rhs: InstructionId::new(0, 0),
        });
        let ctor_id = b.push(InstructionKind::NamedFunctionCall {
            name: QualifiedName::method("m", "Box", "new"),
            ctor: true,
            args: vec![TempVar::arg(0)],
        });
        let mut body = b.finish();
        let profiles = IndexMap::new();
        EqualityEngine::solve(&mut body, &alloc, &profiles);

        let ctor = body.instruction(ctor_id);
        assert_eq!(ctor.ty, Some(QualifiedName::method("m", "Box", "new")));
        assert_eq!(ctor.members.len(), 1);
        assert_eq!(ctor.members[0].info, body.instruction(arg_bind).tv_info);
    }
}
