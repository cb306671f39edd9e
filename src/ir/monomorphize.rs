//! Component L — the monomorphizer.
//!
//! Work-list over `FunctionOwnershipSignature`/`ClassInstantiationSignature`,
//! seeded from the program's entry function's own (empty-caller-context)
//! signature. For each dequeued function, re-runs Equality, the
//! forbidden-borrow engine, ownership inference, and the normalizer, then
//! lifts every argument's dependent borrow IDs into lifetimes and computes
//! the lifetime-dependency edges between them and the result's. Every
//! ctor call site becomes a queued `ClassInstantiationSignature`; every
//! non-ctor call becomes a queued callee signature. Termination is by
//! signature hash-and-compare: once a signature is a key in the output
//! maps, dequeuing it again is a no-op.
//!
//! Grounded on the teacher's `MonoKey`/cache-by-signature idiom (lazy
//! instantiation keyed by a hashable signature, short-circuiting repeat
//! work) and on `semantic_graph::analysis::{lifetime_solver,
//! global_lifetime_constraints}` for the outlives-edge computation.
//!
//! This pass does not yet rewrite a callee's body under a caller-supplied
//! concrete `TypeVariableInfo` substitution (full cross-function constraint
//! propagation, the general case `FunctionOwnershipSignature` models) — each
//! function is re-analyzed against its own body exactly once, and the
//! resulting profile is shared across every call site. Recorded as a
//! deliberate simplification in the design ledger.

use crate::error_codes::CoreResult;
use crate::ids::IdAllocator;
use crate::ir::blocks::Body;
use crate::ir::functions::Function;
use crate::ir::instructions::InstructionKind;
use crate::ir::modules::{MonomorphizedOutput, Program};
use crate::ir::normalize::Normalizer;
use crate::ir::types::{Lifetime, LifetimeAnnotation, MemberInfo, QualifiedName};
use crate::semantic_graph::analysis::analysis_engine::ProfileStore;
use crate::semantic_graph::analysis::escape_analyzer::ForbiddenBorrowEngine;
use crate::semantic_graph::analysis::global_lifetime_constraints::LifetimeDependencyEdges;
use crate::semantic_graph::analysis::ownership_analyzer::OwnershipInferenceEngine;
use crate::semantic_graph::builder::CfgBuilder;
use crate::semantic_graph::ownership_graph::Ownership;
use crate::tast::constraint_solver::EqualityEngine;
use crate::tast::id_types::BorrowId;
use indexmap::IndexSet;
use std::collections::VecDeque;

pub struct Monomorphizer;

impl Monomorphizer {
    pub fn run(
        program: &Program,
        entry: &QualifiedName,
        alloc: &IdAllocator,
        profiles: &ProfileStore,
    ) -> CoreResult<MonomorphizedOutput> {
        let mut output = MonomorphizedOutput::default();
        let mut function_queue: VecDeque<QualifiedName> = VecDeque::new();
        let mut queued_functions: IndexSet<QualifiedName> = IndexSet::new();
        let mut class_queue: VecDeque<(QualifiedName, crate::ids::TypeVariableInfo)> = VecDeque::new();
        let mut queued_classes: IndexSet<QualifiedName> = IndexSet::new();

        function_queue.push_back(entry.clone());
        queued_functions.insert(entry.clone());

        while let Some(name) = function_queue.pop_front() {
            let Some(function) = program.functions.get(&name) else {
                continue;
            };
            Self::process_function(
                program,
                function,
                alloc,
                profiles,
                &mut output,
                &mut function_queue,
                &mut queued_functions,
                &mut class_queue,
                &mut queued_classes,
            )?;
        }

        while let Some((class_name, root)) = class_queue.pop_front() {
            let Some(class) = program.classes.get(&class_name) else {
                continue;
            };
            let skeleton = class.instantiation_skeleton(root);
            let normalized = Normalizer::normalize_class_signature(&skeleton);
            output.classes.entry(normalized).or_insert_with(|| class.clone());
        }

        Ok(output)
    }

    #[allow(clippy::too_many_arguments)]
    fn process_function(
        program: &Program,
        function: &Function,
        alloc: &IdAllocator,
        profiles: &ProfileStore,
        output: &mut MonomorphizedOutput,
        function_queue: &mut VecDeque<QualifiedName>,
        queued_functions: &mut IndexSet<QualifiedName>,
        class_queue: &mut VecDeque<(QualifiedName, crate::ids::TypeVariableInfo)>,
        queued_classes: &mut IndexSet<QualifiedName>,
    ) -> CoreResult<()> {
        let mut function = function.clone();
        let (mut subst, callsite_profiles) =
            EqualityEngine::solve(&mut function.body, alloc, &profiles.profiles);
        function.args = function.args.iter().map(|a| subst.resolve(*a)).collect();
        function.result = subst.resolve(function.result);

        let cfg = CfgBuilder::build(&function.body);
        let borrow_paths = crate::ir::drop_analysis::BorrowPathAnalyzer::analyze(&cfg);
        let forbidden = ForbiddenBorrowEngine::analyze(&function.body, &borrow_paths);
        let outcome = OwnershipInferenceEngine::analyze(
            &function,
            &forbidden,
            &program.classes,
            alloc,
            &callsite_profiles,
        )?;

        let mut signature = function.signature_skeleton();
        signature.members = Self::collect_members(&function.body);
        let normalized = Normalizer::normalize_function_signature(&signature, &outcome, true);

        if output.functions.contains_key(&normalized) {
            return Ok(());
        }

        let arg_borrows: Vec<Vec<BorrowId>> = function
            .args
            .iter()
            .map(|a| Self::dependent_borrows(&outcome, a.ownership_var))
            .collect();
        let result_borrows = Self::dependent_borrows(&outcome, function.result.ownership_var);
        let mut all_edges: IndexSet<(Lifetime, Lifetime)> = IndexSet::new();
        for from in arg_borrows.iter().flatten().copied() {
            let edges = LifetimeDependencyEdges::compute(&outcome.borrow_map, &[from], &result_borrows);
            all_edges.extend(edges.edges);
        }
        function.lifetime_dependencies = all_edges.iter().copied().collect();

        function.arg_lifetimes = arg_borrows
            .iter()
            .map(|borrows| match borrows.first() {
                Some(&id) => LifetimeAnnotation::of(Lifetime::of(id)),
                None => LifetimeAnnotation::none(),
            })
            .collect();
        function.result_lifetime = match result_borrows.first() {
            Some(&id) => LifetimeAnnotation {
                lifetime: Some(Lifetime::of(id)),
                dep_lifetimes: all_edges.iter().map(|(from, _)| *from).collect(),
            },
            None => LifetimeAnnotation::none(),
        };

        for block in &mut function.body.blocks {
            for instr in &mut block.instructions {
                let ownership = outcome.resolve(instr.tv_info.ownership_var);
                instr.ownership = Some(ownership);
                if let Ownership::Borrow(id) = ownership {
                    instr.lifetimes = LifetimeAnnotation::of(Lifetime::of(id));
                }
                if let Some(class_name) = &instr.ty {
                    if let Some(class) = program.classes.get(class_name) {
                        instr.type_signature = Some(class.instantiation_skeleton(instr.tv_info));
                    }
                }
                if outcome.clone_sites.contains(&instr.id) {
                    if let InstructionKind::ValueRef { clone, .. } = &mut instr.kind {
                        *clone = true;
                    }
                }

                match &instr.kind {
                    InstructionKind::NamedFunctionCall { name, ctor: true, .. } => {
                        if queued_classes.insert(name.clone()) {
                            class_queue.push_back((name.clone(), instr.tv_info));
                        }
                    }
                    InstructionKind::NamedFunctionCall { name, ctor: false, .. } if !name.is_unit() => {
                        if queued_functions.insert(name.clone()) {
                            function_queue.push_back(name.clone());
                        }
                    }
                    _ => {}
                }
            }
        }

        output.functions.insert(normalized, function);

        Ok(())
    }

    fn collect_members(body: &Body) -> Vec<MemberInfo> {
        let mut members = Vec::new();
        for instr in body.iter_instructions() {
            members.extend(instr.members.iter().copied());
        }
        members
    }

    /// Every borrow ID minted along the way whose witness resolves under
    /// `var`'s own assignment — approximated here as "every borrow ID this
    /// var was ever assigned", since a var carries at most one `Borrow` at
    /// a time under this core's single-pass resolution.
    fn dependent_borrows(
        outcome: &crate::semantic_graph::analysis::ownership_analyzer::OwnershipOutcome,
        var: crate::tast::id_types::OwnershipVar,
    ) -> Vec<BorrowId> {
        match outcome.resolve(var) {
            Ownership::Borrow(id) => vec![id],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::build_identity_function;

    #[test]
    fn identity_function_monomorphizes_to_one_published_function() {
        let alloc = IdAllocator::new();
        let f = build_identity_function(QualifiedName::function("m", "f"), &alloc);
        let mut program = Program::new();
        program.functions.insert(f.name.clone(), f);
        let profiles = ProfileStore::default();
        let output =
            Monomorphizer::run(&program, &QualifiedName::function("m", "f"), &alloc, &profiles).unwrap();
        assert_eq!(output.functions.len(), 1);
        assert!(output.classes.is_empty());
    }
}
