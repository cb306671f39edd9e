//! Component K — the data-flow profile store and builder.
//!
//! Walks the call graph's SCCs in leaf-first order, running Equality (F),
//! the data-flow path engine (H), the forbidden-borrow engine (G),
//! ownership inference (I), and the normalizer (J) to publish each
//! function's `DataFlowProfile`, exactly the orchestration §4.K describes.
//!
//! Grounded on the teacher's `AnalysisEngine` (the central orchestrator
//! coordinating lifetime/ownership/escape/dead-code analyses over one set
//! of semantic graphs), generalized from "run N independent analyses over
//! one function" to "run this core's five-stage pipeline per call-graph
//! SCC, bottom-up".
//!
//! A recursive SCC (more than one member, or a direct self-call) is re-run
//! up to `max_iterations` times; because none of this core's stages yet
//! feed a member's already-published profile back into another member's
//! Equality pass (full cross-function group-profile propagation, the
//! general case §4.K describes), every iteration in the current build
//! converges on the first pass. The loop and its safety valve are kept so
//! that future profile-feedback work has somewhere to plug in — documented
//! as a simplification in the design ledger.

use crate::error_codes::{CoreError, CoreResult};
use crate::ids::IdAllocator;
use crate::ir::blocks::Body;
use crate::ir::drop_analysis::BorrowPathAnalyzer;
use crate::ir::functions::Function;
use crate::ir::modules::Program;
use crate::ir::normalize::Normalizer;
use crate::ir::types::{DataFlowProfile, MemberInfo, QualifiedName};
use crate::semantic_graph::analysis::escape_analyzer::ForbiddenBorrowEngine;
use crate::semantic_graph::analysis::ownership_analyzer::OwnershipInferenceEngine;
use crate::semantic_graph::builder::CfgBuilder;
use crate::semantic_graph::call_graph::CallGraph;
use crate::semantic_graph::dfg_builder::DataFlowPathEngine;
use crate::tast::constraint_solver::EqualityEngine;
use indexmap::IndexMap;

pub const DEFAULT_MAX_FIXED_POINT_ITERATIONS: u32 = 10_000;

/// `function name -> published profile`, filled in leaf-first call-graph
/// order.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    pub profiles: IndexMap<QualifiedName, DataFlowProfile>,
    /// When `build_with_limit` last finished populating this store. `None`
    /// for a store nobody has built yet (e.g. a fresh `default()`).
    pub built_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ProfileStore {
    pub fn get(&self, name: &QualifiedName) -> Option<&DataFlowProfile> {
        self.profiles.get(name)
    }
}

pub struct ProfileBuilder;

impl ProfileBuilder {
    pub fn build(program: &Program, alloc: &IdAllocator) -> CoreResult<ProfileStore> {
        Self::build_with_limit(program, alloc, DEFAULT_MAX_FIXED_POINT_ITERATIONS)
    }

    pub fn build_with_limit(
        program: &Program,
        alloc: &IdAllocator,
        max_iterations: u32,
    ) -> CoreResult<ProfileStore> {
        let call_graph = CallGraph::build(program);
        let mut store = ProfileStore::default();

        for scc in &call_graph.sccs {
            let recursive = scc.len() > 1 || scc.iter().any(|n| call_graph.is_recursive(n));
            if recursive {
                Self::build_recursive_group(scc, program, alloc, max_iterations, &mut store)?;
            } else if let Some(name) = scc.first() {
                if let Some(function) = program.functions.get(name) {
                    let profile = Self::build_one(function, program, alloc, false, &store.profiles)?;
                    store.profiles.insert(name.clone(), profile);
                }
            }
        }

        store.built_at = Some(chrono::Utc::now());
        Ok(store)
    }

    fn build_recursive_group(
        group: &[QualifiedName],
        program: &Program,
        alloc: &IdAllocator,
        max_iterations: u32,
        store: &mut ProfileStore,
    ) -> CoreResult<()> {
        let mut previous: IndexMap<QualifiedName, DataFlowProfile> = IndexMap::new();
        let mut iterations: u32 = 0;

        loop {
            iterations += 1;
            if iterations > max_iterations {
                debug_assert!(
                    false,
                    "profile builder fixed point did not converge within {max_iterations} iterations"
                );
                return Err(CoreError::ConvergenceFailure {
                    stage: "profile_builder_scc_fixed_point",
                    function: group.first().cloned().unwrap_or_else(QualifiedName::unit),
                    max_iterations,
                });
            }

            // Cross-SCC callees come from `store`; in-SCC callees come from
            // the previous iteration's round — a member calling a peer sees
            // that peer's last-published profile, not nothing, from the
            // second iteration on.
            let mut visible = store.profiles.clone();
            visible.extend(previous.iter().map(|(k, v)| (k.clone(), v.clone())));

            let mut current: IndexMap<QualifiedName, DataFlowProfile> = IndexMap::new();
            for name in group {
                if let Some(function) = program.functions.get(name) {
                    let profile = Self::build_one(function, program, alloc, false, &visible)?;
                    current.insert(name.clone(), profile);
                }
            }

            let stable = group.iter().all(|name| match (previous.get(name), current.get(name)) {
                (Some(a), Some(b)) => a.signature == b.signature,
                (None, None) => true,
                _ => false,
            });

            previous = current;
            if stable {
                break;
            }
        }

        for (name, profile) in previous {
            store.profiles.insert(name, profile);
        }
        Ok(())
    }

    fn build_one(
        function: &Function,
        program: &Program,
        alloc: &IdAllocator,
        only_borrow: bool,
        profiles: &IndexMap<QualifiedName, DataFlowProfile>,
    ) -> CoreResult<DataFlowProfile> {
        let mut function = function.clone();
        let (mut subst, callsite_profiles) = EqualityEngine::solve(&mut function.body, alloc, profiles);
        function.args = function.args.iter().map(|a| subst.resolve(*a)).collect();
        function.result = subst.resolve(function.result);

        let cfg = CfgBuilder::build(&function.body);
        let borrow_paths = BorrowPathAnalyzer::analyze(&cfg);
        let forbidden = ForbiddenBorrowEngine::analyze(&function.body, &borrow_paths);
        let paths = DataFlowPathEngine::analyze(&function);
        let outcome = OwnershipInferenceEngine::analyze(
            &function,
            &forbidden,
            &program.classes,
            alloc,
            &callsite_profiles,
        )?;

        let mut signature = function.signature_skeleton();
        signature.members = Self::collect_members(&function.body);
        let profile = DataFlowProfile { paths, signature };

        Ok(Normalizer::normalize_function_profile(&profile, &outcome, only_borrow))
    }

    fn collect_members(body: &Body) -> Vec<MemberInfo> {
        let mut members = Vec::new();
        for instr in body.iter_instructions() {
            members.extend(instr.members.iter().copied());
        }
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::build_identity_function;

    #[test]
    fn single_function_program_publishes_one_profile() {
        let alloc = IdAllocator::new();
        let f = build_identity_function(QualifiedName::function("m", "f"), &alloc);
        let mut program = Program::new();
        program.functions.insert(f.name.clone(), f);
        let store = ProfileBuilder::build(&program, &alloc).unwrap();
        assert!(store.get(&QualifiedName::function("m", "f")).is_some());
    }
}
