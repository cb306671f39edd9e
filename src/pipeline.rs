//! §6 external interfaces — the driver a caller embeds.
//!
//! `ResolvedProgram` wraps the already-resolved, already-type-checked input
//! this core receives (§6's "Input to the core"); `MonomorphizedProgram`
//! wraps what it hands to a backend. `Driver` exposes the ordered call
//! sequence from §6's driver contract as individual stages
//! (`build_cfgs`/`analyze_borrow_paths`/`build_profiles`/`monomorphize`)
//! plus a `run_core` convenience chaining them — this is the CLI/test
//! harness entry point into the core, not a general compiler driver: lexing,
//! parsing, type checking, and backend emission happen outside it.
//!
//! Grounded on the teacher's top-level pipeline module (a `Driver` owning
//! each pass and exposing both granular stage methods and a `run`
//! convenience), generalized from a Haxe-source compile pipeline to this
//! core's narrower IR-in/monomorphized-IR-out contract.

use crate::config::InferenceConfig;
use crate::error_codes::{CoreError, CoreResult};
use crate::ids::IdAllocator;
use crate::ir::drop_analysis::BorrowPathAnalyzer;
use crate::ir::instructions::InstructionKind;
use crate::ir::modules::{MonomorphizedOutput, Program};
use crate::ir::monomorphize::Monomorphizer;
use crate::ir::types::QualifiedName;
use crate::semantic_graph::analysis::analysis_engine::{ProfileBuilder, ProfileStore};
use crate::semantic_graph::builder::CfgBuilder;
use crate::semantic_graph::cfg::ControlFlowGraph;
use indexmap::IndexMap;

/// §6's "Input to the core": a resolved, type-checked whole program. A thin
/// wrapper rather than a type alias so the driver's stage methods have a
/// stable, documented entry type independent of `ir::modules::Program`'s own
/// shape.
#[derive(Debug, Clone, Default)]
pub struct ResolvedProgram {
    pub program: Program,
}

impl ResolvedProgram {
    pub fn new(program: Program) -> Self {
        Self { program }
    }
}

/// §6's "Output to the backend": functions and classes keyed by the concrete
/// ownership signature they were monomorphized for.
#[derive(Debug, Clone, Default)]
pub struct MonomorphizedProgram {
    pub output: MonomorphizedOutput,
}

/// Owns the per-run allocator and config; exposes the driver contract's
/// ordered stages plus `run_core` chaining them for entry -> monomorphized
/// output.
pub struct Driver {
    pub alloc: IdAllocator,
    pub config: InferenceConfig,
}

impl Default for Driver {
    fn default() -> Self {
        Self::new(InferenceConfig::default())
    }
}

impl Driver {
    pub fn new(config: InferenceConfig) -> Self {
        Self {
            alloc: IdAllocator::new(),
            config,
        }
    }

    /// Checks every `NamedFunctionCall` in the program against the
    /// functions/classes `resolved` actually defines. A ctor call names a
    /// class; any other call names a function. Run first in `run_core` so
    /// an unresolved name is reported before any analysis pass touches it.
    pub fn validate_names(&self, resolved: &ResolvedProgram) -> CoreResult<()> {
        for function in resolved.program.functions.values() {
            for block in &function.body.blocks {
                for instr in &block.instructions {
                    let InstructionKind::NamedFunctionCall { name, ctor, .. } = &instr.kind else {
                        continue;
                    };
                    if name.is_unit() {
                        continue;
                    }
                    let defined = if *ctor {
                        resolved.program.classes.contains_key(name)
                    } else {
                        resolved.program.functions.contains_key(name)
                    };
                    if !defined {
                        return Err(CoreError::UndefinedName {
                            function: function.name.clone(),
                            site: instr.id,
                            name: name.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Lowers every function's `Body` into a `ControlFlowGraph`, keyed by
    /// function name — Component D, the first step the borrow-path analyzer
    /// (a diagnostic pass per §6) needs.
    pub fn build_cfgs(&self, resolved: &ResolvedProgram) -> IndexMap<QualifiedName, ControlFlowGraph> {
        resolved
            .program
            .functions
            .iter()
            .map(|(name, function)| (name.clone(), CfgBuilder::build(&function.body)))
            .collect()
    }

    /// Runs the borrow-path analyzer (Component E) over every function and
    /// rewrites cancelled drops to `Nop` in place; when
    /// `config.trim_trailing_nops` is set, also trims the resulting trailing
    /// `Nop`s from each block (the resolved Open Question in spec.md §9).
    ///
    /// This is the diagnostic pass §6's driver contract names: it does not
    /// reject a program, only prepares each body for profile building.
    pub fn analyze_borrow_paths(&self, resolved: &mut ResolvedProgram) {
        for function in resolved.program.functions.values_mut() {
            let cfg = CfgBuilder::build(&function.body);
            let outcome = BorrowPathAnalyzer::analyze(&cfg);

            if let Err(violation) = crate::pipeline_validation::check_property_1_total_invalidation(&outcome) {
                log::debug!("{}: property 1 violation: {violation}", function.name);
            }
            if let Err(violation) = crate::pipeline_validation::check_property_2_drop_cancellation_sound(
                &outcome.cancelled_drops,
                &outcome.moves_by_instruction,
            ) {
                log::debug!("{}: property 2 violation: {violation}", function.name);
            }

            for block in &mut function.body.blocks {
                for instr in &mut block.instructions {
                    if outcome.cancelled_drops.contains(&instr.id) {
                        if let InstructionKind::DropVar { cancelled, .. } = &mut instr.kind {
                            *cancelled = true;
                        }
                    }
                }
            }
            function.body.rewrite_cancelled_drops_to_nop();

            if self.config.trim_trailing_nops {
                for block in &mut function.body.blocks {
                    block.trim_trailing_nops();
                }
            }
        }
    }

    /// Component K: runs Equality, the data-flow path engine, the
    /// forbidden-borrow engine, ownership inference, and the normalizer over
    /// every function's call-graph SCC, bottom-up, publishing a
    /// `DataFlowProfile` per function.
    pub fn build_profiles(&self, resolved: &ResolvedProgram) -> CoreResult<ProfileStore> {
        ProfileBuilder::build_with_limit(
            &resolved.program,
            &self.alloc,
            self.config.max_fixed_point_iterations,
        )
    }

    /// Component L: monomorphizes from `entry`, producing the classes and
    /// functions a backend consumes. `profiles` is consulted so a call site's
    /// Equality pass can unify against a callee's already-published signature
    /// instead of leaving the call opaque.
    pub fn monomorphize(
        &self,
        resolved: &ResolvedProgram,
        entry: &QualifiedName,
        profiles: &ProfileStore,
    ) -> CoreResult<MonomorphizedProgram> {
        let output = Monomorphizer::run(&resolved.program, entry, &self.alloc, profiles)?;
        Ok(MonomorphizedProgram { output })
    }

    /// The driver-contract convenience: name validation, borrow-path
    /// analysis, profile building, then monomorphization from `entry`,
    /// threading the built `ProfileStore` through so monomorphization sees
    /// every published callee signature.
    pub fn run_core(
        &self,
        mut resolved: ResolvedProgram,
        entry: &QualifiedName,
    ) -> CoreResult<MonomorphizedProgram> {
        self.validate_names(&resolved)?;
        self.analyze_borrow_paths(&mut resolved);
        let profiles = self.build_profiles(&resolved)?;
        self.monomorphize(&resolved, entry, &profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::build_identity_function;

    #[test]
    fn run_core_on_identity_function_publishes_one_monomorphized_function() {
        let driver = Driver::default();
        let entry = QualifiedName::function("m", "f");
        let f = build_identity_function(entry.clone(), &driver.alloc);
        let mut program = Program::new();
        program.functions.insert(f.name.clone(), f);
        let resolved = ResolvedProgram::new(program);

        let result = driver.run_core(resolved, &entry).unwrap();
        assert_eq!(result.output.functions.len(), 1);
    }

    #[test]
    fn validate_names_rejects_a_call_to_an_undeclared_function() {
        use crate::ir::builder::BodyBuilder;
        use crate::ir::functions::Function;
        use crate::ir::types::TempVar;

        let driver = Driver::default();
        let mut f = Function::new(QualifiedName::function("m", "f"), 0, &driver.alloc);
        let mut b = BodyBuilder::new(&driver.alloc);
        b.push(InstructionKind::NamedFunctionCall {
            name: QualifiedName::function("m", "missing"),
            ctor: false,
            args: vec![],
        });
        b.push(InstructionKind::Return { arg: None::<TempVar> });
        f.body = b.finish();

        let mut program = Program::new();
        program.functions.insert(f.name.clone(), f);
        let resolved = ResolvedProgram::new(program);

        let err = driver.validate_names(&resolved).unwrap_err();
        assert!(matches!(err, crate::error_codes::CoreError::UndefinedName { .. }));
    }

    #[test]
    fn analyze_borrow_paths_cancels_drop_after_a_move() {
        let driver = Driver::default();
        let entry = QualifiedName::function("m", "f");
        let f = build_identity_function(entry, &driver.alloc);
        let mut program = Program::new();
        program.functions.insert(f.name.clone(), f);
        let mut resolved = ResolvedProgram::new(program);

        driver.analyze_borrow_paths(&mut resolved);
        // The identity function has no synthetic DropVar, so no block should
        // end up empty from trimming; this just exercises the stage without
        // panicking and confirms the body is still well-formed.
        let function = resolved.program.functions.values().next().unwrap();
        assert!(!function.body.blocks.is_empty());
    }
}
