//! Component E — the borrow-path analyzer ("borrow checker").
//!
//! Forward worklist dataflow over the CFG: `usages(node) = ⋃ usages(pred) ∪
//! {own_usage(node)}`. After a node's own usage is joined, the analyzer
//! checks it against the pre-join set for invalidation and records each
//! invalidated prior usage into the function-global borrow-site set —
//! unless the current usage is a whole-path drop whose invalidated usage
//! hasn't already been forced into that set, in which case the drop is
//! cancelled instead (the value was already moved; the synthetic drop must
//! not execute).
//!
//! Grounded on the teacher's `DropPointAnalyzer`/`LastUseInfo` last-use
//! tracking, generalized from "last use of a heap variable" to the full
//! `Path`-prefix invalidation rule.

use crate::ir::instructions::InstructionId;
use crate::ir::types::{Path, Usage, UsageSet};
use crate::semantic_graph::cfg::{ControlFlowGraph, NodeKey};
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;

/// What the downstream engines need from the borrow-path analyzer.
#[derive(Debug, Clone, Default)]
pub struct BorrowPathOutcome {
    /// Sites forced to borrow: the owning `ValueRef`'s instruction id.
    pub borrow_sites: IndexSet<InstructionId>,
    /// `DropVar` instructions whose drop never executes.
    pub cancelled_drops: IndexSet<InstructionId>,
    /// Per-instruction: every path witnessed at a predecessor on the way to
    /// that instruction — "the paths already consumed on the way here".
    pub moves_by_instruction: IndexMap<InstructionId, Vec<Path>>,
}

pub struct BorrowPathAnalyzer;

impl BorrowPathAnalyzer {
    /// Runs the dataflow to a fixed point and returns the witness sets.
    /// Termination follows from monotonicity on the finite powerset lattice
    /// of `Usage`s — re-enqueue only happens on a strict set change.
    pub fn analyze(cfg: &ControlFlowGraph) -> BorrowPathOutcome {
        let n = cfg.len();
        let mut usage_sets: Vec<UsageSet<NodeKey>> = vec![IndexSet::new(); n];
        // Every node (not just sources) is queued initially: a node with an
        // empty predecessor contribution still needs to run once to push its
        // own usage onward, even though its own set doesn't change from the
        // all-empty start state.
        let mut queued = vec![true; n];
        let mut worklist: VecDeque<usize> = (0..n).collect();

        let mut outcome = BorrowPathOutcome::default();

        while let Some(idx) = worklist.pop_front() {
            queued[idx] = false;
            let node = cfg.node_at(idx);
            let key = node.key;

            let mut pre_join: UsageSet<NodeKey> = IndexSet::new();
            for pred in cfg.predecessors(idx) {
                pre_join.extend(usage_sets[pred].iter().cloned());
            }

            if let Some(instr_id) = key.instruction_id() {
                outcome
                    .moves_by_instruction
                    .insert(instr_id, pre_join.iter().map(|u| u.path.clone()).collect());
            }

            let mut new_set = pre_join.clone();
            if let Some(own_path) = node.usage.clone() {
                let is_own_drop = own_path.is_drop();
                for prior in pre_join.iter() {
                    if own_path.invalidates(&prior.path) {
                        let prior_instr = prior.site.instruction_id();
                        let prior_already_borrowed = prior_instr
                            .map(|id| outcome.borrow_sites.contains(&id))
                            .unwrap_or(false);
                        if is_own_drop && !prior_already_borrowed {
                            if let Some(drop_id) = key.instruction_id() {
                                outcome.cancelled_drops.insert(drop_id);
                            }
                        } else if let Some(id) = prior_instr {
                            outcome.borrow_sites.insert(id);
                        }
                    }
                }
                new_set.insert(Usage::new(key, own_path));
            }

            if new_set != usage_sets[idx] {
                usage_sets[idx] = new_set;
                for succ in cfg.successors(idx).collect::<Vec<_>>() {
                    if !queued[succ] {
                        queued[succ] = true;
                        worklist.push_back(succ);
                    }
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::TempVar;

    fn value_ref(id: InstructionId, var: &TempVar, fields: Vec<String>) -> (NodeKey, Path) {
        (
            NodeKey::InstructionKey(id),
            Path::partial(var.clone(), fields),
        )
    }

    #[test]
    fn single_whole_use_produces_no_borrow() {
        let v = TempVar::local(0);
        let mut cfg = ControlFlowGraph::new();
        let (k0, p0) = value_ref(InstructionId::new(0, 0), &v, vec![]);
        cfg.ensure_node(k0, "value_ref");
        cfg.set_usage(k0, p0);
        cfg.update_edges();
        let outcome = BorrowPathAnalyzer::analyze(&cfg);
        assert!(outcome.borrow_sites.is_empty());
    }

    #[test]
    fn two_whole_uses_in_sequence_force_a_borrow_on_the_first() {
        let v = TempVar::local(0);
        let mut cfg = ControlFlowGraph::new();
        let (k0, p0) = value_ref(InstructionId::new(0, 0), &v, vec![]);
        let (k1, p1) = value_ref(InstructionId::new(0, 1), &v, vec![]);
        cfg.ensure_node(k0, "value_ref");
        cfg.set_usage(k0, p0);
        cfg.ensure_node(k1, "value_ref");
        cfg.set_usage(k1, p1);
        cfg.add_edge(k0, k1);
        cfg.update_edges();
        let outcome = BorrowPathAnalyzer::analyze(&cfg);
        assert!(outcome.borrow_sites.contains(&InstructionId::new(0, 0)));
    }

    #[test]
    fn drop_after_a_move_is_cancelled() {
        let v = TempVar::local(0);
        let mut cfg = ControlFlowGraph::new();
        let (k0, p0) = value_ref(InstructionId::new(0, 0), &v, vec![]);
        let drop_key = NodeKey::DropKey(InstructionId::new(0, 1));
        cfg.ensure_node(k0, "value_ref");
        cfg.set_usage(k0, p0);
        cfg.ensure_node(drop_key, "drop");
        cfg.set_usage(drop_key, Path::whole_drop(v));
        cfg.add_edge(k0, drop_key);
        cfg.update_edges();
        let outcome = BorrowPathAnalyzer::analyze(&cfg);
        assert!(outcome.cancelled_drops.contains(&InstructionId::new(0, 1)));
        assert!(outcome.borrow_sites.is_empty());
    }

    #[test]
    fn read_through_field_is_a_move_and_drop_is_cancelled() {
        let v = TempVar::arg(0);
        let mut cfg = ControlFlowGraph::new();
        let (k0, p0) = value_ref(InstructionId::new(0, 0), &v, vec!["f".to_string()]);
        let drop_key = NodeKey::DropKey(InstructionId::new(0, 1));
        cfg.ensure_node(k0, "value_ref");
        cfg.set_usage(k0, p0);
        cfg.ensure_node(drop_key, "drop");
        cfg.set_usage(drop_key, Path::whole_drop(v));
        cfg.add_edge(k0, drop_key);
        cfg.update_edges();
        let outcome = BorrowPathAnalyzer::analyze(&cfg);
        assert!(outcome.cancelled_drops.contains(&InstructionId::new(0, 1)));
    }

    #[test]
    fn a_small_loop_reaches_a_fixed_point() {
        // entry -> LoopStart -> body (value_ref) -> back to LoopStart; must terminate.
        let v = TempVar::local(0);
        let mut cfg = ControlFlowGraph::new();
        let entry = NodeKey::InstructionKey(InstructionId::new(0, 0));
        let start = NodeKey::LoopStart(InstructionId::new(0, 1));
        let (body_key, body_path) = value_ref(InstructionId::new(1, 0), &v, vec![]);
        cfg.ensure_node(entry, "instruction");
        cfg.ensure_node(start, "loop_start");
        cfg.ensure_node(body_key, "value_ref");
        cfg.set_usage(body_key, body_path);
        cfg.add_edge(entry, start);
        cfg.add_edge(start, body_key);
        cfg.add_edge(body_key, start);
        cfg.update_edges();
        let outcome = BorrowPathAnalyzer::analyze(&cfg);
        // Second trip through body_key invalidates the first -> forced borrow.
        assert!(outcome.borrow_sites.contains(&InstructionId::new(1, 0)));
    }
}
