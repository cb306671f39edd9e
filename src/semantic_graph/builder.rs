//! Component D — lowers a structured `Body` into a `ControlFlowGraph`,
//! following the per-instruction rules of §4.D exactly (linear instruction
//! → `InstructionKey`; `DropVar` → `DropKey` with a whole-drop usage;
//! `ValueRef` → `InstructionKey` with a whole/partial usage; `If` joins both
//! arms into an `IfKey`, skipping arms that diverge; `Loop` produces the
//! `LoopStart`/`LoopEnd` pair with `Break`/`Continue` wired to the innermost
//! enclosing loop; `Return` produces no further edges).

use crate::ir::blocks::{BlockId, Body};
use crate::ir::instructions::InstructionKind;
use crate::ir::types::Path;
use crate::semantic_graph::cfg::{ControlFlowGraph, NodeKey};

/// `(loop_start, loop_end)` for the innermost enclosing `Loop`, consulted
/// by `Break`/`Continue`.
type LoopFrame = (NodeKey, NodeKey);

pub struct CfgBuilder<'a> {
    body: &'a Body,
    cfg: ControlFlowGraph,
    loop_stack: Vec<LoopFrame>,
}

impl<'a> CfgBuilder<'a> {
    pub fn build(body: &'a Body) -> ControlFlowGraph {
        let mut builder = Self {
            body,
            cfg: ControlFlowGraph::new(),
            loop_stack: Vec::new(),
        };
        let entry_last = builder.lower_block(body.entry(), None);
        if let Some(last) = entry_last {
            builder.cfg.add_edge(last, NodeKey::End);
        }
        builder.cfg.update_edges();
        builder.cfg
    }

    /// Lowers every instruction in `block_id` in order, threading `last`
    /// (the most recently lowered node, or `None` if control has already
    /// diverged via `Return`/`Break`/`Continue`). Returns the block's exit
    /// node, or `None` if it never falls through.
    fn lower_block(&mut self, block_id: BlockId, mut last: Option<NodeKey>) -> Option<NodeKey> {
        let block = self.body.block(block_id);
        for instr in &block.instructions {
            match &instr.kind {
                InstructionKind::DropVar { name, .. } => {
                    let key = NodeKey::DropKey(instr.id);
                    self.cfg.ensure_node(key, "drop");
                    self.cfg.set_usage(key, Path::whole_drop(name.clone()));
                    if let Some(l) = last {
                        self.cfg.add_edge(l, key);
                    }
                    last = Some(key);
                }
                InstructionKind::ValueRef { name, fields, .. } => {
                    let key = NodeKey::InstructionKey(instr.id);
                    self.cfg.ensure_node(key, "value_ref");
                    self.cfg
                        .set_usage(key, Path::partial(name.clone(), fields.clone()));
                    if let Some(l) = last {
                        self.cfg.add_edge(l, key);
                    }
                    last = Some(key);
                }
                InstructionKind::If {
                    true_branch,
                    false_branch,
                    ..
                } => {
                    let true_end = self.lower_block(*true_branch, last);
                    let false_end = self.lower_block(*false_branch, last);
                    let join = NodeKey::IfKey(instr.id);
                    self.cfg.ensure_node(join, "if_join");
                    let mut any_arm_falls_through = false;
                    if let Some(t) = true_end {
                        self.cfg.add_edge(t, join);
                        any_arm_falls_through = true;
                    }
                    if let Some(f) = false_end {
                        self.cfg.add_edge(f, join);
                        any_arm_falls_through = true;
                    }
                    last = if any_arm_falls_through {
                        Some(join)
                    } else {
                        None
                    };
                }
                InstructionKind::Loop { body: loop_body, .. } => {
                    let start = NodeKey::LoopStart(instr.id);
                    let end = NodeKey::LoopEnd(instr.id);
                    self.cfg.ensure_node(start, "loop_start");
                    self.cfg.ensure_node(end, "loop_end");
                    if let Some(l) = last {
                        self.cfg.add_edge(l, start);
                    }
                    // The loop-variable bind shares the loop instruction's id
                    // under a distinct node key, matching LoopStart -> LoopVar.
                    let loop_var = NodeKey::InstructionKey(instr.id);
                    self.cfg.ensure_node(loop_var, "loop_var");
                    self.cfg.add_edge(start, loop_var);

                    self.loop_stack.push((start, end));
                    let body_end = self.lower_block(*loop_body, Some(loop_var));
                    self.loop_stack.pop();

                    if let Some(b) = body_end {
                        self.cfg.add_edge(b, start);
                    }
                    last = Some(end);
                }
                InstructionKind::Break { .. } => {
                    if let Some(l) = last {
                        if let Some(&(_, end)) = self.loop_stack.last() {
                            self.cfg.add_edge(l, end);
                        }
                    }
                    last = None;
                }
                InstructionKind::Continue { .. } => {
                    if let Some(l) = last {
                        if let Some(&(start, _)) = self.loop_stack.last() {
                            self.cfg.add_edge(l, start);
                        }
                    }
                    last = None;
                }
                InstructionKind::Return { .. } => {
                    last = None;
                }
                _ => {
                    let key = NodeKey::InstructionKey(instr.id);
                    self.cfg.ensure_node(key, "instruction");
                    if let Some(l) = last {
                        self.cfg.add_edge(l, key);
                    }
                    last = Some(key);
                }
            }
        }
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdAllocator;
    use crate::ir::builder::build_identity_function;
    use crate::ir::types::QualifiedName;

    #[test]
    fn trivial_function_lowers_to_a_linear_chain_ending_in_end() {
        let alloc = IdAllocator::new();
        let f = build_identity_function(QualifiedName::function("m", "f"), &alloc);
        let cfg = CfgBuilder::build(&f.body);
        // Bind, ValueRef, Return -> ValueRef is the only node that reaches End
        // (Return diverges before producing a node; Bind produces a node too).
        assert!(cfg.len() >= 2);
        assert_eq!(cfg.sources().len(), 1);
    }
}
