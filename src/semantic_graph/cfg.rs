//! Component D — the control-flow graph a structured `Body` is lowered
//! into: `CFG = (nodes, edges)` with a closed node-key variant set.
//!
//! Grounded on the teacher's `BasicBlock`/`Terminator` shape (arena-style
//! node storage, explicit predecessor/successor lists) generalized from
//! statement-level basic blocks to the finer-grained per-instruction nodes
//! §4.D calls for.

use crate::ir::instructions::InstructionId;
use crate::ir::types::Path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The closed node-key variant set (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKey {
    InstructionKey(InstructionId),
    DropKey(InstructionId),
    IfKey(InstructionId),
    LoopStart(InstructionId),
    LoopEnd(InstructionId),
    End,
}

impl NodeKey {
    /// The instruction this node was lowered from, if any (`End` has none).
    pub fn instruction_id(&self) -> Option<InstructionId> {
        match self {
            NodeKey::InstructionKey(id)
            | NodeKey::DropKey(id)
            | NodeKey::IfKey(id)
            | NodeKey::LoopStart(id)
            | NodeKey::LoopEnd(id) => Some(*id),
            NodeKey::End => None,
        }
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKey::InstructionKey(id) => write!(f, "instr({id})"),
            NodeKey::DropKey(id) => write!(f, "drop({id})"),
            NodeKey::IfKey(id) => write!(f, "if({id})"),
            NodeKey::LoopStart(id) => write!(f, "loop_start({id})"),
            NodeKey::LoopEnd(id) => write!(f, "loop_end({id})"),
            NodeKey::End => write!(f, "end"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeIndex(pub u32);

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Edge {
    from: u32,
    to: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfgNode {
    pub key: NodeKey,
    pub kind: String,
    pub incoming: Vec<EdgeIndex>,
    pub outgoing: Vec<EdgeIndex>,
    pub usage: Option<Path>,
    pub color: String,
}

impl CfgNode {
    fn new(key: NodeKey, kind: &str) -> Self {
        Self {
            key,
            kind: kind.to_string(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
            usage: None,
            color: "white".to_string(),
        }
    }
}

/// The lowered graph: `nodes` indexed by position, `edges` as `(from, to)`
/// pairs over those positions. `node_index` maps a `NodeKey` back to its
/// position for the builder's incremental construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControlFlowGraph {
    nodes: Vec<CfgNode>,
    #[serde(skip)]
    node_index: IndexMap<NodeKey, usize>,
    edges: Vec<Edge>,
}

impl ControlFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `key` if absent and returns its node index either way —
    /// idempotent so the builder can reference a node before all its edges
    /// are known.
    pub fn ensure_node(&mut self, key: NodeKey, kind: &str) -> usize {
        if let Some(&idx) = self.node_index.get(&key) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(CfgNode::new(key, kind));
        self.node_index.insert(key, idx);
        idx
    }

    pub fn set_usage(&mut self, key: NodeKey, usage: Path) {
        if let Some(&idx) = self.node_index.get(&key) {
            self.nodes[idx].usage = Some(usage);
        }
    }

    pub fn add_edge(&mut self, from: NodeKey, to: NodeKey) {
        let from_idx = self.ensure_node(from, "");
        let to_idx = self.ensure_node(to, "");
        self.edges.push(Edge {
            from: from_idx as u32,
            to: to_idx as u32,
        });
    }

    /// Materializes per-node `incoming`/`outgoing` edge-index lists from the
    /// flat edge list — run once after construction, per §4.D.
    pub fn update_edges(&mut self) {
        for node in &mut self.nodes {
            node.incoming.clear();
            node.outgoing.clear();
        }
        for (i, edge) in self.edges.iter().enumerate() {
            self.nodes[edge.from as usize]
                .outgoing
                .push(EdgeIndex(i as u32));
            self.nodes[edge.to as usize]
                .incoming
                .push(EdgeIndex(i as u32));
        }
    }

    pub fn node(&self, key: NodeKey) -> Option<&CfgNode> {
        self.node_index.get(&key).map(|&i| &self.nodes[i])
    }

    pub fn node_at(&self, idx: usize) -> &CfgNode {
        &self.nodes[idx]
    }

    pub fn index_of(&self, key: NodeKey) -> Option<usize> {
        self.node_index.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes.iter().map(|n| n.key)
    }

    pub fn successors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes[idx]
            .outgoing
            .iter()
            .map(move |e| self.edges[e.0 as usize].to as usize)
    }

    pub fn predecessors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes[idx]
            .incoming
            .iter()
            .map(move |e| self.edges[e.0 as usize].from as usize)
    }

    /// Nodes with no incoming edges — the analyzer's worklist seeds.
    pub fn sources(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| self.nodes[i].incoming.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_chain_has_one_source_and_matching_edges() {
        let mut cfg = ControlFlowGraph::new();
        let a = NodeKey::InstructionKey(InstructionId::new(0, 0));
        let b = NodeKey::InstructionKey(InstructionId::new(0, 1));
        let c = NodeKey::End;
        cfg.add_edge(a, b);
        cfg.add_edge(b, c);
        cfg.update_edges();
        assert_eq!(cfg.sources().len(), 1);
        let a_idx = cfg.index_of(a).unwrap();
        assert_eq!(cfg.sources()[0], a_idx);
    }

    #[test]
    fn if_join_has_two_incoming_edges() {
        let mut cfg = ControlFlowGraph::new();
        let cond = NodeKey::InstructionKey(InstructionId::new(0, 0));
        let t = NodeKey::InstructionKey(InstructionId::new(1, 0));
        let f = NodeKey::InstructionKey(InstructionId::new(2, 0));
        let join = NodeKey::IfKey(InstructionId::new(0, 0));
        cfg.add_edge(cond, t);
        cfg.add_edge(cond, f);
        cfg.add_edge(t, join);
        cfg.add_edge(f, join);
        cfg.update_edges();
        let join_idx = cfg.index_of(join).unwrap();
        assert_eq!(cfg.node_at(join_idx).incoming.len(), 2);
    }

    #[test]
    fn ensure_node_is_idempotent() {
        let mut cfg = ControlFlowGraph::new();
        let k = NodeKey::End;
        let a = cfg.ensure_node(k, "end");
        let b = cfg.ensure_node(k, "end");
        assert_eq!(a, b);
        assert_eq!(cfg.len(), 1);
    }
}
