//! Component C — the dependency processor: Tarjan SCC over an arbitrary
//! `Key -> [Key]` map, returning groups in reverse-topological order
//! (leaves first).
//!
//! Grounded on the call-graph SCC routine in the teacher crate's
//! `semantic_graph::call_graph` (`tarjan_scc_algorithm`/`tarjan_strongconnect`)
//! and cross-checked against the original `SCC.py`'s node bookkeeping
//! (`index`, `low_link`, `on_stack`). Made iterative with an explicit work
//! stack — the teacher's version recurses, the original's `dfs` recurses
//! too, but §4.C calls for an iterative algorithm to avoid stack overflow on
//! deep call graphs, so this is a deliberate divergence from both (see
//! design ledger).

use indexmap::IndexMap;
use std::hash::Hash;

struct NodeState {
    index: Option<u32>,
    low_link: u32,
    on_stack: bool,
}

/// Runs Tarjan's algorithm over `deps` (a key depends on each entry in its
/// value list) and returns strongly-connected components ordered so that a
/// component's dependencies always precede it (leaves first). Successors
/// absent from `deps`' keys are treated as leaf nodes with no further
/// dependencies, matching "missing successors are treated as absent nodes".
///
/// Deterministic for a fixed iteration order of `deps` — callers must pass
/// an `IndexMap` (or otherwise insertion-ordered source) rather than a
/// `HashMap`, whose iteration order is not stable across runs.
pub fn tarjan_scc<K>(deps: &IndexMap<K, Vec<K>>) -> Vec<Vec<K>>
where
    K: Eq + Hash + Clone,
{
    let mut states: IndexMap<K, NodeState> = IndexMap::new();
    for key in deps.keys() {
        states.insert(
            key.clone(),
            NodeState {
                index: None,
                low_link: 0,
                on_stack: false,
            },
        );
    }

    let mut next_index: u32 = 0;
    let mut tarjan_stack: Vec<K> = Vec::new();
    let mut sccs: Vec<Vec<K>> = Vec::new();

    // Explicit work-stack DFS. Each frame is (node, next-neighbour-index-to-visit).
    enum Frame<K> {
        Enter(K),
        Resume(K, usize),
    }

    let keys: Vec<K> = deps.keys().cloned().collect();
    for root in keys {
        if states.get(&root).map(|s| s.index.is_some()).unwrap_or(false) {
            continue;
        }

        let mut work: Vec<Frame<K>> = vec![Frame::Enter(root)];

        while let Some(frame) = work.pop() {
            match frame {
                Frame::Enter(node) => {
                    if states
                        .get(&node)
                        .map(|s| s.index.is_some())
                        .unwrap_or(false)
                    {
                        continue;
                    }
                    states.entry(node.clone()).or_insert_with(|| NodeState {
                        index: None,
                        low_link: 0,
                        on_stack: false,
                    });
                    {
                        let s = states.get_mut(&node).unwrap();
                        s.index = Some(next_index);
                        s.low_link = next_index;
                        s.on_stack = true;
                    }
                    next_index += 1;
                    tarjan_stack.push(node.clone());
                    work.push(Frame::Resume(node, 0));
                }
                Frame::Resume(node, next_neighbour) => {
                    let neighbours: &[K] = deps.get(&node).map(|v| v.as_slice()).unwrap_or(&[]);
                    if next_neighbour < neighbours.len() {
                        let neighbour = neighbours[next_neighbour].clone();
                        work.push(Frame::Resume(node.clone(), next_neighbour + 1));
                        let visited = states
                            .get(&neighbour)
                            .map(|s| s.index.is_some())
                            .unwrap_or(false);
                        if !visited {
                            work.push(Frame::Enter(neighbour));
                        } else {
                            let on_stack = states
                                .get(&neighbour)
                                .map(|s| s.on_stack)
                                .unwrap_or(false);
                            if on_stack {
                                let neighbour_index = states.get(&neighbour).unwrap().index.unwrap();
                                let s = states.get_mut(&node).unwrap();
                                s.low_link = s.low_link.min(neighbour_index);
                            }
                        }
                    } else {
                        // All neighbours processed: the parent frame (if resumed after an
                        // Enter we pushed) has already had its low_link updated via the
                        // visited neighbour's low_link, propagated below.
                        let node_index = states.get(&node).unwrap().index.unwrap();
                        let node_low_link = states.get(&node).unwrap().low_link;

                        if node_index == node_low_link {
                            let mut scc = Vec::new();
                            loop {
                                let last = tarjan_stack.pop().unwrap();
                                states.get_mut(&last).unwrap().on_stack = false;
                                let last_is_root = last == node;
                                scc.push(last);
                                if last_is_root {
                                    break;
                                }
                            }
                            sccs.push(scc);
                        }

                        // Propagate this node's final low_link up to whoever is still on
                        // the work stack waiting to resume (its caller), mirroring
                        // `checkNode`'s `updateLowLink(current, neighbour.low_link)`.
                        if let Some(Frame::Resume(parent, _)) = work.last() {
                            let parent_low = states.get(parent).unwrap().low_link;
                            let merged = parent_low.min(node_low_link);
                            states.get_mut(parent).unwrap().low_link = merged;
                        }
                    }
                }
            }
        }
    }

    sccs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: Vec<(&str, Vec<&str>)>) -> IndexMap<String, Vec<String>> {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.into_iter().map(String::from).collect()))
            .collect()
    }

    #[test]
    fn single_node_no_edges_is_its_own_scc() {
        let deps = map(vec![("a", vec![])]);
        let sccs = tarjan_scc(&deps);
        assert_eq!(sccs, vec![vec!["a".to_string()]]);
    }

    #[test]
    fn linear_chain_is_reverse_topological() {
        let deps = map(vec![("a", vec!["b"]), ("b", vec!["c"]), ("c", vec![])]);
        let sccs = tarjan_scc(&deps);
        assert_eq!(
            sccs,
            vec![
                vec!["c".to_string()],
                vec!["b".to_string()],
                vec!["a".to_string()],
            ]
        );
    }

    #[test]
    fn mutual_recursion_collapses_into_one_scc() {
        let deps = map(vec![("a", vec!["b"]), ("b", vec!["a"])]);
        let sccs = tarjan_scc(&deps);
        assert_eq!(sccs.len(), 1);
        assert_eq!(sccs[0].len(), 2);
    }

    #[test]
    fn missing_successor_is_treated_as_a_leaf() {
        let deps = map(vec![("a", vec!["ghost"])]);
        let sccs = tarjan_scc(&deps);
        // "ghost" never appears as a key, so only "a" is ever discovered.
        assert_eq!(sccs, vec![vec!["a".to_string()]]);
    }

    #[test]
    fn self_loop_is_its_own_scc() {
        let deps = map(vec![("a", vec!["a"])]);
        let sccs = tarjan_scc(&deps);
        assert_eq!(sccs, vec![vec!["a".to_string()]]);
    }
}
