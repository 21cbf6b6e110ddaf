//! Levelization and combinational-loop breaking.
//!
//! [`levelize`] assigns every node a BFS level via Kahn's algorithm: level 0
//! is every node with no live incoming edges, level `k+1` is every node
//! whose live predecessors are all at level `<= k`. If the graph contains a
//! combinational loop, some nodes never reach in-degree zero and are left
//! un-levelized; [`break_combinational_loops`] finds those cycles with an
//! iterative Tarjan SCC pass (no recursion, so a large design can't blow the
//! stack) and breaks one edge per non-trivial strongly connected component,
//! marking it [`EdgeState::BrokenByLoop`] rather than deleting it so
//! reporting can still explain why the node downstream of the break has no
//! real predecessor.

use crate::graph::{EdgeState, TimingGraph};
use crate::ids::TimingNodeId;
use aion_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use aion_source::Span;
use std::collections::VecDeque;

/// The result of levelizing a timing graph.
#[derive(Debug, Clone)]
pub struct Levelization {
    /// Nodes grouped by BFS level, in level order.
    pub levels: Vec<Vec<TimingNodeId>>,
    /// The level assigned to each node, indexed by [`TimingNodeId::index`].
    pub node_level: Vec<Option<u32>>,
    /// `true` if every node in the graph reached a level (no remaining
    /// cycle). If `false`, [`break_combinational_loops`] must run first.
    pub complete: bool,
}

/// Performs Kahn's-algorithm BFS levelization over live edges only.
pub fn levelize(graph: &TimingGraph) -> Levelization {
    let n = graph.node_count();
    let mut remaining_in_degree = vec![0u32; n];
    for e in &graph.edges {
        if e.state == EdgeState::Live {
            remaining_in_degree[e.to.index()] += 1;
        }
    }

    let mut queue: VecDeque<TimingNodeId> = (0..n)
        .filter(|&i| remaining_in_degree[i] == 0)
        .map(|i| TimingNodeId::from_raw(i as u32))
        .collect();

    let mut node_level = vec![None; n];
    let mut levels = Vec::new();
    let mut visited = 0usize;
    let mut level = 0u32;

    while !queue.is_empty() {
        let mut this_level = Vec::with_capacity(queue.len());
        let mut next_queue = VecDeque::new();

        for nid in queue.drain(..) {
            node_level[nid.index()] = Some(level);
            this_level.push(nid);
            visited += 1;

            for edge in graph.outgoing_edges(nid) {
                let to = edge.to.index();
                remaining_in_degree[to] -= 1;
                if remaining_in_degree[to] == 0 {
                    next_queue.push_back(edge.to);
                }
            }
        }

        levels.push(this_level);
        queue = next_queue;
        level += 1;
    }

    Levelization {
        levels,
        node_level,
        complete: visited == n,
    }
}

/// Finds every strongly connected component of size > 1 (or a self-loop)
/// among live edges using an iterative Tarjan's algorithm, breaks one edge
/// per component, and emits a warning diagnostic for each break. Returns
/// the node IDs chosen as break points.
///
/// Must be called when [`Levelization::complete`] is `false`; callers
/// should re-run [`levelize`] afterward.
pub fn break_combinational_loops(graph: &mut TimingGraph, sink: &DiagnosticSink) -> Vec<TimingNodeId> {
    let sccs = tarjan_scc(graph);
    let mut breakpoints = Vec::new();

    for scc in sccs {
        if scc.len() == 1 {
            // Only a true self-loop counts as a (degenerate) cycle here;
            // a singleton SCC with no self-edge is just a normal node.
            let node = scc[0];
            let has_self_loop = graph
                .outgoing_edges(node)
                .iter()
                .any(|e| e.to == node);
            if !has_self_loop {
                continue;
            }
        }

        // Deterministic choice: break the edge entering the member with
        // the smallest ID, choosing its in-SCC predecessor with the
        // smallest ID in turn. This makes loop-breaking reproducible
        // across runs of the same graph.
        let scc_set: std::collections::HashSet<TimingNodeId> = scc.iter().copied().collect();
        let target = *scc.iter().min_by_key(|n| n.as_raw()).unwrap();
        let incoming_in_scc: Vec<_> = graph
            .incoming_edges(target)
            .into_iter()
            .filter(|e| scc_set.contains(&e.from))
            .map(|e| e.id)
            .collect();

        if let Some(&edge_id) = incoming_in_scc.iter().min_by_key(|e| e.as_raw()) {
            let edge = graph.edge(edge_id).clone();
            graph.break_edge(edge_id, EdgeState::BrokenByLoop);
            graph.node_mut(target).is_combinational_loop_breakpoint = true;
            breakpoints.push(target);

            sink.emit(Diagnostic::warning(
                DiagnosticCode::new(Category::Timing, 20),
                format!(
                    "combinational loop detected and broken: edge {} -> {} removed",
                    edge.from.as_raw(),
                    edge.to.as_raw()
                ),
                Span::DUMMY,
            ));
        }
    }

    breakpoints
}

/// Iterative Tarjan's strongly-connected-components algorithm over live
/// edges, using an explicit work stack instead of recursion.
fn tarjan_scc(graph: &TimingGraph) -> Vec<Vec<TimingNodeId>> {
    let n = graph.node_count();
    let mut index = vec![None; n];
    let mut lowlink = vec![0u32; n];
    let mut on_stack = vec![false; n];
    let mut stack = Vec::new();
    let mut next_index = 0u32;
    let mut sccs = Vec::new();

    // (node, next unexplored child position in its outgoing-edge list)
    let mut work: Vec<(TimingNodeId, usize)> = Vec::new();

    for start in 0..n {
        let start_id = TimingNodeId::from_raw(start as u32);
        if index[start].is_some() {
            continue;
        }

        work.push((start_id, 0));

        while let Some(&(node, child_pos)) = work.last() {
            let node_idx = node.index();
            if index[node_idx].is_none() {
                index[node_idx] = Some(next_index);
                lowlink[node_idx] = next_index;
                next_index += 1;
                stack.push(node);
                on_stack[node_idx] = true;
            }

            let outgoing = graph.outgoing_edges(node);
            if child_pos < outgoing.len() {
                let child = outgoing[child_pos].to;
                work.last_mut().unwrap().1 += 1;

                let child_idx = child.index();
                if index[child_idx].is_none() {
                    work.push((child, 0));
                } else if on_stack[child_idx] {
                    lowlink[node_idx] = lowlink[node_idx].min(index[child_idx].unwrap());
                }
            } else {
                work.pop();
                if let Some(&(parent, _)) = work.last() {
                    let parent_idx = parent.index();
                    lowlink[parent_idx] = lowlink[parent_idx].min(lowlink[node_idx]);
                }

                if lowlink[node_idx] == index[node_idx].unwrap() {
                    let mut component = Vec::new();
                    loop {
                        let member = stack.pop().unwrap();
                        on_stack[member.index()] = false;
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    sccs.push(component);
                }
            }
        }
    }

    sccs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{TimingEdgeType, TimingNodeType};
    use aion_arch::types::Delay;

    #[test]
    fn levelize_linear_chain() {
        let mut g = TimingGraph::new();
        let a = g.add_node("a".into(), TimingNodeType::InputPadSource);
        let b = g.add_node("b".into(), TimingNodeType::PrimitiveIpin);
        let c = g.add_node("c".into(), TimingNodeType::OutputPadSink);
        g.add_edge(a, b, Delay::ZERO, TimingEdgeType::NetDelay);
        g.add_edge(b, c, Delay::ZERO, TimingEdgeType::CellDelay);

        let lvl = levelize(&g);
        assert!(lvl.complete);
        assert_eq!(lvl.node_level[a.index()], Some(0));
        assert_eq!(lvl.node_level[b.index()], Some(1));
        assert_eq!(lvl.node_level[c.index()], Some(2));
    }

    #[test]
    fn levelize_diamond_takes_longest_path_level() {
        let mut g = TimingGraph::new();
        let a = g.add_node("a".into(), TimingNodeType::InputPadSource);
        let b = g.add_node("b".into(), TimingNodeType::PrimitiveIpin);
        let c = g.add_node("c".into(), TimingNodeType::PrimitiveIpin);
        let d = g.add_node("d".into(), TimingNodeType::OutputPadSink);
        g.add_edge(a, b, Delay::ZERO, TimingEdgeType::NetDelay);
        g.add_edge(a, c, Delay::ZERO, TimingEdgeType::NetDelay);
        g.add_edge(b, d, Delay::ZERO, TimingEdgeType::CellDelay);
        g.add_edge(c, d, Delay::ZERO, TimingEdgeType::CellDelay);

        let lvl = levelize(&g);
        assert!(lvl.complete);
        assert_eq!(lvl.node_level[d.index()], Some(2));
    }

    #[test]
    fn levelize_incomplete_with_cycle() {
        let mut g = TimingGraph::new();
        let a = g.add_node("a".into(), TimingNodeType::PrimitiveIpin);
        let b = g.add_node("b".into(), TimingNodeType::PrimitiveOpin);
        g.add_edge(a, b, Delay::ZERO, TimingEdgeType::CellDelay);
        g.add_edge(b, a, Delay::ZERO, TimingEdgeType::NetDelay);

        let lvl = levelize(&g);
        assert!(!lvl.complete);
    }

    #[test]
    fn break_two_node_cycle() {
        let mut g = TimingGraph::new();
        let a = g.add_node("a".into(), TimingNodeType::PrimitiveIpin);
        let b = g.add_node("b".into(), TimingNodeType::PrimitiveOpin);
        g.add_edge(a, b, Delay::ZERO, TimingEdgeType::CellDelay);
        g.add_edge(b, a, Delay::ZERO, TimingEdgeType::NetDelay);

        let sink = DiagnosticSink::new();
        let breakpoints = break_combinational_loops(&mut g, &sink);
        assert_eq!(breakpoints.len(), 1);
        assert_eq!(g.broken_edge_count(), 1);

        let lvl = levelize(&g);
        assert!(lvl.complete);
        assert!(!sink.diagnostics().is_empty());
    }

    #[test]
    fn break_self_loop() {
        let mut g = TimingGraph::new();
        let a = g.add_node("a".into(), TimingNodeType::PrimitiveIpin);
        g.add_edge(a, a, Delay::ZERO, TimingEdgeType::CellDelay);

        let sink = DiagnosticSink::new();
        let breakpoints = break_combinational_loops(&mut g, &sink);
        assert_eq!(breakpoints.len(), 1);
        assert_eq!(g.broken_edge_count(), 1);
    }

    #[test]
    fn acyclic_graph_has_no_sccs_broken() {
        let mut g = TimingGraph::new();
        let a = g.add_node("a".into(), TimingNodeType::InputPadSource);
        let b = g.add_node("b".into(), TimingNodeType::OutputPadSink);
        g.add_edge(a, b, Delay::ZERO, TimingEdgeType::NetDelay);

        let sink = DiagnosticSink::new();
        let breakpoints = break_combinational_loops(&mut g, &sink);
        assert!(breakpoints.is_empty());
        assert_eq!(g.broken_edge_count(), 0);
    }

    #[test]
    fn three_node_cycle_broken() {
        let mut g = TimingGraph::new();
        let a = g.add_node("a".into(), TimingNodeType::PrimitiveIpin);
        let b = g.add_node("b".into(), TimingNodeType::PrimitiveOpin);
        let c = g.add_node("c".into(), TimingNodeType::PrimitiveIpin);
        g.add_edge(a, b, Delay::ZERO, TimingEdgeType::CellDelay);
        g.add_edge(b, c, Delay::ZERO, TimingEdgeType::NetDelay);
        g.add_edge(c, a, Delay::ZERO, TimingEdgeType::NetDelay);

        let sink = DiagnosticSink::new();
        let breakpoints = break_combinational_loops(&mut g, &sink);
        assert_eq!(breakpoints.len(), 1);
        let lvl = levelize(&g);
        assert!(lvl.complete);
    }
}
