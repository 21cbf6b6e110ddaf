//! Clock domain and skew propagation (§4.5), plus pre-analysis constraint
//! pruning (§4.6).
//!
//! Three phases, run in order:
//!
//! - **Phase A** walks every `InputPadSource`/`ClockSource` level-0 node,
//!   matching its driven net name against the constrained clocks and
//!   constrained inputs; a clock match propagates `clock_domain`/
//!   `clock_delay` depth-first (iteratively, via an explicit stack) to
//!   every reachable node, which must terminate at a `FlipFlopClock` leaf.
//! - **Phase B** assigns `OutputPadSink` nodes their matched constrained
//!   output's clock domain.
//! - **Phase C** copies a `FlipFlopClock` node's domain onto its sibling
//!   `FlipFlopSource`/`FlipFlopSink` nodes, erroring if two different
//!   clocks would fan into the same `FlipFlopClock` pin (resolves open
//!   question 3 as a hard error, not a silent last-writer-wins).
//!
//! After propagation, [`prune_unreachable_domain_pairs`] runs a forward
//! reachability BFS per source domain and forces any `(src, snk)` pair
//! that is never actually reached to `DO_NOT_ANALYSE`, per §4.6.

use crate::constraints::TimingConstraints;
use crate::errors::TimingError;
use crate::graph::TimingGraph;
use crate::ids::{ClockIndex, TimingNodeId};
use crate::graph::TimingNodeType;
use aion_common::Interner;
use aion_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use aion_source::Span;
use std::collections::{HashSet, VecDeque};

/// Runs all three clock-propagation phases over `graph`, using
/// `constraints` to resolve clock/I/O names.
///
/// Net names are taken from each source node's own name (the builder
/// names pad/clock-source nodes after the net they drive), matched
/// against [`TimingConstraints::find_clock`] and the constrained I/O
/// lists.
pub fn propagate_clocks(
    graph: &mut TimingGraph,
    constraints: &TimingConstraints,
    interner: &Interner,
    sink: &DiagnosticSink,
) -> Result<(), TimingError> {
    phase_a_sources(graph, constraints, interner, sink)?;
    phase_b_pad_sinks(graph, constraints, interner);
    phase_c_flip_flops(graph, sink)?;
    Ok(())
}

fn net_base_name(node_name: &str) -> &str {
    // Builder node names are "<block>/<pin>"; the net identity we match
    // against SDC target patterns is the block name.
    node_name.split('/').next().unwrap_or(node_name)
}

fn phase_a_sources(
    graph: &mut TimingGraph,
    constraints: &TimingConstraints,
    interner: &Interner,
    sink: &DiagnosticSink,
) -> Result<(), TimingError> {
    let candidates: Vec<TimingNodeId> = graph
        .nodes
        .iter()
        .filter(|n| matches!(n.node_type, TimingNodeType::InputPadSource | TimingNodeType::ClockSource))
        .map(|n| n.id)
        .collect();

    for node_id in candidates {
        let name = net_base_name(&graph.node(node_id).name).to_string();
        let clock_ident = interner.get_or_intern(&name);

        if let Some(clock_idx) = constraints.clock_index(clock_ident) {
            graph.node_mut(node_id).clock_domain = Some(clock_idx);
            graph.node_mut(node_id).clock_delay_ns = 0.0;
            propagate_domain_dfs(graph, node_id, clock_idx, sink)?;
            // The clock source itself is not a data path.
            graph.node_mut(node_id).clock_domain = None;
        } else if let Some(io) = constraints.constrained_inputs.iter().find(|io| {
            interner.resolve(io.port) == name
        }) {
            graph.node_mut(node_id).clock_domain = Some(io.clock);
            if let Some(edge_id) = graph.outgoing_edges(node_id).first().map(|e| e.id) {
                let delay = io.delay_ns;
                let edge = &mut graph.edges[edge_id.index()];
                edge.delay.min_ns = delay;
                edge.delay.typ_ns = delay;
                edge.delay.max_ns = delay;
            }
        } else {
            graph.node_mut(node_id).clock_domain = None;
        }
    }

    Ok(())
}

/// Iterative depth-first propagation of a clock domain/accumulated delay
/// from `start` to every node reachable via live edges. Leaves of the
/// traversal must be `FlipFlopClock`; anything else triggers a warning.
fn propagate_domain_dfs(
    graph: &mut TimingGraph,
    start: TimingNodeId,
    clock_idx: ClockIndex,
    sink: &DiagnosticSink,
) -> Result<(), TimingError> {
    let mut stack = vec![(start, 0.0f64)];
    let mut visited = HashSet::new();

    while let Some((node, accumulated_delay)) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }

        let outgoing: Vec<_> = graph
            .outgoing_edges(node)
            .iter()
            .map(|e| (e.to, e.delay.typ_ns))
            .collect();

        if outgoing.is_empty() {
            let is_leaf_ok = graph.node(node).node_type == TimingNodeType::FlipFlopClock;
            if !is_leaf_ok && node != start {
                sink.emit(Diagnostic::warning(
                    DiagnosticCode::new(Category::Timing, 10),
                    format!(
                        "clock network leaf '{}' is not a flip-flop clock pin",
                        graph.node(node).name
                    ),
                    Span::DUMMY,
                ));
            }
            continue;
        }

        for (child, edge_delay) in outgoing {
            let child_accum = accumulated_delay + edge_delay;
            graph.node_mut(child).clock_domain = Some(clock_idx);
            graph.node_mut(child).clock_delay_ns = child_accum;
            stack.push((child, child_accum));
        }
    }

    Ok(())
}

fn phase_b_pad_sinks(graph: &mut TimingGraph, constraints: &TimingConstraints, interner: &Interner) {
    let sinks: Vec<TimingNodeId> = graph
        .nodes
        .iter()
        .filter(|n| n.node_type == TimingNodeType::OutputPadSink)
        .map(|n| n.id)
        .collect();

    for node_id in sinks {
        let name = net_base_name(&graph.node(node_id).name).to_string();
        let Some(io) = constraints
            .constrained_outputs
            .iter()
            .find(|io| interner.resolve(io.port) == name)
        else {
            continue;
        };
        graph.node_mut(node_id).clock_domain = Some(io.clock);
        if let Some(edge_id) = graph.incoming_edges(node_id).first().map(|e| e.id) {
            let delay = io.delay_ns;
            let edge = &mut graph.edges[edge_id.index()];
            edge.delay.min_ns = delay;
            edge.delay.typ_ns = delay;
            edge.delay.max_ns = delay;
        }
    }
}

fn block_prefix(node_name: &str) -> &str {
    node_name.rsplit_once('/').map(|(prefix, _)| prefix).unwrap_or(node_name)
}

fn phase_c_flip_flops(graph: &mut TimingGraph, sink: &DiagnosticSink) -> Result<(), TimingError> {
    let clock_pins: Vec<TimingNodeId> = graph
        .nodes
        .iter()
        .filter(|n| n.node_type == TimingNodeType::FlipFlopClock)
        .map(|n| n.id)
        .collect();

    let targets: Vec<TimingNodeId> = graph
        .nodes
        .iter()
        .filter(|n| matches!(n.node_type, TimingNodeType::FlipFlopSource | TimingNodeType::FlipFlopSink))
        .map(|n| n.id)
        .collect();

    for target in targets {
        let prefix = block_prefix(&graph.node(target).name).to_string();
        let Some(&clk_node) = clock_pins.iter().find(|&&c| block_prefix(&graph.node(c).name) == prefix) else {
            continue;
        };

        let clk_domain = graph.node(clk_node).clock_domain;
        let Some(clk_domain) = clk_domain else { continue };

        let existing = graph.node(target).clock_domain;
        if let Some(existing_domain) = existing {
            if existing_domain.as_raw() != clk_domain.as_raw() {
                return Err(TimingError::GraphConstructionError(format!(
                    "flip-flop '{prefix}' clock pin fed by two different clock domains"
                )));
            }
        }

        let clk_delay = graph.node(clk_node).clock_delay_ns;
        graph.node_mut(target).clock_domain = Some(clk_domain);
        graph.node_mut(target).clock_delay_ns = clk_delay;
    }

    let _ = sink;
    Ok(())
}

/// Forces any `(src, snk)` domain pair that is never reached by a live
/// forward path to `DO_NOT_ANALYSE`, per §4.6.
pub fn prune_unreachable_domain_pairs(graph: &TimingGraph, constraints: &mut TimingConstraints) {
    let clock_count = constraints.clock_count();

    for src in 0..clock_count {
        let src_idx = ClockIndex::from_raw(src as u32);
        let reached = reachable_domains(graph, src_idx);

        for snk in 0..clock_count {
            let snk_idx = ClockIndex::from_raw(snk as u32);
            if constraints.domain_budget(src_idx, snk_idx).is_some() && !reached.contains(&snk) {
                constraints.set_domain_budget(src_idx, snk_idx, None);
            }
        }
    }
}

fn reachable_domains(graph: &TimingGraph, src: ClockIndex) -> HashSet<u32> {
    let starts: Vec<TimingNodeId> = graph
        .nodes
        .iter()
        .filter(|n| n.node_type.is_startpoint() && n.clock_domain == Some(src))
        .map(|n| n.id)
        .collect();

    let mut reached = HashSet::new();
    let mut visited = HashSet::new();
    let mut queue: VecDeque<TimingNodeId> = starts.into_iter().collect();

    while let Some(node) = queue.pop_front() {
        if !visited.insert(node) {
            continue;
        }
        let n = graph.node(node);
        if n.node_type.is_endpoint() {
            if let Some(domain) = n.clock_domain {
                reached.insert(domain.as_raw());
            }
        }
        for edge in graph.outgoing_edges(node) {
            queue.push_back(edge.to);
        }
    }

    reached
}
