//! Timing graph construction from a pin-level netlist.
//!
//! [`build_timing_graph`] is the single entry point for both pre-pack
//! (atom) and post-pack (cluster) netlists — both shapes are represented
//! by [`crate::netlist::Netlist`], so one builder handles both instead of
//! the teacher-inherited pattern of two parallel code paths.
//!
//! Kind assignment follows the pad/primitive/sequential rules below; after
//! every node and edge exists, a final sweep rewrites any edge terminating
//! at a [`TimingNodeType::ConstantGenSource`] to [`EdgeState::BrokenByConstant`]
//! since constant generators never consume real data (invariant 3), and
//! gives every edge a constant generator *drives* the `HUGE_NEGATIVE_NS`
//! sentinel delay so it never wins a forward max-arrival-time computation.

use crate::errors::TimingError;
use crate::graph::{TimingEdgeType, TimingGraph, TimingNodeType};
use crate::ids::TimingNodeId;
use crate::netlist::{BlockKind, Netlist, NetlistBlock, PinDirection, PinRole};
use aion_arch::types::Delay;
use aion_arch::DeviceTimingModel;
use aion_common::Interner;
use aion_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use aion_source::Span;
use std::collections::HashMap;

/// Builds a [`TimingGraph`] from a flattened netlist and a device timing
/// model.
///
/// Returns [`TimingError::GraphConstructionError`] if a primitive cannot
/// be classified (e.g. a `Dff` block missing its data or clock pin), and
/// [`TimingError::ModelPortNotFound`] if the timing model has no
/// combinational delay entry for a primitive/pin pair that the netlist
/// says exists.
pub fn build_timing_graph(
    netlist: &Netlist,
    model: &dyn DeviceTimingModel,
    interner: &Interner,
    sink: &DiagnosticSink,
) -> Result<TimingGraph, TimingError> {
    let mut graph = TimingGraph::new();

    // Two nodes per pin for sequential/pad primitives (source+sink split),
    // one node per pin otherwise. `pin_nodes[block_idx][pin_idx]` records
    // the node representing the pin on the *data/combinational* side;
    // `ff_source_nodes`/`ff_sink_nodes` record the paired half for
    // sequential primitives and pads.
    let mut pin_nodes: Vec<Vec<Option<TimingNodeId>>> = Vec::with_capacity(netlist.blocks.len());
    let mut paired_nodes: Vec<Vec<Option<TimingNodeId>>> = Vec::with_capacity(netlist.blocks.len());

    for block in &netlist.blocks {
        let (primary, paired) = classify_block(&mut graph, block, model, interner, sink)?;
        pin_nodes.push(primary);
        paired_nodes.push(paired);
    }

    // Wire up net-level edges: every driver's pin node connects to every
    // sink's pin node. Pre-pack/post-pack both use plain net delay;
    // interconnect delay itself is supplied externally (§6 net-delay
    // interface) and defaults to zero here, filled in later by the caller
    // via `TimingEdge::delay` mutation once routing delays are known.
    let mut net_to_driver_pin: HashMap<u32, TimingNodeId> = HashMap::new();
    let mut net_to_sink_pins: HashMap<u32, Vec<TimingNodeId>> = HashMap::new();

    for (block_idx, block) in netlist.blocks.iter().enumerate() {
        for (pin_idx, pin) in block.pins.iter().enumerate() {
            let Some(net) = pin.net else { continue };
            let Some(node) = pin_nodes[block_idx][pin_idx] else { continue };

            match pin.direction {
                PinDirection::Output => {
                    net_to_driver_pin.insert(net.0, node);
                }
                PinDirection::Input | PinDirection::Clock => {
                    net_to_sink_pins.entry(net.0).or_default().push(node);
                }
            }
        }
    }

    for (net_id, driver) in &net_to_driver_pin {
        if let Some(sinks) = net_to_sink_pins.get(net_id) {
            for &sink_node in sinks {
                graph.add_edge(*driver, sink_node, Delay::ZERO, TimingEdgeType::NetDelay);
            }
        }
    }

    for (net_id, sinks) in &net_to_sink_pins {
        if !net_to_driver_pin.contains_key(net_id) {
            for &sink_node in sinks {
                sink.emit(
                    Diagnostic::warning(
                        DiagnosticCode::new(Category::Timing, 1),
                        format!("dangling pin: node '{}' has no driver", graph.node(sink_node).name),
                        Span::DUMMY,
                    )
                    .with_note("net has no driving output pin in the netlist"),
                );
            }
        }
    }

    let _ = paired_nodes;
    constant_generator_sweep(&mut graph, &netlist, &pin_nodes);

    Ok(graph)
}

/// Classifies one netlist block into its timing-graph nodes, wiring
/// internal (intra-primitive) edges. Returns `(pin_nodes, paired_nodes)`
/// indexed the same as `block.pins`; `paired_nodes` holds the Source/Sink
/// half-node for sequential primitives and pads, `None` elsewhere.
fn classify_block(
    graph: &mut TimingGraph,
    block: &NetlistBlock,
    model: &dyn DeviceTimingModel,
    interner: &Interner,
    sink_diag: &DiagnosticSink,
) -> Result<(Vec<Option<TimingNodeId>>, Vec<Option<TimingNodeId>>), TimingError> {
    let block_name = interner.resolve(block.name);
    let mut primary = vec![None; block.pins.len()];
    let mut paired = vec![None; block.pins.len()];

    match &block.kind {
        BlockKind::Iobuf { is_output } => {
            if *is_output {
                let ipin = block
                    .pin_with_role(PinRole::Data)
                    .ok_or_else(|| TimingError::GraphConstructionError(format!(
                        "output pad '{block_name}' missing data pin"
                    )))?;
                let ipin_idx = pin_index(block, ipin);
                let ipin_node = graph.add_node(format!("{block_name}/ipin"), TimingNodeType::OutputPadIpin);
                let sink_node = graph.add_node(format!("{block_name}/sink"), TimingNodeType::OutputPadSink);
                graph.add_edge(ipin_node, sink_node, Delay::ZERO, TimingEdgeType::CellDelay);
                primary[ipin_idx] = Some(ipin_node);
                paired[ipin_idx] = Some(sink_node);
            } else {
                let opin = block
                    .pin_with_role(PinRole::Data)
                    .ok_or_else(|| TimingError::GraphConstructionError(format!(
                        "input pad '{block_name}' missing data pin"
                    )))?;
                let opin_idx = pin_index(block, opin);
                let source_node = graph.add_node(format!("{block_name}/source"), TimingNodeType::InputPadSource);
                let opin_node = graph.add_node(format!("{block_name}/opin"), TimingNodeType::InputPadOpin);
                graph.add_edge(source_node, opin_node, Delay::ZERO, TimingEdgeType::CellDelay);
                primary[opin_idx] = Some(opin_node);
                paired[opin_idx] = Some(source_node);
            }
        }

        BlockKind::Dff { .. } => {
            let d_pin = block
                .pins
                .iter()
                .find(|p| p.role == PinRole::Data && p.direction == PinDirection::Input)
                .ok_or_else(|| TimingError::GraphConstructionError(format!(
                    "flip-flop '{block_name}' missing data input pin"
                )))?;
            let q_pin = block
                .pins
                .iter()
                .find(|p| p.role == PinRole::Data && p.direction == PinDirection::Output);
            let clk_pin = block.pin_with_role(PinRole::Clock).ok_or_else(|| {
                TimingError::GraphConstructionError(format!("flip-flop '{block_name}' missing clock pin"))
            })?;

            let tsu = model.setup_time_ns("dff");
            let tco = model.clock_to_q_max_ns("dff");

            let d_idx = pin_index(block, d_pin);
            let ipin_node = graph.add_node(format!("{block_name}/D"), TimingNodeType::FlipFlopIpin);
            let sink_node = graph.add_node(format!("{block_name}/D_sink"), TimingNodeType::FlipFlopSink);
            graph.add_edge(ipin_node, sink_node, Delay::new(tsu, tsu, tsu), TimingEdgeType::SetupCheck);
            primary[d_idx] = Some(ipin_node);
            paired[d_idx] = Some(sink_node);

            let clk_idx = pin_index(block, clk_pin);
            let clk_node = graph.add_node(format!("{block_name}/CLK"), TimingNodeType::FlipFlopClock);
            primary[clk_idx] = Some(clk_node);

            if let Some(q_pin) = q_pin {
                let q_idx = pin_index(block, q_pin);
                let source_node = graph.add_node(format!("{block_name}/Q_source"), TimingNodeType::FlipFlopSource);
                let opin_node = graph.add_node(format!("{block_name}/Q"), TimingNodeType::FlipFlopOpin);
                graph.add_edge(source_node, opin_node, Delay::new(tco, tco, tco), TimingEdgeType::ClockToQ);
                primary[q_idx] = Some(opin_node);
                paired[q_idx] = Some(source_node);
            }
        }

        BlockKind::Pll => {
            for (idx, pin) in block.pins.iter().enumerate() {
                let node = match pin.direction {
                    PinDirection::Input | PinDirection::Clock => {
                        graph.add_node(format!("{block_name}/{}", pin_name(interner, pin)), TimingNodeType::ClockSource)
                    }
                    PinDirection::Output => {
                        graph.add_node(format!("{block_name}/{}", pin_name(interner, pin)), TimingNodeType::ClockOpin)
                    }
                };
                primary[idx] = Some(node);
            }
            wire_combinational_fanin_fanout(graph, block, &primary, model, interner, sink_diag, &block_name)?;
        }

        BlockKind::Const => {
            let opin = block.pin_with_role(PinRole::Data).ok_or_else(|| {
                TimingError::GraphConstructionError(format!("constant generator '{block_name}' missing output pin"))
            })?;
            let idx = pin_index(block, opin);
            let node = graph.add_node(format!("{block_name}/O"), TimingNodeType::ConstantGenSource);
            primary[idx] = Some(node);
        }

        BlockKind::Lut { .. } => {
            for (idx, pin) in block.pins.iter().enumerate() {
                let node_type = match pin.direction {
                    PinDirection::Output => TimingNodeType::PrimitiveOpin,
                    _ => TimingNodeType::PrimitiveIpin,
                };
                let node = graph.add_node(format!("{block_name}/{}", pin_name(interner, pin)), node_type);
                primary[idx] = Some(node);
            }
            wire_combinational_fanin_fanout(graph, block, &primary, model, interner, sink_diag, &block_name)?;
        }

        BlockKind::Cluster => {
            for (idx, pin) in block.pins.iter().enumerate() {
                let node_type = match pin.direction {
                    PinDirection::Output => TimingNodeType::ClusterOutputPin,
                    _ => TimingNodeType::ClusterInputPin,
                };
                let node = graph.add_node(format!("{block_name}/{}", pin_name(interner, pin)), node_type);
                primary[idx] = Some(node);
            }
        }
    }

    Ok((primary, paired))
}

fn pin_index(block: &NetlistBlock, pin: &crate::netlist::NetlistPin) -> usize {
    block.pins.iter().position(|p| std::ptr::eq(p, pin)).unwrap()
}

fn pin_name(interner: &Interner, pin: &crate::netlist::NetlistPin) -> String {
    interner.resolve(pin.name).to_string()
}

/// Connects every input pin node to every output pin node of a
/// combinational primitive, using the device model's per-pin delay.
fn wire_combinational_fanin_fanout(
    graph: &mut TimingGraph,
    block: &NetlistBlock,
    nodes: &[Option<TimingNodeId>],
    model: &dyn DeviceTimingModel,
    interner: &Interner,
    sink_diag: &DiagnosticSink,
    block_name: &str,
) -> Result<(), TimingError> {
    let primitive_kind = match &block.kind {
        BlockKind::Lut { .. } => "lut",
        BlockKind::Pll => "pll",
        _ => "cell",
    };

    let inputs: Vec<usize> = block
        .pins
        .iter()
        .enumerate()
        .filter(|(_, p)| p.direction != PinDirection::Output)
        .map(|(i, _)| i)
        .collect();
    let outputs: Vec<usize> = block
        .pins
        .iter()
        .enumerate()
        .filter(|(_, p)| p.direction == PinDirection::Output)
        .map(|(i, _)| i)
        .collect();

    for &in_idx in &inputs {
        for &out_idx in &outputs {
            let from_pin = pin_name(interner, &block.pins[in_idx]);
            let to_pin = pin_name(interner, &block.pins[out_idx]);
            let delay = model.combinational_delay(primitive_kind, &from_pin, &to_pin);
            let Some(delay) = delay else {
                sink_diag.emit(Diagnostic::warning(
                    DiagnosticCode::new(Category::Timing, 2),
                    format!("no combinational delay model for '{block_name}' {from_pin} -> {to_pin}"),
                    Span::DUMMY,
                ));
                continue;
            };
            let (Some(from_node), Some(to_node)) = (nodes[in_idx], nodes[out_idx]) else {
                return Err(TimingError::ModelPortNotFound {
                    cell: block_name.to_string(),
                    port: from_pin,
                });
            };
            graph.add_edge(from_node, to_node, delay, TimingEdgeType::CellDelay);
        }
    }

    Ok(())
}

/// Rewrites every edge targeting a [`TimingNodeType::ConstantGenSource`] to
/// [`EdgeState::BrokenByConstant`] (invariant 3: constant generators never
/// receive real data), and every edge the generator drives to carry
/// [`crate::sta::HUGE_NEGATIVE_NS`] delay, so a constant input can never
/// win the max-arrival-time computation at its fanout even if it is
/// reached by some other path.
fn constant_generator_sweep(
    graph: &mut TimingGraph,
    _netlist: &Netlist,
    _pin_nodes: &[Vec<Option<TimingNodeId>>],
) {
    use crate::graph::EdgeState;
    use crate::sta::HUGE_NEGATIVE_NS;
    use aion_arch::types::Delay;

    let const_gen_nodes: Vec<TimingNodeId> = graph
        .nodes
        .iter()
        .filter(|n| n.node_type == TimingNodeType::ConstantGenSource)
        .map(|n| n.id)
        .collect();

    let edges_to_break: Vec<_> = graph
        .edges
        .iter()
        .filter(|e| const_gen_nodes.contains(&e.to) && e.state == EdgeState::Live)
        .map(|e| e.id)
        .collect();
    for edge_id in edges_to_break {
        graph.break_edge(edge_id, EdgeState::BrokenByConstant);
    }

    let outgoing_ids: Vec<_> = graph
        .edges
        .iter()
        .filter(|e| const_gen_nodes.contains(&e.from))
        .map(|e| e.id)
        .collect();
    for edge_id in outgoing_ids {
        graph.edges[edge_id.index()].delay =
            Delay::new(HUGE_NEGATIVE_NS, HUGE_NEGATIVE_NS, HUGE_NEGATIVE_NS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::{NetId, NetlistPin};
    use aion_arch::GenericTimingModel;

    fn mkpin(interner: &Interner, name: &str, dir: PinDirection, role: PinRole, net: Option<NetId>) -> NetlistPin {
        NetlistPin { name: interner.get_or_intern(name), direction: dir, role, net }
    }

    #[test]
    fn builds_input_pad_source_opin_pair() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let model = GenericTimingModel::mid_speed_grade();
        let mut nl = Netlist::new();
        nl.add_block(NetlistBlock {
            name: interner.get_or_intern("in0"),
            kind: BlockKind::Iobuf { is_output: false },
            pins: vec![mkpin(&interner, "O", PinDirection::Output, PinRole::Data, None)],
        });

        let graph = build_timing_graph(&nl, &model, &interner, &sink).unwrap();
        let kinds: Vec<_> = graph.nodes.iter().map(|n| n.node_type).collect();
        assert!(kinds.contains(&TimingNodeType::InputPadSource));
        assert!(kinds.contains(&TimingNodeType::InputPadOpin));
    }

    #[test]
    fn builds_output_pad_ipin_sink_pair() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let model = GenericTimingModel::mid_speed_grade();
        let mut nl = Netlist::new();
        nl.add_block(NetlistBlock {
            name: interner.get_or_intern("out0"),
            kind: BlockKind::Iobuf { is_output: true },
            pins: vec![mkpin(&interner, "I", PinDirection::Input, PinRole::Data, None)],
        });

        let graph = build_timing_graph(&nl, &model, &interner, &sink).unwrap();
        let kinds: Vec<_> = graph.nodes.iter().map(|n| n.node_type).collect();
        assert!(kinds.contains(&TimingNodeType::OutputPadIpin));
        assert!(kinds.contains(&TimingNodeType::OutputPadSink));
    }

    #[test]
    fn builds_dff_with_setup_and_tco_edges() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let model = GenericTimingModel::mid_speed_grade();
        let mut nl = Netlist::new();
        nl.add_block(NetlistBlock {
            name: interner.get_or_intern("ff0"),
            kind: BlockKind::Dff { has_enable: false },
            pins: vec![
                mkpin(&interner, "D", PinDirection::Input, PinRole::Data, None),
                mkpin(&interner, "CLK", PinDirection::Clock, PinRole::Clock, None),
                mkpin(&interner, "Q", PinDirection::Output, PinRole::Data, None),
            ],
        });

        let graph = build_timing_graph(&nl, &model, &interner, &sink).unwrap();
        let kinds: Vec<_> = graph.nodes.iter().map(|n| n.node_type).collect();
        assert!(kinds.contains(&TimingNodeType::FlipFlopIpin));
        assert!(kinds.contains(&TimingNodeType::FlipFlopSink));
        assert!(kinds.contains(&TimingNodeType::FlipFlopClock));
        assert!(kinds.contains(&TimingNodeType::FlipFlopSource));
        assert!(kinds.contains(&TimingNodeType::FlipFlopOpin));

        let setup_edges: Vec<_> = graph.edges.iter().filter(|e| e.edge_type == TimingEdgeType::SetupCheck).collect();
        assert_eq!(setup_edges.len(), 1);
        let tco_edges: Vec<_> = graph.edges.iter().filter(|e| e.edge_type == TimingEdgeType::ClockToQ).collect();
        assert_eq!(tco_edges.len(), 1);
    }

    #[test]
    fn dff_missing_clock_pin_is_error() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let model = GenericTimingModel::mid_speed_grade();
        let mut nl = Netlist::new();
        nl.add_block(NetlistBlock {
            name: interner.get_or_intern("ff0"),
            kind: BlockKind::Dff { has_enable: false },
            pins: vec![mkpin(&interner, "D", PinDirection::Input, PinRole::Data, None)],
        });

        let result = build_timing_graph(&nl, &model, &interner, &sink);
        assert!(matches!(result, Err(TimingError::GraphConstructionError(_))));
    }

    #[test]
    fn lut_wires_combinational_fanin_fanout() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let model = GenericTimingModel::mid_speed_grade();
        let mut nl = Netlist::new();
        nl.add_block(NetlistBlock {
            name: interner.get_or_intern("lut0"),
            kind: BlockKind::Lut { num_inputs: 2 },
            pins: vec![
                mkpin(&interner, "I0", PinDirection::Input, PinRole::Data, None),
                mkpin(&interner, "I1", PinDirection::Input, PinRole::Data, None),
                mkpin(&interner, "O", PinDirection::Output, PinRole::Data, None),
            ],
        });

        let graph = build_timing_graph(&nl, &model, &interner, &sink).unwrap();
        let cell_edges: Vec<_> = graph.edges.iter().filter(|e| e.edge_type == TimingEdgeType::CellDelay).collect();
        assert_eq!(cell_edges.len(), 2);
    }

    #[test]
    fn constant_generator_edges_are_broken() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let model = GenericTimingModel::mid_speed_grade();
        let mut nl = Netlist::new();
        let net = nl.add_net(interner.get_or_intern("n_const"));
        nl.add_block(NetlistBlock {
            name: interner.get_or_intern("const0"),
            kind: BlockKind::Const,
            pins: vec![mkpin(&interner, "O", PinDirection::Output, PinRole::Data, Some(net))],
        });
        nl.add_block(NetlistBlock {
            name: interner.get_or_intern("ff0"),
            kind: BlockKind::Dff { has_enable: false },
            pins: vec![
                mkpin(&interner, "D", PinDirection::Input, PinRole::Data, Some(net)),
                mkpin(&interner, "CLK", PinDirection::Clock, PinRole::Clock, None),
            ],
        });

        let graph = build_timing_graph(&nl, &model, &interner, &sink).unwrap();
        let const_node = graph
            .nodes
            .iter()
            .find(|n| n.node_type == TimingNodeType::ConstantGenSource)
            .unwrap();
        // The edge into ff0's D pin stays live (it's the only driver of that
        // net) but carries the −∞ sentinel so it can never win a forward
        // max-arrival-time computation.
        let outgoing = graph.outgoing_edges(const_node.id);
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].delay.typ_ns, crate::sta::HUGE_NEGATIVE_NS);
    }

    #[test]
    fn dangling_pin_emits_warning() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let model = GenericTimingModel::mid_speed_grade();
        let mut nl = Netlist::new();
        let net = nl.add_net(interner.get_or_intern("floating"));
        nl.add_block(NetlistBlock {
            name: interner.get_or_intern("out0"),
            kind: BlockKind::Iobuf { is_output: true },
            pins: vec![mkpin(&interner, "I", PinDirection::Input, PinRole::Data, Some(net))],
        });

        let _ = build_timing_graph(&nl, &model, &interner, &sink).unwrap();
        assert!(!sink.diagnostics().is_empty());
    }
}
