//! Timing graph data structures for static timing analysis.
//!
//! The [`TimingGraph`] is a device-independent directed graph of timing nodes
//! (`tnode`s) and edges (`tedge`s), arena-indexed by [`TimingNodeId`]/
//! [`TimingEdgeId`]. The node-kind taxonomy follows the original VPR timing
//! graph exactly (seventeen kinds — pads, cluster pins, primitive pins,
//! flip-flop pins, clocks, and constant generators) so the builder can assign
//! a kind to every pin in a technology-mapped netlist without inventing new
//! categories.
//!
//! Arrival/required times are *not* stored on the node: they are transient
//! analysis results produced by [`crate::sta`], kept in parallel vectors
//! indexed by [`TimingNodeId`] so the graph itself stays a plain, cheaply
//! serializable structural description.

use crate::ids::{ClockIndex, TimingEdgeId, TimingNodeId};
use aion_arch::types::Delay;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A timing graph for static timing analysis.
///
/// Contains nodes (cell pins, routing points, I/O, clocks) and directed
/// edges (delays between nodes). Built by [`crate::builder`] from a
/// pre-pack or post-pack netlist and consumed by [`crate::sta`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingGraph {
    /// All nodes in the timing graph.
    pub nodes: Vec<TimingNode>,
    /// All directed edges in the timing graph.
    pub edges: Vec<TimingEdge>,
}

impl TimingGraph {
    /// Creates an empty timing graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the timing graph and returns its ID.
    pub fn add_node(&mut self, name: String, node_type: TimingNodeType) -> TimingNodeId {
        let id = TimingNodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(TimingNode {
            id,
            name,
            node_type,
            clock_domain: None,
            clock_delay_ns: 0.0,
            is_combinational_loop_breakpoint: false,
        });
        id
    }

    /// Adds a node with a clock domain already assigned (used for clock-tree
    /// nodes built directly from a `create_clock` constraint).
    pub fn add_node_with_domain(
        &mut self,
        name: String,
        node_type: TimingNodeType,
        clock_domain: ClockIndex,
    ) -> TimingNodeId {
        let id = self.add_node(name, node_type);
        self.nodes[id.index()].clock_domain = Some(clock_domain);
        id
    }

    /// Adds a directed, live edge to the timing graph and returns its ID.
    pub fn add_edge(
        &mut self,
        from: TimingNodeId,
        to: TimingNodeId,
        delay: Delay,
        edge_type: TimingEdgeType,
    ) -> TimingEdgeId {
        let id = TimingEdgeId::from_raw(self.edges.len() as u32);
        self.edges.push(TimingEdge {
            id,
            from,
            to,
            delay,
            edge_type,
            state: EdgeState::Live,
        });
        id
    }

    /// Marks an edge as broken (removed from traversal but kept for
    /// reporting) because it closes a combinational loop or originates from
    /// a constant generator.
    pub fn break_edge(&mut self, id: TimingEdgeId, reason: EdgeState) {
        debug_assert_ne!(reason, EdgeState::Live);
        self.edges[id.index()].state = reason;
    }

    /// Returns the node with the given ID.
    pub fn node(&self, id: TimingNodeId) -> &TimingNode {
        &self.nodes[id.index()]
    }

    /// Returns a mutable reference to the node with the given ID.
    pub fn node_mut(&mut self, id: TimingNodeId) -> &mut TimingNode {
        &mut self.nodes[id.index()]
    }

    /// Returns the edge with the given ID.
    pub fn edge(&self, id: TimingEdgeId) -> &TimingEdge {
        &self.edges[id.index()]
    }

    /// Returns all *live* edges originating from the given node.
    pub fn outgoing_edges(&self, node: TimingNodeId) -> Vec<&TimingEdge> {
        self.edges
            .iter()
            .filter(|e| e.from == node && e.state == EdgeState::Live)
            .collect()
    }

    /// Returns all *live* edges arriving at the given node.
    pub fn incoming_edges(&self, node: TimingNodeId) -> Vec<&TimingEdge> {
        self.edges
            .iter()
            .filter(|e| e.to == node && e.state == EdgeState::Live)
            .collect()
    }

    /// Returns all edges originating from the given node, live or broken.
    pub fn outgoing_edges_all(&self, node: TimingNodeId) -> Vec<&TimingEdge> {
        self.edges.iter().filter(|e| e.from == node).collect()
    }

    /// Returns all edges arriving at the given node, live or broken.
    pub fn incoming_edges_all(&self, node: TimingNodeId) -> Vec<&TimingEdge> {
        self.edges.iter().filter(|e| e.to == node).collect()
    }

    /// Returns the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the total number of edges in the graph (live and broken).
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the number of edges broken by loop detection or constant
    /// propagation.
    pub fn broken_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.state != EdgeState::Live).count()
    }

    /// Returns all source nodes (nodes with no live incoming edges).
    pub fn source_nodes(&self) -> Vec<TimingNodeId> {
        let has_incoming: HashSet<TimingNodeId> = self
            .edges
            .iter()
            .filter(|e| e.state == EdgeState::Live)
            .map(|e| e.to)
            .collect();
        self.nodes
            .iter()
            .filter(|n| !has_incoming.contains(&n.id))
            .map(|n| n.id)
            .collect()
    }

    /// Returns all sink nodes (nodes with no live outgoing edges).
    pub fn sink_nodes(&self) -> Vec<TimingNodeId> {
        let has_outgoing: HashSet<TimingNodeId> = self
            .edges
            .iter()
            .filter(|e| e.state == EdgeState::Live)
            .map(|e| e.from)
            .collect();
        self.nodes
            .iter()
            .filter(|n| !has_outgoing.contains(&n.id))
            .map(|n| n.id)
            .collect()
    }

    /// Returns the IDs of nodes whose kind is [`TimingNodeType::is_endpoint`].
    pub fn endpoint_nodes(&self) -> Vec<TimingNodeId> {
        self.nodes
            .iter()
            .filter(|n| n.node_type.is_endpoint())
            .map(|n| n.id)
            .collect()
    }
}

/// A node in the timing graph (`tnode`).
///
/// Each node represents a point where timing is measured: a pad, a cluster
/// pin, a primitive pin, a flip-flop pin, or a clock-tree node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingNode {
    /// The unique ID of this node.
    pub id: TimingNodeId,
    /// Human-readable name of this node (e.g., "lut_0/O", "ff_3/D").
    pub name: String,
    /// The functional type of this node.
    pub node_type: TimingNodeType,
    /// The clock domain this node is launched/captured by, or `None` if the
    /// node has not been reached by clock propagation (`DO_NOT_ANALYSE`).
    pub clock_domain: Option<ClockIndex>,
    /// Accumulated clock-tree delay (nanoseconds) from the clock source to
    /// this node, set by [`crate::clockprop`]'s Phase A/C. Zero for nodes
    /// outside a clock tree.
    pub clock_delay_ns: f64,
    /// Set when this node was chosen as the point where a detected
    /// combinational loop is broken (§4.2). Suppresses the post-levelization
    /// node-count sanity check for this node.
    pub is_combinational_loop_breakpoint: bool,
}

/// The type of a timing graph node, mirroring VPR's seventeen `tnode` kinds.
///
/// Determines how the STA algorithm treats this node during graph
/// construction, levelization, clock propagation, and traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingNodeType {
    /// Source of a primary input pad (before any I/O delay is applied).
    InputPadSource,
    /// Output pin of an input pad, after the input delay.
    InputPadOpin,
    /// Input pin of an output pad, before the output delay.
    OutputPadIpin,
    /// Sink of a primary output pad (after the output delay is applied).
    OutputPadSink,
    /// An input pin on a logic cluster (post-pack netlist only).
    ClusterInputPin,
    /// An output pin on a logic cluster (post-pack netlist only).
    ClusterOutputPin,
    /// A routing/intermediate node with no direct timing significance of
    /// its own, kept to preserve fan-out structure.
    IntermediateNode,
    /// An input pin on a combinational primitive (e.g. a LUT input).
    PrimitiveIpin,
    /// An output pin on a combinational primitive (e.g. a LUT output).
    PrimitiveOpin,
    /// The data input pin of a flip-flop.
    FlipFlopIpin,
    /// The Q output pin of a flip-flop, immediately after the clock edge.
    FlipFlopOpin,
    /// The flip-flop's D-pin timing check node (setup/hold endpoint).
    FlipFlopSink,
    /// The flip-flop's Q-pin launch node (clock-to-Q source).
    FlipFlopSource,
    /// The clock pin of a flip-flop.
    FlipFlopClock,
    /// The root of a clock tree (a `create_clock` target or virtual clock).
    ClockSource,
    /// An output pin of a clock buffer/PLL within the clock tree.
    ClockOpin,
    /// The source of a constant generator (tied-off `0`/`1`), never
    /// analyzed: all edges leaving it are excluded from the timing graph.
    ConstantGenSource,
}

impl TimingNodeType {
    /// Returns `true` if this node type is always a path endpoint (a timing
    /// check node where arrival and required time are directly compared).
    pub fn is_endpoint(self) -> bool {
        matches!(
            self,
            TimingNodeType::OutputPadSink | TimingNodeType::FlipFlopSink
        )
    }

    /// Returns `true` if this node type is always a path startpoint (where
    /// forward propagation begins at `T_arr = clock_skew` or `0`).
    pub fn is_startpoint(self) -> bool {
        matches!(
            self,
            TimingNodeType::InputPadSource | TimingNodeType::FlipFlopSource
        )
    }

    /// Returns `true` for clock-tree node kinds.
    pub fn is_clock_node(self) -> bool {
        matches!(
            self,
            TimingNodeType::ClockSource | TimingNodeType::ClockOpin | TimingNodeType::FlipFlopClock
        )
    }
}

/// A directed edge in the timing graph representing a delay (`tedge`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingEdge {
    /// The unique ID of this edge.
    pub id: TimingEdgeId,
    /// The source node of this edge.
    pub from: TimingNodeId,
    /// The destination node of this edge.
    pub to: TimingNodeId,
    /// The propagation delay along this edge.
    pub delay: Delay,
    /// The semantic type of this edge.
    pub edge_type: TimingEdgeType,
    /// Whether this edge currently participates in traversal.
    pub state: EdgeState,
}

/// The type of a timing graph edge.
///
/// Determines how the edge's delay contributes to path timing during
/// forward/backward traversal in [`crate::sta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingEdgeType {
    /// Combinational delay through a cell (input pin to output pin).
    CellDelay,
    /// Interconnect delay along a routed net.
    NetDelay,
    /// Setup time check at a flip-flop data pin relative to clock.
    SetupCheck,
    /// Hold time check at a flip-flop data pin relative to clock.
    HoldCheck,
    /// Clock-to-output delay at a flip-flop (clock pin to Q output).
    ClockToQ,
    /// Propagation delay along the clock tree (clock source to a clock pin).
    ClockTree,
}

/// Why an edge no longer participates in traversal.
///
/// Broken edges are kept in the graph (rather than removed) so that
/// reporting can still explain *why* a node is unreachable instead of
/// silently dropping it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeState {
    /// The edge participates in traversal normally.
    Live,
    /// The edge was removed to break a detected combinational loop (§4.2).
    BrokenByLoop,
    /// The edge originates from a constant generator and is excluded from
    /// analysis entirely (§4.1 invariant 4).
    BrokenByConstant,
}
