//! Pin-level netlist adapter consumed by [`crate::builder`].
//!
//! The timing graph is built from a flattened, pin-level view of the
//! design rather than the RTL-level signal/module IR: by the time timing
//! analysis runs, the netlist has already been synthesized and
//! technology-mapped, and every primitive is one of a small set of timing
//! kinds (LUT, flip-flop, constant generator, clock buffer, I/O pad).
//! [`BlockKind`] mirrors that primitive set using the same names as the
//! synthesis IR's cell kinds (`Lut`, `Dff`, `Const`, `Pll`, `Iobuf`) so a
//! caller translating from that IR to this one is a near-direct mapping,
//! without this crate depending on the IR crate itself — a timing
//! analyzer should be usable against any front end that can produce this
//! flattened shape, VPR-derived flows included.
//!
//! Both pre-pack (atom) and post-pack (cluster) netlists use the same
//! types; [`NetlistBlock::is_primitive`] distinguishes a technology
//! primitive from a packed-cluster boundary pin when the builder needs to
//! know which [`crate::graph::TimingNodeType`] variants apply.

use aion_common::Ident;
use serde::{Deserialize, Serialize};

/// The functional kind of a netlist block, matching the technology-mapped
/// primitive set produced after synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    /// A look-up table with the given number of inputs.
    Lut {
        /// Number of LUT inputs.
        num_inputs: u32,
    },
    /// A D flip-flop, optionally with a clock-enable pin.
    Dff {
        /// Whether this flip-flop has a clock-enable input pin.
        has_enable: bool,
    },
    /// A tied-off constant generator (drives a `0` or `1`).
    Const,
    /// A PLL/clock-management primitive producing one or more derived
    /// clocks from an input clock.
    Pll,
    /// An input or output pad buffer.
    Iobuf {
        /// `true` for an output pad, `false` for an input pad.
        is_output: bool,
    },
    /// A packed logic cluster boundary (post-pack netlists only); carries
    /// no delay of its own, just groups primitives for routing.
    Cluster,
}

/// The direction of a [`NetlistPin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinDirection {
    /// Data or clock flows into the block through this pin.
    Input,
    /// Data flows out of the block through this pin.
    Output,
    /// This pin is a clock input specifically (distinguished from a data
    /// input so the builder can emit [`crate::graph::TimingNodeType::FlipFlopClock`]).
    Clock,
}

/// The role a pin plays for delay-model lookup and graph construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinRole {
    /// An ordinary data pin.
    Data,
    /// The clock pin of a sequential primitive.
    Clock,
    /// A synchronous reset pin (edge ignored for combinational delay,
    /// but still a timing-checked input).
    Reset,
    /// A clock-enable pin.
    Enable,
}

/// A single pin on a [`NetlistBlock`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetlistPin {
    /// The pin's name within its block (e.g. `"I0"`, `"Q"`, `"CLK"`).
    pub name: Ident,
    /// Data direction.
    pub direction: PinDirection,
    /// Delay-model role.
    pub role: PinRole,
    /// The net this pin connects to, or `None` if unconnected.
    pub net: Option<NetId>,
}

/// A block (cell instance) in the flattened netlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetlistBlock {
    /// The block's instance name, used to build timing-graph node names.
    pub name: Ident,
    /// The functional kind of this block.
    pub kind: BlockKind,
    /// All pins on this block, in declaration order.
    pub pins: Vec<NetlistPin>,
}

impl NetlistBlock {
    /// Returns `true` if this block is a technology primitive (LUT, DFF,
    /// constant generator, PLL, I/O buffer) rather than a cluster boundary.
    pub fn is_primitive(&self) -> bool {
        !matches!(self.kind, BlockKind::Cluster)
    }

    /// Returns the pin with the given role, if exactly one exists.
    pub fn pin_with_role(&self, role: PinRole) -> Option<&NetlistPin> {
        self.pins.iter().find(|p| p.role == role)
    }

    /// Returns all pins with the given direction.
    pub fn pins_with_direction(&self, direction: PinDirection) -> Vec<&NetlistPin> {
        self.pins.iter().filter(|p| p.direction == direction).collect()
    }
}

/// Opaque index of a net within a [`Netlist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetId(pub u32);

/// A net connecting one driver pin to zero or more sink pins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Net {
    /// The net's name, used for `-from`/`-to` SDC matching when it
    /// coincides with a primary I/O or register name.
    pub name: Ident,
}

/// A flattened, pin-level netlist ready for timing-graph construction.
///
/// Either a pre-pack (atom-level, one block per primitive) or post-pack
/// (cluster-level, with [`BlockKind::Cluster`] boundary blocks inserted)
/// netlist can be represented with this type; [`crate::builder`] treats
/// both uniformly, differing only in which [`NetlistBlock::is_primitive`]
/// nodes exist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Netlist {
    /// All blocks in the netlist, in no particular order.
    pub blocks: Vec<NetlistBlock>,
    /// All nets in the netlist, indexed by [`NetId`].
    pub nets: Vec<Net>,
}

impl Netlist {
    /// Creates an empty netlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a block and returns its index within [`Netlist::blocks`].
    pub fn add_block(&mut self, block: NetlistBlock) -> usize {
        self.blocks.push(block);
        self.blocks.len() - 1
    }

    /// Adds a net and returns its [`NetId`].
    pub fn add_net(&mut self, name: Ident) -> NetId {
        let id = NetId(self.nets.len() as u32);
        self.nets.push(Net { name });
        id
    }

    /// Returns the net with the given ID.
    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.0 as usize]
    }

    /// Returns every block whose output pins include a driver for `net`.
    pub fn drivers_of(&self, net: NetId) -> Vec<&NetlistBlock> {
        self.blocks
            .iter()
            .filter(|b| {
                b.pins
                    .iter()
                    .any(|p| p.direction != PinDirection::Input && p.net == Some(net))
            })
            .collect()
    }

    /// Returns every block with an input pin connected to `net`.
    pub fn sinks_of(&self, net: NetId) -> Vec<&NetlistBlock> {
        self.blocks
            .iter()
            .filter(|b| {
                b.pins
                    .iter()
                    .any(|p| p.direction == PinDirection::Input && p.net == Some(net))
            })
            .collect()
    }
}
