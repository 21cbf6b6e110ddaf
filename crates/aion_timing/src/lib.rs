//! Static timing analysis and constraint management for the Aion FPGA toolchain.
//!
//! This crate provides SDC constraint parsing, a device-independent timing
//! graph representation, clock propagation, and a static timing analysis
//! (STA) engine. It computes arrival times, required times, and slack at
//! every endpoint, then extracts critical paths and renders a full report.
//!
//! # Usage
//!
//! ```ignore
//! use aion_timing::{
//!     parse_sdc, build_timing_graph, propagate_clocks, prune_unreachable_domain_pairs,
//!     levelize, build_report,
//! };
//!
//! let mut constraints = parse_sdc(sdc_source, &interner, &sink)?;
//! let mut graph = build_timing_graph(&netlist, &model, &interner, &sink)?;
//! propagate_clocks(&mut graph, &constraints, &interner, &sink)?;
//! prune_unreachable_domain_pairs(&graph, &mut constraints);
//! let levels = levelize(&graph);
//! let report = build_report(&graph, &constraints, &levels, &model, &interner, &config);
//! println!("met: {}, worst slack: {:.3} ns", report.met, report.worst_slack_ns);
//! ```
//!
//! # Architecture
//!
//! - [`netlist`] — pin-level netlist types consumed by the builder
//! - [`builder`] — timing graph construction from a flattened netlist
//! - [`graph`] — device-independent timing graph (nodes + delay edges)
//! - [`levelize`] — BFS levelization and combinational loop breaking
//! - [`pattern`] — regex-subset matcher for SDC target lists
//! - [`constraints`] — timing constraint types (clocks, I/O delays, exceptions)
//! - [`edgecount`] — LCM-based edge-count constraint calculation
//! - [`sdc`] — SDC file parser
//! - [`clockprop`] — clock domain/skew propagation and pre-analysis pruning
//! - [`sta`] — STA algorithm (forward/backward propagation, slack, criticality)
//! - [`report`] — critical path extraction, histograms, echo dumps
//! - [`errors`] — [`TimingError`], the fatal error type for this crate

#![warn(missing_docs)]

pub mod builder;
pub mod clockprop;
pub mod constraints;
pub mod edgecount;
pub mod errors;
pub mod graph;
pub mod ids;
pub mod levelize;
pub mod netlist;
pub mod pattern;
pub mod report;
pub mod sdc;
pub mod sta;

pub use builder::build_timing_graph;
pub use clockprop::{propagate_clocks, prune_unreachable_domain_pairs};
pub use constraints::{
    ClockConstraint, FalsePath, IoDelay, OverrideConstraint, TimingConstraints,
};
pub use errors::TimingError;
pub use graph::{TimingEdge, TimingEdgeType, TimingGraph, TimingNode, TimingNodeType};
pub use ids::{ClockIndex, TimingEdgeId, TimingNodeId};
pub use levelize::{break_combinational_loops, levelize, Levelization};
pub use netlist::{BlockKind, Netlist, NetlistBlock, NetlistPin, PinDirection, PinRole};
pub use report::{
    build_report, echo_timing_constraints, echo_timing_graph, ClockDomainTiming, CriticalPath,
    Histogram, PathElement, TimingEndpoint, TimingReport,
};
pub use sdc::parse_sdc;
pub use sta::{analyze_timing, AnalysisResult, AnalyzerConfig, SlackDefinition};

use std::cell::Cell;
use std::marker::PhantomData;

/// The single mutable-state value an analysis run operates on: the timing
/// graph, the resolved constraint store, and the last [`AnalysisResult`].
///
/// Deliberately **not** `Sync` (the `PhantomData<Cell<()>>` marker
/// suppresses the compiler's auto-derived `Sync` impl while leaving `Send`
/// intact) — concurrent analysis calls sharing one context are a
/// compile-time error, matching §5's single-threaded-cooperative model.
/// Independent contexts may each be handed to their own thread.
pub struct AnalyzerContext {
    /// The timing graph under analysis.
    pub graph: TimingGraph,
    /// The resolved constraint store.
    pub constraints: TimingConstraints,
    /// The most recent analysis result, if `analyze` has been called.
    pub last_result: Option<AnalysisResult>,
    _not_sync: PhantomData<Cell<()>>,
}

impl AnalyzerContext {
    /// Creates a context from an already-built graph and constraint store.
    pub fn new(graph: TimingGraph, constraints: TimingConstraints) -> Self {
        Self { graph, constraints, last_result: None, _not_sync: PhantomData }
    }

    /// Prunes unreachable domain pairs (assumes `propagate_clocks` has
    /// already run), runs levelization (breaking any combinational loop
    /// first), then STA, storing the result on the context and returning
    /// it by reference.
    pub fn analyze(
        &mut self,
        model: &dyn aion_arch::DeviceTimingModel,
        interner: &aion_common::Interner,
        sink: &aion_diagnostics::DiagnosticSink,
        config: &AnalyzerConfig,
    ) -> &AnalysisResult {
        clockprop::prune_unreachable_domain_pairs(&self.graph, &mut self.constraints);
        let mut levels = levelize::levelize(&self.graph);
        if !levels.complete {
            levelize::break_combinational_loops(&mut self.graph, sink);
            levels = levelize::levelize(&self.graph);
        }
        let result = sta::analyze_timing(&self.graph, &self.constraints, &levels, model, interner, config);
        self.last_result = Some(result);
        self.last_result.as_ref().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::{NetId, NetlistPin};
    use aion_arch::GenericTimingModel;
    use aion_common::Interner;
    use aion_diagnostics::DiagnosticSink;

    fn mkpin(interner: &Interner, name: &str, dir: PinDirection, role: PinRole, net: Option<NetId>) -> NetlistPin {
        NetlistPin { name: interner.get_or_intern(name), direction: dir, role, net }
    }

    #[test]
    fn full_pipeline_parse_and_analyze() {
        let sdc_source = r#"
create_clock -period 10.0 -name clk clk_port
set_input_delay -clock clk 2.0 data_in
set_output_delay -clock clk 1.0 data_out
"#;
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let constraints = parse_sdc(sdc_source, &interner, &sink).unwrap();
        assert_eq!(constraints.clock_count(), 1);

        let model = GenericTimingModel::mid_speed_grade();
        let mut nl = Netlist::new();
        let data_net = nl.add_net(interner.get_or_intern("data_net"));
        let lut_out_net = nl.add_net(interner.get_or_intern("lut_out_net"));

        nl.add_block(NetlistBlock {
            name: interner.get_or_intern("data_in"),
            kind: BlockKind::Iobuf { is_output: false },
            pins: vec![mkpin(&interner, "O", PinDirection::Output, PinRole::Data, Some(data_net))],
        });
        nl.add_block(NetlistBlock {
            name: interner.get_or_intern("lut0"),
            kind: BlockKind::Lut { num_inputs: 1 },
            pins: vec![
                mkpin(&interner, "I0", PinDirection::Input, PinRole::Data, Some(data_net)),
                mkpin(&interner, "O", PinDirection::Output, PinRole::Data, Some(lut_out_net)),
            ],
        });
        nl.add_block(NetlistBlock {
            name: interner.get_or_intern("data_out"),
            kind: BlockKind::Iobuf { is_output: true },
            pins: vec![mkpin(&interner, "I", PinDirection::Input, PinRole::Data, Some(lut_out_net))],
        });

        let mut graph = build_timing_graph(&nl, &model, &interner, &sink).unwrap();
        propagate_clocks(&mut graph, &constraints, &interner, &sink).unwrap();
        let levels = levelize(&graph);
        assert!(levels.complete);

        let config = AnalyzerConfig { final_analysis: true, ..AnalyzerConfig::default() };
        let report = build_report(&graph, &constraints, &levels, &model, &interner, &config);

        assert!(report.met);
        // 2.0 (input delay) + 0.2 (lut) + 1.0 (output delay) = 3.2; budget 10.0.
        assert!((report.worst_slack_ns - 6.8).abs() < 1e-6);
    }

    #[test]
    fn full_pipeline_timing_violation() {
        let sdc_source = "create_clock -period 2.0 -name clk clk_port\nset_input_delay -clock clk 1.0 data_in\nset_output_delay -clock clk 1.0 data_out";
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let constraints = parse_sdc(sdc_source, &interner, &sink).unwrap();

        let model = GenericTimingModel::mid_speed_grade();
        let mut nl = Netlist::new();
        let net = nl.add_net(interner.get_or_intern("n1"));

        nl.add_block(NetlistBlock {
            name: interner.get_or_intern("data_in"),
            kind: BlockKind::Iobuf { is_output: false },
            pins: vec![mkpin(&interner, "O", PinDirection::Output, PinRole::Data, Some(net))],
        });
        nl.add_block(NetlistBlock {
            name: interner.get_or_intern("data_out"),
            kind: BlockKind::Iobuf { is_output: true },
            pins: vec![mkpin(&interner, "I", PinDirection::Input, PinRole::Data, Some(net))],
        });

        let mut graph = build_timing_graph(&nl, &model, &interner, &sink).unwrap();
        propagate_clocks(&mut graph, &constraints, &interner, &sink).unwrap();
        let levels = levelize(&graph);

        let config = AnalyzerConfig { final_analysis: true, ..AnalyzerConfig::default() };
        let report = build_report(&graph, &constraints, &levels, &model, &interner, &config);

        // 1.0 + 1.0 = 2.0 against a 2.0ns budget: slack is exactly zero, met.
        assert!((report.worst_slack_ns - 0.0).abs() < 1e-6);
        assert!(report.met);
    }

    #[test]
    fn analyzer_context_analyze_populates_last_result() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let constraints = parse_sdc("create_clock -period 10.0 -name clk clk_port", &interner, &sink).unwrap();

        let model = GenericTimingModel::mid_speed_grade();
        let mut nl = Netlist::new();
        nl.add_block(NetlistBlock {
            name: interner.get_or_intern("data_in"),
            kind: BlockKind::Iobuf { is_output: false },
            pins: vec![mkpin(&interner, "O", PinDirection::Output, PinRole::Data, None)],
        });
        let graph = build_timing_graph(&nl, &model, &interner, &sink).unwrap();

        let mut ctx = AnalyzerContext::new(graph, constraints);
        assert!(ctx.last_result.is_none());
        ctx.analyze(&model, &interner, &sink, &AnalyzerConfig::default());
        assert!(ctx.last_result.is_some());
    }

    #[test]
    fn reexports_available() {
        let _ = TimingConstraints::new();
        let _ = TimingGraph::new();
        let _ = TimingReport::empty();
        let _ = TimingNodeId::from_raw(0);
        let _ = TimingEdgeId::from_raw(0);
        let _ = ClockIndex::from_raw(0);
    }
}
