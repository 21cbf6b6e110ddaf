//! `aion-sta analyze` — build a timing graph from a netlist file, apply an
//! SDC constraint file, and print a full timing report.
//!
//! The on-disk netlist format is a plain, human-authorable JSON document
//! (block/pin names as strings, nets as a name list) rather than a direct
//! dump of [`aion_timing::Netlist`]: that type's `Ident` fields are raw
//! interner indices, meaningful only within the process that produced
//! them, so a file written by one run couldn't be read back by another.
//! [`NetlistFile`] is interned fresh on load instead.

use std::fs;
use std::path::PathBuf;

use aion_common::Interner;
use aion_diagnostics::{DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use aion_source::SourceDb;
use aion_timing::netlist::NetId;
use aion_timing::{
    build_report, build_timing_graph, echo_timing_constraints, echo_timing_graph, levelize,
    parse_sdc, propagate_clocks, AnalyzerConfig, BlockKind, Netlist, NetlistBlock, NetlistPin,
    PinDirection, PinRole, SlackDefinition,
};
use aion_arch::GenericTimingModel;
use clap::{Args, ValueEnum};
use serde::Deserialize;
use serde_json::json;

use crate::{GlobalArgs, ReportFormat};

/// Arguments for `aion-sta analyze`.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Path to a JSON netlist file (see [`NetlistFile`]).
    #[arg(long)]
    pub netlist: PathBuf,

    /// Path to an SDC constraint file.
    #[arg(long)]
    pub sdc: PathBuf,

    /// Report output format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Slack definition to use (see spec §4.7).
    #[arg(long, value_enum, default_value_t = SlackDefinitionArg::Relaxed)]
    pub slack_definition: SlackDefinitionArg,

    /// Rebalance LUT input delays to favor the most critical logical input.
    #[arg(long)]
    pub rebalance_lut_inputs: bool,

    /// Print the resolved timing graph to stderr before analyzing.
    #[arg(long)]
    pub dump_graph: bool,

    /// Print the resolved constraint table to stderr before analyzing.
    #[arg(long)]
    pub dump_constraints: bool,
}

/// The six slack-definition policies from spec §4.7, exposed as a CLI enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SlackDefinitionArg {
    /// `R` — relaxed required time, clamped at the max arrival (default).
    Relaxed,
    /// `I` — improved, shifted against the domain's own critical path.
    Improved,
    /// `S` — shifted, with a single global denominator.
    Shifted,
    /// `G` — relaxed, with a single global denominator.
    Global,
    /// `C` — clipped: negative slack is reported as zero.
    Clipped,
    /// `N` — unnormalized, denominator is the sum of max Treq and max Tarr.
    None,
}

impl From<SlackDefinitionArg> for SlackDefinition {
    fn from(arg: SlackDefinitionArg) -> Self {
        match arg {
            SlackDefinitionArg::Relaxed => SlackDefinition::R,
            SlackDefinitionArg::Improved => SlackDefinition::I,
            SlackDefinitionArg::Shifted => SlackDefinition::S,
            SlackDefinitionArg::Global => SlackDefinition::G,
            SlackDefinitionArg::Clipped => SlackDefinition::C,
            SlackDefinitionArg::None => SlackDefinition::N,
        }
    }
}

/// On-disk netlist format: block/pin names as plain strings, nets as a
/// name list addressed by position. Converted into [`Netlist`] at load
/// time via [`NetlistFile::into_netlist`].
#[derive(Deserialize, Debug)]
pub struct NetlistFile {
    /// Net names, in index order; a pin's `net` field indexes into this list.
    pub nets: Vec<String>,
    /// Block (cell instance) declarations.
    pub blocks: Vec<BlockFile>,
}

/// One block in a [`NetlistFile`].
#[derive(Deserialize, Debug)]
pub struct BlockFile {
    /// The block's instance name.
    pub name: String,
    /// The block's functional kind.
    pub kind: BlockKindFile,
    /// The block's pins.
    pub pins: Vec<PinFile>,
}

/// A [`BlockKind`] as read from a [`NetlistFile`].
#[derive(Deserialize, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockKindFile {
    /// See [`BlockKind::Lut`].
    Lut {
        /// Number of LUT inputs.
        num_inputs: u32,
    },
    /// See [`BlockKind::Dff`].
    Dff {
        /// Whether this flip-flop has a clock-enable input pin.
        has_enable: bool,
    },
    /// See [`BlockKind::Const`].
    Const,
    /// See [`BlockKind::Pll`].
    Pll,
    /// See [`BlockKind::Iobuf`].
    Iobuf {
        /// `true` for an output pad, `false` for an input pad.
        is_output: bool,
    },
    /// See [`BlockKind::Cluster`].
    Cluster,
}

impl From<BlockKindFile> for BlockKind {
    fn from(kind: BlockKindFile) -> Self {
        match kind {
            BlockKindFile::Lut { num_inputs } => BlockKind::Lut { num_inputs },
            BlockKindFile::Dff { has_enable } => BlockKind::Dff { has_enable },
            BlockKindFile::Const => BlockKind::Const,
            BlockKindFile::Pll => BlockKind::Pll,
            BlockKindFile::Iobuf { is_output } => BlockKind::Iobuf { is_output },
            BlockKindFile::Cluster => BlockKind::Cluster,
        }
    }
}

/// A [`NetlistPin`] as read from a [`NetlistFile`].
#[derive(Deserialize, Debug)]
pub struct PinFile {
    /// The pin's name within its block.
    pub name: String,
    /// Data direction.
    pub direction: PinDirectionFile,
    /// Delay-model role.
    pub role: PinRoleFile,
    /// Index into the enclosing [`NetlistFile::nets`] list, if connected.
    pub net: Option<usize>,
}

/// A [`PinDirection`] as read from a [`NetlistFile`].
#[derive(Deserialize, Debug)]
#[serde(rename_all = "snake_case")]
pub enum PinDirectionFile {
    /// See [`PinDirection::Input`].
    Input,
    /// See [`PinDirection::Output`].
    Output,
    /// See [`PinDirection::Clock`].
    Clock,
}

impl From<PinDirectionFile> for PinDirection {
    fn from(d: PinDirectionFile) -> Self {
        match d {
            PinDirectionFile::Input => PinDirection::Input,
            PinDirectionFile::Output => PinDirection::Output,
            PinDirectionFile::Clock => PinDirection::Clock,
        }
    }
}

/// A [`PinRole`] as read from a [`NetlistFile`].
#[derive(Deserialize, Debug)]
#[serde(rename_all = "snake_case")]
pub enum PinRoleFile {
    /// See [`PinRole::Data`].
    Data,
    /// See [`PinRole::Clock`].
    Clock,
    /// See [`PinRole::Reset`].
    Reset,
    /// See [`PinRole::Enable`].
    Enable,
}

impl From<PinRoleFile> for PinRole {
    fn from(r: PinRoleFile) -> Self {
        match r {
            PinRoleFile::Data => PinRole::Data,
            PinRoleFile::Clock => PinRole::Clock,
            PinRoleFile::Reset => PinRole::Reset,
            PinRoleFile::Enable => PinRole::Enable,
        }
    }
}

impl NetlistFile {
    /// Interns every name through `interner` and builds the real
    /// [`Netlist`] the builder consumes. Net indices are preserved
    /// one-to-one: [`Netlist::add_net`] assigns [`NetId`]s in push order,
    /// and nets are pushed in the same order they appear in `self.nets`.
    pub fn into_netlist(self, interner: &Interner) -> Netlist {
        let mut nl = Netlist::new();
        for name in &self.nets {
            nl.add_net(interner.get_or_intern(name));
        }

        for block in self.blocks {
            let pins = block
                .pins
                .into_iter()
                .map(|p| NetlistPin {
                    name: interner.get_or_intern(&p.name),
                    direction: p.direction.into(),
                    role: p.role.into(),
                    net: p.net.map(|i| NetId(i as u32)),
                })
                .collect();
            nl.add_block(NetlistBlock {
                name: interner.get_or_intern(&block.name),
                kind: block.kind.into(),
                pins,
            });
        }

        nl
    }
}

/// Runs `aion-sta analyze`.
///
/// Returns `Ok(0)` if timing is met, `Ok(1)` if any endpoint has negative
/// slack, or an `Err` (a [`aion_timing::TimingError`] in practice) on a
/// malformed netlist/SDC that prevents analysis from running at all.
pub fn run(args: &AnalyzeArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let netlist_json = fs::read_to_string(&args.netlist)?;
    let netlist_file: NetlistFile = serde_json::from_str(&netlist_json)?;
    let sdc_source = fs::read_to_string(&args.sdc)?;

    let interner = Interner::new();
    let sink = DiagnosticSink::new();

    let mut constraints = parse_sdc(&sdc_source, &interner, &sink)?;
    let netlist = netlist_file.into_netlist(&interner);
    let model = GenericTimingModel::default();

    let mut graph = build_timing_graph(&netlist, &model, &interner, &sink)?;
    propagate_clocks(&mut graph, &constraints, &interner, &sink)?;
    aion_timing::prune_unreachable_domain_pairs(&graph, &mut constraints);

    let mut levels = levelize(&graph);
    if !levels.complete {
        aion_timing::break_combinational_loops(&mut graph, &sink);
        levels = levelize(&graph);
    }

    if args.dump_constraints {
        eprintln!("{}", echo_timing_constraints(&constraints, &interner));
    }
    if args.dump_graph {
        eprintln!("{}", echo_timing_graph(&graph));
    }

    let config = AnalyzerConfig {
        slack_definition: args.slack_definition.into(),
        rebalance_lut_inputs: args.rebalance_lut_inputs,
        final_analysis: true,
    };
    let report = build_report(&graph, &constraints, &levels, &model, &interner, &config);

    let diagnostics = sink.diagnostics();
    if !global.quiet {
        let source_db = SourceDb::new();
        let renderer = TerminalRenderer::new(global.color, 80);
        for diag in &diagnostics {
            eprintln!("{}", renderer.render(diag, &source_db));
        }
    }

    match args.format {
        ReportFormat::Text => print_text_report(&report),
        ReportFormat::Json => print_json_report(&report),
    }

    Ok(if report.met { 0 } else { 1 })
}

fn print_text_report(report: &aion_timing::TimingReport) {
    println!("timing: {}", if report.met { "MET" } else { "VIOLATED" });
    println!("worst slack: {:.3} ns", report.worst_slack_ns);
    if let Some(path) = &report.critical_path {
        println!(
            "critical path: {} -> {} ({:.3} ns, slack {:.3} ns)",
            path.src.as_raw(),
            path.snk.as_raw(),
            path.delay_ns,
            path.slack_ns
        );
        for elem in &path.elements {
            println!("  {} @ {:.3} ns (+{:.3})", elem.name, elem.t_arr_ns, elem.incremental_delay_ns);
        }
    }
    for domain in &report.domains {
        println!(
            "domain {}: period {:.3} ns, fmax {} MHz, worst slack {}",
            domain.name,
            domain.period_ns,
            domain.fmax_mhz.map(|f| format!("{f:.1}")).unwrap_or_else(|| "n/a".into()),
            domain.worst_slack_ns.map(|s| format!("{s:.3} ns")).unwrap_or_else(|| "n/a".into()),
        );
    }
}

fn print_json_report(report: &aion_timing::TimingReport) {
    let domains: Vec<_> = report
        .domains
        .iter()
        .map(|d| {
            json!({
                "name": d.name,
                "period_ns": d.period_ns,
                "cpd_ns": d.cpd_ns,
                "fmax_mhz": d.fmax_mhz,
                "worst_slack_ns": d.worst_slack_ns,
            })
        })
        .collect();
    let critical_path = report.critical_path.as_ref().map(|p| {
        json!({
            "delay_ns": p.delay_ns,
            "slack_ns": p.slack_ns,
            "elements": p.elements.iter().map(|e| json!({
                "name": e.name,
                "t_arr_ns": e.t_arr_ns,
                "incremental_delay_ns": e.incremental_delay_ns,
            })).collect::<Vec<_>>(),
        })
    });
    let value = json!({
        "met": report.met,
        "worst_slack_ns": report.worst_slack_ns,
        "critical_path": critical_path,
        "domains": domains,
        "geomean_period_ns": report.geomean_period_ns,
        "fanout_weighted_geomean_period_ns": report.fanout_weighted_geomean_period_ns,
    });
    println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn netlist_file_converts_a_simple_design() {
        let json = r#"
        {
            "nets": ["data_net"],
            "blocks": [
                { "name": "in0", "kind": "iobuf", "is_output": false,
                  "pins": [{ "name": "O", "direction": "output", "role": "data", "net": 0 }] },
                { "name": "out0", "kind": "iobuf", "is_output": true,
                  "pins": [{ "name": "I", "direction": "input", "role": "data", "net": 0 }] }
            ]
        }
        "#;
        let file: NetlistFile = serde_json::from_str(json).unwrap();
        let interner = Interner::new();
        let nl = file.into_netlist(&interner);
        assert_eq!(nl.blocks.len(), 2);
        assert_eq!(nl.nets.len(), 1);
    }

    #[test]
    fn run_reports_met_for_simple_design() {
        let netlist = write_temp(
            r#"{
                "nets": ["n1"],
                "blocks": [
                    { "name": "data_in", "kind": "iobuf", "is_output": false,
                      "pins": [{ "name": "O", "direction": "output", "role": "data", "net": 0 }] },
                    { "name": "data_out", "kind": "iobuf", "is_output": true,
                      "pins": [{ "name": "I", "direction": "input", "role": "data", "net": 0 }] }
                ]
            }"#,
        );
        let sdc = write_temp(
            "create_clock -period 10.0 -name clk clk_port\nset_input_delay -clock clk 1.0 data_in\nset_output_delay -clock clk 1.0 data_out",
        );

        let args = AnalyzeArgs {
            netlist: netlist.path().to_path_buf(),
            sdc: sdc.path().to_path_buf(),
            format: ReportFormat::Text,
            slack_definition: SlackDefinitionArg::Relaxed,
            rebalance_lut_inputs: false,
            dump_graph: false,
            dump_constraints: false,
        };
        let global = GlobalArgs { quiet: true, color: false };

        let code = run(&args, &global).unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn run_fails_on_malformed_sdc() {
        let netlist = write_temp(r#"{ "nets": [], "blocks": [] }"#);
        let sdc = write_temp("create_clock -name clk clk_port");

        let args = AnalyzeArgs {
            netlist: netlist.path().to_path_buf(),
            sdc: sdc.path().to_path_buf(),
            format: ReportFormat::Text,
            slack_definition: SlackDefinitionArg::Relaxed,
            rebalance_lut_inputs: false,
            dump_graph: false,
            dump_constraints: false,
        };
        let global = GlobalArgs { quiet: true, color: false };

        assert!(run(&args, &global).is_err());
    }
}
