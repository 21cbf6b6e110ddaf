//! Timing report construction: critical path extraction, per-domain
//! summaries, slack/criticality histograms, and echo dumps.
//!
//! None of this module mutates [`TimingGraph`]/[`TimingConstraints`]; it
//! consumes an already-computed [`crate::sta::AnalysisResult`] (plus a
//! fresh re-run of the single worst `(src, snk)` pair to recover that
//! pair's `T_arr`/`T_req`, per spec.md §4.8) and renders it into the types
//! below.

use crate::constraints::TimingConstraints;
use crate::graph::{EdgeState, TimingGraph, TimingNodeType};
use crate::ids::{ClockIndex, TimingNodeId};
use crate::levelize::Levelization;
use crate::sta::{self, AnalysisResult, AnalyzerConfig, HUGE_POSITIVE_NS};
use aion_arch::DeviceTimingModel;
use aion_common::Interner;

/// One endpoint in a rendered report: a sink node with its final slack and
/// criticality.
#[derive(Debug, Clone)]
pub struct TimingEndpoint {
    /// The endpoint node.
    pub node: TimingNodeId,
    /// Its name, as assigned by the builder.
    pub name: String,
    /// Slack in nanoseconds; [`HUGE_POSITIVE_NS`] if never analyzed.
    pub slack_ns: f64,
    /// Timing criticality in `[0, 1]`.
    pub criticality: f64,
}

/// One node along an extracted critical path.
#[derive(Debug, Clone)]
pub struct PathElement {
    /// The node at this hop.
    pub node: TimingNodeId,
    /// Its name.
    pub name: String,
    /// Arrival time at this node, nanoseconds.
    pub t_arr_ns: f64,
    /// Delay of the edge that was just traversed to reach this node (zero
    /// for the first element).
    pub incremental_delay_ns: f64,
}

/// The worst path through one `(src, snk)` clock domain pair.
#[derive(Debug, Clone)]
pub struct CriticalPath {
    /// Launch clock domain.
    pub src: ClockIndex,
    /// Capture clock domain.
    pub snk: ClockIndex,
    /// Path nodes in traversal order, startpoint first.
    pub elements: Vec<PathElement>,
    /// Total path delay in nanoseconds (last element's arrival time).
    pub delay_ns: f64,
    /// Slack at the endpoint this path terminates at.
    pub slack_ns: f64,
}

/// Per-clock-domain timing summary.
#[derive(Debug, Clone)]
pub struct ClockDomainTiming {
    /// The clock domain.
    pub clock: ClockIndex,
    /// Its name.
    pub name: String,
    /// Its constrained period, nanoseconds.
    pub period_ns: f64,
    /// Critical path delay for the intra-domain (`clock`, `clock`) pair,
    /// `None` if that pair was never analyzed.
    pub cpd_ns: Option<f64>,
    /// `1.0 / cpd_ns`, in MHz; `None` if `cpd_ns` is `None` or zero.
    pub fmax_mhz: Option<f64>,
    /// Worst (least) slack among this domain's endpoints.
    pub worst_slack_ns: Option<f64>,
}

/// A 5-linear-bucket-plus-unanalysed histogram over slack or criticality
/// values, per spec.md §4.8.
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Lower bound of the histogram's analyzed range.
    pub lower_bound: f64,
    /// Upper bound of the histogram's analyzed range.
    pub upper_bound: f64,
    /// Count of values in each of the 5 equal-width buckets spanning
    /// `[lower_bound, upper_bound]`.
    pub buckets: [usize; 5],
    /// Count of sentinel ([`HUGE_POSITIVE_NS`]-valued) entries, kept out of
    /// the linear buckets since they would otherwise swamp bucket 5.
    pub unanalysed: usize,
}

impl Histogram {
    fn build(values: impl Iterator<Item = f64>, lower_bound: f64, upper_bound: f64) -> Self {
        let mut buckets = [0usize; 5];
        let mut unanalysed = 0usize;
        let span = (upper_bound - lower_bound).max(1e-12);

        for v in values {
            if v >= HUGE_POSITIVE_NS {
                unanalysed += 1;
                continue;
            }
            let clamped = v.clamp(lower_bound, upper_bound);
            let mut bucket = (((clamped - lower_bound) / span) * 5.0) as usize;
            if bucket >= 5 {
                bucket = 4;
            }
            buckets[bucket] += 1;
        }

        Histogram { lower_bound, upper_bound, buckets, unanalysed }
    }
}

/// The full rendered timing report for one [`AnalyzerConfig`] run.
#[derive(Debug, Clone)]
pub struct TimingReport {
    /// `true` if no endpoint has negative slack.
    pub met: bool,
    /// The minimum slack across every analyzed endpoint, nanoseconds.
    /// [`HUGE_POSITIVE_NS`] if nothing was analyzed.
    pub worst_slack_ns: f64,
    /// The extracted worst-case critical path, `None` if no pair was ever
    /// analyzed.
    pub critical_path: Option<CriticalPath>,
    /// Per-clock-domain summaries, in clock declaration order.
    pub domains: Vec<ClockDomainTiming>,
    /// Histogram over every edge's final slack.
    pub slack_histogram: Histogram,
    /// Histogram over every edge's final timing criticality.
    pub criticality_histogram: Histogram,
    /// Geometric mean of every analyzed domain's own period, nanoseconds.
    /// `None` for a design with no intra-domain pair analyzed.
    pub geomean_period_ns: Option<f64>,
    /// Same geometric mean, weighted by each domain's endpoint count.
    pub fanout_weighted_geomean_period_ns: Option<f64>,
}

impl TimingReport {
    /// An empty report with no endpoints analyzed, used as a starting
    /// point before any analysis has run.
    pub fn empty() -> Self {
        TimingReport {
            met: true,
            worst_slack_ns: HUGE_POSITIVE_NS,
            critical_path: None,
            domains: Vec::new(),
            slack_histogram: Histogram::build(std::iter::empty(), 0.0, 1.0),
            criticality_histogram: Histogram::build(std::iter::empty(), 0.0, 1.0),
            geomean_period_ns: None,
            fanout_weighted_geomean_period_ns: None,
        }
    }
}

/// Runs STA and renders a full [`TimingReport`], including critical path
/// extraction and per-domain summaries.
pub fn build_report(
    graph: &TimingGraph,
    constraints: &TimingConstraints,
    levels: &Levelization,
    model: &dyn DeviceTimingModel,
    interner: &Interner,
    config: &AnalyzerConfig,
) -> TimingReport {
    let result = sta::analyze_timing(graph, constraints, levels, model, interner, config);

    let worst_slack_ns = result
        .slack_ns
        .iter()
        .copied()
        .filter(|s| *s < HUGE_POSITIVE_NS)
        .fold(HUGE_POSITIVE_NS, f64::min);
    let met = worst_slack_ns >= 0.0;

    let critical_path = extract_critical_path(graph, constraints, levels, model, interner, config, &result);

    let domains = build_domain_summaries(graph, constraints, interner, &result);
    let (geomean_period_ns, fanout_weighted_geomean_period_ns) = geomean_periods(graph, constraints, &domains);

    let slack_histogram = Histogram::build(result.slack_ns.iter().copied(), -1.0, 1.0);
    let criticality_histogram = Histogram::build(result.timing_criticality.iter().copied(), 0.0, 1.0);

    TimingReport {
        met,
        worst_slack_ns,
        critical_path,
        domains,
        slack_histogram,
        criticality_histogram,
        geomean_period_ns,
        fanout_weighted_geomean_period_ns,
    }
}

/// Picks the `(src, snk)` pair with the smallest least-slack, re-runs it to
/// recover `T_arr`/`T_req`, then walks forward from the minimum-slack
/// level-0 node choosing the minimum-slack fan-out at each hop until a
/// sink is reached, per spec.md §4.8.
fn extract_critical_path(
    graph: &TimingGraph,
    constraints: &TimingConstraints,
    levels: &Levelization,
    model: &dyn DeviceTimingModel,
    interner: &Interner,
    config: &AnalyzerConfig,
    result: &AnalysisResult,
) -> Option<CriticalPath> {
    let mut worst: Option<(ClockIndex, ClockIndex, f64)> = None;
    for (src, row) in result.least_slack_ns.iter().enumerate() {
        for (snk, slack) in row.iter().enumerate() {
            let Some(slack) = slack else { continue };
            if worst.map_or(true, |(_, _, w)| *slack < w) {
                worst = Some((ClockIndex::from_raw(src as u32), ClockIndex::from_raw(snk as u32), *slack));
            }
        }
    }
    let (src, snk, slack_ns) = worst?;

    let pair = sta::run_pair(graph, constraints, levels, model, interner, src, snk, config);

    let start = levels
        .levels
        .first()?
        .iter()
        .filter(|&&n| pair.t_arr_ns[n.index()].is_some())
        .min_by(|&&a, &&b| {
            let sa = graph.outgoing_edges(a).iter().filter_map(|e| pair.t_req_ns[e.to.index()]).fold(f64::INFINITY, f64::min);
            let sb = graph.outgoing_edges(b).iter().filter_map(|e| pair.t_req_ns[e.to.index()]).fold(f64::INFINITY, f64::min);
            sa.partial_cmp(&sb).unwrap()
        })
        .copied()?;

    let mut elements = vec![PathElement {
        node: start,
        name: graph.node(start).name.clone(),
        t_arr_ns: pair.t_arr_ns[start.index()].unwrap_or(0.0),
        incremental_delay_ns: 0.0,
    }];

    let mut current = start;
    loop {
        if graph.node(current).node_type.is_endpoint() {
            break;
        }
        let outgoing = graph.outgoing_edges(current);
        let next = outgoing
            .iter()
            .filter_map(|e| {
                let t_req = pair.t_req_ns[e.to.index()]?;
                let t_arr = pair.t_arr_ns[e.to.index()]?;
                Some((e.to, e.delay.typ_ns, t_req - t_arr))
            })
            .min_by(|a, b| a.2.partial_cmp(&b.2).unwrap());
        let Some((next_node, delay, _)) = next else { break };

        elements.push(PathElement {
            node: next_node,
            name: graph.node(next_node).name.clone(),
            t_arr_ns: pair.t_arr_ns[next_node.index()].unwrap_or(0.0),
            incremental_delay_ns: delay,
        });
        current = next_node;
    }

    let delay_ns = elements.last().map(|e| e.t_arr_ns).unwrap_or(0.0);
    Some(CriticalPath { src, snk, elements, delay_ns, slack_ns })
}

fn build_domain_summaries(
    graph: &TimingGraph,
    constraints: &TimingConstraints,
    interner: &Interner,
    result: &AnalysisResult,
) -> Vec<ClockDomainTiming> {
    (0..constraints.clock_count())
        .map(|i| {
            let idx = ClockIndex::from_raw(i as u32);
            let clock = constraints.clock(idx);
            let cpd_ns = result.cpd_ns[i][i];
            let fmax_mhz = cpd_ns.filter(|c| *c > 0.0).map(|c| 1000.0 / c);

            let worst_slack_ns = graph
                .nodes
                .iter()
                .filter(|n| n.node_type.is_endpoint() && n.clock_domain == Some(idx))
                .flat_map(|n| graph.incoming_edges(n.id))
                .filter(|e| e.state == EdgeState::Live)
                .map(|e| result.slack_ns[e.id.index()])
                .filter(|s| *s < HUGE_POSITIVE_NS)
                .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.min(s))));

            ClockDomainTiming {
                clock: idx,
                name: interner.resolve(clock.name).to_string(),
                period_ns: clock.period_ns,
                cpd_ns,
                fmax_mhz,
                worst_slack_ns,
            }
        })
        .collect()
}

fn geomean_periods(
    graph: &TimingGraph,
    constraints: &TimingConstraints,
    domains: &[ClockDomainTiming],
) -> (Option<f64>, Option<f64>) {
    let analyzed: Vec<&ClockDomainTiming> = domains.iter().filter(|d| d.cpd_ns.is_some() && d.period_ns > 0.0).collect();
    if analyzed.is_empty() {
        return (None, None);
    }

    let log_sum: f64 = analyzed.iter().map(|d| d.period_ns.ln()).sum();
    let geomean = (log_sum / analyzed.len() as f64).exp();

    let weights: Vec<f64> = analyzed
        .iter()
        .map(|d| {
            graph
                .nodes
                .iter()
                .filter(|n| n.node_type.is_endpoint() && n.clock_domain == Some(d.clock))
                .count() as f64
        })
        .collect();
    let total_weight: f64 = weights.iter().sum();

    let fanout_weighted = if total_weight > 0.0 {
        let weighted_log_sum: f64 = analyzed
            .iter()
            .zip(&weights)
            .map(|(d, w)| w * d.period_ns.ln())
            .sum();
        Some((weighted_log_sum / total_weight).exp())
    } else {
        Some(geomean)
    };

    (Some(geomean), fanout_weighted)
}

/// Dumps every populated `domain_constraint` entry plus every override, in
/// a stable `src -> snk : value` line order, per spec.md §4.8/§6.
pub fn echo_timing_constraints(constraints: &TimingConstraints, interner: &Interner) -> String {
    let mut out = String::new();
    let n = constraints.clock_count();

    for src in 0..n {
        let src_idx = ClockIndex::from_raw(src as u32);
        for snk in 0..n {
            let snk_idx = ClockIndex::from_raw(snk as u32);
            let Some(budget) = constraints.domain_budget(src_idx, snk_idx) else { continue };
            let src_name = interner.resolve(constraints.clock(src_idx).name);
            let snk_name = interner.resolve(constraints.clock(snk_idx).name);
            out.push_str(&format!("{src_name} -> {snk_name} : {budget:.6}\n"));
        }
    }

    for (label, overrides) in [
        ("cc", &constraints.cc_constraints),
        ("cf", &constraints.cf_constraints),
        ("fc", &constraints.fc_constraints),
        ("ff", &constraints.ff_constraints),
    ] {
        for ov in overrides {
            let from: Vec<&str> = ov.from.iter().map(|&id| interner.resolve(id)).collect();
            let to: Vec<&str> = ov.to.iter().map(|&id| interner.resolve(id)).collect();
            out.push_str(&format!(
                "{label}: {} -> {} : {:.6}\n",
                from.join(","),
                to.join(","),
                ov.constraint_ns
            ));
        }
    }

    out
}

/// Dumps every node and live edge in the timing graph, skipping broken
/// edges but noting their count in a trailing summary line, per
/// spec.md §4.8/§6.
pub fn echo_timing_graph(graph: &TimingGraph) -> String {
    let mut out = String::new();

    for node in &graph.nodes {
        out.push_str(&format!(
            "node {} : {} : {:?} : domain={:?}\n",
            node.id.index(),
            node.name,
            node.node_type,
            node.clock_domain.map(|c| c.as_raw())
        ));
    }

    for edge in &graph.edges {
        if edge.state != EdgeState::Live {
            continue;
        }
        out.push_str(&format!(
            "edge {} -> {} : {:.6}\n",
            edge.from.index(),
            edge.to.index(),
            edge.delay.typ_ns
        ));
    }

    out.push_str(&format!("broken_edges: {}\n", graph.broken_edge_count()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clockprop::propagate_clocks;
    use crate::constraints::ClockConstraint;
    use crate::graph::TimingEdgeType;
    use crate::levelize::levelize;
    use aion_arch::types::Delay;
    use aion_arch::GenericTimingModel;
    use aion_diagnostics::DiagnosticSink;

    fn single_ff_graph(interner: &Interner, period_ns: f64) -> (TimingGraph, TimingConstraints) {
        let mut constraints = TimingConstraints::new();
        let clk = constraints.add_clock(ClockConstraint {
            name: interner.get_or_intern("clk"),
            period_ns,
            port: Some(interner.get_or_intern("clk")),
            waveform: None,
        });
        constraints.set_domain_budget(clk, clk, Some(period_ns));

        let mut graph = TimingGraph::new();
        let clk_src = graph.add_node("clk/source".into(), TimingNodeType::ClockSource);
        let clk_pin = graph.add_node("ff0/CLK".into(), TimingNodeType::FlipFlopClock);
        let ff_source = graph.add_node("ff0/Q_source".into(), TimingNodeType::FlipFlopSource);
        let ff_opin = graph.add_node("ff0/Q".into(), TimingNodeType::FlipFlopOpin);
        let ff1_ipin = graph.add_node("ff1/D".into(), TimingNodeType::FlipFlopIpin);
        let ff1_sink = graph.add_node("ff1/D_sink".into(), TimingNodeType::FlipFlopSink);
        let ff1_clk = graph.add_node("ff1/CLK".into(), TimingNodeType::FlipFlopClock);

        graph.add_edge(clk_src, clk_pin, Delay::ZERO, TimingEdgeType::ClockTree);
        graph.add_edge(clk_src, ff1_clk, Delay::ZERO, TimingEdgeType::ClockTree);
        graph.add_edge(ff_source, ff_opin, Delay::new(0.3, 0.3, 0.3), TimingEdgeType::ClockToQ);
        graph.add_edge(ff_opin, ff1_ipin, Delay::new(0.5, 0.5, 0.5), TimingEdgeType::NetDelay);
        graph.add_edge(ff1_ipin, ff1_sink, Delay::new(0.1, 0.1, 0.1), TimingEdgeType::SetupCheck);

        let sink = DiagnosticSink::new();
        propagate_clocks(&mut graph, &constraints, interner, &sink).unwrap();
        (graph, constraints)
    }

    #[test]
    fn build_report_marks_met_when_slack_positive() {
        let interner = Interner::new();
        let (graph, constraints) = single_ff_graph(&interner, 10.0);
        let levels = levelize(&graph);
        let model = GenericTimingModel::mid_speed_grade();
        let config = AnalyzerConfig { final_analysis: true, ..AnalyzerConfig::default() };

        let report = build_report(&graph, &constraints, &levels, &model, &interner, &config);
        assert!(report.met);
        assert!(report.critical_path.is_some());
        let path = report.critical_path.unwrap();
        assert!((path.delay_ns - 0.9).abs() < 1e-9);
    }

    #[test]
    fn build_report_marks_unmet_when_path_exceeds_period() {
        let interner = Interner::new();
        let (graph, constraints) = single_ff_graph(&interner, 0.5);
        let levels = levelize(&graph);
        let model = GenericTimingModel::mid_speed_grade();
        let config = AnalyzerConfig { final_analysis: true, ..AnalyzerConfig::default() };

        let report = build_report(&graph, &constraints, &levels, &model, &interner, &config);
        assert!(!report.met);
        assert!(report.worst_slack_ns < 0.0);
    }

    #[test]
    fn domain_summary_reports_fmax() {
        let interner = Interner::new();
        let (graph, constraints) = single_ff_graph(&interner, 10.0);
        let levels = levelize(&graph);
        let model = GenericTimingModel::mid_speed_grade();
        let config = AnalyzerConfig { final_analysis: true, ..AnalyzerConfig::default() };

        let report = build_report(&graph, &constraints, &levels, &model, &interner, &config);
        let domain = &report.domains[0];
        assert!(domain.cpd_ns.is_some());
        assert!(domain.fmax_mhz.unwrap() > 0.0);
    }

    #[test]
    fn domain_summary_resolves_clock_name() {
        let interner = Interner::new();
        let (graph, constraints) = single_ff_graph(&interner, 10.0);
        let levels = levelize(&graph);
        let model = GenericTimingModel::mid_speed_grade();
        let config = AnalyzerConfig { final_analysis: true, ..AnalyzerConfig::default() };

        let report = build_report(&graph, &constraints, &levels, &model, &interner, &config);
        assert_eq!(report.domains[0].name, "clk");
    }

    #[test]
    fn histogram_counts_values_in_range() {
        let values = vec![-0.5, 0.0, 0.5, 0.9, HUGE_POSITIVE_NS];
        let hist = Histogram::build(values.into_iter(), -1.0, 1.0);
        assert_eq!(hist.unanalysed, 1);
        assert_eq!(hist.buckets.iter().sum::<usize>(), 4);
    }

    #[test]
    fn echo_timing_graph_counts_broken_edges() {
        let mut graph = TimingGraph::new();
        let a = graph.add_node("a".into(), TimingNodeType::PrimitiveIpin);
        let b = graph.add_node("b".into(), TimingNodeType::PrimitiveOpin);
        let edge = graph.add_edge(a, b, Delay::ZERO, TimingEdgeType::CellDelay);
        graph.break_edge(edge, EdgeState::BrokenByLoop);

        let dump = echo_timing_graph(&graph);
        assert!(dump.contains("broken_edges: 1"));
        assert!(!dump.contains("edge 0 -> 1"));
    }

    #[test]
    fn echo_timing_constraints_lists_every_pair() {
        let interner = Interner::new();
        let mut constraints = TimingConstraints::new();
        let a = constraints.add_clock(ClockConstraint {
            name: interner.get_or_intern("a"),
            period_ns: 10.0,
            port: None,
            waveform: None,
        });
        constraints.set_domain_budget(a, a, Some(10.0));

        let dump = echo_timing_constraints(&constraints, &interner);
        assert!(dump.contains("a -> a : 10.000000"));
    }

    #[test]
    fn geomean_period_matches_single_clock() {
        let interner = Interner::new();
        let (graph, constraints) = single_ff_graph(&interner, 8.0);
        let domains = vec![ClockDomainTiming {
            clock: ClockIndex::from_raw(0),
            name: String::new(),
            period_ns: 8.0,
            cpd_ns: Some(0.9),
            fmax_mhz: Some(1000.0 / 0.9),
            worst_slack_ns: Some(7.1),
        }];
        let (geomean, weighted) = geomean_periods(&graph, &constraints, &domains);
        assert!((geomean.unwrap() - 8.0).abs() < 1e-9);
        assert!(weighted.is_some());
    }
}
