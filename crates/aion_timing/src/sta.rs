//! Static timing analysis engine: per-clock-domain-pair forward/backward
//! traversal, slack and criticality computation, optional LUT input
//! rebalancing.
//!
//! Arrival (`T_arr`) and required (`T_req`) times are never stored on
//! [`TimingNode`](crate::graph::TimingNode); they are transient, reset for
//! every `(src, snk)` pair, and live only in the parallel `Vec<Option<f64>>`
//! values local to [`run_pair`]. What survives across pairs is the slack
//! and criticality bundle (indexed by [`TimingEdgeId`]), accumulated by
//! `min`/`max` as each pair completes, plus the `cpd`/`least_slack`
//! matrices consumed by [`crate::report`].

use crate::constraints::TimingConstraints;
use crate::graph::{TimingGraph, TimingNodeType};
use crate::ids::{ClockIndex, TimingEdgeId, TimingNodeId};
use crate::levelize::Levelization;
use aion_arch::DeviceTimingModel;
use aion_common::Interner;

/// Sentinel used for a slack value that was never updated by any pair
/// (`HUGE_POSITIVE_FLOAT` in the original).
pub const HUGE_POSITIVE_NS: f64 = 1.0e30;

/// Sentinel delay carried by every edge driven directly by a constant
/// generator, so it can never contribute to an arrival time even if a
/// traversal somehow reaches it despite [`EdgeState::BrokenByConstant`]
/// severing its inbound side.
///
/// [`EdgeState::BrokenByConstant`]: crate::graph::EdgeState::BrokenByConstant
pub const HUGE_NEGATIVE_NS: f64 = -1.0e30;

/// Selects how required times are relaxed and how criticality is
/// normalized during analysis. Default is `R`, matching the original's
/// own default (`slack_definition == 'R'` unless overridden).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlackDefinition {
    /// T_req-relaxed: required times are clamped up to the max arrival
    /// time so intermediate negative slacks don't confuse optimizers.
    #[default]
    R,
    /// Improved shifted: after all pairs, every slack is shifted up by
    /// the absolute value of the most negative slack in the design (if
    /// negative); the criticality denominator is adjusted per pair by
    /// the same amount instead.
    I,
    /// Shifted: the global-denominator variant of `I`.
    S,
    /// Global relaxed: the global-denominator variant of `R`.
    G,
    /// Clipped: negative slacks are clipped to zero.
    C,
    /// None: no normalization; the criticality denominator is
    /// `max_Treq + max_Tarr`.
    N,
}

/// Runtime configuration for one [`analyze_timing`] call.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Which slack/criticality normalization policy to apply.
    pub slack_definition: SlackDefinition,
    /// Whether to run LUT input rebalancing during the forward pass.
    /// Skipped entirely (not merely a no-op loop) when `false`.
    pub rebalance_lut_inputs: bool,
    /// Disables all relaxation/shifting so reported slacks are the true,
    /// unrelaxed values. Set for the final analysis pass after timing
    /// closure, not during iterative optimization.
    pub final_analysis: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            slack_definition: SlackDefinition::default(),
            rebalance_lut_inputs: false,
            final_analysis: false,
        }
    }
}

/// One `(src, snk)` pair's raw contribution to an edge's slack, carrying
/// the denominator that pair used so deferred criticality definitions
/// (`I`, `S`, `G`) can recombine it after every pair has run.
#[derive(Debug, Clone, Copy)]
struct EdgeSample {
    edge: TimingEdgeId,
    slack_ns: f64,
    denom_ns: f64,
}

/// The result of running forward/backward traversal for a single `(src,
/// snk)` clock domain pair. Exposed so [`crate::report`] can re-run one
/// pair to recover `T_arr`/`T_req` for critical path backtracking.
#[derive(Debug, Clone)]
pub struct PairTraversal {
    /// Source clock domain.
    pub src: ClockIndex,
    /// Sink clock domain.
    pub snk: ClockIndex,
    /// Arrival time at every node, `None` if unreached by this pair.
    pub t_arr_ns: Vec<Option<f64>>,
    /// Required time at every node, `None` if off the analyzed path set.
    pub t_req_ns: Vec<Option<f64>>,
    /// Critical path delay for this pair (worst endpoint arrival minus
    /// its clock delay).
    pub cpd_ns: f64,
    /// Least slack among edges adjacent to this pair's analyzed sinks.
    pub least_slack_ns: Option<f64>,
}

/// The accumulated result of a full [`analyze_timing`] call across every
/// active clock domain pair.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Per-edge slack in nanoseconds, indexed by [`TimingEdgeId::index`].
    /// [`HUGE_POSITIVE_NS`] for an edge never reached by any pair.
    pub slack_ns: Vec<f64>,
    /// Per-edge timing criticality in `[0, 1]`, indexed the same way.
    /// `0.0` for an edge never reached by any pair.
    pub timing_criticality: Vec<f64>,
    /// `cpd_ns[src][snk]`: critical path delay for that pair, `None` if
    /// the pair was never analyzed.
    pub cpd_ns: Vec<Vec<Option<f64>>>,
    /// `least_slack_ns[src][snk]`: least slack for that pair, `None` if
    /// never analyzed.
    pub least_slack_ns: Vec<Vec<Option<f64>>>,
}

/// Runs STA over every active (non-`DO_NOT_ANALYSE`) clock domain pair and
/// returns the accumulated slack/criticality bundle.
pub fn analyze_timing(
    graph: &TimingGraph,
    constraints: &TimingConstraints,
    levels: &Levelization,
    model: &dyn DeviceTimingModel,
    interner: &Interner,
    config: &AnalyzerConfig,
) -> AnalysisResult {
    let clock_count = constraints.clock_count();
    let edge_count = graph.edge_count();

    let mut raw_slack = vec![HUGE_POSITIVE_NS; edge_count];
    let mut samples: Vec<EdgeSample> = Vec::new();
    let mut cpd_ns = vec![vec![None; clock_count]; clock_count];
    let mut least_slack_ns = vec![vec![None; clock_count]; clock_count];

    for src in 0..clock_count {
        let src_idx = ClockIndex::from_raw(src as u32);
        for snk in 0..clock_count {
            let snk_idx = ClockIndex::from_raw(snk as u32);
            if constraints.domain_budget(src_idx, snk_idx).is_none() {
                continue;
            }

            let pair = run_pair(graph, constraints, levels, model, interner, src_idx, snk_idx, config);
            cpd_ns[src][snk] = Some(pair.cpd_ns);
            least_slack_ns[src][snk] = pair.least_slack_ns;

            for edge in &graph.edges {
                let (Some(t_from), Some(t_to)) =
                    (pair.t_arr_ns[edge.from.index()], pair.t_req_ns[edge.to.index()])
                else {
                    continue;
                };
                let slack = t_to - t_from - edge.delay.typ_ns;
                if slack < raw_slack[edge.id.index()] {
                    raw_slack[edge.id.index()] = slack;
                }
                let max_treq = pair.t_req_ns.iter().filter_map(|v| *v).fold(f64::NEG_INFINITY, f64::max);
                let max_tarr = pair.t_arr_ns.iter().filter_map(|v| *v).fold(f64::NEG_INFINITY, f64::max);
                let denom = if config.slack_definition == SlackDefinition::N {
                    max_treq + max_tarr
                } else {
                    max_treq
                };
                samples.push(EdgeSample { edge: edge.id, slack_ns: slack, denom_ns: denom });
            }
        }
    }

    let smallest_slack_in_design = raw_slack
        .iter()
        .copied()
        .filter(|s| *s < HUGE_POSITIVE_NS)
        .fold(f64::INFINITY, f64::min);
    let smallest_slack_in_design = if smallest_slack_in_design.is_finite() { smallest_slack_in_design } else { 0.0 };
    let global_denom = samples.iter().map(|s| s.denom_ns).fold(f64::NEG_INFINITY, f64::max).max(1e-12);

    let slack_ns: Vec<f64> = raw_slack
        .iter()
        .map(|&s| finalize_slack(s, config, smallest_slack_in_design))
        .collect();

    let timing_criticality = finalize_criticality(
        edge_count,
        &samples,
        &slack_ns,
        config,
        smallest_slack_in_design,
        global_denom,
    );

    AnalysisResult { slack_ns, timing_criticality, cpd_ns, least_slack_ns }
}

fn finalize_slack(raw: f64, config: &AnalyzerConfig, smallest_slack_in_design: f64) -> f64 {
    if raw >= HUGE_POSITIVE_NS {
        return raw;
    }
    match config.slack_definition {
        SlackDefinition::I | SlackDefinition::S if !config.final_analysis && smallest_slack_in_design < 0.0 => {
            raw - smallest_slack_in_design
        }
        SlackDefinition::C => raw.max(0.0),
        _ => raw,
    }
}

fn finalize_criticality(
    edge_count: usize,
    samples: &[EdgeSample],
    final_slack: &[f64],
    config: &AnalyzerConfig,
    smallest_slack_in_design: f64,
    global_denom: f64,
) -> Vec<f64> {
    let mut out = vec![0.0f64; edge_count];
    match config.slack_definition {
        SlackDefinition::S | SlackDefinition::G => {
            for (idx, out_val) in out.iter_mut().enumerate() {
                if final_slack[idx] >= HUGE_POSITIVE_NS {
                    continue;
                }
                *out_val = (1.0 - final_slack[idx] / global_denom).clamp(0.0, 1.0);
            }
        }
        SlackDefinition::I => {
            for sample in samples {
                let denom = (sample.denom_ns - smallest_slack_in_design).max(1e-12);
                let crit = (1.0 - sample.slack_ns / denom).clamp(0.0, 1.0);
                let slot = &mut out[sample.edge.index()];
                if crit > *slot {
                    *slot = crit;
                }
            }
        }
        SlackDefinition::R | SlackDefinition::C | SlackDefinition::N => {
            for sample in samples {
                let denom = sample.denom_ns.max(1e-12);
                let crit = (1.0 - sample.slack_ns / denom).clamp(0.0, 1.0);
                let slot = &mut out[sample.edge.index()];
                if crit > *slot {
                    *slot = crit;
                }
            }
        }
    }
    out
}

/// Runs forward and backward traversal for a single `(src, snk)` clock
/// domain pair, per spec.md §4.7.
pub fn run_pair(
    graph: &TimingGraph,
    constraints: &TimingConstraints,
    levels: &Levelization,
    model: &dyn DeviceTimingModel,
    interner: &Interner,
    src: ClockIndex,
    snk: ClockIndex,
    config: &AnalyzerConfig,
) -> PairTraversal {
    let n = graph.node_count();
    let (t_arr_ns, max_tarr) = forward_pass(graph, levels, model, config, src);
    let (t_req_ns, cpd_ns, max_treq) =
        backward_pass(graph, levels, constraints, interner, src, snk, config, &t_arr_ns, max_tarr);

    let _ = n;
    let least_slack_ns = graph
        .nodes
        .iter()
        .filter(|node| node.node_type.is_endpoint())
        .flat_map(|node| graph.incoming_edges(node.id))
        .filter_map(|edge| {
            let t_from = t_arr_ns[edge.from.index()]?;
            let t_to = t_req_ns[edge.to.index()]?;
            Some(t_to - t_from - edge.delay.typ_ns)
        })
        .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.min(s))));

    let _ = max_treq;
    PairTraversal { src, snk, t_arr_ns, t_req_ns, cpd_ns, least_slack_ns }
}

fn forward_pass(
    graph: &TimingGraph,
    levels: &Levelization,
    model: &dyn DeviceTimingModel,
    config: &AnalyzerConfig,
    src: ClockIndex,
) -> (Vec<Option<f64>>, f64) {
    let n = graph.node_count();
    let mut t_arr: Vec<Option<f64>> = vec![None; n];
    let mut max_tarr = f64::NEG_INFINITY;

    for node in &graph.nodes {
        if node.node_type.is_startpoint() && node.clock_domain == Some(src) {
            let seed = if node.node_type == TimingNodeType::FlipFlopSource { node.clock_delay_ns } else { 0.0 };
            t_arr[node.id.index()] = Some(seed);
            max_tarr = max_tarr.max(seed);
        }
    }

    for level in &levels.levels {
        for &nid in level {
            if t_arr[nid.index()].is_some() {
                continue;
            }
            let incoming = graph.incoming_edges(nid);
            if incoming.is_empty() {
                continue;
            }

            let contributions: Vec<(TimingEdgeId, f64, f64)> = incoming
                .iter()
                .filter_map(|e| t_arr[e.from.index()].map(|ta| (e.id, ta, e.delay.typ_ns)))
                .collect();
            if contributions.is_empty() {
                continue;
            }

            let arrival = if config.rebalance_lut_inputs
                && graph.node(nid).node_type == TimingNodeType::PrimitiveOpin
                && contributions.len() == incoming.len()
                && contributions.len() > 1
            {
                rebalanced_arrival(model, &contributions)
            } else {
                contributions.iter().map(|&(_, ta, delay)| ta + delay).fold(f64::NEG_INFINITY, f64::max)
            };

            t_arr[nid.index()] = Some(arrival);
            max_tarr = max_tarr.max(arrival);
        }
    }

    (t_arr, max_tarr)
}

/// Greedily assigns the fastest physical LUT input to the currently
/// most-critical (latest-arriving) logical input, per spec.md §4.7.
fn rebalanced_arrival(model: &dyn DeviceTimingModel, contributions: &[(TimingEdgeId, f64, f64)]) -> f64 {
    let mut physical = model.lut_input_delays_ns(contributions.len() as u32);
    physical.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mut by_criticality: Vec<f64> = contributions.iter().map(|&(_, ta, _)| ta).collect();
    by_criticality.sort_by(|a, b| b.partial_cmp(a).unwrap());

    by_criticality
        .iter()
        .zip(physical.iter())
        .map(|(&ta, &delay)| ta + delay)
        .fold(f64::NEG_INFINITY, f64::max)
}

fn backward_pass(
    graph: &TimingGraph,
    levels: &Levelization,
    constraints: &TimingConstraints,
    interner: &Interner,
    src: ClockIndex,
    snk: ClockIndex,
    config: &AnalyzerConfig,
    t_arr: &[Option<f64>],
    max_tarr: f64,
) -> (Vec<Option<f64>>, f64, f64) {
    let n = graph.node_count();
    let mut t_req: Vec<Option<f64>> = vec![None; n];
    let mut cpd_ns = f64::NEG_INFINITY;
    let mut max_treq = f64::NEG_INFINITY;

    let src_clock_name = interner.resolve(constraints.clock(src).name).to_string();

    for node in &graph.nodes {
        if !node.node_type.is_endpoint() || node.clock_domain != Some(snk) {
            continue;
        }
        let Some(arrival) = t_arr[node.id.index()] else { continue };

        let clock_delay = node.clock_delay_ns;
        let sink_name = entity_name(&node.name);
        let base_constraint = resolve_required_budget(constraints, interner, &src_clock_name, sink_name, src, snk);

        let relax = !config.final_analysis
            && matches!(config.slack_definition, SlackDefinition::R | SlackDefinition::G);
        let req = if relax {
            (base_constraint + clock_delay).max(arrival)
        } else {
            base_constraint + clock_delay
        };

        t_req[node.id.index()] = Some(req);
        max_treq = max_treq.max(req);
        cpd_ns = cpd_ns.max(arrival - clock_delay);
    }

    for level in levels.levels.iter().rev() {
        for &nid in level {
            let node = graph.node(nid);
            if node.node_type.is_endpoint() {
                continue;
            }
            let outgoing = graph.outgoing_edges(nid);
            if outgoing.is_empty() {
                continue;
            }
            let req = outgoing
                .iter()
                .filter_map(|e| t_req[e.to.index()].map(|r| r - e.delay.typ_ns))
                .fold(None, |acc: Option<f64>, r| Some(acc.map_or(r, |a| a.min(r))));
            if let Some(req) = req {
                t_req[nid.index()] = Some(req);
            }
        }
    }

    if !cpd_ns.is_finite() {
        cpd_ns = 0.0;
    }
    let _ = max_tarr;
    (t_req, cpd_ns, max_treq)
}

/// Strips the trailing `/pin` suffix from a builder-assigned node name,
/// leaving the owning netlist block/port identity for SDC pattern matching.
fn entity_name(node_name: &str) -> &str {
    node_name.rsplit_once('/').map(|(prefix, _)| prefix).unwrap_or(node_name)
}

/// Resolves the required-time budget for one sink endpoint, consulting
/// `cf_constraints` before falling back to the domain default, and
/// finishing any multicycle arithmetic `sdc.rs` deferred because the
/// sink's clock domain was not yet known at parse time.
fn resolve_required_budget(
    constraints: &TimingConstraints,
    interner: &Interner,
    src_clock_name: &str,
    sink_name: &str,
    src: ClockIndex,
    snk: ClockIndex,
) -> f64 {
    let default_budget = constraints.domain_budget(src, snk).unwrap_or(0.0);

    let Some(ov) = constraints
        .cf_constraints
        .iter()
        .find(|ov| ov.applies_to(interner, src_clock_name, sink_name))
    else {
        return default_budget;
    };

    match ov.num_multicycles {
        Some(n) if ov.constraint_ns == 0.0 => {
            let sink_period = constraints.clock(snk).period_ns;
            default_budget + (n.saturating_sub(1) as f64) * sink_period
        }
        _ => ov.constraint_ns,
    }
}
