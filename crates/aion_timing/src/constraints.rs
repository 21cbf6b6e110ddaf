//! Timing constraint store parsed from SDC files.
//!
//! [`TimingConstraints`] is the resolved constraint database consumed by the
//! STA engine: a square `domain_constraint` matrix giving the default
//! required-time budget between every pair of clock domains, four override
//! lists for path-specific exceptions, and the per-port I/O delay lists.
//! This mirrors the original constraint reader's `domain_constraint`,
//! `cc_constraints`, `cf_constraints`, `fc_constraints`, and
//! `ff_constraints` tables one-for-one, rather than the simpler flat
//! exception lists a first pass at this crate used.

use crate::ids::ClockIndex;
use crate::pattern;
use aion_common::Ident;
use serde::{Deserialize, Serialize};

/// A clock definition from `create_clock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConstraint {
    /// The name of the clock domain.
    pub name: Ident,
    /// Clock period in nanoseconds.
    pub period_ns: f64,
    /// The port or pin the clock is applied to. `None` for a virtual clock
    /// (`create_clock -name <n>` with no target list).
    pub port: Option<Ident>,
    /// Waveform specification: (rise_time_ns, fall_time_ns). Defaults to a
    /// 50% duty cycle, `(0, period/2)`, when not given explicitly.
    pub waveform: Option<(f64, f64)>,
}

impl ClockConstraint {
    /// Returns the target frequency in MHz for this clock.
    pub fn frequency_mhz(&self) -> f64 {
        if self.period_ns > 0.0 {
            1000.0 / self.period_ns
        } else {
            0.0
        }
    }

    /// Returns the duty cycle as a fraction (0.0 to 1.0).
    pub fn duty_cycle(&self) -> f64 {
        match self.waveform {
            Some((rise, fall)) => {
                if self.period_ns > 0.0 {
                    let high_time = if fall > rise {
                        fall - rise
                    } else {
                        self.period_ns - rise + fall
                    };
                    high_time / self.period_ns
                } else {
                    0.5
                }
            }
            None => 0.5,
        }
    }

    /// Returns `true` if this clock is a virtual clock with no netlist
    /// target (used purely as a timing reference).
    pub fn is_virtual(&self) -> bool {
        self.port.is_none()
    }
}

/// An input or output delay constraint from `set_input_delay`/`set_output_delay`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoDelay {
    /// The port that this delay applies to.
    pub port: Ident,
    /// The reference clock for this delay.
    pub clock: ClockIndex,
    /// The delay value in nanoseconds.
    pub delay_ns: f64,
}

/// A false path exception from `set_false_path`.
///
/// Excludes every path from any `from` startpoint to any `to` endpoint from
/// timing analysis entirely, independent of the domain constraint matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FalsePath {
    /// Source endpoint name patterns.
    pub from: Vec<Ident>,
    /// Destination endpoint name patterns.
    pub to: Vec<Ident>,
}

/// A path-specific override of the domain constraint matrix.
///
/// Produced by `set_multicycle_path` and `set_max_delay` when they name
/// specific `-from`/`-to` endpoints rather than applying to an entire clock
/// domain pair. `from`/`to` hold name *patterns* (possibly containing `*`),
/// matched against netlist endpoint names with [`pattern::matches`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideConstraint {
    /// Source endpoint name patterns.
    pub from: Vec<Ident>,
    /// Destination endpoint name patterns.
    pub to: Vec<Ident>,
    /// The resolved scalar constraint in nanoseconds (the allowed required
    /// time budget for matching paths).
    pub constraint_ns: f64,
    /// Set for `set_multicycle_path -setup N`; `constraint_ns` is then
    /// `(N - 1) * sink_period` rather than a `set_max_delay` literal.
    pub num_multicycles: Option<u32>,
}

impl OverrideConstraint {
    /// Returns `true` if `from_name` matches any of this override's source
    /// patterns and `to_name` matches any of its destination patterns.
    pub fn applies_to(&self, interner: &aion_common::Interner, from_name: &str, to_name: &str) -> bool {
        let from_match = self
            .from
            .iter()
            .any(|p| pattern::matches(interner.resolve(*p), from_name));
        let to_match = self
            .to
            .iter()
            .any(|p| pattern::matches(interner.resolve(*p), to_name));
        from_match && to_match
    }
}

/// The resolved timing constraint database for a design.
///
/// Populated by [`crate::sdc::parse_sdc`] and consumed by
/// [`crate::clockprop`] and [`crate::sta`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingConstraints {
    /// Every clock defined by `create_clock`, in declaration order. Indexed
    /// by [`ClockIndex`].
    pub constrained_clocks: Vec<ClockConstraint>,
    /// `domain_constraint[src.as_raw()][snk.as_raw()]`: the required-time
    /// budget in nanoseconds for paths launched by clock `src` and captured
    /// by clock `snk`. `None` means `DO_NOT_ANALYSE` — the pair is
    /// excluded from timing analysis entirely (set by `set_clock_groups
    /// -exclusive` or by default for domains with no common period).
    pub domain_constraint: Vec<Vec<Option<f64>>>,
    /// Clock-domain-to-clock-domain overrides (rare; most `-from`/`-to`
    /// exceptions name specific registers, landing in `ff_constraints`).
    pub cc_constraints: Vec<OverrideConstraint>,
    /// Clock-to-flip-flop overrides (`-from <clock> -to <reg>`).
    pub cf_constraints: Vec<OverrideConstraint>,
    /// Flip-flop-to-clock overrides (`-from <reg> -to <clock>`).
    pub fc_constraints: Vec<OverrideConstraint>,
    /// Flip-flop-to-flip-flop overrides (`-from <reg> -to <reg>`).
    pub ff_constraints: Vec<OverrideConstraint>,
    /// Input port delay constraints.
    pub constrained_inputs: Vec<IoDelay>,
    /// Output port delay constraints.
    pub constrained_outputs: Vec<IoDelay>,
    /// False path exceptions.
    pub false_paths: Vec<FalsePath>,
}

impl TimingConstraints {
    /// Creates an empty constraint store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a clock definition and returns its [`ClockIndex`]. Grows the
    /// `domain_constraint` matrix to stay square.
    pub fn add_clock(&mut self, clock: ClockConstraint) -> ClockIndex {
        let idx = ClockIndex::from_raw(self.constrained_clocks.len() as u32);
        self.constrained_clocks.push(clock);
        let n = self.constrained_clocks.len();
        for row in &mut self.domain_constraint {
            row.resize(n, None);
        }
        self.domain_constraint.resize(n, vec![None; n]);
        idx
    }

    /// Returns the clock constraint with the given name, if any.
    pub fn find_clock(&self, name: Ident) -> Option<&ClockConstraint> {
        self.constrained_clocks.iter().find(|c| c.name == name)
    }

    /// Returns the index of the clock with the given name, if any.
    pub fn clock_index(&self, name: Ident) -> Option<ClockIndex> {
        self.constrained_clocks
            .iter()
            .position(|c| c.name == name)
            .map(|i| ClockIndex::from_raw(i as u32))
    }

    /// Returns the clock at the given index.
    pub fn clock(&self, idx: ClockIndex) -> &ClockConstraint {
        &self.constrained_clocks[idx.index()]
    }

    /// Returns the number of defined clocks.
    pub fn clock_count(&self) -> usize {
        self.constrained_clocks.len()
    }

    /// Returns the default required-time budget, in nanoseconds, for paths
    /// from clock `src` captured by clock `snk`, or `None` if that pair is
    /// `DO_NOT_ANALYSE`.
    pub fn domain_budget(&self, src: ClockIndex, snk: ClockIndex) -> Option<f64> {
        self.domain_constraint
            .get(src.index())
            .and_then(|row| row.get(snk.index()))
            .copied()
            .flatten()
    }

    /// Sets the required-time budget for a clock domain pair.
    pub fn set_domain_budget(&mut self, src: ClockIndex, snk: ClockIndex, budget_ns: Option<f64>) {
        self.domain_constraint[src.index()][snk.index()] = budget_ns;
    }

    /// Marks every pair across two clock groups as `DO_NOT_ANALYSE`, per
    /// `set_clock_groups -exclusive -group {a} -group {b}`.
    pub fn mark_exclusive_groups(&mut self, group_a: &[ClockIndex], group_b: &[ClockIndex]) {
        for &a in group_a {
            for &b in group_b {
                self.set_domain_budget(a, b, None);
                self.set_domain_budget(b, a, None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aion_common::Interner;

    fn make_interner() -> Interner {
        Interner::new()
    }

    fn clk(interner: &Interner, name: &str, period_ns: f64, port: &str) -> ClockConstraint {
        ClockConstraint {
            name: interner.get_or_intern(name),
            period_ns,
            port: Some(interner.get_or_intern(port)),
            waveform: None,
        }
    }

    #[test]
    fn constraints_default_empty() {
        let tc = TimingConstraints::new();
        assert_eq!(tc.clock_count(), 0);
        assert!(tc.constrained_inputs.is_empty());
        assert!(tc.false_paths.is_empty());
    }

    #[test]
    fn clock_constraint_frequency() {
        let interner = make_interner();
        let c = clk(&interner, "clk", 10.0, "clk_port");
        assert!((c.frequency_mhz() - 100.0).abs() < 0.001);
    }

    #[test]
    fn clock_constraint_duty_cycle_default() {
        let interner = make_interner();
        let c = clk(&interner, "clk", 10.0, "clk_port");
        assert!((c.duty_cycle() - 0.5).abs() < 0.001);
    }

    #[test]
    fn clock_constraint_duty_cycle_custom() {
        let interner = make_interner();
        let mut c = clk(&interner, "clk", 10.0, "clk_port");
        c.waveform = Some((0.0, 7.0));
        assert!((c.duty_cycle() - 0.7).abs() < 0.001);
    }

    #[test]
    fn virtual_clock_has_no_port() {
        let interner = make_interner();
        let c = ClockConstraint {
            name: interner.get_or_intern("virt"),
            period_ns: 10.0,
            port: None,
            waveform: None,
        };
        assert!(c.is_virtual());
    }

    #[test]
    fn add_clock_grows_matrix() {
        let interner = make_interner();
        let mut tc = TimingConstraints::new();
        let a = tc.add_clock(clk(&interner, "a", 10.0, "pa"));
        let b = tc.add_clock(clk(&interner, "b", 5.0, "pb"));
        assert_eq!(tc.domain_constraint.len(), 2);
        assert_eq!(tc.domain_constraint[0].len(), 2);
        tc.set_domain_budget(a, b, Some(5.0));
        assert_eq!(tc.domain_budget(a, b), Some(5.0));
        assert_eq!(tc.domain_budget(b, a), None);
    }

    #[test]
    fn find_clock_by_name() {
        let interner = make_interner();
        let mut tc = TimingConstraints::new();
        let name = interner.get_or_intern("sys_clk");
        tc.add_clock(ClockConstraint {
            name,
            period_ns: 8.0,
            port: Some(interner.get_or_intern("clk")),
            waveform: None,
        });
        assert!(tc.find_clock(name).is_some());
        assert_eq!(tc.find_clock(name).unwrap().period_ns, 8.0);
    }

    #[test]
    fn clock_index_lookup() {
        let interner = make_interner();
        let mut tc = TimingConstraints::new();
        let idx = tc.add_clock(clk(&interner, "clk", 10.0, "p"));
        let name = interner.get_or_intern("clk");
        assert_eq!(tc.clock_index(name), Some(idx));
        assert_eq!(tc.clock_index(interner.get_or_intern("missing")), None);
    }

    #[test]
    fn exclusive_groups_set_do_not_analyse() {
        let interner = make_interner();
        let mut tc = TimingConstraints::new();
        let a = tc.add_clock(clk(&interner, "a", 10.0, "pa"));
        let b = tc.add_clock(clk(&interner, "b", 5.0, "pb"));
        tc.set_domain_budget(a, b, Some(5.0));
        tc.set_domain_budget(b, a, Some(5.0));
        tc.mark_exclusive_groups(&[a], &[b]);
        assert_eq!(tc.domain_budget(a, b), None);
        assert_eq!(tc.domain_budget(b, a), None);
    }

    #[test]
    fn override_constraint_applies_to_wildcard() {
        let interner = make_interner();
        let ov = OverrideConstraint {
            from: vec![interner.get_or_intern("slow_.*")],
            to: vec![interner.get_or_intern("*")],
            constraint_ns: 20.0,
            num_multicycles: Some(3),
        };
        assert!(ov.applies_to(&interner, "slow_reg", "anything"));
        assert!(!ov.applies_to(&interner, "fast_reg", "anything"));
    }

    #[test]
    fn io_delay_references_clock_index() {
        let interner = make_interner();
        let mut tc = TimingConstraints::new();
        let idx = tc.add_clock(clk(&interner, "clk", 10.0, "p"));
        tc.constrained_inputs.push(IoDelay {
            port: interner.get_or_intern("data_in"),
            clock: idx,
            delay_ns: 2.5,
        });
        assert_eq!(tc.constrained_inputs[0].delay_ns, 2.5);
        assert_eq!(tc.constrained_inputs[0].clock, idx);
    }

    #[test]
    fn false_path_construction() {
        let interner = make_interner();
        let fp = FalsePath {
            from: vec![interner.get_or_intern("clk_a")],
            to: vec![interner.get_or_intern("clk_b")],
        };
        assert_eq!(fp.from.len(), 1);
        assert_eq!(fp.to.len(), 1);
    }

    #[test]
    fn constraints_serde_roundtrip() {
        let interner = make_interner();
        let mut tc = TimingConstraints::new();
        tc.add_clock(clk(&interner, "clk", 10.0, "clk_port"));
        let json = serde_json::to_string(&tc).unwrap();
        let restored: TimingConstraints = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.clock_count(), 1);
    }

    #[test]
    fn multicycle_override_budget_formula() {
        // (N - 1) * sink_period is computed by the SDC resolution step, not
        // this module; here we only check the override carries the fields
        // that formula needs.
        let interner = make_interner();
        let ov = OverrideConstraint {
            from: vec![interner.get_or_intern("a")],
            to: vec![interner.get_or_intern("b")],
            constraint_ns: 2.0 * 10.0,
            num_multicycles: Some(3),
        };
        assert_eq!(ov.num_multicycles, Some(3));
        assert_eq!(ov.constraint_ns, 20.0);
    }
}
