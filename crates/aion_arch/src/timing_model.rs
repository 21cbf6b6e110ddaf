//! Device-side timing model consumed by the static timing analysis graph
//! builder.
//!
//! This is the timing-relevant slice of what a full device architecture
//! model would otherwise provide (grid topology, routing resources,
//! technology mapping): setup/clock-to-Q times for sequential primitives,
//! combinational pin-to-pin delays, and per-input delays for LUTs (needed
//! for input rebalancing). Concrete device families implement
//! [`DeviceTimingModel`] the same way they implement [`crate::Architecture`]
//! — a lookup table of part variants with a fallback to the smallest known
//! device. All delay values are in nanoseconds, matching [`Delay`].

use crate::types::Delay;

/// Supplies delay values for timing-graph construction.
///
/// Every method takes a primitive kind name (`"lut"`, `"dff"`, `"pll"`,
/// `"iobuf"`) rather than a structured cell-kind type, since this crate
/// does not depend on the IR crate — callers translate their own
/// primitive representation into these names.
pub trait DeviceTimingModel {
    /// Setup time (nanoseconds) for a sequential primitive's data input
    /// relative to its clock edge.
    fn setup_time_ns(&self, primitive: &str) -> f64;

    /// Clock-to-Q maximum delay (nanoseconds) for a sequential primitive.
    fn clock_to_q_max_ns(&self, primitive: &str) -> f64;

    /// Combinational delay from one pin to another within the same
    /// primitive. Returns `None` if the pins are not combinationally
    /// connected (e.g. asking for a flip-flop's D-to-Q path, which is a
    /// registered rather than combinational connection).
    fn combinational_delay(&self, primitive: &str, from_pin: &str, to_pin: &str) -> Option<Delay>;

    /// Per-physical-input delays (nanoseconds) for a LUT with `num_inputs`
    /// inputs, ordered from fastest to slowest physical input. Used by
    /// LUT input rebalancing to match the most critical logical input to
    /// the fastest physical one.
    fn lut_input_delays_ns(&self, num_inputs: u32) -> Vec<f64>;
}

/// A simple parameterized timing model: one set of setup/tco/LUT delay
/// constants, not tied to any specific device part. Used when a caller
/// has no vendor-specific timing database, or for synthetic/test netlists.
#[derive(Debug, Clone)]
pub struct GenericTimingModel {
    /// Setup time in nanoseconds, applied to every sequential primitive.
    pub setup_time_ns: f64,
    /// Clock-to-Q maximum delay in nanoseconds, applied to every sequential
    /// primitive.
    pub clock_to_q_max_ns: f64,
    /// Base combinational delay in nanoseconds for a LUT's fastest input.
    pub lut_base_delay_ns: f64,
    /// Additional per-input-position delay in nanoseconds; input `k` (0 =
    /// fastest) costs `lut_base_delay_ns + k * lut_input_skew_ns`.
    pub lut_input_skew_ns: f64,
}

impl GenericTimingModel {
    /// A timing model with delay values representative of a mid-speed-grade
    /// 6-input-LUT FPGA fabric: 0.1ns setup, 0.3ns clock-to-Q, LUT delays
    /// rising from 0.2ns to 0.45ns across six physical inputs.
    pub fn mid_speed_grade() -> Self {
        Self {
            setup_time_ns: 0.1,
            clock_to_q_max_ns: 0.3,
            lut_base_delay_ns: 0.2,
            lut_input_skew_ns: 0.05,
        }
    }
}

impl Default for GenericTimingModel {
    fn default() -> Self {
        Self::mid_speed_grade()
    }
}

impl DeviceTimingModel for GenericTimingModel {
    fn setup_time_ns(&self, _primitive: &str) -> f64 {
        self.setup_time_ns
    }

    fn clock_to_q_max_ns(&self, _primitive: &str) -> f64 {
        self.clock_to_q_max_ns
    }

    fn combinational_delay(&self, primitive: &str, from_pin: &str, to_pin: &str) -> Option<Delay> {
        let _ = (from_pin, to_pin);
        if primitive.eq_ignore_ascii_case("dff") || primitive.eq_ignore_ascii_case("latch") {
            return None;
        }
        Some(Delay::new(
            self.lut_base_delay_ns * 0.8,
            self.lut_base_delay_ns,
            self.lut_base_delay_ns * 1.2,
        ))
    }

    fn lut_input_delays_ns(&self, num_inputs: u32) -> Vec<f64> {
        (0..num_inputs)
            .map(|k| self.lut_base_delay_ns + (k as f64) * self.lut_input_skew_ns)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_model_setup_and_tco() {
        let model = GenericTimingModel::mid_speed_grade();
        assert!(model.setup_time_ns("dff") > 0.0);
        assert!(model.clock_to_q_max_ns("dff") > 0.0);
    }

    #[test]
    fn dff_has_no_combinational_path() {
        let model = GenericTimingModel::mid_speed_grade();
        assert!(model.combinational_delay("dff", "D", "Q").is_none());
    }

    #[test]
    fn lut_has_combinational_path() {
        let model = GenericTimingModel::mid_speed_grade();
        let delay = model.combinational_delay("lut", "I0", "O").unwrap();
        assert!(delay.typ_ns > 0.0);
    }

    #[test]
    fn lut_input_delays_increase_with_position() {
        let model = GenericTimingModel::mid_speed_grade();
        let delays = model.lut_input_delays_ns(6);
        assert_eq!(delays.len(), 6);
        for window in delays.windows(2) {
            assert!(window[1] > window[0]);
        }
    }

    #[test]
    fn default_matches_mid_speed_grade() {
        let default_model = GenericTimingModel::default();
        let explicit = GenericTimingModel::mid_speed_grade();
        assert_eq!(default_model.setup_time_ns, explicit.setup_time_ns);
    }
}
