//! Device timing models for the Aion FPGA toolchain.
//!
//! This crate supplies the timing-relevant slice of a device architecture
//! model consumed by `aion_timing`'s graph builder and STA engine: the
//! [`Delay`] type (min/typ/max corners) and the [`DeviceTimingModel`]
//! trait (setup/clock-to-Q/combinational delays, LUT input skew). Concrete
//! device families are expected to implement [`DeviceTimingModel`] against
//! their own part-variant timing databases; [`GenericTimingModel`] is
//! provided for callers with no vendor-specific database.
//!
//! # Usage
//!
//! ```
//! use aion_arch::{DeviceTimingModel, GenericTimingModel};
//!
//! let model = GenericTimingModel::mid_speed_grade();
//! assert!(model.setup_time_ns("dff") > 0.0);
//! assert!(model.combinational_delay("dff", "D", "Q").is_none());
//! ```

#![warn(missing_docs)]

pub mod timing_model;
pub mod types;

pub use timing_model::{DeviceTimingModel, GenericTimingModel};
pub use types::Delay;
