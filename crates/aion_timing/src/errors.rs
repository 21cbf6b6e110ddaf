//! User-facing error kinds for SDC parsing, graph construction, and analysis.
//!
//! These are distinct from [`aion_common::InternalError`]: a [`TimingError`]
//! means the input (SDC file, netlist) is malformed in a way that prevents
//! analysis from proceeding at all. Recoverable problems (unrecognized SDC
//! commands, dangling pins, broken combinational loops) are reported through
//! [`aion_diagnostics::DiagnosticSink`] instead and do not stop the pipeline.

use aion_common::Ident;
use thiserror::Error;

/// An error that prevents timing analysis from completing.
#[derive(Debug, Error)]
pub enum TimingError {
    /// An SDC command could not be parsed (bad syntax, unsupported flag
    /// combination, or a flag explicitly rejected by policy).
    #[error("SDC syntax error: {0}")]
    SdcSyntaxError(String),

    /// A constraint referenced a clock name that was never defined by
    /// `create_clock`.
    #[error("undefined clock reference: `{0}`")]
    UndefinedClockReference(String),

    /// A constraint referenced a primary input/output port that does not
    /// exist in the netlist.
    #[error("undefined I/O reference: `{0}`")]
    UndefinedIoReference(String),

    /// The timing graph could not be constructed from the netlist (e.g. a
    /// cell kind with no timing model, or a port the model doesn't know).
    #[error("graph construction error: {0}")]
    GraphConstructionError(String),

    /// A netlist cell referenced a model port that doesn't exist for its
    /// primitive kind.
    #[error("cell `{cell}` has no port `{port}` in its timing model")]
    ModelPortNotFound {
        /// The offending cell's name.
        cell: String,
        /// The port name that was not found.
        port: String,
    },
}

impl TimingError {
    /// Convenience constructor for an undefined clock reference, resolving
    /// the identifier through the given interner.
    pub fn undefined_clock(interner: &aion_common::Interner, name: Ident) -> Self {
        TimingError::UndefinedClockReference(interner.resolve(name).to_string())
    }
}
