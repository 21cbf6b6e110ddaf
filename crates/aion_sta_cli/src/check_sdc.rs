//! `aion-sta check-sdc` — parse an SDC file and print its resolved
//! constraint table, without requiring a netlist.
//!
//! Useful for validating a constraint file in isolation (e.g. in CI)
//! before it is ever paired with a specific netlist.

use std::fs;
use std::path::PathBuf;

use aion_common::Interner;
use aion_diagnostics::{DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use aion_source::SourceDb;
use aion_timing::{echo_timing_constraints, parse_sdc};
use clap::Args;

use crate::GlobalArgs;

/// Arguments for `aion-sta check-sdc`.
#[derive(Args, Debug)]
pub struct CheckSdcArgs {
    /// Path to the SDC file to parse.
    pub sdc: PathBuf,
}

/// Runs `aion-sta check-sdc`.
///
/// Returns `Ok(0)` if the file parsed with no warnings, `Ok(1)` if it
/// parsed but produced warning diagnostics (e.g. unrecognized commands),
/// or an `Err` on a syntax error that prevented parsing from completing.
pub fn run(args: &CheckSdcArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let source = fs::read_to_string(&args.sdc)?;
    let interner = Interner::new();
    let sink = DiagnosticSink::new();

    let constraints = parse_sdc(&source, &interner, &sink)?;

    let diagnostics = sink.diagnostics();
    if !global.quiet {
        let source_db = SourceDb::new();
        let renderer = TerminalRenderer::new(global.color, 80);
        for diag in &diagnostics {
            eprintln!("{}", renderer.render(diag, &source_db));
        }
    }
    println!("{}", echo_timing_constraints(&constraints, &interner));

    Ok(if diagnostics.is_empty() { 0 } else { 1 })
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
    fn valid_sdc_parses_cleanly() {
        let sdc = write_temp("create_clock -period 5.0 -name clk clk_port");
        let args = CheckSdcArgs { sdc: sdc.path().to_path_buf() };
        let global = GlobalArgs { quiet: true, color: false };
        assert_eq!(run(&args, &global).unwrap(), 0);
    }

    #[test]
    fn unrecognized_command_is_a_warning_not_a_hard_error() {
        let sdc = write_temp("create_clock -period 5.0 -name clk clk_port\nset_totally_unknown_thing foo");
        let args = CheckSdcArgs { sdc: sdc.path().to_path_buf() };
        let global = GlobalArgs { quiet: true, color: false };
        assert_eq!(run(&args, &global).unwrap(), 1);
    }

    #[test]
    fn missing_period_is_a_hard_error() {
        let sdc = write_temp("create_clock -name clk clk_port");
        let args = CheckSdcArgs { sdc: sdc.path().to_path_buf() };
        let global = GlobalArgs { quiet: true, color: false };
        assert!(run(&args, &global).is_err());
    }
}
