//! `aion-sta` — standalone static timing analysis CLI for the Aion FPGA
//! toolchain.
//!
//! Two subcommands: `analyze` runs full STA over a netlist + SDC pair and
//! prints a report, `check-sdc` parses an SDC file and echoes the resolved
//! constraint table without touching a netlist.

#![warn(missing_docs)]

mod analyze;
mod check_sdc;

use std::process;

use aion_timing::TimingError;
use clap::{Parser, Subcommand, ValueEnum};

/// `aion-sta` — static timing analysis for the Aion FPGA toolchain.
#[derive(Parser, Debug)]
#[command(name = "aion-sta", version, about = "Aion static timing analyzer")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Control colored diagnostic output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a timing graph from a netlist, apply an SDC file, and report.
    Analyze(analyze::AnalyzeArgs),
    /// Parse an SDC file and print its resolved constraint table.
    CheckSdc(check_sdc::CheckSdcArgs),
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Output format shared by both subcommands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to use colored output.
    pub color: bool,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::env::var("TERM").is_ok(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };
    let global = GlobalArgs { quiet: cli.quiet, color };

    let result = match cli.command {
        Command::Analyze(ref args) => analyze::run(args, &global),
        Command::CheckSdc(ref args) => check_sdc::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            let code = e.downcast_ref::<TimingError>().map_or(1, exit_code_for);
            process::exit(code);
        }
    }
}

/// Maps a fatal [`TimingError`] to a stable, distinct process exit code so
/// scripts invoking `aion-sta` can distinguish failure classes without
/// parsing the message text. Any other error (I/O, malformed JSON) exits 1.
fn exit_code_for(err: &TimingError) -> i32 {
    match err {
        TimingError::SdcSyntaxError(_) => 2,
        TimingError::UndefinedClockReference(_) => 3,
        TimingError::UndefinedIoReference(_) => 4,
        TimingError::GraphConstructionError(_) => 5,
        TimingError::ModelPortNotFound { .. } => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_analyze_requires_netlist_and_sdc() {
        let cli = Cli::parse_from(["aion-sta", "analyze", "--netlist", "n.json", "--sdc", "c.sdc"]);
        match cli.command {
            Command::Analyze(ref args) => {
                assert_eq!(args.netlist.to_str(), Some("n.json"));
                assert_eq!(args.sdc.to_str(), Some("c.sdc"));
            }
            _ => panic!("expected Analyze command"),
        }
    }

    #[test]
    fn parse_check_sdc() {
        let cli = Cli::parse_from(["aion-sta", "check-sdc", "c.sdc"]);
        match cli.command {
            Command::CheckSdc(ref args) => assert_eq!(args.sdc.to_str(), Some("c.sdc")),
            _ => panic!("expected CheckSdc command"),
        }
    }

    #[test]
    fn exit_codes_are_distinct_per_variant() {
        let codes = [
            exit_code_for(&TimingError::SdcSyntaxError("x".into())),
            exit_code_for(&TimingError::UndefinedClockReference("x".into())),
            exit_code_for(&TimingError::UndefinedIoReference("x".into())),
            exit_code_for(&TimingError::GraphConstructionError("x".into())),
            exit_code_for(&TimingError::ModelPortNotFound { cell: "x".into(), port: "y".into() }),
        ];
        for c in codes {
            assert_ne!(c, 0);
        }
        let mut sorted = codes;
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
