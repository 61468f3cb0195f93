//! CLI surface: turns `argv` into a typed [`SimConfig`] before the core ever
//! runs, the same job the teacher's `flags.rs` did for its own binaries.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Cycle-accurate simulator for a five-stage in-order MIPS pipeline.
#[derive(Parser, Debug)]
#[command(name = "mips-pipeline-sim", version, about)]
pub struct Cli {
    /// Forwarding mode: F (EX/MEM and MEM/WB forwarding enabled) or N (none).
    pub mode: Mode,

    /// Path to the assembly source file.
    pub path: PathBuf,

    /// Raise the default trace verbosity (equivalent to RUST_LOG=trace).
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Forwarding enabled.
    F,
    /// No forwarding.
    N,
}

impl Mode {
    pub fn forwarding(self) -> bool {
        matches!(self, Mode::F)
    }
}

/// Fully resolved run configuration, handed to [`crate::run_wrapper::run_simulation`].
pub struct SimConfig {
    pub path: PathBuf,
    pub forwarding: bool,
    pub max_cycles: u64,
}

/// Diagram width and stall budget; the run is abandoned past this many
/// cycles rather than looping forever on a malformed program.
pub const MAX_CYCLES: u64 = 16;

impl From<Cli> for SimConfig {
    fn from(cli: Cli) -> Self {
        Self { path: cli.path, forwarding: cli.mode.forwarding(), max_cycles: MAX_CYCLES }
    }
}
