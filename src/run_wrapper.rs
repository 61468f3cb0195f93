//! Simulation driver: parses a source file, drives the [`Cpu`] to
//! completion, and prints the per-cycle snapshot spec.md §6 describes.
//!
//! Grounded in `original_source/p1.py`'s `main`/`printState` for output
//! shape, and in the teacher's `run_wrapper.rs`/`sim.rs` split between a
//! library entry point and a thin binary.

use std::fmt::Write as _;

use crate::config::SimConfig;
use crate::cpu::Cpu;
use crate::diagram::DiagramLog;
use crate::error::SimResult;
use crate::ir::Register;
use crate::parser;

const SEPARATOR_WIDTH: usize = 82;
const TABLE_COLUMN_WIDTH: usize = 20;
const TABLE_COLUMNS: usize = 4;

/// Everything a caller needs to inspect after a run: the rendered text this
/// function also printed to stdout, and the cycle count it ran for.
pub struct RunOutput {
    pub report: String,
    pub cycles: u64,
}

/// Parse `config.path`, run the pipeline to completion (or `max_cycles`,
/// whichever comes first), and print one snapshot per cycle.
pub fn run_simulation(config: &SimConfig) -> SimResult<RunOutput> {
    let source = std::fs::read_to_string(&config.path)?;
    let nodes = parser::parse(&source)?;

    let mut cpu = Cpu::new(nodes, config.forwarding);
    let mut diagram = DiagramLog::new(config.max_cycles);
    let mut report = String::new();
    let mut cycles = 0u64;

    while cpu.running() && cycles < config.max_cycles {
        let events = cpu.cycle()?;
        for event in &events {
            diagram.apply(event);
        }
        cycles += 1;

        write_snapshot(&mut report, &diagram, &cpu);
        tracing::debug!(cycle = cpu.current_cycle(), "snapshot printed");
    }

    report.push_str("END OF SIMULATION\n");
    print!("{report}");

    Ok(RunOutput { report, cycles })
}

fn write_snapshot(report: &mut String, diagram: &DiagramLog, cpu: &Cpu) {
    let _ = writeln!(report, "{}", "-".repeat(SEPARATOR_WIDTH));
    let _ = write!(report, "{diagram}");
    report.push('\n');
    write_register_table(report, cpu);
}

/// `$name = value` cells, `TABLE_COLUMNS` per row, each `TABLE_COLUMN_WIDTH`
/// columns wide, covering the curated `S0..S7, T0..T9` snapshot set.
fn write_register_table(report: &mut String, cpu: &Cpu) {
    for chunk in Register::SNAPSHOT.chunks(TABLE_COLUMNS) {
        for reg in chunk {
            let cell = format!("{reg} = {}", cpu.register(*reg));
            let _ = write!(report, "{cell:<TABLE_COLUMN_WIDTH$}");
        }
        report.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn write_temp(src: &str) -> std::path::PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut path = std::env::temp_dir();
        path.push(format!("mips-pipeline-sim-test-{}-{id}.asm", std::process::id()));
        std::fs::write(&path, src).unwrap();
        path
    }

    #[test]
    fn run_simulation_reports_end_of_simulation_and_separator() {
        let path = write_temp("add $t0,$zero,$zero\n");
        let config = SimConfig { path: path.clone(), forwarding: true, max_cycles: 16 };
        let output = run_simulation(&config).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(output.report.contains(&"-".repeat(SEPARATOR_WIDTH)));
        assert!(output.report.ends_with("END OF SIMULATION\n"));
        assert!(output.report.contains("$t0 = 0"));
    }

    #[test]
    fn run_simulation_surfaces_parse_errors() {
        let path = write_temp("xor $t0,$t1,$t2\n");
        let config = SimConfig { path: path.clone(), forwarding: false, max_cycles: 16 };
        let result = run_simulation(&config);
        std::fs::remove_file(&path).unwrap();

        assert!(result.is_err());
    }
}
