//! Per-cycle event stream emitted by the CPU core.
//!
//! `Cpu::cycle` drains into a small owned buffer of these rather than a
//! generator — see DESIGN.md for the rationale.

use crate::ir::Node;

/// Monotonically increasing id assigned to an instruction at IF. Dense,
/// starts at 0, never recycled.
pub type ExId = u64;

/// Diagram cell / stall-site label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    If,
    Id,
    Ex,
    Mem,
    Wb,
    /// `"*"`: the execution instance occupied the pipeline this cycle but
    /// was squashed or otherwise did not meaningfully advance.
    Squashed,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::If => "IF",
            Stage::Id => "ID",
            Stage::Ex => "EX",
            Stage::Mem => "MEM",
            Stage::Wb => "WB",
            Stage::Squashed => "*",
        }
    }
}

/// One event emitted by the CPU during a single cycle.
#[derive(Clone, Debug)]
pub enum Event {
    /// Emitted when an instruction enters IF.
    InstructionFetch { ex_id: ExId, cycle: u64, node: Node },
    /// Emitted when an instruction advances into a new stage.
    StageAdvance { ex_id: ExId, cycle: u64, stage: Stage },
    /// Emitted when an instruction cannot advance this cycle. `stalls > 0`
    /// requests that the diagram reconstructor splice in that many
    /// synthetic NOP rows immediately before this row.
    PipelineStall { ex_id: ExId, cycle: u64, stage: Stage, stalls: u64 },
    /// Emitted when an instruction leaves the pipeline via WB.
    PipelineExit { ex_id: ExId, cycle: u64 },
    /// Emitted once per cycle after all five stages have run.
    EndOfCycle { cycle: u64 },
}
