//! Diagram reconstructor: turns the CPU's event stream into the canonical
//! per-cycle timing grid, including retroactive NOP-row insertion for
//! stalls and `"*"` marking for squashed/idle instances.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::event::{Event, ExId, Stage};
use crate::ir::Node;

/// Identifies a row in the diagram: either a real execution instance or a
/// synthetic bubble spliced in by a stall.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum RowId {
    Real(ExId),
    Synthetic(i64),
}

struct LogRow {
    node: Node,
    start_cycle: u64,
    /// Sparse stage labels, indexed by `cycle - start_cycle`.
    cells: Vec<Option<Stage>>,
    frozen: Option<String>,
}

impl LogRow {
    fn new(node: Node, start_cycle: u64) -> Self {
        Self { node, start_cycle, cells: Vec::new(), frozen: None }
    }

    fn mark(&mut self, cycle: u64, stage: Stage) {
        let offset = (cycle - self.start_cycle) as usize;
        if self.cells.len() <= offset {
            self.cells.resize(offset + 1, None);
        }
        self.cells[offset] = Some(stage);
    }

    fn render(&self, width: u64) -> String {
        if let Some(frozen) = &self.frozen {
            return frozen.clone();
        }
        self.render_live(width)
    }

    fn render_live(&self, width: u64) -> String {
        let mut out = format!("{:<20}", self.node.text());
        for column in 0..width {
            let label = if column < self.start_cycle {
                "."
            } else {
                let offset = (column - self.start_cycle) as usize;
                self.cells.get(offset).copied().flatten().map(Stage::label).unwrap_or(".")
            };
            out.push_str(&format!("{label:<4}"));
        }
        out
    }

    fn freeze(&mut self, width: u64) {
        if self.frozen.is_none() {
            self.frozen = Some(self.render_live(width));
        }
    }
}

/// Consumes the CPU's event stream and maintains one row per execution
/// instance, producing the fixed-width text diagram.
pub struct DiagramLog {
    width: u64,
    history: Vec<LogRow>,
    current: HashMap<RowId, usize>,
    cycle_missed: HashSet<RowId>,
    next_synthetic_id: i64,
}

impl DiagramLog {
    pub fn new(width: u64) -> Self {
        Self {
            width,
            history: Vec::new(),
            current: HashMap::new(),
            cycle_missed: HashSet::new(),
            next_synthetic_id: -1,
        }
    }

    /// Number of rows recorded so far (real instances + synthetic NOPs).
    pub fn row_count(&self) -> usize {
        self.history.len()
    }

    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::InstructionFetch { ex_id, cycle, node } => {
                let row_id = RowId::Real(*ex_id);
                let mut row = LogRow::new(node.clone(), *cycle);
                row.mark(*cycle, Stage::If);
                self.history.push(row);
                self.current.insert(row_id, self.history.len() - 1);
                // Deliberately not added to cycle_missed: IF just marked this
                // row's own cycle, so it is not "missed" this cycle. Only
                // synthetic NOP rows start out in cycle_missed (see
                // insert_nops) since nothing will ever StageAdvance them.
            }
            Event::StageAdvance { ex_id, cycle, stage } => {
                let row_id = RowId::Real(*ex_id);
                if let Some(&idx) = self.current.get(&row_id) {
                    self.history[idx].mark(*cycle, *stage);
                    self.cycle_missed.remove(&row_id);
                }
            }
            Event::PipelineStall { ex_id, cycle, stage, stalls } => {
                let row_id = RowId::Real(*ex_id);
                if let Some(&idx) = self.current.get(&row_id) {
                    self.history[idx].mark(*cycle, *stage);
                    self.cycle_missed.remove(&row_id);
                    if *stalls > 0 {
                        let start_cycle = self.history[idx].start_cycle;
                        self.insert_nops(idx, start_cycle, *stalls);
                    }
                }
            }
            Event::PipelineExit { ex_id, .. } => {
                let row_id = RowId::Real(*ex_id);
                self.cycle_missed.remove(&row_id);
                if let Some(idx) = self.current.remove(&row_id) {
                    self.history[idx].freeze(self.width);
                }
            }
            Event::EndOfCycle { cycle } => {
                let missed: Vec<RowId> = self.cycle_missed.iter().copied().collect();
                for row_id in missed {
                    let Some(&idx) = self.current.get(&row_id) else { continue };
                    self.history[idx].mark(*cycle, Stage::Squashed);
                    if self.history[idx].start_cycle + 4 <= *cycle {
                        self.current.remove(&row_id);
                        self.history[idx].freeze(self.width);
                    }
                }
                self.cycle_missed = self.current.keys().copied().collect();
            }
        }
    }

    fn insert_row_at(&mut self, index: usize, row_id: RowId, row: LogRow) {
        self.history.insert(index, row);
        for v in self.current.values_mut() {
            if *v >= index {
                *v += 1;
            }
        }
        self.current.insert(row_id, index);
    }

    /// Splice `count` synthetic NOP rows immediately before the row at
    /// `stalling_idx`, one fresh negative id each.
    fn insert_nops(&mut self, stalling_idx: usize, start_cycle: u64, count: u64) {
        let mut insert_at = stalling_idx;
        for _ in 0..count {
            let row_id = RowId::Synthetic(self.next_synthetic_id);
            self.next_synthetic_id -= 1;

            let mut row = LogRow::new(Node::nop(), start_cycle);
            row.mark(start_cycle, Stage::If);
            row.mark(start_cycle + 1, Stage::Id);

            self.insert_row_at(insert_at, row_id, row);
            self.cycle_missed.insert(row_id);
            insert_at += 1;
        }
    }
}

impl fmt::Display for DiagramLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<20}", "CPU Cycles ===>")?;
        for i in 1..=self.width {
            write!(f, "{i:<4}")?;
        }
        writeln!(f)?;
        for row in &self.history {
            writeln!(f, "{}", row.render(self.width))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Cpu;
    use crate::parser;

    fn drive(src: &str, forwarding: bool, max_cycles: u64) -> DiagramLog {
        let nodes = parser::parse(src).unwrap();
        let mut cpu = Cpu::new(nodes, forwarding);
        let mut log = DiagramLog::new(max_cycles);
        let mut cycles = 0;
        while cpu.running() && cycles < max_cycles {
            for event in cpu.cycle().unwrap() {
                log.apply(&event);
            }
            cycles += 1;
        }
        log
    }

    #[test]
    fn row_count_matches_fetches_plus_synthetic_nops() {
        let log = drive("addi $t0,$zero,5\nadd $t1,$t0,$t0\n", false, 16);
        // 2 real fetches + 2 synthetic stall rows inserted before row 2.
        assert_eq!(log.row_count(), 4);
    }

    #[test]
    fn forwarding_avoids_inserting_any_nop_rows() {
        let log = drive("addi $t0,$zero,5\nadd $t1,$t0,$t0\n", true, 16);
        assert_eq!(log.row_count(), 2);
    }

    #[test]
    fn squashed_row_is_marked_with_asterisk() {
        let log = drive(
            "addi $t0,$zero,1\nbeq $t0,$t0,END\naddi $t1,$zero,9\nEND: add $t2,$zero,$zero\n",
            false,
            16,
        );
        let rendered = log.to_string();
        assert!(rendered.contains('*'), "expected a squashed row marker in:\n{rendered}");
    }

    #[test]
    fn s1_row_renders_if_id_ex_mem_wb_in_order() {
        let max_cycles = 8;
        let log = drive("add $t0,$zero,$zero\n", false, max_cycles);
        let rendered = log.to_string();
        let row = rendered.lines().nth(1).expect("header plus one instruction row");

        let mut expected = format!("{:<20}", "add $t0,$zero,$zero");
        for label in ["IF", "ID", "EX", "MEM", "WB"] {
            expected.push_str(&format!("{label:<4}"));
        }
        for _ in 5..max_cycles {
            expected.push_str(&format!("{:<4}", "."));
        }

        assert_eq!(row, expected, "first column must be IF, not squashed, for a freshly fetched row");
    }

    #[test]
    fn header_line_lists_cycle_numbers() {
        let log = drive("add $t0,$zero,$zero\n", false, 4);
        let rendered = log.to_string();
        let header = rendered.lines().next().unwrap();
        assert!(header.starts_with("CPU Cycles ===>"));
        assert!(header.contains('1') && header.contains('4'));
    }
}
