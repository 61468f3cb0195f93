//! Five-stage in-order MIPS pipeline core.
//!
//! Implements the hazard detector, optional forwarding paths, branch
//! resolution, and the per-cycle event emitter. This is the hard
//! engineering the rest of the crate exists to support.

use crate::error::{SimError, SimResult};
use crate::event::{Event, ExId, Stage};
use crate::ir::{Node, Opcode, Register, NUM_REGISTERS};

#[derive(Clone, Debug)]
struct IfIdLatch {
    ex_id: ExId,
    node: Node,
}

#[derive(Clone, Debug)]
struct IdExLatch {
    ex_id: ExId,
    node: Node,
    rd_target: Register,
    stalled: bool,
}

#[derive(Clone, Debug)]
struct ExMemLatch {
    ex_id: ExId,
    node: Node,
    rd_value: i64,
    rd_target: Register,
}

type MemWbLatch = ExMemLatch;

/// The pipelined MIPS CPU.
pub struct Cpu {
    current_cycle: u64,
    next_ex_id: ExId,
    forwarding: bool,
    instructions: Vec<Node>,

    regfile: [i64; NUM_REGISTERS],
    availability: [u64; NUM_REGISTERS],

    if_id: Option<IfIdLatch>,
    id_ex: Option<IdExLatch>,
    ex_mem: Option<ExMemLatch>,
    mem_wb: Option<MemWbLatch>,
}

impl Cpu {
    pub fn new(instructions: Vec<Node>, forwarding: bool) -> Self {
        Self {
            current_cycle: 0,
            next_ex_id: 0,
            forwarding,
            instructions,
            regfile: [0; NUM_REGISTERS],
            availability: [0; NUM_REGISTERS],
            if_id: None,
            id_ex: None,
            ex_mem: None,
            mem_wb: None,
        }
    }

    pub fn current_cycle(&self) -> u64 {
        self.current_cycle
    }

    pub fn pc(&self) -> u64 {
        self.regfile[Register::Pc as usize] as u64
    }

    fn set_pc(&mut self, value: u64) {
        self.regfile[Register::Pc as usize] = value as i64;
    }

    /// `true` while there is still fetchable or in-flight work.
    pub fn running(&self) -> bool {
        self.pc() < self.instructions.len() as u64
            || self.if_id.is_some()
            || self.id_ex.is_some()
            || self.ex_mem.is_some()
            || self.mem_wb.is_some()
    }

    /// Current value of a register. `Zero` always reads as 0.
    pub fn register(&self, reg: Register) -> i64 {
        if reg == Register::Zero {
            0
        } else {
            self.regfile[reg as usize]
        }
    }

    fn write_register(&mut self, reg: Register, value: i64) {
        if reg == Register::Zero {
            return;
        }
        self.regfile[reg as usize] = value;
    }

    /// Resolve a register read against the scoreboard and forwarding paths.
    /// Returns `(earliest_cycle_available, value)`.
    fn read_operand(&self, reg: Register, now: u64) -> (u64, i64) {
        let available = self.availability[reg as usize];
        let stored = self.register(reg);
        if available <= now {
            return (available, stored);
        }
        if self.forwarding {
            if let Some(ex_mem) = &self.ex_mem {
                if ex_mem.rd_target == reg {
                    return (now, ex_mem.rd_value);
                }
            }
            if let Some(mem_wb) = &self.mem_wb {
                if mem_wb.rd_target == reg {
                    return (now, mem_wb.rd_value);
                }
            }
        }
        (available, stored)
    }

    /// Run one simulation cycle: WB, MEM, EX, ID, IF, then `EndOfCycle`.
    /// Stages run in this reverse order so each frees its downstream latch
    /// before the upstream stage tries to advance into it.
    pub fn cycle(&mut self) -> SimResult<Vec<Event>> {
        let mut events = Vec::new();
        self.wb_stage(&mut events);
        self.mem_stage(&mut events);
        self.ex_stage(&mut events)?;
        self.id_stage(&mut events);
        self.if_stage(&mut events);
        events.push(Event::EndOfCycle { cycle: self.current_cycle });
        self.current_cycle += 1;
        Ok(events)
    }

    fn if_stage(&mut self, events: &mut Vec<Event>) {
        if self.if_id.is_some() {
            return;
        }
        let pc = self.pc();
        if pc >= self.instructions.len() as u64 {
            return;
        }

        let node = self.instructions[pc as usize].clone();
        let ex_id = self.next_ex_id;
        self.next_ex_id += 1;
        self.set_pc(pc + 1);

        tracing::trace!(ex_id, cycle = self.current_cycle, %node, "IF");
        events.push(Event::InstructionFetch { ex_id, cycle: self.current_cycle, node: node.clone() });
        self.if_id = Some(IfIdLatch { ex_id, node });
    }

    fn id_stage(&mut self, events: &mut Vec<Event>) {
        let Some(if_id) = &self.if_id else { return };

        if self.id_ex.is_some() {
            events.push(Event::PipelineStall {
                ex_id: if_id.ex_id,
                cycle: self.current_cycle,
                stage: Stage::If,
                stalls: 0,
            });
            return;
        }

        let if_id = self.if_id.take().expect("checked Some above");
        let rd_target = if if_id.node.opcode.is_arithmetic() || if_id.node.opcode.is_immediate() {
            if_id.node.rd.expect("arithmetic/immediate nodes always carry rd")
        } else if if_id.node.opcode.is_branch() {
            // Tentative; EX downgrades to Zero if the branch is not taken.
            Register::Pc
        } else {
            Register::Zero
        };

        tracing::trace!(ex_id = if_id.ex_id, cycle = self.current_cycle, "ID");
        events.push(Event::StageAdvance { ex_id: if_id.ex_id, cycle: self.current_cycle, stage: Stage::Id });
        self.id_ex = Some(IdExLatch { ex_id: if_id.ex_id, node: if_id.node, rd_target, stalled: false });
    }

    fn ex_stage(&mut self, events: &mut Vec<Event>) -> SimResult<()> {
        let Some(id_ex) = &self.id_ex else { return Ok(()) };
        let now = self.current_cycle;
        let node = id_ex.node.clone();
        let ex_id = id_ex.ex_id;

        let (ready, op1, op2) = if node.opcode == Opcode::Nop {
            (true, 0i64, 0i64)
        } else if node.opcode.is_immediate() {
            let rs = node.rs.expect("immediate nodes always carry rs");
            let (avail, value) = self.read_operand(rs, now);
            let ready = if self.forwarding { avail <= now } else { avail <= now.saturating_sub(1) };
            (ready, value, node.immediate.expect("immediate nodes always carry an immediate"))
        } else {
            let rs = node.rs.unwrap_or(Register::Zero);
            let rt = node.rt.unwrap_or(Register::Zero);
            let (avail1, v1) = self.read_operand(rs, now);
            let (avail2, v2) = self.read_operand(rt, now);
            let combined = avail1.max(avail2);
            let ready = if self.forwarding { combined <= now } else { combined <= now.saturating_sub(1) };
            (ready, v1, v2)
        };

        if !ready {
            let avail1 = self.availability[node.rs.unwrap_or(Register::Zero) as usize];
            let avail2 = if node.opcode.is_immediate() {
                0
            } else {
                self.availability[node.rt.unwrap_or(Register::Zero) as usize]
            };
            let combined = avail1.max(avail2);
            let stalls = combined.saturating_sub(now);

            let id_ex = self.id_ex.as_mut().expect("checked Some above");
            if !id_ex.stalled {
                id_ex.stalled = true;
                events.push(Event::PipelineStall { ex_id, cycle: now, stage: Stage::Id, stalls });
            } else {
                events.push(Event::PipelineStall { ex_id, cycle: now, stage: Stage::Id, stalls: 0 });
            }
            return Ok(());
        }

        if self.ex_mem.is_some() {
            events.push(Event::PipelineStall { ex_id, cycle: now, stage: Stage::Id, stalls: 0 });
            return Ok(());
        }

        let result = match node.opcode {
            Opcode::Nop => 0,
            Opcode::Add | Opcode::Addi => op1.wrapping_add(op2),
            Opcode::And | Opcode::Andi => op1 & op2,
            Opcode::Or | Opcode::Ori => op1 | op2,
            Opcode::Slt | Opcode::Slti => i64::from(op1 < op2),
            Opcode::Beq => i64::from(op1 == op2),
            Opcode::Bne => i64::from(op1 != op2),
        };

        let id_ex = self.id_ex.as_ref().expect("checked Some above");
        let (rd_value, rd_target) = if node.opcode.is_arithmetic() || node.opcode.is_immediate() {
            let rd_target = id_ex.rd_target;
            if rd_target != Register::Zero && rd_target != Register::Pc {
                self.availability[rd_target as usize] = self.availability[rd_target as usize].max(now + 2);
            }
            (result, rd_target)
        } else if node.opcode.is_branch() {
            if result != 0 {
                let target = node.target.as_deref().expect("branch nodes always carry a target label");
                let index = self
                    .instructions
                    .iter()
                    .position(|n| n.label.as_deref() == Some(target))
                    .ok_or_else(|| SimError::UnresolvedLabel(target.to_string()))?;
                (index as i64, Register::Pc)
            } else {
                (0, Register::Zero)
            }
        } else {
            (0, Register::Zero)
        };

        tracing::trace!(ex_id, cycle = now, ?rd_target, rd_value, "EX");
        events.push(Event::StageAdvance { ex_id, cycle: now, stage: Stage::Ex });
        self.id_ex = None;
        self.ex_mem = Some(ExMemLatch { ex_id, node, rd_value, rd_target });
        Ok(())
    }

    fn mem_stage(&mut self, events: &mut Vec<Event>) {
        let Some(ex_mem) = &self.ex_mem else { return };

        if self.mem_wb.is_some() {
            events.push(Event::PipelineStall {
                ex_id: ex_mem.ex_id,
                cycle: self.current_cycle,
                stage: Stage::Ex,
                stalls: 0,
            });
            return;
        }

        let ex_mem = self.ex_mem.take().expect("checked Some above");
        tracing::trace!(ex_id = ex_mem.ex_id, cycle = self.current_cycle, "MEM");
        events.push(Event::StageAdvance { ex_id: ex_mem.ex_id, cycle: self.current_cycle, stage: Stage::Mem });
        self.mem_wb = Some(ex_mem);
    }

    fn wb_stage(&mut self, events: &mut Vec<Event>) {
        let Some(mem_wb) = &self.mem_wb else { return };
        let now = self.current_cycle;
        let rd_target = mem_wb.rd_target;
        let rd_value = mem_wb.rd_value;
        let ex_id = mem_wb.ex_id;

        if rd_target == Register::Pc && rd_value != self.pc() as i64 {
            // Taken branch: squash the speculative (younger) prefix.
            if let Some(id_ex) = self.id_ex.take() {
                events.push(Event::StageAdvance { ex_id: id_ex.ex_id, cycle: now, stage: Stage::Squashed });
            }
            if let Some(ex_mem) = self.ex_mem.take() {
                events.push(Event::StageAdvance { ex_id: ex_mem.ex_id, cycle: now, stage: Stage::Squashed });
            }
            if let Some(if_id) = self.if_id.take() {
                events.push(Event::StageAdvance { ex_id: if_id.ex_id, cycle: now, stage: Stage::Squashed });
            }
            self.availability = [0; NUM_REGISTERS];
        }

        self.write_register(rd_target, rd_value);
        tracing::trace!(ex_id, cycle = now, ?rd_target, rd_value, "WB");
        self.mem_wb = None;
        events.push(Event::StageAdvance { ex_id, cycle: now, stage: Stage::Wb });
        events.push(Event::PipelineExit { ex_id, cycle: now });
    }
}
