//! MIPS instruction representation

use std::fmt;

/// One of the 32 MIPS ABI registers, plus the `Pc` pseudo-register.
///
/// Integer values 0..31 match the MIPS ABI; `Pc` sits outside that range so
/// it can never collide with a decoded register operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Register {
    Zero = 0,
    At = 1,
    V0 = 2,
    V1 = 3,
    A0 = 4,
    A1 = 5,
    A2 = 6,
    A3 = 7,
    T0 = 8,
    T1 = 9,
    T2 = 10,
    T3 = 11,
    T4 = 12,
    T5 = 13,
    T6 = 14,
    T7 = 15,
    S0 = 16,
    S1 = 17,
    S2 = 18,
    S3 = 19,
    S4 = 20,
    S5 = 21,
    S6 = 22,
    S7 = 23,
    T8 = 24,
    T9 = 25,
    K0 = 26,
    K1 = 27,
    Gp = 28,
    Sp = 29,
    Fp = 30,
    Ra = 31,
    Pc = 32,
}

/// Number of register file / scoreboard slots (32 GPRs + `Pc`).
pub const NUM_REGISTERS: usize = 33;

impl Register {
    /// The curated subset printed in the final register snapshot table:
    /// `S0..S7` then `T0..T9`, per the worked examples (18 registers).
    pub const SNAPSHOT: [Register; 18] = [
        Register::S0,
        Register::S1,
        Register::S2,
        Register::S3,
        Register::S4,
        Register::S5,
        Register::S6,
        Register::S7,
        Register::T0,
        Register::T1,
        Register::T2,
        Register::T3,
        Register::T4,
        Register::T5,
        Register::T6,
        Register::T7,
        Register::T8,
        Register::T9,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Register::Zero => "zero",
            Register::At => "at",
            Register::V0 => "v0",
            Register::V1 => "v1",
            Register::A0 => "a0",
            Register::A1 => "a1",
            Register::A2 => "a2",
            Register::A3 => "a3",
            Register::T0 => "t0",
            Register::T1 => "t1",
            Register::T2 => "t2",
            Register::T3 => "t3",
            Register::T4 => "t4",
            Register::T5 => "t5",
            Register::T6 => "t6",
            Register::T7 => "t7",
            Register::S0 => "s0",
            Register::S1 => "s1",
            Register::S2 => "s2",
            Register::S3 => "s3",
            Register::S4 => "s4",
            Register::S5 => "s5",
            Register::S6 => "s6",
            Register::S7 => "s7",
            Register::T8 => "t8",
            Register::T9 => "t9",
            Register::K0 => "k0",
            Register::K1 => "k1",
            Register::Gp => "gp",
            Register::Sp => "sp",
            Register::Fp => "fp",
            Register::Ra => "ra",
            Register::Pc => "pc",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name())
    }
}

/// MIPS opcode subset implemented by this pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    Nop,
    Add,
    And,
    Or,
    Slt,
    Addi,
    Andi,
    Ori,
    Slti,
    Beq,
    Bne,
}

impl Opcode {
    /// `rd, rs, rt` form.
    pub fn is_arithmetic(self) -> bool {
        matches!(self, Opcode::Add | Opcode::And | Opcode::Or | Opcode::Slt)
    }

    /// `rd, rs, imm` form.
    pub fn is_immediate(self) -> bool {
        matches!(
            self,
            Opcode::Addi | Opcode::Andi | Opcode::Ori | Opcode::Slti
        )
    }

    /// `rs, rt, target` form.
    pub fn is_branch(self) -> bool {
        matches!(self, Opcode::Beq | Opcode::Bne)
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::Add => "add",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Slt => "slt",
            Opcode::Addi => "addi",
            Opcode::Andi => "andi",
            Opcode::Ori => "ori",
            Opcode::Slti => "slti",
            Opcode::Beq => "beq",
            Opcode::Bne => "bne",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded representation of one assembly line. Immutable after
/// construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub opcode: Opcode,
    pub label: Option<String>,
    pub rd: Option<Register>,
    pub rs: Option<Register>,
    pub rt: Option<Register>,
    pub immediate: Option<i64>,
    pub target: Option<String>,
    text: String,
}

impl Node {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        opcode: Opcode,
        label: Option<String>,
        rd: Option<Register>,
        rs: Option<Register>,
        rt: Option<Register>,
        immediate: Option<i64>,
        target: Option<String>,
        text: String,
    ) -> Self {
        Self { opcode, label, rd, rs, rt, immediate, target, text }
    }

    /// A synthetic NOP row, used by the diagram reconstructor to splice in
    /// bubbles that never actually occupied a real pipeline slot.
    pub fn nop() -> Self {
        Self {
            opcode: Opcode::Nop,
            label: None,
            rd: None,
            rs: None,
            rt: None,
            immediate: None,
            target: None,
            text: "nop".to_string(),
        }
    }

    /// Original assembly text, used for display in the diagram.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_display_matches_mips_asm_syntax() {
        assert_eq!(Register::Zero.to_string(), "$zero");
        assert_eq!(Register::T0.to_string(), "$t0");
        assert_eq!(Register::Pc.to_string(), "$pc");
    }

    #[test]
    fn opcode_predicates_are_disjoint() {
        for op in [
            Opcode::Add,
            Opcode::And,
            Opcode::Or,
            Opcode::Slt,
            Opcode::Addi,
            Opcode::Andi,
            Opcode::Ori,
            Opcode::Slti,
            Opcode::Beq,
            Opcode::Bne,
        ] {
            let count = [op.is_arithmetic(), op.is_immediate(), op.is_branch()]
                .iter()
                .filter(|b| **b)
                .count();
            assert_eq!(count, 1, "{op:?} should match exactly one form");
        }
        assert!(!Opcode::Nop.is_arithmetic());
        assert!(!Opcode::Nop.is_immediate());
        assert!(!Opcode::Nop.is_branch());
    }

    #[test]
    fn nop_node_displays_as_nop() {
        assert_eq!(Node::nop().to_string(), "nop");
    }
}
