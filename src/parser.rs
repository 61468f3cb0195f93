//! Textual assembly decoder.
//!
//! Treated as an external collaborator by the spec (the "hard engineering"
//! lives in the pipeline, not here) but implemented in full since this has
//! to be a runnable crate. Grounded in the original Python `Parser` class
//! (table-lookup register/mnemonic resolution over a single regex) and in
//! the teacher's `instruction/decode_helper.rs` (a `SimResult`-returning,
//! table-driven single pass).

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{SimError, SimResult};
use crate::ir::{Node, Opcode, Register};

fn register_table() -> &'static HashMap<&'static str, Register> {
    static TABLE: OnceLock<HashMap<&'static str, Register>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut m = HashMap::new();
        m.insert("$0", Register::Zero);
        m.insert("$zero", Register::Zero);
        m.insert("$at", Register::At);
        m.insert("$v0", Register::V0);
        m.insert("$v1", Register::V1);
        m.insert("$a0", Register::A0);
        m.insert("$a1", Register::A1);
        m.insert("$a2", Register::A2);
        m.insert("$a3", Register::A3);
        m.insert("$t0", Register::T0);
        m.insert("$t1", Register::T1);
        m.insert("$t2", Register::T2);
        m.insert("$t3", Register::T3);
        m.insert("$t4", Register::T4);
        m.insert("$t5", Register::T5);
        m.insert("$t6", Register::T6);
        m.insert("$t7", Register::T7);
        m.insert("$s0", Register::S0);
        m.insert("$s1", Register::S1);
        m.insert("$s2", Register::S2);
        m.insert("$s3", Register::S3);
        m.insert("$s4", Register::S4);
        m.insert("$s5", Register::S5);
        m.insert("$s6", Register::S6);
        m.insert("$s7", Register::S7);
        m.insert("$t8", Register::T8);
        m.insert("$t9", Register::T9);
        m.insert("$k0", Register::K0);
        m.insert("$k1", Register::K1);
        m.insert("$gp", Register::Gp);
        m.insert("$sp", Register::Sp);
        m.insert("$fp", Register::Fp);
        m.insert("$ra", Register::Ra);
        m
    })
}

fn opcode_table() -> &'static HashMap<&'static str, Opcode> {
    static TABLE: OnceLock<HashMap<&'static str, Opcode>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut m = HashMap::new();
        m.insert("add", Opcode::Add);
        m.insert("addi", Opcode::Addi);
        m.insert("and", Opcode::And);
        m.insert("andi", Opcode::Andi);
        m.insert("or", Opcode::Or);
        m.insert("ori", Opcode::Ori);
        m.insert("slt", Opcode::Slt);
        m.insert("slti", Opcode::Slti);
        m.insert("beq", Opcode::Beq);
        m.insert("bne", Opcode::Bne);
        m
    })
}

fn line_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let label = r"\w+";
        let inst = r"\w+";
        let reg = r"\$(?:\d{1,2}|zero|a[t0-3]|[kv][01]|t[0-9]|s[0-7]|[gsf]p|ra)";
        let imm = r"\d+";
        Regex::new(&format!(
            r"^\s*(?:(?P<label>{label}):)?\s*(?P<text>(?P<inst>{inst})\s+(?P<arg1>{reg})\s*,\s*(?P<arg2>{reg})\s*,\s*(?:(?P<arg3>{reg})|(?P<immediate>{imm})|(?P<target>{label})))\s*$"
        ))
        .expect("line pattern is a fixed, valid regex")
    })
}

fn lookup_register(name: &str, line: usize) -> SimResult<Register> {
    register_table().get(name).copied().ok_or_else(|| SimError::Parse {
        line,
        message: format!("unknown register: '{name}'"),
    })
}

fn lookup_opcode(name: &str, line: usize) -> SimResult<Opcode> {
    opcode_table().get(name).copied().ok_or_else(|| SimError::Parse {
        line,
        message: format!("unknown mnemonic: '{name}'"),
    })
}

/// Decode an entire assembly source file into an ordered sequence of
/// instruction nodes, one per non-empty line.
pub fn parse(src: &str) -> SimResult<Vec<Node>> {
    let pattern = line_pattern();
    let mut nodes = Vec::new();

    for (idx, raw_line) in src.lines().enumerate() {
        let line_no = idx + 1;
        if raw_line.trim().is_empty() {
            continue;
        }

        let caps = pattern.text_captures(raw_line, line_no)?;
        nodes.push(caps.into_node(line_no)?);
    }

    Ok(nodes)
}

trait CaptureExt {
    fn text_captures<'h>(&self, line: &'h str, line_no: usize) -> SimResult<LineCaptures<'h>>;
}

impl CaptureExt for Regex {
    fn text_captures<'h>(&self, line: &'h str, line_no: usize) -> SimResult<LineCaptures<'h>> {
        let caps = self.captures(line).ok_or_else(|| SimError::Parse {
            line: line_no,
            message: format!("malformed instruction: '{}'", line.trim()),
        })?;
        Ok(LineCaptures { caps })
    }
}

struct LineCaptures<'h> {
    caps: regex::Captures<'h>,
}

impl<'h> LineCaptures<'h> {
    fn into_node(self, line_no: usize) -> SimResult<Node> {
        let caps = self.caps;
        let text = caps.name("text").expect("text group always matches alongside the outer match").as_str().to_string();
        let label = caps.name("label").map(|m| m.as_str().to_string());
        let mnemonic = caps.name("inst").expect("inst group always matches").as_str();
        let opcode = lookup_opcode(mnemonic, line_no)?;

        let arg1 = lookup_register(caps.name("arg1").expect("arg1 always matches").as_str(), line_no)?;
        let arg2 = lookup_register(caps.name("arg2").expect("arg2 always matches").as_str(), line_no)?;

        if opcode.is_arithmetic() {
            let arg3_str = caps.name("arg3").ok_or_else(|| SimError::Parse {
                line: line_no,
                message: format!("'{mnemonic}' requires a third register operand"),
            })?;
            let arg3 = lookup_register(arg3_str.as_str(), line_no)?;
            Ok(Node::new(opcode, label, Some(arg1), Some(arg2), Some(arg3), None, None, text))
        } else if opcode.is_immediate() {
            let imm_str = caps.name("immediate").ok_or_else(|| SimError::Parse {
                line: line_no,
                message: format!("'{mnemonic}' requires an immediate operand"),
            })?;
            let immediate: i64 = imm_str.as_str().parse().map_err(|_| SimError::Parse {
                line: line_no,
                message: format!("malformed immediate: '{}'", imm_str.as_str()),
            })?;
            Ok(Node::new(opcode, label, Some(arg1), Some(arg2), None, Some(immediate), None, text))
        } else {
            // branch form: rs, rt, target
            let target = caps.name("target").ok_or_else(|| SimError::Parse {
                line: line_no,
                message: format!("'{mnemonic}' requires a branch target label"),
            })?;
            Ok(Node::new(
                opcode,
                label,
                None,
                Some(arg1),
                Some(arg2),
                None,
                Some(target.as_str().to_string()),
                text,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_arithmetic_immediate_and_branch_forms() {
        let src = "addi $t0,$zero,5\nadd $t1,$t0,$t0\nbeq $t0,$t0,END\nEND: or $t2,$zero,$zero\n";
        let nodes = parse(src).unwrap();
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0].opcode, Opcode::Addi);
        assert_eq!(nodes[0].immediate, Some(5));
        assert_eq!(nodes[1].opcode, Opcode::Add);
        assert_eq!(nodes[2].target.as_deref(), Some("END"));
        assert_eq!(nodes[3].label.as_deref(), Some("END"));
    }

    #[test]
    fn unknown_register_is_a_parse_error() {
        let err = parse("add $t0,$bogus,$t1\n").unwrap_err();
        assert!(matches!(err, SimError::Parse { .. }));
    }

    #[test]
    fn unknown_mnemonic_is_a_parse_error() {
        let err = parse("xor $t0,$t1,$t2\n").unwrap_err();
        assert!(matches!(err, SimError::Parse { .. }));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let nodes = parse("\n\nadd $t0,$zero,$zero\n\n").unwrap();
        assert_eq!(nodes.len(), 1);
    }
}
