use thiserror::Error;

use crate::ir::Opcode;

/// Top-level error type for the simulator
#[derive(Error, Debug)]
pub enum SimError {
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("unresolved branch target label: '{0}'")]
    UnresolvedLabel(String),

    #[error("unknown opcode encountered during execute: {0:?}")]
    UnknownOpcodeAtExecute(Opcode),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for `Result` with `SimError`
pub type SimResult<T> = Result<T, SimError>;
