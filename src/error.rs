use thiserror::Error;

/// Faults raised while loading or executing a program.
///
/// Every fault stops the current `load`/`execute` call. The VM never retries
/// and never logs them; reporting is up to the caller.
#[derive(Debug, Error)]
pub enum VmError {
    /// An instruction in the stream being loaded is malformed.
    #[error("invalid program: instruction {index}: {reason}")]
    InvalidProgram { index: usize, reason: String },

    /// A pointer move would have placed the cursor below zero.
    #[error("memory cursor went below zero (cursor {cursor}, delta {delta})")]
    MemoryOutOfBounds { cursor: usize, delta: i32 },

    /// The program counter references a code outside the opcode set.
    #[error("invalid command code {code} at instruction {program_counter}")]
    InvalidCommand { code: i32, program_counter: usize },

    /// The input or output collaborator failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors produced while turning source text into an instruction stream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("unmatched ']' at byte {offset}")]
    UnmatchedClose { offset: usize },

    #[error("unmatched '[' at byte {offset}")]
    UnmatchedOpen { offset: usize },

    /// A folded run or loop body is too long for a 32-bit argument.
    #[error("instruction argument overflows at byte {offset}")]
    Overflow { offset: usize },
}

/// Top-level error for [`crate::eval`].
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Vm(#[from] VmError),
}
