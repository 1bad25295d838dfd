use serde::Serialize;

use crate::error::VmError;
use crate::io::{Input, Output};
use crate::program::{Opcode, Program};
use crate::tape::{INITIAL_TAPE_LEN, MAX_TAPE_GROWTH, Tape};

/// Initial size of the scratch buffer used to batch `Put` output.
pub const INITIAL_SCRATCH_LEN: usize = 32;

/// Construction-time settings for a [`Vm`].
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Value stored into the current cell when `Get` finds the input exhausted.
    pub eof: i32,
    /// Cells allocated on every load.
    pub initial_tape_len: usize,
    /// Largest single growth step once the tape has reached this size.
    pub max_tape_growth: usize,
    /// Scratch bytes allocated on every load.
    pub initial_scratch_len: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            eof: 0,
            initial_tape_len: INITIAL_TAPE_LEN,
            max_tape_growth: MAX_TAPE_GROWTH,
            initial_scratch_len: INITIAL_SCRATCH_LEN,
        }
    }
}

/// Read-only snapshot of the VM registers, for debugging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VmState {
    pub cursor: usize,
    pub tape_len: usize,
    pub program_counter: usize,
    /// `None` only when the cursor is not addressable, i.e. before any load.
    pub current_value: Option<i32>,
}

/// The execution engine.
///
/// Owns the tape, the cursor, the program counter and the `Put` scratch
/// buffer. One VM runs one program at a time; run independent programs
/// concurrently on independent VMs.
pub struct Vm<I, O> {
    input: I,
    output: O,
    config: VmConfig,

    program: Program,
    program_counter: usize,

    tape: Tape,
    cursor: usize,

    scratch: Vec<u8>,
}

impl<I: Input, O: Output> Vm<I, O> {
    pub fn new(input: I, output: O, eof: i32) -> Self {
        Self::with_config(
            input,
            output,
            VmConfig {
                eof,
                ..Default::default()
            },
        )
    }

    /// Create a VM with nothing loaded: an empty program, an empty tape and
    /// no scratch space. Executing it is a no-op.
    pub fn with_config(input: I, output: O, config: VmConfig) -> Self {
        Self {
            input,
            output,
            config,
            program: Program::default(),
            program_counter: 0,
            tape: Tape::empty(),
            cursor: 0,
            scratch: Vec::new(),
        }
    }

    /// Replace the program and start over with fresh memory.
    ///
    /// The previous tape, scratch buffer and program are dropped; cursor and
    /// program counter go back to 0.
    pub fn load(&mut self, program: Program) {
        tracing::debug!(instructions = program.len(), "loading program");
        self.tape = Tape::new(self.config.initial_tape_len, self.config.max_tape_growth);
        self.cursor = 0;
        self.scratch = vec![0; self.config.initial_scratch_len];
        self.program = program;
        self.program_counter = 0;
    }

    /// Validate a JSON instruction stream and load it.
    ///
    /// On failure nothing changes: the previously loaded program, tape and
    /// registers stay exactly as they were.
    pub fn load_json(&mut self, text: &str) -> Result<(), VmError> {
        let program = Program::from_json(text)?;
        self.load(program);
        Ok(())
    }

    /// Run until the program counter reaches the end of the program.
    ///
    /// Calling this again after a normal return does nothing. A fault leaves
    /// the VM exactly as it was before the faulting instruction.
    pub fn execute(&mut self) -> Result<(), VmError> {
        while let Some(&instruction) = self.program.get(self.program_counter) {
            let op = instruction
                .opcode()
                .map_err(|code| VmError::InvalidCommand {
                    code,
                    program_counter: self.program_counter,
                })?;
            let arg = instruction.argument;

            match op {
                Opcode::ChangeValue => {
                    let cell = self.cell_mut();
                    *cell = cell.wrapping_add(arg);
                    self.program_counter += 1;
                }
                Opcode::ChangePointer => {
                    let target = self.cursor as i64 + i64::from(arg);
                    let target = usize::try_from(target).map_err(|_| {
                        VmError::MemoryOutOfBounds {
                            cursor: self.cursor,
                            delta: arg,
                        }
                    })?;
                    self.cursor = target;
                    self.tape.grow_to_include(target);
                    self.program_counter += 1;
                }
                Opcode::BranchIfZero => {
                    self.branch(arg, self.current() == 0);
                }
                Opcode::BranchNotZero => {
                    self.branch(arg, self.current() != 0);
                }
                Opcode::Get => {
                    // Every iteration overwrites the cell; only the last read
                    // remains visible.
                    for _ in 0..arg.max(0) {
                        let value = if self.input.eof()? {
                            self.config.eof
                        } else {
                            i32::from(self.input.get_byte()?)
                        };
                        *self.cell_mut() = value;
                    }
                    self.program_counter += 1;
                }
                Opcode::Put => {
                    let count = usize::try_from(arg).unwrap_or(0);
                    if count > 0 {
                        if self.scratch.len() < count {
                            self.scratch = vec![0; count];
                        }
                        let byte = self.current() as u8;
                        let batch = &mut self.scratch[..count];
                        batch.fill(byte);
                        self.output.write(batch)?;
                    }
                    self.program_counter += 1;
                }
            }
        }
        Ok(())
    }

    pub fn state(&self) -> VmState {
        VmState {
            cursor: self.cursor,
            tape_len: self.tape.len(),
            program_counter: self.program_counter,
            current_value: self.tape.get(self.cursor),
        }
    }

    pub fn tape(&self) -> &[i32] {
        self.tape.cells()
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn into_parts(self) -> (I, O) {
        (self.input, self.output)
    }

    /// Relative jump when `taken`, otherwise fall through. Targets outside
    /// the program end execution.
    #[inline(always)]
    fn branch(&mut self, offset: i32, taken: bool) {
        self.program_counter = if taken {
            self.program_counter.wrapping_add_signed(offset as isize)
        } else {
            self.program_counter + 1
        };
    }

    #[inline(always)]
    fn current(&self) -> i32 {
        self.tape.get(self.cursor).unwrap_or(0)
    }

    #[inline(always)]
    fn cell_mut(&mut self) -> &mut i32 {
        self.tape.cell_mut(self.cursor)
    }
}
