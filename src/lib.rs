pub mod error;
pub mod io;
pub mod lexer;
pub mod parser;
pub mod program;
pub mod tape;
pub mod unroll;
pub mod vm;

pub use error::{CompileError, Error, VmError};
pub use io::{Input, Output, ReadInput, WriteOutput};
pub use program::{Instruction, Opcode, Program};
pub use vm::{Vm, VmConfig, VmState};

/// Compile source text into an instruction stream.
pub fn compile(source: &[u8]) -> Result<Program, CompileError> {
    let forest = lexer::lex(parser::tokenize(source))?;
    Ok(Program::new(unroll::unroll(&forest)?))
}

/// Compile `source` and run it to completion on a fresh VM.
pub fn eval<I: Input, O: Output>(
    source: &[u8],
    input: I,
    output: O,
    eof: i32,
) -> Result<VmState, Error> {
    let program = compile(source)?;
    let mut vm = Vm::new(input, output, eof);
    vm.load(program);
    vm.execute()?;
    Ok(vm.state())
}
