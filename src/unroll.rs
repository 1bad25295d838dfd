use crate::error::CompileError;
use crate::lexer::Node;
use crate::program::{Instruction, Opcode};

/// Flatten a syntax forest into a linear instruction stream.
///
/// A loop whose body unrolls to `k` instructions becomes
/// `BranchIfZero(k + 2)`, the body, then `BranchNotZero(-k)`: the forward
/// branch lands just past the loop and the backward branch lands on the first
/// body instruction.
pub fn unroll(forest: &[Node]) -> Result<Vec<Instruction>, CompileError> {
    let mut out = Vec::with_capacity(forest.len());
    unroll_into(forest, &mut out)?;
    Ok(out)
}

fn unroll_into(forest: &[Node], out: &mut Vec<Instruction>) -> Result<(), CompileError> {
    for node in forest {
        match node {
            Node::ChangeValue(delta) => out.push(Instruction::new(Opcode::ChangeValue, *delta)),
            Node::ChangePointer(delta) => {
                out.push(Instruction::new(Opcode::ChangePointer, *delta))
            }
            Node::Get(count) => out.push(Instruction::new(Opcode::Get, *count)),
            Node::Put(count) => out.push(Instruction::new(Opcode::Put, *count)),
            Node::Loop { offset, body } => {
                let head = out.len();
                // Placeholder, patched once the body length is known.
                out.push(Instruction::new(Opcode::BranchIfZero, 0));
                unroll_into(body, out)?;
                let len = out.len() - head - 1;

                let overflow = CompileError::Overflow { offset: *offset };
                let back = i32::try_from(len).map_err(|_| overflow.clone())?;
                let forward = back.checked_add(2).ok_or(overflow)?;
                out[head].argument = forward;
                out.push(Instruction::new(Opcode::BranchNotZero, -back));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::tokenize;

    fn compile_str(source: &str) -> Vec<(Opcode, i32)> {
        let forest = lex(tokenize(source.as_bytes())).unwrap();
        unroll(&forest)
            .unwrap()
            .into_iter()
            .map(|i| (i.opcode().unwrap(), i.argument))
            .collect()
    }

    use Opcode::*;

    #[test]
    fn test_straight_line() {
        assert_eq!(
            compile_str("++>,.."),
            vec![(ChangeValue, 2), (ChangePointer, 1), (Get, 1), (Put, 2)]
        );
    }

    #[test]
    fn test_simple_loop() {
        assert_eq!(
            compile_str("[-]"),
            vec![(BranchIfZero, 3), (ChangeValue, -1), (BranchNotZero, -1)]
        );
    }

    #[test]
    fn test_empty_loop() {
        assert_eq!(
            compile_str("[]"),
            vec![(BranchIfZero, 2), (BranchNotZero, 0)]
        );
    }

    #[test]
    fn test_nested_loops() {
        assert_eq!(
            compile_str("[>[-]<]"),
            vec![
                (BranchIfZero, 7),
                (ChangePointer, 1),
                (BranchIfZero, 3),
                (ChangeValue, -1),
                (BranchNotZero, -1),
                (ChangePointer, -1),
                (BranchNotZero, -5),
            ]
        );
    }

    #[test]
    fn test_branch_targets_match() {
        let program = compile_str("+[>[+<-]>[<]]");
        for (pc, &(op, arg)) in program.iter().enumerate() {
            if op == BranchIfZero {
                let exit = (pc as i32 + arg) as usize;
                // The forward branch lands just past its matching close.
                assert_eq!(program[exit - 1].0, BranchNotZero);
                let (_, back) = program[exit - 1];
                assert_eq!((exit as i32 - 1 + back) as usize, pc + 1);
            }
        }
    }
}
