use serde_json::Value;

use crate::error::VmError;

/// The six operations understood by the VM.
///
/// Instructions store raw integer codes; decoding into this enum happens at
/// execution time so that unknown codes surface as
/// [`VmError::InvalidCommand`] only when they are actually reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Opcode {
    ChangeValue = 0,
    ChangePointer = 1,
    Get = 2,
    Put = 3,
    BranchIfZero = 4,
    BranchNotZero = 5,
}

impl Opcode {
    pub const ALL: [Opcode; 6] = [
        Opcode::ChangeValue,
        Opcode::ChangePointer,
        Opcode::Get,
        Opcode::Put,
        Opcode::BranchIfZero,
        Opcode::BranchNotZero,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for Opcode {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Opcode::ChangeValue),
            1 => Ok(Opcode::ChangePointer),
            2 => Ok(Opcode::Get),
            3 => Ok(Opcode::Put),
            4 => Ok(Opcode::BranchIfZero),
            5 => Ok(Opcode::BranchNotZero),
            other => Err(other),
        }
    }
}

/// A single `(code, argument)` pair, stored verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub code: i32,
    pub argument: i32,
}

impl Instruction {
    pub fn new(op: Opcode, argument: i32) -> Self {
        Self {
            code: op.code(),
            argument,
        }
    }

    /// Decode the opcode, returning the raw code if it is not recognized.
    #[inline(always)]
    pub fn opcode(&self) -> Result<Opcode, i32> {
        Opcode::try_from(self.code)
    }
}

/// The instruction store: an immutable, index-addressed instruction sequence.
///
/// Index 0 is the entry point. A program never changes after construction;
/// loading a different one into the VM replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Box<[Instruction]>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions: instructions.into_boxed_slice(),
        }
    }

    /// Build a program from wide `(code, argument)` pairs.
    ///
    /// Fails with [`VmError::InvalidProgram`] if any field does not fit the
    /// 32-bit instruction layout. Nothing is built unless every pair is valid.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, VmError>
    where
        I: IntoIterator<Item = (i64, i64)>,
    {
        let instructions = pairs
            .into_iter()
            .enumerate()
            .map(|(index, (code, argument))| {
                Ok(Instruction {
                    code: narrow(index, "code", code)?,
                    argument: narrow(index, "argument", argument)?,
                })
            })
            .collect::<Result<Vec<_>, VmError>>()?;
        Ok(Self::new(instructions))
    }

    /// Parse a JSON document of the form `[[code, argument], ...]`.
    pub fn from_json(text: &str) -> Result<Self, VmError> {
        let value: Value = serde_json::from_str(text).map_err(|e| VmError::InvalidProgram {
            index: 0,
            reason: format!("not valid JSON: {e}"),
        })?;
        Self::from_json_value(&value)
    }

    /// Validate an already-parsed JSON value as an instruction stream.
    pub fn from_json_value(value: &Value) -> Result<Self, VmError> {
        let entries = value.as_array().ok_or_else(|| VmError::InvalidProgram {
            index: 0,
            reason: "program must be an array of instructions".to_string(),
        })?;

        let mut pairs = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let invalid = |reason: &str| VmError::InvalidProgram {
                index,
                reason: reason.to_string(),
            };
            let tuple = entry
                .as_array()
                .ok_or_else(|| invalid("instruction must be an array"))?;
            if tuple.len() != 2 {
                return Err(invalid("instructions must be (code, argument) tuples"));
            }
            let code = tuple[0]
                .as_i64()
                .ok_or_else(|| invalid("code must be an integer"))?;
            let argument = tuple[1]
                .as_i64()
                .ok_or_else(|| invalid("argument must be an integer"))?;
            pairs.push((code, argument));
        }
        Self::from_pairs(pairs)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Render the program as the JSON instruction-stream format.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let pairs: Vec<[i32; 2]> = self
            .instructions
            .iter()
            .map(|i| [i.code, i.argument])
            .collect();
        serde_json::to_string(&pairs)
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self::new(instructions)
    }
}

fn narrow(index: usize, field: &str, value: i64) -> Result<i32, VmError> {
    i32::try_from(value).map_err(|_| VmError::InvalidProgram {
        index,
        reason: format!("{field} {value} does not fit in 32 bits"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_codes_round_trip() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::try_from(op.code()), Ok(op));
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert_eq!(Opcode::try_from(6), Err(6));
        assert_eq!(Opcode::try_from(-1), Err(-1));
        assert_eq!(Opcode::try_from(99), Err(99));
    }

    #[test]
    fn test_from_json_accepts_pairs() {
        let program = Program::from_json("[[0, 5], [1, -2], [3, 1]]").unwrap();
        assert_eq!(program.len(), 3);
        assert_eq!(program.get(0), Some(&Instruction::new(Opcode::ChangeValue, 5)));
        assert_eq!(program.get(1), Some(&Instruction::new(Opcode::ChangePointer, -2)));
        assert_eq!(program.get(2), Some(&Instruction::new(Opcode::Put, 1)));
        assert_eq!(program.get(3), None);
    }

    #[test]
    fn test_from_json_keeps_unknown_opcodes() {
        // Opcode validity is deferred to execution.
        let program = Program::from_json("[[99, 1]]").unwrap();
        assert_eq!(program.get(0).unwrap().opcode(), Err(99));
    }

    #[test]
    fn test_from_json_empty_program() {
        let program = Program::from_json("[]").unwrap();
        assert!(program.is_empty());
    }

    #[test]
    fn test_from_json_wrong_arity() {
        let err = Program::from_json("[[0, 1], [0, 1, 2]]").unwrap_err();
        match err {
            VmError::InvalidProgram { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_from_json_non_integer_fields() {
        assert!(matches!(
            Program::from_json(r#"[["change_value", 1]]"#),
            Err(VmError::InvalidProgram { index: 0, .. })
        ));
        assert!(matches!(
            Program::from_json("[[0, 1.5]]"),
            Err(VmError::InvalidProgram { index: 0, .. })
        ));
        assert!(matches!(
            Program::from_json("[[0, 1], 7]"),
            Err(VmError::InvalidProgram { index: 1, .. })
        ));
    }

    #[test]
    fn test_from_json_not_an_array() {
        assert!(matches!(
            Program::from_json(r#"{"code": 0}"#),
            Err(VmError::InvalidProgram { .. })
        ));
        assert!(matches!(
            Program::from_json("[[0, 1]"),
            Err(VmError::InvalidProgram { .. })
        ));
    }

    #[test]
    fn test_from_pairs_out_of_range() {
        let err = Program::from_pairs([(0, 1), (0, i64::from(i32::MAX) + 1)]).unwrap_err();
        assert!(matches!(err, VmError::InvalidProgram { index: 1, .. }));
    }

    #[test]
    fn test_to_json() {
        let program = Program::new(vec![
            Instruction::new(Opcode::BranchIfZero, 3),
            Instruction::new(Opcode::ChangeValue, -1),
            Instruction::new(Opcode::BranchNotZero, -1),
        ]);
        let json = program.to_json().unwrap();
        assert_eq!(json, "[[4,3],[0,-1],[5,-1]]");
        assert_eq!(Program::from_json(&json).unwrap(), program);
    }
}
