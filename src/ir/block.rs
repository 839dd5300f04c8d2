//! Basic blocks.

use std::fmt;

use crate::ir::Instruction;

/// A named, ordered sequence of instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    name: String,
    instructions: Vec<Instruction>,
}

impl BasicBlock {
    /// Creates an empty block.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: Vec::new(),
        }
    }

    /// Returns the block label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the instructions in order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Returns mutable access to the instruction list.
    pub fn instructions_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.instructions
    }

    /// Appends an instruction.
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Returns the final instruction if it is a terminator.
    #[must_use]
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions
            .last()
            .filter(|inst| inst.op().is_terminator())
    }

    /// Returns `true` if the block has no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Returns the number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.name)?;
        for inst in &self.instructions {
            writeln!(f, "  {inst}")?;
        }
        Ok(())
    }
}
