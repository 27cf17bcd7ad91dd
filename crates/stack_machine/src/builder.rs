use alloc::vec::Vec;
use thiserror_no_std::Error;

use crate::resolver::resolve;
use crate::{Instruction, Kind, Name, Program, Word, UNRESOLVED};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuilderError {
    #[error("label name is too long")]
    NameTooLong,
    #[error("jump to undeclared label {0}")]
    UndefinedLabel(Name),
}

fn to_name(name: &str) -> Result<Name, BuilderError> {
    let mut out = Name::new();
    out.push_str(name).map_err(|_| BuilderError::NameTooLong)?;
    Ok(out)
}

/// Builds a program in code, one instruction per call.
///
/// ```
/// use stack_machine::builder::ProgramBuilder;
///
/// let program = ProgramBuilder::new().push(3).push(4).sum().end().finish()?;
/// assert_eq!(program.len(), 4);
/// # Ok::<(), stack_machine::builder::BuilderError>(())
/// ```
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    instructions: Vec<Instruction>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next instruction will occupy.
    pub fn position(&self) -> usize {
        self.instructions.len()
    }

    pub fn add(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    pub fn push(self, value: Word) -> Self {
        self.add(Instruction::push(value))
    }

    pub fn duplicate(self, depth: Word) -> Self {
        self.add(Instruction::duplicate(depth))
    }

    pub fn sum(self) -> Self {
        self.add(Instruction::sum())
    }

    pub fn subtract(self) -> Self {
        self.add(Instruction::subtract())
    }

    pub fn multiply(self) -> Self {
        self.add(Instruction::multiply())
    }

    pub fn divide(self) -> Self {
        self.add(Instruction::divide())
    }

    pub fn equal(self) -> Self {
        self.add(Instruction::equal())
    }

    /// Jump to an absolute index.
    pub fn jump(self, target: Word) -> Self {
        self.add(Instruction::jump(target))
    }

    pub fn jump_if_true(self, target: Word) -> Self {
        self.add(Instruction::jump_if_true(target))
    }

    pub fn end(self) -> Self {
        self.add(Instruction::end())
    }

    /// Declare a label at the current position.
    pub fn label(self, name: &str) -> Result<Self, BuilderError> {
        let name = to_name(name)?;
        Ok(self.add(Instruction::with_name(Kind::Label, 0, name)))
    }

    /// Jump to a label that may be declared before or after this call.
    pub fn jump_to(self, name: &str) -> Result<Self, BuilderError> {
        let name = to_name(name)?;
        Ok(self.add(Instruction::with_name(Kind::Jump, UNRESOLVED, name)))
    }

    pub fn jump_if_true_to(self, name: &str) -> Result<Self, BuilderError> {
        let name = to_name(name)?;
        Ok(self.add(Instruction::with_name(Kind::JumpIfTrue, UNRESOLVED, name)))
    }

    /// Bind every symbolic jump. Unlike assembling text, a jump to a label
    /// that is never declared is an error here.
    pub fn finish(self) -> Result<Program, BuilderError> {
        let resolved = resolve(self.instructions);
        if let Some(missing) = resolved.unresolved.into_iter().next() {
            return Err(BuilderError::UndefinedLabel(missing.name));
        }
        Ok(resolved.program)
    }
}
