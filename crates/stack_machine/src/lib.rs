#![no_std]

#![cfg_attr(
    not(test),
    deny(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing,
        clippy::string_slice,
        clippy::arithmetic_side_effects,
        clippy::panicking_unwrap,
        clippy::out_of_bounds_indexing,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
    )
)]
#![cfg_attr(not(test), warn(clippy::missing_panics_doc))]

//! A small stack based virtual machine together with the text front end
//! that feeds it.
//!
//! Source text is turned into a stream of [`Instruction`]s by the
//! [`tokenizer`], symbolic jump targets are bound to absolute indices by
//! the [`resolver`], and the resulting [`Program`] is either executed by a
//! [`Machine`] or persisted with the [`codec`].
//!
//! The token stream and the program are the same thing. Every token the
//! tokenizer produces occupies one slot in the program, labels included,
//! and labels execute as no-ops so a jump to a label lands on it.

extern crate alloc;
#[cfg(test)]
extern crate std;

use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;
use variant_count::VariantCount;

pub mod builder;
pub mod codec;
pub mod disassembler;
pub mod resolver;
pub mod tokenizer;

/// Every stack value and operand is a signed 64 bit word.
pub type Word = i64;

/// Longest identifier the tokenizer accepts.
pub const NAME_CAP: usize = 32;

/// Identifier text for labels and symbolic references.
pub type Name = heapless::String<NAME_CAP>;

#[repr(u8)] // Must match the opcode byte used by the codec.
#[derive(VariantCount, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Push,
    Duplicate,
    Sum,
    Subtract,
    Multiply,
    Divide,
    Jump,
    JumpIfTrue,
    Equal,
    Label,
    Identifier,
    Number,
    EndOfStream,
}

impl Kind {
    /// Every kind in opcode order.
    pub const ALL: [Kind; Kind::VARIANT_COUNT] = [
        Kind::Push,
        Kind::Duplicate,
        Kind::Sum,
        Kind::Subtract,
        Kind::Multiply,
        Kind::Divide,
        Kind::Jump,
        Kind::JumpIfTrue,
        Kind::Equal,
        Kind::Label,
        Kind::Identifier,
        Kind::Number,
        Kind::EndOfStream,
    ];

    pub fn requires_operand(self) -> bool {
        matches!(
            self,
            Kind::Push | Kind::Duplicate | Kind::Jump | Kind::JumpIfTrue
        )
    }

    /// Jumps are the only opcodes whose operand may be a label name.
    pub fn takes_label(self) -> bool {
        matches!(self, Kind::Jump | Kind::JumpIfTrue)
    }

    /// The assembly mnemonic of an opcode, `None` for the lexical kinds.
    pub fn mnemonic(self) -> Option<&'static str> {
        match self {
            Kind::Push => Some("psh"),
            Kind::Duplicate => Some("dupl"),
            Kind::Sum => Some("sum"),
            Kind::Subtract => Some("sub"),
            Kind::Multiply => Some("mul"),
            Kind::Divide => Some("div"),
            Kind::Jump => Some("jmp"),
            Kind::JumpIfTrue => Some("jif"),
            Kind::Equal => Some("eq"),
            Kind::Label | Kind::Identifier | Kind::Number | Kind::EndOfStream => None,
        }
    }
}

impl From<Kind> for u8 {
    fn from(kind: Kind) -> u8 {
        kind as u8
    }
}

impl TryFrom<u8> for Kind {
    type Error = u8;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Kind::ALL.get(usize::from(value)).copied().ok_or(value)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Source span of a token, 1-based, `column_end` is one past the last
/// character. Only used for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub line_start: u32,
    pub column_start: u32,
    pub line_end: u32,
    pub column_end: u32,
}

/// One slot of the token stream and of a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub kind: Kind,
    pub operand: Word,
    pub name: Option<Name>,
    pub hash: u32,
    pub span: Span,
}

/// Operand of an identifier that has not been bound to a label.
pub const UNRESOLVED: Word = -1;

impl Instruction {
    pub fn new(kind: Kind, operand: Word) -> Self {
        Self {
            kind,
            operand,
            name: None,
            hash: 0,
            span: Span::default(),
        }
    }

    pub fn with_name(kind: Kind, operand: Word, name: Name) -> Self {
        let hash = hash_name(&name);
        Self {
            kind,
            operand,
            name: Some(name),
            hash,
            span: Span::default(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn push(value: Word) -> Self {
        Self::new(Kind::Push, value)
    }

    pub fn duplicate(depth: Word) -> Self {
        Self::new(Kind::Duplicate, depth)
    }

    pub fn sum() -> Self {
        Self::new(Kind::Sum, 0)
    }

    pub fn subtract() -> Self {
        Self::new(Kind::Subtract, 0)
    }

    pub fn multiply() -> Self {
        Self::new(Kind::Multiply, 0)
    }

    pub fn divide() -> Self {
        Self::new(Kind::Divide, 0)
    }

    pub fn jump(target: Word) -> Self {
        Self::new(Kind::Jump, target)
    }

    pub fn jump_if_true(target: Word) -> Self {
        Self::new(Kind::JumpIfTrue, target)
    }

    pub fn equal() -> Self {
        Self::new(Kind::Equal, 0)
    }

    pub fn end() -> Self {
        Self::new(Kind::EndOfStream, 0)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(|name| name.as_str())
    }

    /// True when this instruction refers to a label by name.
    pub fn is_reference(&self) -> bool {
        self.name.is_some() && (self.kind == Kind::Identifier || self.kind.takes_label())
    }
}

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32 bit FNV-1a hash of an identifier.
pub fn hash_name(name: &str) -> u32 {
    name.bytes()
        .fold(FNV_OFFSET, |hash, byte| (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME))
}

/// An ordered sequence of instructions, indexed from zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    pub fn as_slice(&self) -> &[Instruction] {
        self.instructions.as_slice()
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self::new(instructions)
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = core::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Illegal {
    InstructionPointerOutOfRange,
    NotAnOpcode(Kind),
    JumpTargetOutOfRange(Word),
    NegativeDuplicateDepth(Word),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineError {
    #[error("illegal instruction at {at}: {cause:?}")]
    IllegalInstruction { at: usize, cause: Illegal },
    #[error("stack underflow at {at}: needed {needed} values, found {available}")]
    StackUnderflow {
        at: usize,
        needed: usize,
        available: usize,
    },
    #[error("division by zero at {at}")]
    DivisionByZero { at: usize },
}

impl MachineError {
    /// Instruction pointer of the instruction that failed.
    pub fn at(&self) -> usize {
        match self {
            MachineError::IllegalInstruction { at, .. }
            | MachineError::StackUnderflow { at, .. }
            | MachineError::DivisionByZero { at } => *at,
        }
    }
}

/// How many steps a run may take before it gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepBudget {
    Limited(u64),
    Unbounded,
}

impl StepBudget {
    fn allows(&self, steps: u64) -> bool {
        match self {
            StepBudget::Limited(limit) => steps < *limit,
            StepBudget::Unbounded => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Halted,
}

/// How a run loop ended when no instruction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Halted { steps: u64 },
    StepLimitExceeded { steps: u64 },
}

/// Reported to a run observer after every successful step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTrace {
    pub step: u64,
    pub instruction_pointer: usize,
    pub kind: Kind,
    pub stack_depth: usize,
}

pub struct Machine {
    program: Program,
    stack: Vec<Word>,
    instruction_pointer: usize,
    halted: bool,
    executed: u64,
}

impl Machine {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            stack: Vec::new(),
            instruction_pointer: 0,
            halted: false,
            executed: 0,
        }
    }

    /// Replace the program and start over from a fresh state.
    pub fn load_program(&mut self, program: Program) {
        self.program = program;
        self.stack.clear();
        self.instruction_pointer = 0;
        self.halted = false;
        self.executed = 0;
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn stack(&self) -> &[Word] {
        self.stack.as_slice()
    }

    pub fn instruction_pointer(&self) -> usize {
        self.instruction_pointer
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Successful steps since the program was loaded.
    pub fn executed(&self) -> u64 {
        self.executed
    }

    pub fn run(&mut self, budget: StepBudget) -> Result<RunOutcome, MachineError> {
        self.run_with(budget, |_| {})
    }

    pub fn run_with<F>(&mut self, budget: StepBudget, mut observer: F) -> Result<RunOutcome, MachineError>
    where
        F: FnMut(&StepTrace),
    {
        let mut steps: u64 = 0;
        while !self.halted {
            if !budget.allows(steps) {
                return Ok(RunOutcome::StepLimitExceeded { steps });
            }
            let at = self.instruction_pointer;
            let kind = self
                .program
                .get(at)
                .map(|instruction| instruction.kind)
                .unwrap_or(Kind::EndOfStream);
            self.step()?;
            steps = steps.saturating_add(1);
            observer(&StepTrace {
                step: steps,
                instruction_pointer: at,
                kind,
                stack_depth: self.stack.len(),
            });
        }
        Ok(RunOutcome::Halted { steps })
    }

    /// Execute exactly one instruction. On error nothing is changed.
    pub fn step(&mut self) -> Result<Step, MachineError> {
        if self.halted {
            return Ok(Step::Halted);
        }

        let at = self.instruction_pointer;
        let Some(instruction) = self.program.get(at) else {
            return Err(MachineError::IllegalInstruction {
                at,
                cause: Illegal::InstructionPointerOutOfRange,
            });
        };
        let kind = instruction.kind;
        let operand = instruction.operand;
        tracing::trace!(at, ?kind, operand, depth = self.stack.len(), "step");

        let mut next = next_ip(at)?;
        match kind {
            Kind::Push => {
                self.stack.push(operand);
            }
            Kind::Duplicate => {
                let len = self.stack.len();
                let Ok(depth) = usize::try_from(operand) else {
                    return Err(MachineError::IllegalInstruction {
                        at,
                        cause: Illegal::NegativeDuplicateDepth(operand),
                    });
                };
                // The copied value sits `depth` below the top.
                let Some(index) = len.checked_sub(depth).and_then(|top| top.checked_sub(1)) else {
                    return Err(MachineError::StackUnderflow {
                        at,
                        needed: depth.saturating_add(1),
                        available: len,
                    });
                };
                let value = *self.stack.get(index).ok_or(MachineError::StackUnderflow {
                    at,
                    needed: depth.saturating_add(1),
                    available: len,
                })?;
                self.stack.push(value);
            }
            Kind::Sum => self.binary(at, |lhs, rhs| Ok(lhs.wrapping_add(rhs)))?,
            Kind::Subtract => self.binary(at, |lhs, rhs| Ok(lhs.wrapping_sub(rhs)))?,
            Kind::Multiply => self.binary(at, |lhs, rhs| Ok(lhs.wrapping_mul(rhs)))?,
            Kind::Divide => self.binary(at, |lhs, rhs| {
                if rhs == 0 {
                    return Err(MachineError::DivisionByZero { at });
                }
                Ok(lhs.wrapping_div(rhs))
            })?,
            Kind::Equal => self.binary(at, |lhs, rhs| Ok(Word::from(lhs == rhs)))?,
            Kind::Jump => {
                next = self.jump_target(at, operand)?;
            }
            Kind::JumpIfTrue => {
                let condition = *self.stack.last().ok_or(MachineError::StackUnderflow {
                    at,
                    needed: 1,
                    available: 0,
                })?;
                let target = self.jump_target(at, operand)?;
                let _ = self.stack.pop();
                if condition == 1 {
                    next = target;
                }
            }
            Kind::Label => {}
            Kind::EndOfStream => {
                self.halted = true;
            }
            Kind::Identifier | Kind::Number => {
                return Err(MachineError::IllegalInstruction {
                    at,
                    cause: Illegal::NotAnOpcode(kind),
                });
            }
        }

        self.instruction_pointer = next;
        self.executed = self.executed.saturating_add(1);
        if self.halted {
            Ok(Step::Halted)
        } else {
            Ok(Step::Continue)
        }
    }

    /// Pop `rhs` then `lhs` and push `op(lhs, rhs)`. The stack is only
    /// touched once `op` has succeeded.
    fn binary<F>(&mut self, at: usize, op: F) -> Result<(), MachineError>
    where
        F: FnOnce(Word, Word) -> Result<Word, MachineError>,
    {
        let len = self.stack.len();
        let underflow = MachineError::StackUnderflow {
            at,
            needed: 2,
            available: len,
        };
        let lhs_index = len.checked_sub(2).ok_or(underflow)?;
        let lhs = *self.stack.get(lhs_index).ok_or(underflow)?;
        let rhs = *self.stack.last().ok_or(underflow)?;
        let result = op(lhs, rhs)?;
        self.stack.truncate(lhs_index);
        self.stack.push(result);
        debug_assert_eq!(self.stack.len(), len.saturating_sub(1));
        Ok(())
    }

    fn jump_target(&self, at: usize, operand: Word) -> Result<usize, MachineError> {
        match usize::try_from(operand) {
            Ok(target) if target < self.program.len() => Ok(target),
            _ => Err(MachineError::IllegalInstruction {
                at,
                cause: Illegal::JumpTargetOutOfRange(operand),
            }),
        }
    }
}

fn next_ip(at: usize) -> Result<usize, MachineError> {
    at.checked_add(1).ok_or(MachineError::IllegalInstruction {
        at,
        cause: Illegal::InstructionPointerOutOfRange,
    })
}

/// Canonical example programs.
pub mod programs {
    use super::*;

    /// Grows the stack with the Fibonacci sequence forever. Run it with a
    /// bounded [`StepBudget`].
    pub fn fibonacci() -> Program {
        Program::from(alloc::vec![
            Instruction::push(0),
            Instruction::push(1),
            Instruction::duplicate(1),
            Instruction::duplicate(1),
            Instruction::sum(),
            Instruction::jump(2),
        ])
    }
}
