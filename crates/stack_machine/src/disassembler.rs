use alloc::string::String;
use core::fmt::{self, Write as _};
use thiserror_no_std::Error;

use crate::{Instruction, Kind};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisassembleError {
    /// The text format only ends at the last slot, an earlier end of
    /// stream has no source form.
    #[error("program ends early at {index}")]
    EarlyEnd { index: usize },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.kind.mnemonic()) {
            (kind, Some(mnemonic)) if kind.requires_operand() => {
                write!(f, "{mnemonic} {}", self.operand)
            }
            (_, Some(mnemonic)) => f.write_str(mnemonic),
            (Kind::Label, None) => write!(f, ":{}", self.name().unwrap_or_default()),
            (Kind::Identifier, None) => match self.name() {
                Some(name) => f.write_str(name),
                None => write!(f, "{}", self.operand),
            },
            (Kind::Number, None) => write!(f, "{}", self.operand),
            (_, None) => f.write_str("end"),
        }
    }
}

/// Render instructions back to assembly text, one per line. A trailing
/// end of stream is implied by the text format and left out.
pub fn disassemble(instructions: &[Instruction]) -> Result<String, DisassembleError> {
    let body = match instructions.split_last() {
        Some((last, body)) if last.kind == Kind::EndOfStream => body,
        _ => instructions,
    };
    if let Some(index) = body
        .iter()
        .position(|instruction| instruction.kind == Kind::EndOfStream)
    {
        return Err(DisassembleError::EarlyEnd { index });
    }
    let mut text = String::new();
    for instruction in body {
        // Writing into a String can not fail.
        let _ = writeln!(text, "{instruction}");
    }
    Ok(text)
}
