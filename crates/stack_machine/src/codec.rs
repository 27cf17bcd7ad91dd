//! Binary program images.
//!
//! An image is a postcard encoded [`Header`] followed by the postcard
//! encoded sequence of instruction records. Nothing follows the records.

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::{hash_name, Instruction, Kind, Name, Program, Span, Word};

pub const MAGIC: [u8; 4] = *b"STKM";
pub const FORMAT_VERSION: u16 = 1;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("not a program image")]
    BadMagic,
    #[error("unsupported image version {0}")]
    UnsupportedVersion(u16),
    #[error("record {index} has unknown opcode {opcode}")]
    UnknownOpcode { index: usize, opcode: u8 },
    #[error("record {index} has a hash that does not match its name")]
    HashMismatch { index: usize },
    #[error("{0} trailing bytes after the last record")]
    TrailingBytes(usize),
    #[error("malformed image: {0}")]
    Postcard(#[from] postcard::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Header {
    magic: [u8; 4],
    version: u16,
}

impl Header {
    const CURRENT: Header = Header {
        magic: MAGIC,
        version: FORMAT_VERSION,
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct WireInstruction {
    opcode: u8,
    operand: Word,
    name: Option<Name>,
    hash: u32,
    span: Span,
}

impl From<&Instruction> for WireInstruction {
    fn from(instruction: &Instruction) -> Self {
        Self {
            opcode: instruction.kind.into(),
            operand: instruction.operand,
            name: instruction.name.clone(),
            hash: instruction.hash,
            span: instruction.span,
        }
    }
}

impl WireInstruction {
    fn into_instruction(self, index: usize) -> Result<Instruction, CodecError> {
        let kind = Kind::try_from(self.opcode).map_err(|opcode| CodecError::UnknownOpcode {
            index,
            opcode,
        })?;
        let expected = self.name.as_deref().map(hash_name).unwrap_or(0);
        if expected != self.hash {
            return Err(CodecError::HashMismatch { index });
        }
        Ok(Instruction {
            kind,
            operand: self.operand,
            name: self.name,
            hash: self.hash,
            span: self.span,
        })
    }
}

pub fn encode(program: &Program) -> Result<Vec<u8>, CodecError> {
    let records: Vec<WireInstruction> = program.iter().map(WireInstruction::from).collect();
    let mut bytes = postcard::to_allocvec(&Header::CURRENT)?;
    bytes.extend_from_slice(&postcard::to_allocvec(&records)?);
    tracing::debug!(instructions = records.len(), bytes = bytes.len(), "encoded program");
    Ok(bytes)
}

/// Decode a whole image. Either every record is valid and the program is
/// returned, or nothing is.
pub fn decode(bytes: &[u8]) -> Result<Program, CodecError> {
    let (header, rest) = postcard::take_from_bytes::<Header>(bytes)?;
    if header.magic != MAGIC {
        return Err(CodecError::BadMagic);
    }
    if header.version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(header.version));
    }

    let (records, rest) = postcard::take_from_bytes::<Vec<WireInstruction>>(rest)?;
    if !rest.is_empty() {
        return Err(CodecError::TrailingBytes(rest.len()));
    }

    let instructions = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| record.into_instruction(index))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(instructions = instructions.len(), "decoded program");
    Ok(Program::new(instructions))
}
