use std::io;
use std::path::PathBuf;

use stack_machine::codec::CodecError;
use stack_machine::disassembler::DisassembleError;
use stack_machine::tokenizer::LexError;
use stack_machine::MachineError;
use thiserror_no_std::Error;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("could not read {}: {error}", .path.display())]
    Read { path: PathBuf, error: io::Error },
    #[error("could not write {}: {error}", .path.display())]
    Write { path: PathBuf, error: io::Error },
    #[error("{}:{}:{}: {}", .path.display(), .error.line_number(), .error.column(), .error.error_kind())]
    Lex { path: PathBuf, error: LexError },
    #[error("{}: {error}", .path.display())]
    Codec { path: PathBuf, error: CodecError },
    #[error("{}: {error}", .path.display())]
    Disassemble { path: PathBuf, error: DisassembleError },
    #[error("could not write output: {0}")]
    Output(io::Error),
    #[error("execution failed: {0}")]
    Machine(#[from] MachineError),
}

impl From<io::Error> for DeckError {
    fn from(error: io::Error) -> Self {
        DeckError::Output(error)
    }
}
