use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use stack_machine::codec::{decode, encode};
use stack_machine::Program;
use tempfile::NamedTempFile;

use crate::error::DeckError;

pub const PROGRAM_EXTENSION: &str = "stkb";

pub fn default_output_path(input: &Path) -> PathBuf {
    let mut out = input.to_path_buf();
    out.set_extension(PROGRAM_EXTENSION);
    out
}

pub fn load_source(path: &Path) -> Result<String, DeckError> {
    fs::read_to_string(path).map_err(|error| DeckError::Read {
        path: path.to_path_buf(),
        error,
    })
}

/// Read and decode a program image. Nothing is returned unless the whole
/// image decodes.
pub fn load_program(path: &Path) -> Result<Program, DeckError> {
    let bytes = fs::read(path).map_err(|error| DeckError::Read {
        path: path.to_path_buf(),
        error,
    })?;
    let program = decode(&bytes).map_err(|error| DeckError::Codec {
        path: path.to_path_buf(),
        error,
    })?;
    tracing::debug!(path = %path.display(), instructions = program.len(), "loaded program");
    Ok(program)
}

pub fn save_program(path: &Path, program: &Program) -> Result<(), DeckError> {
    let bytes = encode(program).map_err(|error| DeckError::Codec {
        path: path.to_path_buf(),
        error,
    })?;
    write_atomically(path, &bytes)?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "saved program");
    Ok(())
}

pub fn save_text(path: &Path, text: &str) -> Result<(), DeckError> {
    write_atomically(path, text.as_bytes())
}

/// Write to a temporary file in the same directory and rename it over
/// `path`, so readers never see a partial file. The temporary file is
/// removed if anything fails.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), DeckError> {
    let write_error = |error| DeckError::Write {
        path: path.to_path_buf(),
        error,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(write_error)?;

    let mut temp = NamedTempFile::new_in(parent).map_err(write_error)?;
    temp.write_all(bytes).map_err(write_error)?;
    temp.persist(path).map_err(|error| write_error(error.error))?;
    Ok(())
}
