use std::io::Write;
use std::path::Path;

use stack_machine::disassembler::disassemble;
use stack_machine::resolver::{Resolved, UnresolvedLabel};
use stack_machine::tokenizer::assemble;
use stack_machine::{Machine, Program, RunOutcome, StepBudget, StepTrace};

use crate::error::DeckError;
use crate::file_services::{default_output_path, load_program, load_source, save_program, save_text};
use crate::Command;

pub fn dispatch<W: Write>(command: Command, out: &mut W) -> Result<(), DeckError> {
    match command {
        Command::Build { input, output } => {
            let output = output.unwrap_or_else(|| default_output_path(&input));
            build(&input, &output)
        }
        Command::Disasm { input, output } => disasm(&input, output.as_deref(), out),
        Command::Run {
            input,
            limit,
            trace,
            source,
        } => {
            let budget = limit.map_or(StepBudget::Unbounded, StepBudget::Limited);
            run(&input, source, budget, trace, out)
        }
        Command::Tokens { input } => tokens(&input, out),
    }
}

fn assemble_file(path: &Path) -> Result<Resolved, DeckError> {
    let source = load_source(path)?;
    let resolved = assemble(&source).map_err(|error| DeckError::Lex {
        path: path.to_path_buf(),
        error,
    })?;
    for label in &resolved.unresolved {
        warn_unresolved(path, label);
    }
    Ok(resolved)
}

fn warn_unresolved(path: &Path, label: &UnresolvedLabel) {
    tracing::warn!(
        "{}:{}:{}: label `{}` is never declared, jump at {} will fail if reached",
        path.display(),
        label.span.line_start,
        label.span.column_start,
        label.name,
        label.index,
    );
}

pub fn build(input: &Path, output: &Path) -> Result<(), DeckError> {
    let resolved = assemble_file(input)?;
    save_program(output, &resolved.program)?;
    tracing::info!(
        "wrote {} instructions to {}",
        resolved.program.len(),
        output.display()
    );
    Ok(())
}

pub fn disasm<W: Write>(input: &Path, output: Option<&Path>, out: &mut W) -> Result<(), DeckError> {
    let program = load_program(input)?;
    let text = disassemble(program.as_slice()).map_err(|error| DeckError::Disassemble {
        path: input.to_path_buf(),
        error,
    })?;
    match output {
        Some(path) => save_text(path, &text),
        None => Ok(out.write_all(text.as_bytes())?),
    }
}

pub fn run<W: Write>(
    input: &Path,
    source: bool,
    budget: StepBudget,
    trace: bool,
    out: &mut W,
) -> Result<(), DeckError> {
    let program = if source {
        assemble_file(input)?.program
    } else {
        load_program(input)?
    };
    let mut machine = Machine::new(program);
    let result = machine.run_with(budget, |step: &StepTrace| {
        if trace {
            tracing::info!(
                "#{} ip={} {:?} depth={}",
                step.step,
                step.instruction_pointer,
                step.kind,
                step.stack_depth
            );
        }
    });

    writeln!(out, "stack: {:?}", machine.stack())?;
    match result? {
        RunOutcome::Halted { steps } => writeln!(out, "halted after {steps} steps")?,
        RunOutcome::StepLimitExceeded { steps } => {
            writeln!(out, "step limit reached after {steps} steps")?
        }
    }
    Ok(())
}

pub fn tokens<W: Write>(input: &Path, out: &mut W) -> Result<(), DeckError> {
    let resolved = assemble_file(input)?;
    write_tokens(&resolved.program, out)
}

fn write_tokens<W: Write>(program: &Program, out: &mut W) -> Result<(), DeckError> {
    for (index, instruction) in program.iter().enumerate() {
        let span = instruction.span;
        writeln!(
            out,
            "{index:>4} {:<12} {:>6} {:<12} {}:{}-{}:{}",
            instruction.kind.to_string(),
            instruction.operand,
            instruction.name().unwrap_or("-"),
            span.line_start,
            span.column_start,
            span.line_end,
            span.column_end,
        )?;
    }
    Ok(())
}
