//! Host side tool for the stack machine.
//!
//! ```text
//! deck build program.stk            # writes program.stkb
//! deck disasm program.stkb
//! deck run program.stkb --limit 1000 --trace
//! deck run program.stk --source
//! deck tokens program.stk
//! ```

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::Level;

mod commands;
mod error;
mod file_services;

#[derive(Parser, Debug)]
#[command(name = "deck", version, about = "Assemble, inspect and run stack machine programs")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(short, long, global = true, default_value_t = Level::INFO)]
    log_level: Level,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Assemble a source file into a program image
    Build {
        input: PathBuf,
        /// Output file (default: input with the `stkb` extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Turn a program image back into assembly text
    Disasm {
        input: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Execute a program image
    Run {
        input: PathBuf,
        /// Stop after this many steps
        #[arg(long)]
        limit: Option<u64>,
        /// Log every executed step
        #[arg(long)]
        trace: bool,
        /// Treat the input as assembly source
        #[arg(long)]
        source: bool,
    },
    /// Print the resolved token stream of a source file
    Tokens { input: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(io::stderr)
        .init();

    let mut stdout = io::stdout().lock();
    if let Err(e) = commands::dispatch(cli.command, &mut stdout) {
        tracing::error!("{e}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
