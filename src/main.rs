//! # SCM Bridge CLI
//!
//! This is the binary entry point for the `scm-bridge` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Setting up logging.
//! - Handing the run to the library and turning its error into a non-zero
//!   exit with the failing stage in the message.
//!
//! The core logic lives in the `lib.rs` library crate; the binary is a thin
//! wrapper around it.

mod cli;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
