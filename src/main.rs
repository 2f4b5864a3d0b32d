//! Validar CLI
//!
//! Job-bundle generation entry point for the validar library.
//!
//! # Usage
//!
//! ```bash
//! # Generate job bundles from a job description
//! validar generate validation.yaml
//!
//! # Generate into a specific directory
//! validar generate validation.yaml --output-dir ./jobs
//!
//! # Validate a job description
//! validar validate validation.yaml
//!
//! # Show resolved options
//! validar info validation.yaml --format yaml
//! ```

use clap::Parser;
use std::process::ExitCode;
use validar::cli::{run_command, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
