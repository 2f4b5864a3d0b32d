//! Core CLI types - Cli, Command, and argument structs.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Validar: validation-job generation for detector alignment
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "validar")]
#[command(version)]
#[command(about = "Generate per-validation job bundles (configurations, scripts, batch \
                   descriptors) from a declarative job description")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Generate job bundles from a job description
    Generate(GenerateArgs),

    /// Validate a job description without generating files
    Validate(ValidateArgs),

    /// Display resolved options for every validation section
    Info(InfoArgs),
}

/// Arguments for the generate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct GenerateArgs {
    /// Path to the YAML job description
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Directory receiving the generated files (defaults to the job
    /// description's workdir)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to the YAML job description
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// Arguments for the info command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InfoArgs {
    /// Path to the YAML job description
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Output format for the info command
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON
    Json,
    /// YAML
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        };
        f.write_str(name)
    }
}
