//! Job-description parsing and CLI argument types.

mod cli;
mod file;

pub use cli::{Cli, Command, GenerateArgs, InfoArgs, OutputFormat, ValidateArgs};
pub use file::ValidationConfig;
