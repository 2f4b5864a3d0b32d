//! Shell command execution seam.
//!
//! External collaborators (the environment probe, the batch system) talk
//! to the outside world through [`CommandRunner`] so tests can substitute
//! canned output.

use std::process::Command;

use crate::error::{Error, Result};

/// Runs a shell command line and returns its standard output.
pub trait CommandRunner {
    /// Execute `command` and return captured stdout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandError`] if the command cannot be spawned
    /// or exits with a non-zero status.
    fn run(&self, command: &str) -> Result<String>;
}

/// Default runner: `sh -c <command>`, synchronous, fail-fast.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> Result<String> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .map_err(|e| Error::CommandError(format!("failed to run '{command}': {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::CommandError(format!(
                "command '{}' exited with {}: {}",
                command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout() {
        let out = ShellRunner.run("echo hello").unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_nonzero_exit_is_an_error() {
        let err = ShellRunner.run("exit 3").unwrap_err();
        assert!(matches!(err, Error::CommandError(_)));
    }
}
