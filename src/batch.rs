//! Batch-system collaborator: job modes and job-id validation.
//!
//! A job mode is configured as `<kind>[, <options>]`, for example
//! `interactive`, `lxBatch, -q cmscaf1nd`, or `crab, -q cmscaf`. The
//! options tail is passed through to the submission command untouched;
//! only the queue is ever parsed out of it (grid descriptors need it).

use crate::error::{Error, Result};
use crate::shell::CommandRunner;

/// How the generated jobs are meant to be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobModeKind {
    /// Run locally, one after the other.
    Interactive,
    /// Submit to the batch farm.
    Batch,
    /// Submit to the grid; the grid does its own job splitting.
    Crab,
}

/// Parsed job mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobMode {
    /// Execution kind.
    pub kind: JobModeKind,
    /// Raw submission options following the kind, if any.
    pub options: Option<String>,
}

impl JobMode {
    /// Parse a `jobmode` option value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for an unrecognized mode.
    pub fn parse(value: &str) -> Result<Self> {
        let (head, tail) = match value.split_once(',') {
            Some((head, tail)) => (head, Some(tail.trim().to_owned())),
            None => (value, None),
        };
        let kind = match head.trim() {
            "interactive" => JobModeKind::Interactive,
            "lxBatch" => JobModeKind::Batch,
            "crab" => JobModeKind::Crab,
            other => {
                return Err(Error::ConfigError(format!(
                    "unknown jobmode '{other}' (expected interactive, lxBatch or crab)"
                )))
            }
        };
        Ok(Self { kind, options: tail })
    }

    /// Whether the mode is grid submission.
    #[must_use]
    pub fn is_crab(&self) -> bool {
        self.kind == JobModeKind::Crab
    }

    /// The queue named in the submission options (`-q <queue>`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if no queue is configured.
    pub fn queue(&self) -> Result<String> {
        self.options
            .as_deref()
            .and_then(|options| options.split_once("-q"))
            .map(|(_, queue)| queue.trim().to_owned())
            .filter(|queue| !queue.is_empty())
            .ok_or_else(|| {
                Error::ConfigError(
                    "jobmode does not name a queue; append ', -q <queue>'".to_owned(),
                )
            })
    }
}

/// Ask the batch system about a previously submitted job.
///
/// # Errors
///
/// Returns [`Error::CommandError`] when the query fails or the batch
/// system does not know the id (its answer contains `is not found`).
pub fn query_job(runner: &dyn CommandRunner, job_id: &str) -> Result<String> {
    let output = runner.run(&format!("bjobs {job_id} 2>&1"))?;
    if output.contains("is not found") {
        return Err(Error::CommandError(format!(
            "'{job_id}' is not a valid jobid; maybe it finished already?"
        )));
    }
    Ok(output)
}
