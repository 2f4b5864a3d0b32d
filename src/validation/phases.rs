//! Generation-phase state machine.
//!
//! Generation is a fixed sequence of explicit method calls:
//! configuration, then script, then optionally the grid descriptor,
//! then the optional merge and plot contributions. A step may not run
//! before the step whose products it references.

use crate::error::{Error, Result};

/// Where a validation instance stands in the generation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    /// Constructed, nothing generated yet.
    Constructed,
    /// Configuration files written.
    ConfigurationGenerated,
    /// Run scripts written (they reference the configurations).
    ScriptGenerated,
    /// Grid descriptor written.
    CrabCfgGenerated,
    /// Merge fragment contributed.
    MergeAppended,
    /// Plot fragment contributed.
    PlotAppended,
}

impl GenerationPhase {
    /// Check and perform the transition to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GenerationError`] for any out-of-order
    /// transition.
    pub fn advance(self, next: GenerationPhase) -> Result<GenerationPhase> {
        use GenerationPhase::{
            ConfigurationGenerated, Constructed, CrabCfgGenerated, MergeAppended, PlotAppended,
            ScriptGenerated,
        };
        let allowed = match next {
            Constructed => false,
            ConfigurationGenerated => self == Constructed,
            ScriptGenerated => self == ConfigurationGenerated,
            CrabCfgGenerated => self == ScriptGenerated,
            MergeAppended => matches!(self, ScriptGenerated | CrabCfgGenerated),
            PlotAppended => matches!(self, ScriptGenerated | CrabCfgGenerated | MergeAppended),
        };
        if allowed {
            Ok(next)
        } else {
            Err(Error::GenerationError(format!(
                "cannot enter phase {next:?} from phase {self:?}; generation steps may not \
                 be skipped or reordered"
            )))
        }
    }
}
