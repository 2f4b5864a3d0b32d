//! Validation kinds, instances, and the generation pipeline.

mod alignment;
mod instance;
mod merge;
mod options;
mod phases;
mod plots;
mod traits;

pub use alignment::Alignment;
pub use instance::{GeneratorContext, ValidationInstance, DEFAULT_REFERENCE_NAME};
pub use merge::{create_merge_script, MERGE_SCRIPT_NAME};
pub use options::{resolve_options, ResolvedOptions, MAX_PARALLEL_JOBS};
pub use phases::GenerationPhase;
pub use plots::create_plotting_scripts;
pub use traits::{Capabilities, KindRegistry, KindTraits, TraitDelta, ValidationKind};
