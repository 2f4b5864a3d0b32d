//! Combined merge script over all parallel validations.
//!
//! Each parallel validation contributes a fragment that merges its
//! per-job outputs, copies the final output on success, and folds its
//! exit code into `mergeRetCode`. The script terminates with the
//! maximum exit code seen across all merged jobs; zero is taken as
//! success, as documented, without re-deriving backend semantics.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::template::replace_by_map;
use crate::templates;

use super::instance::ValidationInstance;
use super::plots;

/// File name of the combined merge script.
pub const MERGE_SCRIPT_NAME: &str = "TkAlMerge.sh";

/// Write the combined merge script for every parallel-capable instance,
/// appending the plot-runner lines for plot-capable kinds.
///
/// # Errors
///
/// Returns [`Error::GenerationError`] when no instance is
/// parallel-capable, and propagates fragment failures.
pub fn create_merge_script(
    path: &Path,
    instances: &mut [ValidationInstance],
) -> Result<PathBuf> {
    let parallel: Vec<usize> = instances
        .iter()
        .enumerate()
        .filter(|(_, v)| v.kind.capabilities.parallel)
        .map(|(i, _)| i)
        .collect();
    if parallel.is_empty() {
        return Err(Error::GenerationError(
            "no parallel-capable validation contributes to a merge script".to_owned(),
        ));
    }

    let header = replace_by_map(
        templates::MERGE_HEADER_TEMPLATE,
        &instances[parallel[0]].rep_map()?,
    )?;
    let mut script = header;
    for &index in &parallel {
        script.push_str(&instances[index].append_to_merge()?);
    }
    for macro_path in plots::macro_paths(path, instances) {
        script.push_str(&format!("root -x -b -q {}\n", macro_path.display()));
    }
    script.push_str(templates::MERGE_FOOTER);

    let script_path = path.join(MERGE_SCRIPT_NAME);
    fs::write(&script_path, script)?;
    mark_executable(&script_path)?;
    Ok(script_path)
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}
