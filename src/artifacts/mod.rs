//! Artifact generation: rendering templates to job files.
//!
//! `create_files` is the workhorse: it fans every named template out to
//! the instance's job count, renders each variant with the substitution
//! map plus its own `nIndex`, and writes the results. The configuration
//! and script wrappers add schedule verification and the executable
//! bit; the grid wrapper forbids in-tool fan-out entirely. Writes are
//! not transactional — a failed run leaves partial files and is meant
//! to be re-run, not resumed.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::template::{add_index, replace_by_map, SubstitutionMap};

/// Render `contents` (file name → template) into `path`, producing
/// `n_jobs` indexed variants of each file.
///
/// Returns the ordered logical (pre-index) paths.
///
/// # Errors
///
/// Propagates template and filesystem failures.
pub fn create_files(
    contents: &[(String, String)],
    path: &Path,
    n_jobs: usize,
    map: &SubstitutionMap,
) -> Result<Vec<PathBuf>> {
    let mut result = Vec::with_capacity(contents.len());
    for (file_name, template) in contents {
        let file_path = path.join(file_name);
        result.push(file_path.clone());

        let file_path = file_path.to_string_lossy().into_owned();
        for (index, variant) in add_index(&file_path, n_jobs).into_iter().enumerate() {
            let mut indexed = map.clone();
            indexed.set("nIndex", index.to_string());
            let rendered = replace_by_map(template, &indexed)?;
            fs::write(&variant, rendered)?;
        }
    }
    Ok(result)
}

/// As [`create_files`], then verify the generated set against an
/// explicit execution schedule and return the files in schedule order.
///
/// # Errors
///
/// Returns [`Error::GenerationError`] naming any scheduled file that was
/// not generated, or any generated file the schedule omits.
pub fn create_configuration(
    contents: &[(String, String)],
    path: &Path,
    n_jobs: usize,
    map: &SubstitutionMap,
    schedule: Option<&[String]>,
) -> Result<Vec<PathBuf>> {
    let generated = create_files(contents, path, n_jobs, map)?;
    let Some(schedule) = schedule else {
        return Ok(generated);
    };

    let schedule: Vec<PathBuf> = schedule.iter().map(|name| path.join(name)).collect();
    for scheduled in &schedule {
        if !generated.contains(scheduled) {
            return Err(Error::GenerationError(format!(
                "scheduled configuration {} missing in generated files: {}",
                scheduled.display(),
                display_list(&generated)
            )));
        }
    }
    for file in &generated {
        if !schedule.contains(file) {
            return Err(Error::GenerationError(format!(
                "generated configuration {} not scheduled: {}",
                file.display(),
                display_list(&schedule)
            )));
        }
    }
    Ok(schedule)
}

/// As [`create_files`], then mark every indexed variant executable
/// (mode 0755).
///
/// # Errors
///
/// Propagates template and filesystem failures.
pub fn create_script(
    contents: &[(String, String)],
    path: &Path,
    n_jobs: usize,
    map: &SubstitutionMap,
) -> Result<Vec<PathBuf>> {
    let scripts = create_files(contents, path, n_jobs, map)?;
    for script in &scripts {
        let script = script.to_string_lossy();
        for variant in add_index(&script, n_jobs) {
            mark_executable(Path::new(&variant))?;
        }
    }
    Ok(scripts)
}

/// As [`create_files`], for grid-submission descriptors. The grid does
/// its own job splitting, so any in-tool fan-out is refused.
///
/// # Errors
///
/// Returns [`Error::GenerationError`] when `n_jobs > 1`.
pub fn create_crab_cfg(
    contents: &[(String, String)],
    path: &Path,
    n_jobs: usize,
    map: &SubstitutionMap,
) -> Result<Vec<PathBuf>> {
    if n_jobs > 1 {
        return Err(Error::GenerationError(
            "jobmode 'crab' not supported for parallel validation; please set parallelJobs = 1"
                .to_owned(),
        ));
    }
    create_files(contents, path, n_jobs, map)
}

fn display_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
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
