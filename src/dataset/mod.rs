//! Dataset binding: descriptor lookup, caching, and run/time-range
//! reconciliation.

pub mod catalog;

mod cache;
mod descriptor;
mod range;

pub use cache::DatasetCache;
pub use descriptor::{DataKind, DatasetBackend, DatasetDescriptor};
pub use range::RunRangeSelection;

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::batch::JobMode;
use crate::config::ValidationConfig;
use crate::environment::Environment;
use crate::error::{Error, Result};

/// Placeholder substituted for the magnetic field when the backend does
/// not know it.
const DEFAULT_FIELD_PLACEHOLDER: &str = ".oO[defaultMagneticField]Oo.";

/// Name of the default magnetic-field record.
const DEFAULT_FIELD: &str = "MagneticField";

/// The dataset side of one validation instance.
#[derive(Debug)]
pub struct DatasetBinding {
    /// Shared descriptor from the cache.
    pub descriptor: Rc<dyn DatasetDescriptor>,
    /// Normalized selection (resolved in grid mode, raw otherwise — the
    /// snippet embeds the selection either way).
    pub selection: RunRangeSelection,
    /// Magnetic-field value or the default placeholder.
    pub magnetic_field: String,
    /// Rendered source-selection snippet.
    pub snippet: String,
}

/// Resolves dataset descriptors and selections for validation instances.
pub struct DatasetBinder<'a> {
    /// Shared descriptor cache.
    pub cache: &'a mut DatasetCache,
    /// Catalog backend.
    pub backend: &'a dyn DatasetBackend,
    /// Job description, re-consulted for grid-mode demands.
    pub config: &'a ValidationConfig,
}

fn in_section(section: &str, error: Error) -> Error {
    match error {
        Error::DatasetError(msg) => {
            Error::DatasetError(format!("in section [{section}]: {msg}"))
        }
        other => other,
    }
}

impl DatasetBinder<'_> {
    /// Bind the dataset named in `general` for one validation.
    ///
    /// `general` is updated in place with the derived facts
    /// (`magneticField`, `datasetDefinition`, resolved range values);
    /// `n_jobs` may be forced down to 1 when `maxevents` is unbounded.
    ///
    /// # Errors
    ///
    /// Returns a dataset error for an unknown dataset, a predefined
    /// dataset in grid mode, a reversed run range, or malformed bounds.
    pub fn bind(
        &mut self,
        section: &str,
        general: &mut BTreeMap<String, String>,
        n_jobs: &mut usize,
        job_mode: &JobMode,
        environment: &Environment,
        need_parent_files: bool,
    ) -> Result<DatasetBinding> {
        let maxevents: i64 = general
            .get("maxevents")
            .map(String::as_str)
            .unwrap_or("-1")
            .parse()
            .map_err(|_| {
                Error::ConfigError(format!(
                    "maxevents must be an integer in section [{section}]"
                ))
            })?;
        if maxevents == -1 && *n_jobs > 1 {
            // Without an event bound the per-job share cannot be
            // computed; fall back to a single job.
            eprintln!(
                "Warning: maximum number of events (maxevents) not specified in section \
                 [{section}]: running a single job."
            );
            *n_jobs = 1;
            general.insert("parallelJobs".to_owned(), "1".to_owned());
        }

        let dataset = general
            .get("dataset")
            .cloned()
            .ok_or_else(|| {
                Error::ConfigError(format!("option 'dataset' missing in section [{section}]"))
            })?;
        let raw = RunRangeSelection::from_options(general)?;
        let try_predefined_first = !job_mode.is_crab() && raw.is_empty();

        let descriptor =
            self.cache
                .lookup(self.backend, &dataset, environment, try_predefined_first)?;

        let magnetic_field = match descriptor.magnetic_field() {
            Some(field) => field,
            None => {
                eprintln!(
                    "Warning: could not get the magnetic field for dataset '{dataset}'. \
                     Using the default: {DEFAULT_FIELD}"
                );
                DEFAULT_FIELD_PLACEHOLDER.to_owned()
            }
        };
        general.insert("magneticField".to_owned(), magnetic_field.clone());
        general.insert("defaultMagneticField".to_owned(), DEFAULT_FIELD.to_owned());

        let (selection, snippet) = if job_mode.is_crab() {
            if descriptor.predefined() {
                return Err(Error::DatasetError(format!(
                    "for jobmode 'crab' you cannot use predefined datasets \
                     (in your case: '{}')",
                    descriptor.name()
                )));
            }
            // The grid does its own splitting; the job count must be
            // configured explicitly.
            let demand: BTreeSet<String> = ["parallelJobs".to_owned()].into_iter().collect();
            self.config
                .resulting_section(section, &BTreeMap::new(), &demand)
                .map_err(|e| match e {
                    Error::ConfigError(msg) => {
                        Error::ConfigError(format!("{msg} when using 'jobmode: crab'"))
                    }
                    other => other,
                })?;

            let resolved = raw.resolve(descriptor.as_ref())?;
            general.insert(
                "firstRun".to_owned(),
                resolved.first_run.map(|r| r.to_string()).unwrap_or_default(),
            );
            general.insert(
                "lastRun".to_owned(),
                resolved.last_run.map(|r| r.to_string()).unwrap_or_default(),
            );
            general.insert("begin".to_owned(), String::new());
            general.insert("end".to_owned(), String::new());
            if let Some(range) = resolved.run_range_string() {
                general.insert("runRange".to_owned(), range);
            }

            let snippet = descriptor
                .dataset_snippet(&resolved, need_parent_files, true)
                .map_err(|e| in_section(section, e))?;
            (resolved, snippet)
        } else {
            let snippet = descriptor
                .dataset_snippet(&raw, need_parent_files, false)
                .map_err(|e| in_section(section, e))?;
            (raw, snippet)
        };

        general.insert("datasetDefinition".to_owned(), snippet.clone());

        Ok(DatasetBinding {
            descriptor,
            selection,
            magnetic_field,
            snippet,
        })
    }
}
