//! Run/time-range selection and its normalization.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

use super::descriptor::DatasetDescriptor;

/// Normalized form of the user's run/time/JSON selection.
///
/// Invariant once resolved: `first_run <= last_run` whenever both are
/// known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRangeSelection {
    /// Lower run bound.
    pub first_run: Option<u64>,
    /// Upper run bound.
    pub last_run: Option<u64>,
    /// Lower time bound, `YYYY-MM-DD HH:MM:SS`.
    pub begin: Option<String>,
    /// Upper time bound.
    pub end: Option<String>,
    /// Luminosity-selection JSON file.
    pub json: Option<String>,
}

fn parse_run(options: &BTreeMap<String, String>, key: &str) -> Result<Option<u64>> {
    match options.get(key).map(String::as_str) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| {
            Error::ConfigError(format!("{key} must be a run number, got '{value}'"))
        }),
    }
}

fn non_empty(options: &BTreeMap<String, String>, key: &str) -> Option<String> {
    options.get(key).filter(|v| !v.is_empty()).cloned()
}

impl RunRangeSelection {
    /// Read the selection from a resolved option map (`firstRun`,
    /// `lastRun`, `begin`, `end`, `JSON`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for a malformed run number.
    pub fn from_options(options: &BTreeMap<String, String>) -> Result<Self> {
        Ok(Self {
            first_run: parse_run(options, "firstRun")?,
            last_run: parse_run(options, "lastRun")?,
            begin: non_empty(options, "begin"),
            end: non_empty(options, "end"),
            json: non_empty(options, "JSON"),
        })
    }

    /// No bounds and no JSON selection at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_run.is_none()
            && self.last_run.is_none()
            && self.begin.is_none()
            && self.end.is_none()
            && self.json.is_none()
    }

    /// Whether any run or time bound is present.
    #[must_use]
    pub fn has_bounds(&self) -> bool {
        self.first_run.is_some()
            || self.last_run.is_some()
            || self.begin.is_some()
            || self.end.is_some()
    }

    /// Normalize against a dataset: time bounds become run bounds, a
    /// single-ended range is completed from the run catalog, and the
    /// bound order is checked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DatasetError`] when `first_run > last_run` after
    /// resolution, or when the catalog cannot supply a missing bound.
    pub fn resolve(&self, descriptor: &dyn DatasetDescriptor) -> Result<Self> {
        let mut selection = self.clone();

        if selection.begin.is_some() || selection.end.is_some() {
            selection = descriptor.convert_time_to_run(&selection)?;
        }

        if selection.first_run.is_none() && selection.last_run.is_some() {
            selection.first_run = descriptor.run_list()?.first().copied();
        }
        if selection.last_run.is_none() && selection.first_run.is_some() {
            selection.last_run = descriptor.run_list()?.last().copied();
        }

        if let (Some(first), Some(last)) = (selection.first_run, selection.last_run) {
            if first > last {
                return Err(Error::DatasetError(
                    "the lower time/runrange limit ('begin'/'firstRun') is greater than the \
                     upper time/runrange limit ('end'/'lastRun')"
                        .to_owned(),
                ));
            }
        }

        Ok(selection)
    }

    /// `first-last` once both bounds are known.
    #[must_use]
    pub fn run_range_string(&self) -> Option<String> {
        match (self.first_run, self.last_run) {
            (Some(first), Some(last)) => Some(format!("{first}-{last}")),
            _ => None,
        }
    }
}
