//! Static pre-registered dataset catalog.
//!
//! A YAML file maps dataset identifiers to their field, data kind and
//! run catalog. A predefined-first lookup serves the entry as a
//! predefined descriptor (no run subdivision); otherwise the same entry
//! backs a live-style descriptor whose run catalog supports range
//! selection. Deployments with a real remote catalog implement
//! [`DatasetBackend`] themselves; this backend covers pre-catalogued
//! data and tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::environment::Environment;
use crate::error::{Error, Result};

use super::descriptor::{DataKind, DatasetBackend, DatasetDescriptor};
use super::range::RunRangeSelection;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
struct CatalogFile {
    datasets: BTreeMap<String, CatalogEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogEntry {
    #[serde(default)]
    magnetic_field: Option<String>,
    data_kind: String,
    #[serde(default)]
    runs: Vec<CatalogRun>,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogRun {
    run_number: u64,
    #[serde(default)]
    start: Option<String>,
}

/// YAML-backed dataset backend.
#[derive(Debug)]
pub struct StaticCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl StaticCatalog {
    /// Backend with no entries; every lookup fails.
    #[must_use]
    pub fn empty() -> Self {
        Self { entries: BTreeMap::new() }
    }

    /// Load a catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DatasetError`] if the file cannot be read or
    /// parsed, or an entry carries an unknown data kind.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::DatasetError(format!("failed to read catalog {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse a catalog from a YAML string.
    ///
    /// # Errors
    ///
    /// As [`StaticCatalog::from_file`].
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(content)
            .map_err(|e| Error::DatasetError(format!("failed to parse catalog: {e}")))?;
        for (name, entry) in &file.datasets {
            if parse_kind(&entry.data_kind).is_none() {
                return Err(Error::DatasetError(format!(
                    "dataset '{}' has unknown data kind '{}' (expected mc or data)",
                    name, entry.data_kind
                )));
            }
        }
        Ok(Self { entries: file.datasets })
    }
}

fn parse_kind(value: &str) -> Option<DataKind> {
    match value {
        "mc" => Some(DataKind::Mc),
        "data" => Some(DataKind::Data),
        _ => None,
    }
}

impl DatasetBackend for StaticCatalog {
    fn lookup(
        &self,
        dataset: &str,
        try_predefined_first: bool,
        _environment: &Environment,
    ) -> Result<Rc<dyn DatasetDescriptor>> {
        let entry = self.entries.get(dataset).ok_or_else(|| {
            Error::DatasetError(format!(
                "dataset '{dataset}' is not present in the static catalog"
            ))
        })?;
        Ok(Rc::new(CatalogDataset {
            name: dataset.to_owned(),
            magnetic_field: entry.magnetic_field.clone(),
            kind: parse_kind(&entry.data_kind).unwrap_or(DataKind::Unknown),
            runs: entry.runs.clone(),
            predefined: try_predefined_first,
        }))
    }
}

/// Descriptor served by [`StaticCatalog`].
#[derive(Debug)]
struct CatalogDataset {
    name: String,
    magnetic_field: Option<String>,
    kind: DataKind,
    runs: Vec<CatalogRun>,
    predefined: bool,
}

impl CatalogDataset {
    fn parse_time(&self, value: &str) -> Result<NaiveDateTime> {
        NaiveDateTime::parse_from_str(value, TIME_FORMAT).map_err(|_| {
            Error::DatasetError(format!(
                "malformed time bound '{value}', expected '{TIME_FORMAT}'"
            ))
        })
    }

    fn run_starts(&self) -> Result<Vec<(u64, NaiveDateTime)>> {
        self.runs
            .iter()
            .map(|run| {
                let start = run.start.as_deref().ok_or_else(|| {
                    Error::DatasetError(format!(
                        "run catalog of '{}' carries no timestamp for run {}",
                        self.name, run.run_number
                    ))
                })?;
                Ok((run.run_number, self.parse_time(start)?))
            })
            .collect()
    }
}

impl DatasetDescriptor for CatalogDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn predefined(&self) -> bool {
        self.predefined
    }

    fn magnetic_field(&self) -> Option<String> {
        self.magnetic_field.clone()
    }

    fn data_kind(&self) -> DataKind {
        self.kind
    }

    fn dataset_snippet(
        &self,
        selection: &RunRangeSelection,
        parent: bool,
        crab: bool,
    ) -> Result<String> {
        if self.predefined && (selection.has_bounds() || selection.json.is_some()) {
            return Err(Error::DatasetError(format!(
                "predefined dataset '{}' does not support a run, time or JSON selection",
                self.name
            )));
        }

        if self.predefined {
            let module = self.name.trim_matches('/').replace(['/', '-'], "_");
            return Ok(format!(
                "#use predefined dataset\nprocess.load(\"Alignment.OfflineValidation.{module}_cff\")"
            ));
        }

        let mut lines = vec![
            "process.source = cms.Source(\"PoolSource\",".to_owned(),
            format!("    fileNames = cms.untracked.vstring(\"{}\"),", self.name),
        ];
        if parent {
            lines.push("    secondaryFileNames = cms.untracked.vstring(),".to_owned());
        }
        if !crab {
            if let Some(json) = &selection.json {
                lines.push(format!(
                    "    lumisToProcess = LumiList.LumiList(filename = \"{json}\")\
                     .getVLuminosityBlockRange(),"
                ));
            }
            if let Some(first) = selection.first_run {
                lines.push(format!("    firstRun = cms.untracked.uint32({first}),"));
            }
            if let Some(last) = selection.last_run {
                lines.push(format!("    lastRun = cms.untracked.uint32({last}),"));
            }
        }
        lines.push(")".to_owned());
        Ok(lines.join("\n"))
    }

    fn convert_time_to_run(&self, selection: &RunRangeSelection) -> Result<RunRangeSelection> {
        let starts = self.run_starts()?;
        let mut resolved = selection.clone();

        if let Some(begin) = resolved.begin.take() {
            let begin = self.parse_time(&begin)?;
            resolved.first_run = Some(
                starts
                    .iter()
                    .find(|(_, start)| *start >= begin)
                    .map(|(run, _)| *run)
                    .ok_or_else(|| {
                        Error::DatasetError(format!(
                            "begin time is after the last catalogued run of '{}'",
                            self.name
                        ))
                    })?,
            );
        }
        if let Some(end) = resolved.end.take() {
            let end = self.parse_time(&end)?;
            resolved.last_run = Some(
                starts
                    .iter()
                    .rev()
                    .find(|(_, start)| *start <= end)
                    .map(|(run, _)| *run)
                    .ok_or_else(|| {
                        Error::DatasetError(format!(
                            "end time is before the first catalogued run of '{}'",
                            self.name
                        ))
                    })?,
            );
        }
        Ok(resolved)
    }

    fn run_list(&self) -> Result<Vec<u64>> {
        if self.predefined {
            return Err(Error::DatasetError(format!(
                "predefined dataset '{}' carries no run catalog to select from",
                self.name
            )));
        }
        Ok(self.runs.iter().map(|run| run.run_number).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> StaticCatalog {
        StaticCatalog::from_yaml(
            r#"
datasets:
  "/Cosmics/Run2011A-v1/RAW":
    magnetic_field: "3.8"
    data_kind: data
    runs:
      - { run_number: 100, start: "2011-03-01 00:00:00" }
      - { run_number: 200, start: "2011-05-01 00:00:00" }
  "/RelValZMM/Spring11-v1/GEN-SIM-RECO":
    data_kind: mc
"#,
        )
        .unwrap()
    }

    fn environment() -> Environment {
        Environment {
            base: "/afs/user".into(),
            scram_arch: "slc7_amd64_gcc700".to_owned(),
            release_base: "/afs/release".into(),
        }
    }

    #[test]
    fn test_unknown_dataset_is_rejected() {
        let err = catalog()
            .lookup("/Nope/Nope/RAW", true, &environment())
            .unwrap_err();
        assert!(err.to_string().contains("/Nope/Nope/RAW"));
    }

    #[test]
    fn test_unknown_data_kind_fails_at_load() {
        let err = StaticCatalog::from_yaml(
            "datasets:\n  \"/X/Y/Z\":\n    data_kind: cosmic\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("cosmic"));
    }

    #[test]
    fn test_predefined_descriptor_refuses_selection() {
        let descriptor = catalog()
            .lookup("/Cosmics/Run2011A-v1/RAW", true, &environment())
            .unwrap();
        assert!(descriptor.predefined());
        let selection = RunRangeSelection { first_run: Some(100), ..Default::default() };
        assert!(descriptor.dataset_snippet(&selection, false, false).is_err());
        assert!(descriptor.run_list().is_err());
    }

    #[test]
    fn test_live_descriptor_renders_bounds() {
        let descriptor = catalog()
            .lookup("/Cosmics/Run2011A-v1/RAW", false, &environment())
            .unwrap();
        let selection = RunRangeSelection {
            first_run: Some(100),
            last_run: Some(200),
            ..Default::default()
        };
        let snippet = descriptor.dataset_snippet(&selection, false, false).unwrap();
        assert!(snippet.contains("firstRun = cms.untracked.uint32(100)"));
        assert!(snippet.contains("lastRun = cms.untracked.uint32(200)"));
    }

    #[test]
    fn test_crab_snippet_leaves_selection_to_the_grid() {
        let descriptor = catalog()
            .lookup("/Cosmics/Run2011A-v1/RAW", false, &environment())
            .unwrap();
        let selection = RunRangeSelection {
            first_run: Some(100),
            last_run: Some(200),
            ..Default::default()
        };
        let snippet = descriptor.dataset_snippet(&selection, false, true).unwrap();
        assert!(!snippet.contains("firstRun"));
    }

    #[test]
    fn test_missing_timestamps_fail_time_conversion() {
        let descriptor = catalog()
            .lookup("/RelValZMM/Spring11-v1/GEN-SIM-RECO", false, &environment())
            .unwrap();
        let selection = RunRangeSelection {
            begin: Some("2011-03-01 00:00:00".to_owned()),
            ..Default::default()
        };
        // No runs at all: the conversion has no timestamps to work with.
        assert!(descriptor.convert_time_to_run(&selection).is_err());
    }
}
