//! Job-description file parsing.
//!
//! The job file is YAML: a mapping of section names to key→string option
//! maps. Validation sections are addressed `type:name` (for example
//! `offline:cosmics`); alignment-geometry sections are `alignment:<name>`;
//! per-kind plotting options live under `plots:<type>`; shared options
//! live in `general`. Scalar option values are coerced leniently, so
//! `parallelJobs: 3` and `parallelJobs: "3"` resolve identically.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Option defaults applied to the `general` section.
fn general_defaults() -> BTreeMap<String, String> {
    [
        ("workdir", "."),
        ("datadir", "."),
        ("logdir", "."),
        ("eosdir", ""),
        ("jobmode", "interactive"),
        ("catalog", ""),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect()
}

/// A YAML scalar accepted as an option value.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Str(s) => s,
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
        }
    }
}

/// Parsed job-description file: section name → option map.
#[derive(Debug, Clone, Default)]
pub struct ValidationConfig {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl ValidationConfig {
    /// Load a job description from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the file cannot be read or
    /// parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!(
                "failed to read job description {}: {e}",
                path.display()
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse a job description from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] on malformed YAML or non-scalar
    /// option values.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let raw: BTreeMap<String, BTreeMap<String, Scalar>> = serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("failed to parse job description: {e}")))?;

        let sections = raw
            .into_iter()
            .map(|(section, options)| {
                let options = options
                    .into_iter()
                    .map(|(k, v)| (k, v.into_string()))
                    .collect();
                (section, options)
            })
            .collect();

        Ok(Self { sections })
    }

    /// Whether `section` exists at all.
    #[must_use]
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Whether `section` defines `option`.
    #[must_use]
    pub fn has_option(&self, section: &str, option: &str) -> bool {
        self.sections
            .get(section)
            .is_some_and(|s| s.contains_key(option))
    }

    /// Fetch one option value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the section or the option is
    /// missing.
    pub fn get(&self, section: &str, option: &str) -> Result<&str> {
        let options = self
            .sections
            .get(section)
            .ok_or_else(|| Error::ConfigError(format!("section [{section}] is missing")))?;
        options
            .get(option)
            .map(String::as_str)
            .ok_or_else(|| {
                Error::ConfigError(format!("option '{option}' missing in section [{section}]"))
            })
    }

    /// Merge `defaults` with the options supplied in `section`, demanding
    /// that every key in `demand` is explicitly present in the section.
    ///
    /// A missing section is tolerated when nothing is demanded of it; the
    /// defaults pass through unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] naming the first demanded key the
    /// section does not supply.
    pub fn resulting_section(
        &self,
        section: &str,
        defaults: &BTreeMap<String, String>,
        demand: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, String>> {
        let mut result = defaults.clone();

        for option in demand {
            if !self.has_option(section, option) {
                return Err(Error::ConfigError(format!(
                    "option '{option}' required in section [{section}]"
                )));
            }
        }

        if let Some(options) = self.sections.get(section) {
            for (key, value) in options {
                result.insert(key.clone(), value.clone());
            }
        }

        Ok(result)
    }

    /// Reject any option in `section` outside the known set, ignoring the
    /// listed exceptions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] naming the first unrecognized key.
    pub fn check_input(
        &self,
        section: &str,
        known: &BTreeSet<String>,
        ignore: &[&str],
    ) -> Result<()> {
        let Some(options) = self.sections.get(section) else {
            return Ok(());
        };
        for key in options.keys() {
            if !known.contains(key) && !ignore.contains(&key.as_str()) {
                return Err(Error::ConfigError(format!(
                    "unknown option '{key}' in section [{section}]"
                )));
            }
        }
        Ok(())
    }

    /// The `general` section merged over its defaults.
    ///
    /// # Errors
    ///
    /// Propagates section-merge failures.
    pub fn general(&self) -> Result<BTreeMap<String, String>> {
        self.resulting_section("general", &general_defaults(), &BTreeSet::new())
    }

    /// Options of the `plots:<kind>` section, if present.
    #[must_use]
    pub fn plotting_section(&self, kind: &str) -> Option<&BTreeMap<String, String>> {
        self.sections.get(&format!("plots:{kind}"))
    }

    /// All `(kind, name)` validation section addresses, in file order.
    ///
    /// Sections named `general`, `alignment:*`, and `plots:*` are not
    /// validations.
    #[must_use]
    pub fn validation_sections(&self) -> Vec<(String, String)> {
        self.sections
            .keys()
            .filter_map(|section| {
                let (kind, name) = section.split_once(':')?;
                if kind == "alignment" || kind == "plots" {
                    return None;
                }
                Some((kind.to_owned(), name.to_owned()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> ValidationConfig {
        ValidationConfig::from_yaml(
            r#"
general:
  workdir: /tmp/work
"offline:cosmics":
  dataset: /Cosmics/Run2011A-v1/RAW
  maxevents: 10000
  parallelJobs: "3"
"alignment:ideal":
  globaltag: IDEAL_V1
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_lenient_scalars_resolve_to_strings() {
        let cfg = demo();
        assert_eq!(cfg.get("offline:cosmics", "maxevents").unwrap(), "10000");
        assert_eq!(cfg.get("offline:cosmics", "parallelJobs").unwrap(), "3");
    }

    #[test]
    fn test_missing_option_is_an_error() {
        let cfg = demo();
        let err = cfg.get("offline:cosmics", "nope").unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_resulting_section_overlays_defaults() {
        let cfg = demo();
        let defaults: BTreeMap<String, String> =
            [("parallelJobs".to_owned(), "1".to_owned())].into_iter().collect();
        let merged = cfg
            .resulting_section("offline:cosmics", &defaults, &BTreeSet::new())
            .unwrap();
        assert_eq!(merged["parallelJobs"], "3");
        assert_eq!(merged["dataset"], "/Cosmics/Run2011A-v1/RAW");
    }

    #[test]
    fn test_demanded_key_must_be_explicit() {
        let cfg = demo();
        let demand: BTreeSet<String> = ["maxtracks".to_owned()].into_iter().collect();
        let err = cfg
            .resulting_section("offline:cosmics", &BTreeMap::new(), &demand)
            .unwrap_err();
        assert!(err.to_string().contains("maxtracks"));
        assert!(err.to_string().contains("offline:cosmics"));
    }

    #[test]
    fn test_check_input_names_unknown_key() {
        let cfg = demo();
        let known: BTreeSet<String> =
            ["dataset".to_owned(), "maxevents".to_owned()].into_iter().collect();
        let err = cfg.check_input("offline:cosmics", &known, &[]).unwrap_err();
        assert!(err.to_string().contains("parallelJobs"));
    }

    #[test]
    fn test_general_defaults_fill_in() {
        let cfg = demo();
        let general = cfg.general().unwrap();
        assert_eq!(general["workdir"], "/tmp/work");
        assert_eq!(general["jobmode"], "interactive");
        assert_eq!(general["datadir"], ".");
    }

    #[test]
    fn test_validation_sections_skip_reserved_prefixes() {
        let cfg = demo();
        let sections = cfg.validation_sections();
        assert_eq!(sections, vec![("offline".to_owned(), "cosmics".to_owned())]);
    }
}
