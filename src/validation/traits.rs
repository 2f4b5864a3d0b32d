//! Validation-kind descriptors and build-time trait aggregation.
//!
//! Every validation kind declares a [`TraitDelta`] — its own mandatory
//! keys, optional keys, default values and required packages. At
//! registry build time the delta is folded with the computed traits of
//! its parents: set-valued traits take the union, default maps merge
//! with a hard conflict check. The fold runs once per kind, never per
//! instance, and the resulting [`ValidationKind`] is immutable.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::{Error, Result};
use crate::templates;

/// Trait declarations of a single kind, before folding.
#[derive(Debug, Clone, Default)]
pub struct TraitDelta {
    /// Keys the configuration section must supply.
    pub mandatory: BTreeSet<String>,
    /// Keys the section may supply without a default.
    pub optional: BTreeSet<String>,
    /// Key → default value.
    pub defaults: BTreeMap<String, String>,
    /// Packages that must exist in the software environment.
    pub packages: BTreeSet<String>,
}

/// Folded traits of a kind and all its ancestors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindTraits {
    /// Union of mandatory keys.
    pub mandatory: BTreeSet<String>,
    /// Union of optional keys.
    pub optional: BTreeSet<String>,
    /// Merged defaults.
    pub defaults: BTreeMap<String, String>,
    /// Union of required packages.
    pub packages: BTreeSet<String>,
}

impl KindTraits {
    /// Fold a kind's declared delta with its parents' computed traits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] when two sources supply different
    /// defaults for the same key.
    pub fn fold(delta: &TraitDelta, parents: &[&KindTraits]) -> Result<Self> {
        let mut folded = Self {
            mandatory: delta.mandatory.clone(),
            optional: delta.optional.clone(),
            defaults: delta.defaults.clone(),
            packages: delta.packages.clone(),
        };
        for parent in parents {
            folded.mandatory.extend(parent.mandatory.iter().cloned());
            folded.optional.extend(parent.optional.iter().cloned());
            folded.packages.extend(parent.packages.iter().cloned());
            for (key, value) in &parent.defaults {
                match folded.defaults.get(key) {
                    Some(existing) if existing != value => {
                        return Err(Error::ConfigError(format!(
                            "inconsistent values of defaults[{key}]: '{existing}', '{value}'"
                        )));
                    }
                    Some(_) => {}
                    None => {
                        folded.defaults.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        Ok(folded)
    }

    /// Every key a configuration section may legally carry.
    #[must_use]
    pub fn known_options(&self) -> BTreeSet<String> {
        let mut known: BTreeSet<String> = self.defaults.keys().cloned().collect();
        known.extend(self.mandatory.iter().cloned());
        known.extend(self.optional.iter().cloned());
        known
    }
}

/// What a validation kind can do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Runs over a dataset.
    pub dataset: bool,
    /// May fan out into parallel jobs and be merged afterwards.
    pub parallel: bool,
    /// Contributes to a shared plotting script.
    pub plots: bool,
}

/// Immutable descriptor of one validation kind.
#[derive(Debug, Clone)]
pub struct ValidationKind {
    /// Kind name, the section-address prefix.
    pub name: String,
    /// Capability tags.
    pub capabilities: Capabilities,
    /// Folded traits.
    pub traits: KindTraits,
    /// Base name of generated configurations.
    pub config_base: String,
    /// Base name of generated run scripts.
    pub script_base: String,
    /// Base name of generated grid descriptors.
    pub crab_base: String,
    /// Base name of per-job output files.
    pub output_base: String,
    /// Base name of final result files.
    pub result_base: String,
    /// Whether the dataset source must include parent files.
    pub need_parent_files: bool,
    /// Configuration template.
    pub cfg_template: &'static str,
    /// Per-instance plotting fragment (empty unless `plots`).
    pub plot_fragment: &'static str,
    /// Plotting macro name (empty unless `plots`).
    pub plotting_macro: &'static str,
}

/// The closed set of built-in validation kinds.
pub struct KindRegistry {
    kinds: BTreeMap<String, ValidationKind>,
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

fn map(items: &[(&str, &str)]) -> BTreeMap<String, String> {
    items
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

/// Root traits shared by every kind.
fn generic_delta(default_root: &Path) -> TraitDelta {
    TraitDelta {
        mandatory: BTreeSet::new(),
        optional: set(&["jobmode"]),
        defaults: map(&[
            ("cmssw", &default_root.display().to_string()),
            ("parallelJobs", "1"),
            ("jobid", ""),
            ("alignment", "ideal"),
            ("validationBody", ""),
        ]),
        packages: set(&["Alignment/OfflineValidation"]),
    }
}

/// Additional traits of dataset-backed kinds.
fn data_delta() -> TraitDelta {
    TraitDelta {
        mandatory: set(&["dataset", "maxevents"]),
        optional: BTreeSet::new(),
        defaults: map(&[
            ("runRange", ""),
            ("firstRun", ""),
            ("lastRun", ""),
            ("begin", ""),
            ("end", ""),
            ("JSON", ""),
        ]),
        packages: BTreeSet::new(),
    }
}

impl KindRegistry {
    /// Build the built-in kinds against the process's default software
    /// root (the `cmssw` default every kind inherits).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] on a default conflict in the kind
    /// hierarchy.
    pub fn builtin(default_root: &Path) -> Result<Self> {
        let generic = KindTraits::fold(&generic_delta(default_root), &[])?;
        let data = KindTraits::fold(&data_delta(), &[&generic])?;

        let mut kinds = BTreeMap::new();
        let mut add = |kind: ValidationKind| {
            kinds.insert(kind.name.clone(), kind);
        };

        add(ValidationKind {
            name: "offline".to_owned(),
            capabilities: Capabilities { dataset: true, parallel: true, plots: true },
            traits: KindTraits::fold(&TraitDelta::default(), &[&data])?,
            config_base: "TkAlOfflineValidation".to_owned(),
            script_base: "TkAlOfflineValidation".to_owned(),
            crab_base: "TkAlOfflineValidation".to_owned(),
            output_base: "AlignmentValidation".to_owned(),
            result_base: "AlignmentValidation".to_owned(),
            need_parent_files: false,
            cfg_template: templates::DATASET_CFG_TEMPLATE,
            plot_fragment: "  plotResult(\".oO[finalResultFile]Oo.\", \".oO[title]Oo.\", \
                            .oO[color]Oo., .oO[style]Oo.);\n",
            plotting_macro: "TkAlExtendedOfflineValidation",
        });

        add(ValidationKind {
            name: "mc".to_owned(),
            capabilities: Capabilities { dataset: true, parallel: false, plots: false },
            traits: KindTraits::fold(&TraitDelta::default(), &[&data])?,
            config_base: "TkAlMcValidate".to_owned(),
            script_base: "TkAlMcValidate".to_owned(),
            crab_base: "TkAlMcValidate".to_owned(),
            output_base: "McValidation".to_owned(),
            result_base: "McValidation".to_owned(),
            need_parent_files: true,
            cfg_template: templates::DATASET_CFG_TEMPLATE,
            plot_fragment: "",
            plotting_macro: "",
        });

        add(ValidationKind {
            name: "zmumu".to_owned(),
            capabilities: Capabilities { dataset: true, parallel: false, plots: true },
            traits: KindTraits::fold(&TraitDelta::default(), &[&data])?,
            config_base: "TkAlZMuMuValidation".to_owned(),
            script_base: "TkAlZMuMuValidation".to_owned(),
            crab_base: "TkAlZMuMuValidation".to_owned(),
            output_base: "ZMuMuValidation".to_owned(),
            result_base: "ZMuMuValidation".to_owned(),
            need_parent_files: false,
            cfg_template: templates::DATASET_CFG_TEMPLATE,
            plot_fragment: "  plotZMuMu(\".oO[finalResultFile]Oo.\", \".oO[title]Oo.\");\n",
            plotting_macro: "TkAlMergeZmumuPlots",
        });

        add(ValidationKind {
            name: "compare".to_owned(),
            capabilities: Capabilities::default(),
            traits: KindTraits::fold(&TraitDelta::default(), &[&generic])?,
            config_base: "TkAlGeomCompare".to_owned(),
            script_base: "TkAlGeomCompare".to_owned(),
            crab_base: "TkAlGeomCompare".to_owned(),
            output_base: "GeomComparison".to_owned(),
            result_base: "GeomComparison".to_owned(),
            need_parent_files: false,
            cfg_template: templates::COMPARE_CFG_TEMPLATE,
            plot_fragment: "",
            plotting_macro: "",
        });

        Ok(Self { kinds })
    }

    /// Look a kind up by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] listing the known kinds.
    pub fn get(&self, name: &str) -> Result<&ValidationKind> {
        self.kinds.get(name).ok_or_else(|| {
            Error::ConfigError(format!(
                "unknown validation kind '{}' (known: {})",
                name,
                self.kinds.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Names of all built-in kinds.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_unions_sets_across_parents() {
        let root = Path::new("/afs/user");
        let generic = KindTraits::fold(&generic_delta(root), &[]).unwrap();
        let data = KindTraits::fold(&data_delta(), &[&generic]).unwrap();

        assert!(data.mandatory.contains("dataset"));
        assert!(data.mandatory.contains("maxevents"));
        assert!(data.optional.contains("jobmode"));
        assert!(data.packages.contains("Alignment/OfflineValidation"));
        assert_eq!(data.defaults["parallelJobs"], "1");
        assert_eq!(data.defaults["firstRun"], "");
    }

    #[test]
    fn test_conflicting_defaults_are_rejected_at_fold_time() {
        let a = KindTraits::fold(
            &TraitDelta { defaults: map(&[("mode", "full")]), ..Default::default() },
            &[],
        )
        .unwrap();
        let b = KindTraits::fold(
            &TraitDelta { defaults: map(&[("mode", "fast")]), ..Default::default() },
            &[],
        )
        .unwrap();

        let err = KindTraits::fold(&TraitDelta::default(), &[&a, &b]).unwrap_err();
        assert!(err.to_string().contains("defaults[mode]"));
    }

    #[test]
    fn test_agreeing_defaults_fold_cleanly() {
        let a = KindTraits::fold(
            &TraitDelta { defaults: map(&[("mode", "full")]), ..Default::default() },
            &[],
        )
        .unwrap();
        let folded = KindTraits::fold(
            &TraitDelta { defaults: map(&[("mode", "full")]), ..Default::default() },
            &[&a],
        )
        .unwrap();
        assert_eq!(folded.defaults["mode"], "full");
    }

    #[test]
    fn test_known_options_cover_all_traits() {
        let root = Path::new("/afs/user");
        let registry = KindRegistry::builtin(root).unwrap();
        let offline = registry.get("offline").unwrap();
        let known = offline.traits.known_options();
        for key in ["dataset", "maxevents", "jobmode", "parallelJobs", "JSON"] {
            assert!(known.contains(key), "missing {key}");
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let registry = KindRegistry::builtin(Path::new("/afs/user")).unwrap();
        let err = registry.get("primaryvertex").unwrap_err();
        assert!(err.to_string().contains("offline"));
    }
}
