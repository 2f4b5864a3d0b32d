//! Option resolution for validation sections.
//!
//! Resolution starts from the kind's folded defaults, overlays the
//! user's `type:name` section, demands every mandatory key, and rejects
//! keys the kind does not know. The `parallelJobs` count is parsed and
//! policed here: a hard ceiling of 40 (each job's output artifact is
//! bounded in size), and anything above 1 only on parallel-capable
//! kinds.

use std::collections::BTreeMap;

use crate::config::ValidationConfig;
use crate::error::{Error, Result};

use super::traits::ValidationKind;

/// Hard ceiling on the job fan-out.
pub const MAX_PARALLEL_JOBS: usize = 40;

/// The outcome of option resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    /// Effective options: general section ⊕ defaults ⊕ user section.
    pub general: BTreeMap<String, String>,
    /// Parsed and policed job count.
    pub n_jobs: usize,
}

/// Resolve the effective options of validation `name` of `kind`.
///
/// `general` is the already-merged `general` section; per-validation
/// values overlay it. Resolution has no side effects and is idempotent.
///
/// # Errors
///
/// Returns [`Error::ConfigError`] for a missing mandatory key, an
/// unknown key (named), a malformed or out-of-policy `parallelJobs`.
pub fn resolve_options(
    kind: &ValidationKind,
    config: &ValidationConfig,
    name: &str,
    general: &BTreeMap<String, String>,
) -> Result<ResolvedOptions> {
    let section = format!("{}:{}", kind.name, name);

    let update = config.resulting_section(&section, &kind.traits.defaults, &kind.traits.mandatory)?;
    config.check_input(&section, &kind.traits.known_options(), &[])?;

    let mut merged = general.clone();
    merged.extend(update);

    let jobs_value = merged
        .get("parallelJobs")
        .map(String::as_str)
        .unwrap_or("1");
    let n_jobs: usize = jobs_value.parse().map_err(|_| {
        Error::ConfigError(format!(
            "parallelJobs must be a positive integer in section [{section}], got '{jobs_value}'"
        ))
    })?;
    if n_jobs == 0 {
        return Err(Error::ConfigError(format!(
            "parallelJobs must be at least 1 in section [{section}]"
        )));
    }
    if n_jobs > MAX_PARALLEL_JOBS {
        return Err(Error::ConfigError(format!(
            "maximum allowed number of parallel jobs {MAX_PARALLEL_JOBS} exceeded in section \
             [{section}]"
        )));
    }
    if n_jobs > 1 && !kind.capabilities.parallel {
        return Err(Error::ConfigError(format!(
            "parallel jobs not implemented for '{}'; please set parallelJobs = 1",
            kind.name
        )));
    }

    Ok(ResolvedOptions { general: merged, n_jobs })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::validation::traits::KindRegistry;

    fn registry() -> KindRegistry {
        KindRegistry::builtin(Path::new("/afs/user")).unwrap()
    }

    fn config(parallel_jobs: &str) -> ValidationConfig {
        ValidationConfig::from_yaml(&format!(
            r#"
"offline:cosmics":
  dataset: /Cosmics/Run2011A-v1/RAW
  maxevents: 10000
  parallelJobs: "{parallel_jobs}"
"mc:relval":
  dataset: /RelValZMM/Spring11-v1/GEN-SIM-RECO
  maxevents: 1000
  parallelJobs: "{parallel_jobs}"
"#
        ))
        .unwrap()
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let registry = registry();
        let kind = registry.get("offline").unwrap();
        let cfg = config("3");
        let general = BTreeMap::new();

        let first = resolve_options(kind, &cfg, "cosmics", &general).unwrap();
        let second = resolve_options(kind, &cfg, "cosmics", &general).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_defaults_survive_and_user_values_win() {
        let registry = registry();
        let kind = registry.get("offline").unwrap();
        let resolved =
            resolve_options(kind, &config("3"), "cosmics", &BTreeMap::new()).unwrap();
        assert_eq!(resolved.general["jobid"], "");
        assert_eq!(resolved.general["parallelJobs"], "3");
        assert_eq!(resolved.n_jobs, 3);
    }

    #[test]
    fn test_missing_mandatory_key_fails() {
        let registry = registry();
        let kind = registry.get("offline").unwrap();
        let cfg = ValidationConfig::from_yaml(
            "\"offline:cosmics\":\n  maxevents: 10000\n",
        )
        .unwrap();
        let err = resolve_options(kind, &cfg, "cosmics", &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("dataset"));
    }

    #[test]
    fn test_unknown_key_is_named() {
        let registry = registry();
        let kind = registry.get("offline").unwrap();
        let cfg = ValidationConfig::from_yaml(
            "\"offline:cosmics\":\n  dataset: /X/Y/Z\n  maxevents: 1\n  typo: yes\n",
        )
        .unwrap();
        let err = resolve_options(kind, &cfg, "cosmics", &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("typo"));
    }

    #[test]
    fn test_forty_jobs_accepted_forty_one_rejected() {
        let registry = registry();
        let kind = registry.get("offline").unwrap();
        assert!(resolve_options(kind, &config("40"), "cosmics", &BTreeMap::new()).is_ok());
        let err =
            resolve_options(kind, &config("41"), "cosmics", &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("40"));
    }

    #[test]
    fn test_parallelism_requires_capability() {
        let registry = registry();
        let kind = registry.get("mc").unwrap();
        let err = resolve_options(kind, &config("2"), "relval", &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("parallelJobs = 1"));
    }

    #[test]
    fn test_malformed_job_count_is_rejected() {
        let registry = registry();
        let kind = registry.get("offline").unwrap();
        let err =
            resolve_options(kind, &config("many"), "cosmics", &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("positive integer"));
    }
}
