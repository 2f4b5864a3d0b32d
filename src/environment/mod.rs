//! Software environment and package binding.
//!
//! A validation runs against one software installation: a root
//! directory plus its architecture and release-base metadata. The root
//! requested in the configuration either matches the ambient environment
//! (in which case its metadata is reused directly) or is probed through
//! the external environment-setup collaborator. Required sub-packages
//! are then located inside the root or, failing that, the release base.

mod probe;

pub use probe::{EnvProbe, ScramProbe};

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Characters rejected in a software root path; they would break the
/// quoted shell command used to probe it.
const BAD_ROOT_CHARACTERS: [char; 2] = ['\'', '\\'];

/// A resolved software environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Installation root (user area).
    pub base: PathBuf,
    /// Architecture identifier of the installation.
    pub scram_arch: String,
    /// Root of the underlying release the installation is based on.
    pub release_base: PathBuf,
}

impl Environment {
    /// The process's own environment, from `CMSSW_BASE`, `SCRAM_ARCH`
    /// and `CMSSW_RELEASE_BASE`. Read once at process start by the CLI
    /// and injected everywhere else.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EnvironmentError`] naming the first variable
    /// that is unset.
    pub fn ambient() -> Result<Self> {
        let var = |name: &str| {
            env::var(name).map_err(|_| {
                Error::EnvironmentError(format!("environment variable {name} is not set"))
            })
        };
        Ok(Self {
            base: PathBuf::from(var("CMSSW_BASE")?),
            scram_arch: var("SCRAM_ARCH")?,
            release_base: PathBuf::from(var("CMSSW_RELEASE_BASE")?),
        })
    }
}

/// Resolves requested software roots and locates required packages.
pub struct EnvironmentBinder<'a> {
    /// The process's default environment.
    pub ambient: &'a Environment,
    /// Probe used for roots other than the ambient one.
    pub probe: &'a dyn EnvProbe,
}

impl EnvironmentBinder<'_> {
    /// Resolve `requested` into a full [`Environment`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::EnvironmentError`] if the path contains a quote
    /// or backslash, does not exist, or cannot be probed.
    pub fn bind(&self, requested: &str) -> Result<Environment> {
        if requested.contains(BAD_ROOT_CHARACTERS) {
            return Err(Error::EnvironmentError(format!(
                "the characters ' and \\ are not allowed in the software root path '{requested}'; \
                 make a symbolic link with a saner name"
            )));
        }

        let root = Path::new(requested);
        if fs::read_dir(root).is_err() {
            return Err(Error::EnvironmentError(format!(
                "software root '{requested}' does not exist"
            )));
        }

        if root == self.ambient.base {
            return Ok(self.ambient.clone());
        }
        self.probe.probe(root)
    }

    /// Locate every required package as `src/<package>` under the
    /// environment base, falling back to the release base.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EnvironmentError`] naming the package and both
    /// search roots on a miss.
    pub fn locate_packages(
        &self,
        environment: &Environment,
        packages: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, PathBuf>> {
        let mut located = BTreeMap::new();
        for package in packages {
            let candidates = [
                environment.base.join("src").join(package),
                environment.release_base.join("src").join(package),
            ];
            match candidates.iter().find(|p| p.exists()) {
                Some(path) => {
                    located.insert(package.clone(), path.clone());
                }
                None => {
                    return Err(Error::EnvironmentError(format!(
                        "package {} does not exist in {} or {}",
                        package,
                        environment.base.display(),
                        environment.release_base.display()
                    )));
                }
            }
        }
        Ok(located)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoProbe;

    impl EnvProbe for NoProbe {
        fn probe(&self, _root: &Path) -> Result<Environment> {
            panic!("probe must not run for the ambient root");
        }
    }

    fn ambient(dir: &Path) -> Environment {
        Environment {
            base: dir.to_path_buf(),
            scram_arch: "slc7_amd64_gcc700".to_owned(),
            release_base: dir.join("release"),
        }
    }

    #[test]
    fn test_bad_characters_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let ambient = ambient(tmp.path());
        let binder = EnvironmentBinder { ambient: &ambient, probe: &NoProbe };
        let err = binder.bind("/some/pa'th").unwrap_err();
        assert!(matches!(err, Error::EnvironmentError(_)));
    }

    #[test]
    fn test_missing_root_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let ambient = ambient(tmp.path());
        let binder = EnvironmentBinder { ambient: &ambient, probe: &NoProbe };
        let err = binder.bind("/does/not/exist").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_ambient_root_reuses_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let ambient = ambient(tmp.path());
        let binder = EnvironmentBinder { ambient: &ambient, probe: &NoProbe };
        let bound = binder.bind(tmp.path().to_str().unwrap()).unwrap();
        assert_eq!(bound, ambient);
    }

    #[test]
    fn test_package_found_in_release_base() {
        let tmp = tempfile::tempdir().unwrap();
        let release = tmp.path().join("release");
        fs::create_dir_all(release.join("src/Alignment/OfflineValidation")).unwrap();
        let ambient = ambient(tmp.path());
        let binder = EnvironmentBinder { ambient: &ambient, probe: &NoProbe };

        let packages: BTreeSet<String> =
            ["Alignment/OfflineValidation".to_owned()].into_iter().collect();
        let located = binder.locate_packages(&ambient, &packages).unwrap();
        assert_eq!(
            located["Alignment/OfflineValidation"],
            release.join("src/Alignment/OfflineValidation")
        );
    }

    #[test]
    fn test_missing_package_names_both_roots() {
        let tmp = tempfile::tempdir().unwrap();
        let ambient = ambient(tmp.path());
        let binder = EnvironmentBinder { ambient: &ambient, probe: &NoProbe };

        let packages: BTreeSet<String> = ["Missing/Package".to_owned()].into_iter().collect();
        let err = binder.locate_packages(&ambient, &packages).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("Missing/Package"));
        assert!(text.contains(tmp.path().to_str().unwrap()));
        assert!(text.contains("release"));
    }
}
