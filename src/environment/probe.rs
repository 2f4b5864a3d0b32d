//! External environment-setup probe.

use std::path::Path;

use crate::error::{Error, Result};
use crate::shell::CommandRunner;

use super::Environment;

/// Discovers the metadata of a software root other than the ambient one.
pub trait EnvProbe {
    /// Resolve `root` into a full [`Environment`].
    ///
    /// # Errors
    ///
    /// Returns an error if the probe command fails or its answer is
    /// incomplete.
    fn probe(&self, root: &Path) -> Result<Environment>;
}

/// Probe that sources the installation's runtime environment through
/// `scramv1` and echoes the three facts back.
pub struct ScramProbe<'a> {
    /// Shell used for the round trip.
    pub runner: &'a dyn CommandRunner,
}

impl EnvProbe for ScramProbe<'_> {
    fn probe(&self, root: &Path) -> Result<Environment> {
        let command = format!(
            "cd '{}' && eval `scramv1 runtime -sh 2> /dev/null` \
             && echo \"$CMSSW_BASE\n$SCRAM_ARCH\n$CMSSW_RELEASE_BASE\"",
            root.display()
        );
        let output = self.runner.run(&command)?;
        let mut lines = output.lines();
        let mut next = |what: &str| {
            lines
                .next()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_owned)
                .ok_or_else(|| {
                    Error::EnvironmentError(format!(
                        "environment probe of '{}' did not report a {what}",
                        root.display()
                    ))
                })
        };
        let base = next("base path")?;
        let scram_arch = next("architecture")?;
        let release_base = next("release base")?;
        Ok(Environment {
            base: base.into(),
            scram_arch,
            release_base: release_base.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(&'static str);

    impl CommandRunner for Canned {
        fn run(&self, _command: &str) -> Result<String> {
            Ok(self.0.to_owned())
        }
    }

    #[test]
    fn test_probe_parses_three_lines() {
        let runner = Canned("/cern/user/area\nslc7_amd64_gcc700\n/cern/releases/CMSSW_10_6_0\n");
        let probe = ScramProbe { runner: &runner };
        let env = probe.probe(Path::new("/cern/user/area")).unwrap();
        assert_eq!(env.base, Path::new("/cern/user/area"));
        assert_eq!(env.scram_arch, "slc7_amd64_gcc700");
        assert_eq!(env.release_base, Path::new("/cern/releases/CMSSW_10_6_0"));
    }

    #[test]
    fn test_probe_rejects_short_answer() {
        let runner = Canned("/cern/user/area\n");
        let probe = ScramProbe { runner: &runner };
        let err = probe.probe(Path::new("/cern/user/area")).unwrap_err();
        assert!(matches!(err, Error::EnvironmentError(_)));
    }
}
