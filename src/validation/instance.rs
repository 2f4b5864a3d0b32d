//! A single validation instance and its generation pipeline.
//!
//! Construction is fail-fast and synchronous: options resolve first,
//! then the batch job id, then the software environment, then (for
//! dataset-backed kinds) the dataset. Once constructed, the instance
//! only mutates by accumulating generated-file lists as the phases run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::artifacts;
use crate::batch::{self, JobMode};
use crate::config::ValidationConfig;
use crate::dataset::{DataKind, DatasetBackend, DatasetBinder, DatasetBinding, DatasetCache};
use crate::environment::{EnvProbe, Environment, EnvironmentBinder};
use crate::error::{Error, Result};
use crate::shell::CommandRunner;
use crate::template::{add_index, index_variant, replace_by_map, SubstitutionMap};
use crate::templates;

use super::alignment::Alignment;
use super::options::resolve_options;
use super::phases::GenerationPhase;
use super::traits::ValidationKind;

/// Reference name used when a comparison does not name one explicitly.
pub const DEFAULT_REFERENCE_NAME: &str = "DEFAULT";

/// Everything instance construction needs from the outside world.
pub struct GeneratorContext<'a> {
    /// The job description.
    pub config: &'a ValidationConfig,
    /// The process's default software environment.
    pub ambient: &'a Environment,
    /// Probe for non-ambient software roots.
    pub probe: &'a dyn EnvProbe,
    /// Shell used for batch queries.
    pub runner: &'a dyn CommandRunner,
    /// Dataset catalog backend.
    pub backend: &'a dyn DatasetBackend,
    /// Shared descriptor cache.
    pub cache: &'a mut DatasetCache,
}

/// One validation to generate job artifacts for.
pub struct ValidationInstance {
    /// Instance name (the part after the colon in the section address).
    pub name: String,
    /// Kind descriptor.
    pub kind: ValidationKind,
    /// Alignment geometry under validation.
    pub alignment: Alignment,
    /// Effective options.
    pub general: BTreeMap<String, String>,
    /// Job fan-out count, 1..=40.
    pub n_jobs: usize,
    /// Parsed job mode.
    pub job_mode: JobMode,
    /// Validated external batch job id, if configured.
    pub job_id: Option<String>,
    /// Resolved software environment.
    pub environment: Environment,
    /// Required package name → location.
    pub packages: BTreeMap<String, PathBuf>,
    /// Dataset binding, present only for dataset-backed kinds.
    pub dataset: Option<DatasetBinding>,
    plot_options: BTreeMap<String, String>,
    random_workdir_part: String,
    phase: GenerationPhase,
    config_files: Vec<PathBuf>,
    script_files: Vec<PathBuf>,
    crab_files: Vec<PathBuf>,
}

impl ValidationInstance {
    /// Construct and fully resolve one validation instance.
    ///
    /// # Errors
    ///
    /// Any configuration, environment or dataset failure aborts the
    /// construction; nothing is retried.
    pub fn new(
        name: &str,
        alignment: Alignment,
        kind: &ValidationKind,
        ctx: &mut GeneratorContext<'_>,
    ) -> Result<Self> {
        let section = format!("{}:{}", kind.name, name);

        let general_section = ctx.config.general()?;
        let resolved = resolve_options(kind, ctx.config, name, &general_section)?;
        let mut general = resolved.general;
        let mut n_jobs = resolved.n_jobs;

        let job_mode = JobMode::parse(&general["jobmode"])?;

        let job_id = general.get("jobid").filter(|id| !id.is_empty()).cloned();
        if let Some(id) = &job_id {
            batch::query_job(ctx.runner, id)?;
        }

        let binder = EnvironmentBinder { ambient: ctx.ambient, probe: ctx.probe };
        let environment = binder.bind(&general["cmssw"])?;
        general.insert("cmssw".to_owned(), environment.base.display().to_string());
        let packages = binder.locate_packages(&environment, &kind.traits.packages)?;

        let dataset = if kind.capabilities.dataset {
            let mut dataset_binder = DatasetBinder {
                cache: &mut *ctx.cache,
                backend: ctx.backend,
                config: ctx.config,
            };
            Some(dataset_binder.bind(
                &section,
                &mut general,
                &mut n_jobs,
                &job_mode,
                &environment,
                kind.need_parent_files,
            )?)
        } else {
            None
        };

        let random_workdir_part =
            format!("{:010}", rand::thread_rng().gen_range(1..10_000_000_000_u64));

        Ok(Self {
            name: name.to_owned(),
            kind: kind.clone(),
            alignment,
            general,
            n_jobs,
            job_mode,
            job_id,
            environment,
            packages,
            dataset,
            plot_options: ctx
                .config
                .plotting_section(&kind.name)
                .cloned()
                .unwrap_or_default(),
            random_workdir_part,
            phase: GenerationPhase::Constructed,
            config_files: Vec::new(),
            script_files: Vec::new(),
            crab_files: Vec::new(),
        })
    }

    /// Current generation phase.
    #[must_use]
    pub fn phase(&self) -> GenerationPhase {
        self.phase
    }

    /// Generated configuration files, in execution order.
    #[must_use]
    pub fn config_files(&self) -> &[PathBuf] {
        &self.config_files
    }

    /// Generated run scripts.
    #[must_use]
    pub fn script_files(&self) -> &[PathBuf] {
        &self.script_files
    }

    /// Generated grid descriptors.
    #[must_use]
    pub fn crab_files(&self) -> &[PathBuf] {
        &self.crab_files
    }

    /// Configuration file name for this instance.
    #[must_use]
    pub fn cfg_name(&self) -> String {
        format!(
            "{}.{}.{}_cfg.py",
            self.kind.config_base, self.name, self.alignment.name
        )
    }

    /// Run-script file name for this instance.
    #[must_use]
    pub fn script_name(&self) -> String {
        format!(
            "{}.{}.{}.sh",
            self.kind.script_base, self.name, self.alignment.name
        )
    }

    /// Grid-descriptor file name for this instance.
    #[must_use]
    pub fn crab_cfg_name(&self) -> String {
        format!(
            "crab.{}.{}.{}.cfg",
            self.kind.crab_base, self.name, self.alignment.name
        )
    }

    /// Assemble the substitution map for this instance: plotting
    /// options, alignment facts, effective options, environment facts,
    /// and — for dataset-backed kinds — the indexed output/result file
    /// tables.
    ///
    /// # Errors
    ///
    /// Propagates template failures while pre-rendering the output and
    /// result file names.
    pub fn rep_map(&self) -> Result<SubstitutionMap> {
        let mut map = SubstitutionMap::new();
        map.extend_text(&self.plot_options);
        self.alignment.apply(&mut map);
        map.extend_text(&self.general);

        map.set(
            "workdir",
            format!("{}/{}", self.general["workdir"], self.random_workdir_part),
        );
        map.set("CMSSW_BASE", self.environment.base.display().to_string());
        map.set("SCRAM_ARCH", &self.environment.scram_arch);
        map.set(
            "CMSSW_RELEASE_BASE",
            self.environment.release_base.display().to_string(),
        );
        map.set("alignmentName", &self.alignment.name);
        for (package, path) in &self.packages {
            map.set(package.clone(), path.display().to_string());
        }

        if self.dataset.is_some() {
            let output_file = replace_by_map(
                &format!("{}_{}_.oO[name]Oo..root", self.kind.output_base, self.name),
                &map,
            )?;
            let result_file = replace_by_map(
                &format!(
                    "/store/caf/user/$USER/.oO[eosdir]Oo./{}_{}_.oO[name]Oo..root",
                    self.kind.result_base, self.name
                ),
                &map,
            )?;
            map.set("outputFile", ".oO[outputFiles[.oO[nIndex]Oo.]]Oo.");
            map.set_list("outputFiles", add_index(&output_file, self.n_jobs));
            map.set("finalOutputFile", &output_file);
            map.set("resultFile", ".oO[resultFiles[.oO[nIndex]Oo.]]Oo.");
            map.set_list("resultFiles", add_index(&result_file, self.n_jobs));
            map.set("finalResultFile", &result_file);
        }

        Ok(map)
    }

    /// Generate the configuration files into `path`.
    ///
    /// # Errors
    ///
    /// Fails on an out-of-order call or any template/filesystem error.
    pub fn create_configuration(&mut self, path: &Path) -> Result<&[PathBuf]> {
        let next = self.phase.advance(GenerationPhase::ConfigurationGenerated)?;
        let map = self.rep_map()?;
        let contents = vec![(self.cfg_name(), self.kind.cfg_template.to_owned())];
        self.config_files =
            artifacts::create_configuration(&contents, path, self.n_jobs, &map, None)?;
        self.phase = next;
        Ok(&self.config_files)
    }

    /// Generate the run scripts into `path`. Requires generated
    /// configurations (the script invokes them).
    ///
    /// # Errors
    ///
    /// Fails on an out-of-order call or any template/filesystem error.
    pub fn create_script(&mut self, path: &Path) -> Result<&[PathBuf]> {
        let next = self.phase.advance(GenerationPhase::ScriptGenerated)?;
        let mut map = self.rep_map()?;

        let mut command_line = String::new();
        for cfg in &self.config_files {
            let cfg = cfg.to_string_lossy();
            let variant = index_variant(&cfg, self.n_jobs, ".oO[nIndex]Oo.");
            // Plain replacement here: the nIndex token must survive
            // until the per-job rendering pass.
            command_line.push_str(
                &templates::COMMAND_LINE_TEMPLATE
                    .replace(".oO[cfgFile]Oo.", &variant)
                    .replace(".oO[postProcess]Oo.", ""),
            );
        }
        map.set("CommandLine", command_line);

        let contents = vec![(self.script_name(), templates::SCRIPT_TEMPLATE.to_owned())];
        self.script_files = artifacts::create_script(&contents, path, self.n_jobs, &map)?;
        self.phase = next;
        Ok(&self.script_files)
    }

    /// Generate the grid-submission descriptor into `path`.
    ///
    /// # Errors
    ///
    /// Fails on an out-of-order call, a non-dataset kind, an unknown
    /// data type, a missing queue, or in-tool fan-out.
    pub fn create_crab_cfg(&mut self, path: &Path) -> Result<&[PathBuf]> {
        let next = self.phase.advance(GenerationPhase::CrabCfgGenerated)?;
        let Some(binding) = &self.dataset else {
            return Err(Error::GenerationError(format!(
                "validation kind '{}' is not dataset-backed; there is nothing to submit to \
                 the grid",
                self.kind.name
            )));
        };

        let crab_name = self.crab_cfg_name();
        let mut map = self.rep_map()?;
        map.set("script", "dummy_script.sh");
        map.set(
            "crabWorkingDir",
            crab_name.trim_end_matches(".cfg").to_owned(),
        );
        map.set("numberOfJobs", self.general["parallelJobs"].clone());
        map.set("queue", self.job_mode.queue()?);
        let first_cfg = self.config_files.first().ok_or_else(|| {
            Error::GenerationError(
                "no configuration file to reference from the grid descriptor".to_owned(),
            )
        })?;
        map.set("cfgFile", first_cfg.display().to_string());
        if let Some(maxevents) = self.general.get("maxevents") {
            map.set("nEvents", maxevents.clone());
        }
        match binding.descriptor.data_kind() {
            DataKind::Mc => map.set("McOrData", "events = .oO[nEvents]Oo."),
            DataKind::Data => {
                map.set("McOrData", "lumis = -1");
                eprintln!(
                    "Warning: for jobmode 'crab' the parameter 'maxevents' is ignored and \
                     all events are processed."
                );
            }
            DataKind::Unknown => {
                return Err(Error::DatasetError(format!(
                    "unknown data type of dataset '{}'; cannot run in grid mode",
                    binding.descriptor.name()
                )));
            }
        }

        let contents = vec![(crab_name, templates::CRAB_CFG_TEMPLATE.to_owned())];
        self.crab_files = artifacts::create_crab_cfg(&contents, path, self.n_jobs, &map)?;
        self.phase = next;
        Ok(&self.crab_files)
    }

    /// Contribute this instance's merge fragment: merge the per-job
    /// outputs, copy the final output on success, and fold the exit
    /// code into the script-wide maximum.
    ///
    /// # Errors
    ///
    /// Fails on an out-of-order call or a kind without the parallel
    /// capability.
    pub fn append_to_merge(&mut self) -> Result<String> {
        let next = self.phase.advance(GenerationPhase::MergeAppended)?;
        if !self.kind.capabilities.parallel {
            return Err(Error::GenerationError(format!(
                "validation kind '{}' does not produce mergeable output",
                self.kind.name
            )));
        }

        let targets: Vec<String> = (0..self.n_jobs)
            .map(|index| format!(".oO[outputFiles[{index}]]Oo."))
            .collect();
        let mut fragment = format!(
            "hadd -f .oO[finalOutputFile]Oo. {}\ntmpMergeRetCode=${{?}}\n",
            targets.join(" ")
        );
        fragment.push_str(templates::MERGE_EPILOGUE);

        let mut rendered = replace_by_map(&fragment, &self.rep_map()?)?;
        if !rendered.ends_with('\n') {
            rendered.push('\n');
        }
        self.phase = next;
        Ok(rendered)
    }

    /// Contribute this instance's plotting fragment.
    ///
    /// # Errors
    ///
    /// Fails on an out-of-order call or a kind without the plots
    /// capability.
    pub fn append_to_plots(&mut self) -> Result<String> {
        let next = self.phase.advance(GenerationPhase::PlotAppended)?;
        if !self.kind.capabilities.plots {
            return Err(Error::GenerationError(format!(
                "validation kind '{}' does not produce plots",
                self.kind.name
            )));
        }
        let rendered = replace_by_map(self.kind.plot_fragment, &self.rep_map()?)?;
        self.phase = next;
        Ok(rendered)
    }

    /// The files other validations compare against, keyed by reference
    /// name.
    ///
    /// # Errors
    ///
    /// Fails for kinds that do not produce a result file.
    pub fn files_to_compare(&self) -> Result<BTreeMap<String, String>> {
        if self.dataset.is_none() {
            return Err(Error::GenerationError(format!(
                "validation kind '{}' does not produce comparable result files",
                self.kind.name
            )));
        }
        let map = self.rep_map()?;
        let Some(crate::template::Value::Text(result)) = map.get("finalResultFile") else {
            return Err(Error::GenerationError(
                "no final result file in the substitution map".to_owned(),
            ));
        };
        Ok([(DEFAULT_REFERENCE_NAME.to_owned(), result.clone())]
            .into_iter()
            .collect())
    }

    /// Comparison strings for every reference, rewriting storage paths
    /// into their access protocols. With `plain` the bare file path is
    /// returned instead of the `file=title|color|style` form.
    ///
    /// # Errors
    ///
    /// Propagates [`ValidationInstance::files_to_compare`] failures.
    pub fn compare_strings(&self, plain: bool) -> Result<BTreeMap<String, String>> {
        let mut result = BTreeMap::new();
        for (reference, file) in self.files_to_compare()? {
            let file = if let Some(rest) = file.strip_prefix("/castor/") {
                format!("rfio:/castor/{rest}")
            } else if file.starts_with("/store/") {
                format!("root://eoscms.cern.ch//eos/cms{file}")
            } else {
                file
            };
            let value = if plain {
                file
            } else {
                format!(
                    "{}={}|{}|{}",
                    file, self.alignment.title, self.alignment.color, self.alignment.style
                )
            };
            result.insert(reference, value);
        }
        Ok(result)
    }

    /// One comparison string, addressed `instance.reference` (the
    /// reference defaults to `DEFAULT`).
    ///
    /// # Errors
    ///
    /// Fails when the reference is not known.
    pub fn compare_string_for(&self, request: &str, plain: bool) -> Result<String> {
        let reference = request.rsplit_once('.').map_or(DEFAULT_REFERENCE_NAME, |(_, r)| r);
        let strings = self.compare_strings(plain)?;
        strings.get(reference).cloned().ok_or_else(|| {
            Error::GenerationError(format!(
                "could not find {reference} in reference objects"
            ))
        })
    }
}
