//! Generate command implementation

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{GenerateArgs, ValidationConfig};
use crate::dataset::catalog::StaticCatalog;
use crate::dataset::DatasetCache;
use crate::environment::{Environment, ScramProbe};
use crate::shell::ShellRunner;
use crate::validation::{
    create_merge_script, create_plotting_scripts, Alignment, GeneratorContext, KindRegistry,
    ValidationInstance,
};

pub fn run_generate(args: GenerateArgs, level: LogLevel) -> Result<(), String> {
    let config =
        ValidationConfig::from_file(&args.config).map_err(|e| format!("Config error: {e}"))?;
    let general = config.general().map_err(|e| format!("Config error: {e}"))?;

    let ambient = Environment::ambient().map_err(|e| e.to_string())?;
    let registry = KindRegistry::builtin(&ambient.base).map_err(|e| e.to_string())?;

    let runner = ShellRunner;
    let probe = ScramProbe { runner: &runner };
    let backend = if general["catalog"].is_empty() {
        StaticCatalog::empty()
    } else {
        StaticCatalog::from_file(Path::new(&general["catalog"])).map_err(|e| e.to_string())?
    };
    let mut cache = DatasetCache::new();

    let output_dir = args
        .output_dir
        .unwrap_or_else(|| PathBuf::from(&general["workdir"]));
    fs::create_dir_all(&output_dir)
        .map_err(|e| format!("cannot create output directory {}: {e}", output_dir.display()))?;

    let sections = config.validation_sections();
    if sections.is_empty() {
        return Err("the job description declares no validation sections".to_owned());
    }

    let mut instances: Vec<ValidationInstance> = Vec::new();
    for (kind_name, name) in sections {
        let kind = registry.get(&kind_name).map_err(|e| e.to_string())?;
        let section = format!("{kind_name}:{name}");

        let alignment_name = if config.has_option(&section, "alignment") {
            config
                .get(&section, "alignment")
                .map_err(|e| e.to_string())?
                .to_owned()
        } else {
            "ideal".to_owned()
        };
        let alignment =
            Alignment::from_config(&config, &alignment_name).map_err(|e| e.to_string())?;

        let mut ctx = GeneratorContext {
            config: &config,
            ambient: &ambient,
            probe: &probe,
            runner: &runner,
            backend: &backend,
            cache: &mut cache,
        };
        let mut instance = ValidationInstance::new(&name, alignment, kind, &mut ctx)
            .map_err(|e| format!("in section [{section}]: {e}"))?;

        instance
            .create_configuration(&output_dir)
            .map_err(|e| format!("in section [{section}]: {e}"))?;
        instance
            .create_script(&output_dir)
            .map_err(|e| format!("in section [{section}]: {e}"))?;
        if instance.job_mode.is_crab() {
            instance
                .create_crab_cfg(&output_dir)
                .map_err(|e| format!("in section [{section}]: {e}"))?;
        }

        log(
            level,
            LogLevel::Verbose,
            &format!(
                "  [{section}]: {} configuration(s), {} script(s), {} jobs",
                instance.config_files().len(),
                instance.script_files().len(),
                instance.n_jobs
            ),
        );
        instances.push(instance);
    }

    if instances.iter().any(|v| v.kind.capabilities.parallel) {
        let merge = create_merge_script(&output_dir, &mut instances)
            .map_err(|e| format!("merge step: {e}"))?;
        log(level, LogLevel::Verbose, &format!("  merge script: {}", merge.display()));
    }
    let macros = create_plotting_scripts(&output_dir, &mut instances)
        .map_err(|e| format!("plotting step: {e}"))?;
    for macro_path in &macros {
        log(level, LogLevel::Verbose, &format!("  plotting macro: {}", macro_path.display()));
    }

    log(
        level,
        LogLevel::Normal,
        &format!(
            "✓ generated job bundles for {} validation(s) in {}",
            instances.len(),
            output_dir.display()
        ),
    );
    Ok(())
}
