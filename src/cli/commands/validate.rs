//! Validate command implementation

use std::env;
use std::path::Path;

use crate::batch::JobMode;
use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{ValidateArgs, ValidationConfig};
use crate::validation::{resolve_options, Alignment, KindRegistry};

pub fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Validating {}...", args.config.display()),
    );

    let config =
        ValidationConfig::from_file(&args.config).map_err(|e| format!("Config error: {e}"))?;
    let general = config.general().map_err(|e| format!("Config error: {e}"))?;
    JobMode::parse(&general["jobmode"]).map_err(|e| format!("Config error: {e}"))?;

    // Static checks only: no environment probing, no dataset lookups.
    let default_root = env::var("CMSSW_BASE").unwrap_or_else(|_| ".".to_owned());
    let registry = KindRegistry::builtin(Path::new(&default_root)).map_err(|e| e.to_string())?;

    let sections = config.validation_sections();
    if sections.is_empty() {
        return Err("the job description declares no validation sections".to_owned());
    }

    for (kind_name, name) in &sections {
        let section = format!("{kind_name}:{name}");
        let kind = registry.get(kind_name).map_err(|e| e.to_string())?;
        let resolved = resolve_options(kind, &config, name, &general)
            .map_err(|e| format!("in section [{section}]: {e}"))?;
        JobMode::parse(&resolved.general["jobmode"])
            .map_err(|e| format!("in section [{section}]: {e}"))?;

        let alignment_name = resolved
            .general
            .get("alignment")
            .cloned()
            .unwrap_or_else(|| "ideal".to_owned());
        Alignment::from_config(&config, &alignment_name)
            .map_err(|e| format!("in section [{section}]: {e}"))?;

        log(level, LogLevel::Verbose, &format!("  ✓ [{section}]"));
    }

    log(
        level,
        LogLevel::Normal,
        &format!("✓ configuration is valid ({} validation(s))", sections.len()),
    );
    Ok(())
}
