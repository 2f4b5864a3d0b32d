//! Info command implementation

use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{InfoArgs, OutputFormat, ValidationConfig};
use crate::validation::{resolve_options, KindRegistry};

pub fn run_info(args: InfoArgs, level: LogLevel) -> Result<(), String> {
    let config =
        ValidationConfig::from_file(&args.config).map_err(|e| format!("Config error: {e}"))?;
    let general = config.general().map_err(|e| format!("Config error: {e}"))?;

    let default_root = env::var("CMSSW_BASE").unwrap_or_else(|_| ".".to_owned());
    let registry = KindRegistry::builtin(Path::new(&default_root)).map_err(|e| e.to_string())?;

    let mut resolved: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    for (kind_name, name) in config.validation_sections() {
        let section = format!("{kind_name}:{name}");
        let kind = registry.get(&kind_name).map_err(|e| e.to_string())?;
        let options = resolve_options(kind, &config, &name, &general)
            .map_err(|e| format!("in section [{section}]: {e}"))?;
        resolved.insert(section, options.general);
    }

    match args.format {
        OutputFormat::Text => {
            log(level, LogLevel::Normal, "Resolved validations:");
            for (section, options) in &resolved {
                println!();
                println!("[{section}]");
                for (key, value) in options {
                    println!("  {key} = {value}");
                }
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&resolved)
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&resolved)
                .map_err(|e| format!("YAML serialization error: {e}"))?;
            println!("{yaml}");
        }
    }

    Ok(())
}
