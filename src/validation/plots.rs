//! Shared plotting scripts.
//!
//! Plot-capable validations of one kind share a single macro: each
//! instance contributes a rendered fragment, and the macro is written
//! once per kind group.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::template::replace_by_map;
use crate::templates;

use super::instance::ValidationInstance;

/// Macro file paths for every plot-capable kind present, in kind order.
#[must_use]
pub fn macro_paths(path: &Path, instances: &[ValidationInstance]) -> Vec<PathBuf> {
    let kinds: BTreeSet<&str> = instances
        .iter()
        .filter(|v| v.kind.capabilities.plots)
        .map(|v| v.kind.plotting_macro)
        .collect();
    kinds
        .into_iter()
        .map(|name| path.join(format!("{name}.C")))
        .collect()
}

/// Render one shared plotting macro per plot-capable kind group.
///
/// Returns the written macro paths.
///
/// # Errors
///
/// Propagates fragment and filesystem failures.
pub fn create_plotting_scripts(
    path: &Path,
    instances: &mut [ValidationInstance],
) -> Result<Vec<PathBuf>> {
    let mut kind_order: Vec<String> = Vec::new();
    for instance in instances.iter() {
        if instance.kind.capabilities.plots && !kind_order.contains(&instance.kind.name) {
            kind_order.push(instance.kind.name.clone());
        }
    }

    let mut written = Vec::new();
    for kind_name in kind_order {
        let members: Vec<usize> = instances
            .iter()
            .enumerate()
            .filter(|(_, v)| v.kind.name == kind_name)
            .map(|(i, _)| i)
            .collect();

        let mut instantiation = String::new();
        for &index in &members {
            instantiation.push_str(&instances[index].append_to_plots()?);
        }

        let leader = &instances[members[0]];
        let mut map = leader.rep_map()?;
        map.set("PlottingInstantiation", instantiation);
        map.set("plottingMacroName", leader.kind.plotting_macro);

        let macro_path = path.join(format!("{}.C", leader.kind.plotting_macro));
        let rendered = replace_by_map(templates::PLOTTING_MACRO_TEMPLATE, &map)?;
        fs::write(&macro_path, rendered)?;
        written.push(macro_path);
    }
    Ok(written)
}
