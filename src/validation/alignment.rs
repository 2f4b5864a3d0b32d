//! The alignment geometry being validated.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ValidationConfig;
use crate::error::{Error, Result};
use crate::template::SubstitutionMap;
use crate::templates;

/// Alignment target: name, presentation attributes, conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    /// Section name, used in artifact file names.
    pub name: String,
    /// Legend title in comparison plots.
    pub title: String,
    /// Plot color.
    pub color: String,
    /// Plot line style.
    pub style: String,
    /// Conditions global tag, possibly empty.
    pub globaltag: String,
}

fn defaults(name: &str) -> BTreeMap<String, String> {
    [
        ("title", name),
        ("color", "1"),
        ("style", "1"),
        ("globaltag", ""),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect()
}

impl Alignment {
    /// Read the `alignment:<name>` section.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] when the section is missing or
    /// carries unknown keys.
    pub fn from_config(config: &ValidationConfig, name: &str) -> Result<Self> {
        let section = format!("alignment:{name}");
        if !config.has_section(&section) {
            return Err(Error::ConfigError(format!("section [{section}] is missing")));
        }
        let defaults = defaults(name);
        let known: BTreeSet<String> = defaults.keys().cloned().collect();
        config.check_input(&section, &known, &[])?;
        let options = config.resulting_section(&section, &defaults, &BTreeSet::new())?;

        Ok(Self {
            name: name.to_owned(),
            title: options["title"].clone(),
            color: options["color"].clone(),
            style: options["style"].clone(),
            globaltag: options["globaltag"].clone(),
        })
    }

    /// The conditions-loading snippet, empty without a global tag. The
    /// tag itself resolves through the substitution map.
    #[must_use]
    pub fn conditions(&self) -> &'static str {
        if self.globaltag.is_empty() {
            ""
        } else {
            templates::LOAD_GLOBAL_TAG_TEMPLATE
        }
    }

    /// Contribute this alignment's facts to a substitution map.
    pub fn apply(&self, map: &mut SubstitutionMap) {
        map.set("name", &self.name);
        map.set("title", &self.title);
        map.set("color", &self.color);
        map.set("style", &self.style);
        map.set("GlobalTag", &self.globaltag);
        map.set("condLoad", self.conditions());
    }
}
