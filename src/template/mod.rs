//! Template substitution for `.oO[key]Oo.` placeholders.
//!
//! A [`SubstitutionMap`] carries the key→value table assembled per
//! rendering stage. Values are either plain text or an indexed list;
//! list entries are addressed as `.oO[key[i]]Oo.`. Substitution iterates
//! until no placeholder remains, so map values may themselves contain
//! placeholders (the alignment conditions snippet resolves its global
//! tag this way). Unresolved placeholders are a hard error.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::{Error, Result};

/// Upper bound on substitution passes before the renderer declares a
/// cycle in the map.
const MAX_PASSES: usize = 10_000;

/// A substitution value: plain text, or a list addressed by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Substituted for `.oO[key]Oo.`.
    Text(String),
    /// Entry `i` is substituted for `.oO[key[i]]Oo.`.
    List(Vec<String>),
}

/// Ordered key→value table used to render templates.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionMap {
    entries: BTreeMap<String, Value>,
}

impl SubstitutionMap {
    /// Empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a text value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), Value::Text(value.into()));
    }

    /// Insert or replace an indexed list value.
    pub fn set_list(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.entries.insert(key.into(), Value::List(values));
    }

    /// Copy every `(key, value)` text pair from an option map.
    pub fn extend_text<'a, I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (key, value) in pairs {
            self.set(key.clone(), value.clone());
        }
    }

    /// Look up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    fn apply_pass(&self, text: &str) -> String {
        let mut result = text.to_owned();
        for (key, value) in &self.entries {
            match value {
                Value::Text(v) => {
                    result = result.replace(&format!(".oO[{key}]Oo."), v);
                }
                Value::List(items) => {
                    for (index, item) in items.iter().enumerate() {
                        result = result.replace(&format!(".oO[{key}[{index}]]Oo."), item);
                    }
                }
            }
        }
        result
    }
}

fn has_placeholder(text: &str) -> bool {
    text.contains(".oO[") && text.contains("]Oo.")
}

fn unresolved_keys(text: &str) -> Vec<String> {
    // Nested placeholders make a full grammar pointless here; the inner
    // token is enough to name the offender.
    let pattern = Regex::new(r"\.oO\[([A-Za-z0-9_/\[\]]+?)\]Oo\.").expect("static regex");
    let mut keys: Vec<String> = pattern
        .captures_iter(text)
        .map(|c| c[1].to_owned())
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

/// Render `template` against `map`, iterating until every placeholder is
/// resolved.
///
/// # Errors
///
/// Returns [`Error::GenerationError`] when a placeholder has no entry in
/// the map, or when substitution stops converging (a value cycle).
pub fn replace_by_map(template: &str, map: &SubstitutionMap) -> Result<String> {
    let mut text = template.to_owned();
    let mut passes = 0;

    while has_placeholder(&text) {
        let replaced = map.apply_pass(&text);
        if replaced == text {
            let keys = unresolved_keys(&text);
            return Err(Error::GenerationError(format!(
                "unresolved template placeholders: {}",
                keys.join(", ")
            )));
        }
        text = replaced;
        passes += 1;
        if passes > MAX_PASSES {
            return Err(Error::GenerationError(
                "endless loop in template substitution; a map value refers back to itself"
                    .to_owned(),
            ));
        }
    }

    Ok(text)
}

/// Index-variant name for one fan-out job.
///
/// With a single job the name is unchanged; otherwise `_<token>` is
/// inserted before the file extension (`cfg.py` → `cfg_0.py`). `token`
/// may itself be a placeholder such as `.oO[nIndex]Oo.`.
#[must_use]
pub fn index_variant(path: &str, n_jobs: usize, token: &str) -> String {
    if n_jobs <= 1 {
        return path.to_owned();
    }
    let dot = match path.rfind('.') {
        Some(pos) if pos > path.rfind('/').map_or(0, |s| s + 1) => pos,
        _ => return format!("{path}_{token}"),
    };
    format!("{}_{}{}", &path[..dot], token, &path[dot..])
}

/// All index variants of `path` for an `n_jobs`-way fan-out, in job order.
#[must_use]
pub fn add_index(path: &str, n_jobs: usize) -> Vec<String> {
    (0..n_jobs.max(1))
        .map(|i| index_variant(path, n_jobs, &i.to_string()))
        .collect()
}
