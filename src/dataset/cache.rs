//! Process-wide dataset-descriptor cache.
//!
//! Generation runs sequentially in one process, so the cache needs no
//! locking — but it must be idempotent: one backend lookup per
//! `(dataset, environment, predefined-flag)` key, ever. The cache is an
//! explicit object injected into the binder so tests get isolation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use crate::environment::Environment;
use crate::error::Result;

use super::descriptor::{DatasetBackend, DatasetDescriptor};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    dataset: String,
    root: PathBuf,
    predefined_first: bool,
}

/// Descriptor cache keyed by `(dataset, environment root, predefined)`.
#[derive(Default)]
pub struct DatasetCache {
    entries: HashMap<CacheKey, Rc<dyn DatasetDescriptor>>,
}

impl DatasetCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds nothing yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the cached descriptor for the key, or look it up through
    /// the backend and remember it.
    ///
    /// A descriptor found via predefined-first lookup that turns out not
    /// to be predefined is also registered under the non-predefined key,
    /// so the live catalog is never asked twice for the same data.
    /// Binding one dataset id against a second environment is legal but
    /// suspicious, and warns.
    ///
    /// # Errors
    ///
    /// Propagates backend lookup failures.
    pub fn lookup(
        &mut self,
        backend: &dyn DatasetBackend,
        dataset: &str,
        environment: &Environment,
        predefined_first: bool,
    ) -> Result<Rc<dyn DatasetDescriptor>> {
        let key = CacheKey {
            dataset: dataset.to_owned(),
            root: environment.base.clone(),
            predefined_first,
        };
        if let Some(descriptor) = self.entries.get(&key) {
            return Ok(descriptor.clone());
        }

        if self
            .entries
            .keys()
            .any(|k| k.dataset == dataset && k.root != environment.base)
        {
            eprintln!(
                "Warning: dataset '{dataset}' is used in more than one software environment. \
                 This is allowed, but make sure it is not a mistake."
            );
        }

        let descriptor = backend.lookup(dataset, predefined_first, environment)?;
        self.entries.insert(key.clone(), descriptor.clone());
        if predefined_first && !descriptor.predefined() {
            self.entries
                .entry(CacheKey { predefined_first: false, ..key })
                .or_insert_with(|| descriptor.clone());
        }
        Ok(descriptor)
    }
}
