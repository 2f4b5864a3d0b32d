//! Dataset descriptor and backend contracts.

use std::fmt;
use std::rc::Rc;

use crate::environment::Environment;
use crate::error::Result;

use super::range::RunRangeSelection;

/// What a dataset contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// Simulated events.
    Mc,
    /// Recorded collision or cosmic data.
    Data,
    /// The backend could not tell.
    Unknown,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataKind::Mc => "mc",
            DataKind::Data => "data",
            DataKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Resolved metadata of one dataset.
///
/// Descriptors are shared through the [`super::DatasetCache`]; all
/// methods are read-only.
pub trait DatasetDescriptor: fmt::Debug {
    /// Full dataset identifier.
    fn name(&self) -> &str;

    /// Whether this descriptor came from the pre-registered catalog.
    /// Predefined datasets carry no run catalog and cannot be subdivided
    /// by run or time range.
    fn predefined(&self) -> bool;

    /// Magnetic-field value, if the backend knows it.
    fn magnetic_field(&self) -> Option<String>;

    /// Simulated or recorded data.
    fn data_kind(&self) -> DataKind;

    /// Render the source snippet selecting this dataset.
    ///
    /// `parent` asks for secondary (parent) files as well; `crab` asks
    /// for the grid flavor, which leaves run selection to the grid
    /// descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error when the selection cannot be honored (for
    /// example any range on a predefined dataset).
    fn dataset_snippet(
        &self,
        selection: &RunRangeSelection,
        parent: bool,
        crab: bool,
    ) -> Result<String>;

    /// Consume the selection's time bounds into run bounds using this
    /// dataset's own time→run mapping.
    ///
    /// # Errors
    ///
    /// Returns an error when the dataset has no usable run timestamps or
    /// a bound falls outside the catalogued range.
    fn convert_time_to_run(&self, selection: &RunRangeSelection) -> Result<RunRangeSelection>;

    /// Run numbers of this dataset, in catalog order.
    ///
    /// # Errors
    ///
    /// Returns an error for predefined datasets, which carry no catalog.
    fn run_list(&self) -> Result<Vec<u64>>;
}

/// Looks descriptors up in whatever catalog backs the deployment.
pub trait DatasetBackend {
    /// Obtain the descriptor for `dataset` in `environment`.
    ///
    /// `try_predefined_first` asks for a pre-registered entry before any
    /// live catalog query.
    ///
    /// # Errors
    ///
    /// Returns an error when the dataset is unknown to the backend.
    fn lookup(
        &self,
        dataset: &str,
        try_predefined_first: bool,
        environment: &Environment,
    ) -> Result<Rc<dyn DatasetDescriptor>>;
}
