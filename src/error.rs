// src/error.rs
use std::time::Duration;
use thiserror::Error;

/// Failures raised by the browser-automation layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// A required element never became available within the wait bound.
    #[error("element `{locator}` not available after {waited:?}")]
    LocatorTimeout { locator: String, waited: Duration },

    /// Any other command failure reported by the driver.
    #[error("driver command failed: {0}")]
    Command(String),
}

/// Every way a single harvest can fail.
///
/// Recoverable variants mean "no usable data for this configuration"; the
/// caller logs them and moves on. Fatal variants mean the page itself could not
/// be driven, which still only aborts the current configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarvestError {
    #[error("locator timeout: `{locator}` not available after {waited:?}")]
    LocatorTimeout { locator: String, waited: Duration },

    #[error("driver failure: {0}")]
    Driver(String),

    #[error("no fragments were captured")]
    EmptyTable,

    #[error("could not resolve {missing} column in header {header:?}")]
    UnresolvedColumns {
        missing: &'static str,
        header: Vec<String>,
    },

    #[error("all {dropped} rows were filtered out as blank or aggregate")]
    NoUsableRows { dropped: usize },

    #[error("count `{cell}` for `{entity}` is not a number")]
    UnparsableCount { entity: String, cell: String },

    #[error("row count still changing after {polls} polls on page {page} (last count {last_count})")]
    StabilityBudgetExhausted {
        page: usize,
        polls: usize,
        last_count: usize,
    },

    #[error("page {page} settled at {observed} rows but {captured} were captured")]
    CaptureMismatch {
        page: usize,
        observed: usize,
        captured: usize,
    },

    #[error("pagination did not terminate within {pages} pages")]
    PageBudgetExhausted { pages: usize },
}

impl HarvestError {
    /// Whether the run should simply move on to the next configuration.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            HarvestError::LocatorTimeout { .. } | HarvestError::Driver(_)
        )
    }

    /// Short machine-friendly tag, used in logs and debug dumps.
    pub fn kind(&self) -> &'static str {
        match self {
            HarvestError::LocatorTimeout { .. } => "locator_timeout",
            HarvestError::Driver(_) => "driver",
            HarvestError::EmptyTable => "empty_table",
            HarvestError::UnresolvedColumns { .. } => "unresolved_columns",
            HarvestError::NoUsableRows { .. } => "no_usable_rows",
            HarvestError::UnparsableCount { .. } => "unparsable_count",
            HarvestError::StabilityBudgetExhausted { .. } => "stability_budget_exhausted",
            HarvestError::CaptureMismatch { .. } => "capture_mismatch",
            HarvestError::PageBudgetExhausted { .. } => "page_budget_exhausted",
        }
    }
}

impl From<DriverError> for HarvestError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::LocatorTimeout { locator, waited } => {
                HarvestError::LocatorTimeout { locator, waited }
            }
            DriverError::Command(msg) => HarvestError::Driver(msg),
        }
    }
}
