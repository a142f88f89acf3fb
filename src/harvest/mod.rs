// src/harvest/mod.rs
//! Materializes the complete logical table behind a virtualized, paginated
//! datatable.
//!
//! Control flow for one filter configuration:
//! [`Harvester`] → [`PageWalker`] → ([`ScrollDriver`] ⇄ [`StabilityDetector`])
//! per page → [`merge`] → [`normalize`].

pub mod merge;
pub mod normalize;
pub mod observer;
pub mod pages;
pub mod scroll;
pub mod session;
pub mod stability;

#[cfg(test)]
pub(crate) mod testing;

pub use merge::{merge, Fragment, Header, LogicalTable};
pub use normalize::{normalize, AggregateRowPolicy, ColumnKeywords, NormalizedTable, Record};
pub use observer::{DebugDumpObserver, HarvestObserver, NoopObserver};
pub use pages::{Accumulator, PageWalker};
pub use scroll::{PageCapture, ScrollDriver};
pub use session::{FilterConfig, Harvest, HarvestResult, Harvester};
pub use stability::StabilityDetector;
