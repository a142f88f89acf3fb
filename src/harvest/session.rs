// src/harvest/session.rs
use serde::Serialize;
use tracing::{error, info, warn};

use super::merge::{merge, LogicalTable};
use super::normalize::{normalize, NormalizedTable};
use super::observer::{HarvestObserver, NoopObserver};
use super::pages::PageWalker;
use crate::config::HarvestConfig;
use crate::driver::{Clock, TableDriver, TokioClock};
use crate::error::HarvestError;

/// The filter selections active while a table is harvested.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FilterConfig {
    /// Y-axis selection, e.g. "Maker".
    pub axis: String,
    pub year: String,
    pub category: String,
}

impl FilterConfig {
    pub fn new(axis: impl Into<String>, year: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            axis: axis.into(),
            year: year.into(),
            category: category.into(),
        }
    }
}

impl std::fmt::Display for FilterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.axis, self.year, self.category)
    }
}

/// A complete, normalized table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Harvest {
    pub table: LogicalTable,
    pub normalized: NormalizedTable,
}

/// Outcome of one harvest, tagged with the configuration that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestResult<T = Harvest> {
    pub filter: FilterConfig,
    pub outcome: Result<T, HarvestError>,
}

impl<T> HarvestResult<T> {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Owns the table driver for the duration of a run and harvests one filter
/// configuration at a time.
pub struct Harvester<D: TableDriver, C: Clock = TokioClock> {
    driver: D,
    clock: C,
    cfg: HarvestConfig,
    observer: Box<dyn HarvestObserver>,
}

impl<D: TableDriver> Harvester<D, TokioClock> {
    pub fn new(driver: D, cfg: HarvestConfig) -> Self {
        Self::with_clock(driver, TokioClock, cfg)
    }
}

impl<D: TableDriver, C: Clock> Harvester<D, C> {
    pub fn with_clock(driver: D, clock: C, cfg: HarvestConfig) -> Self {
        Self {
            driver,
            clock,
            cfg,
            observer: Box::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: impl HarvestObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.cfg
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Harvest the table currently rendered for `filter`.
    ///
    /// The caller must already have applied `filter` and must not change it
    /// until this returns. Failures come back inside the result, never as a
    /// panic.
    #[tracing::instrument(level = "info", skip(self, filter), fields(filter = %filter))]
    pub async fn harvest(&mut self, filter: FilterConfig) -> HarvestResult {
        let outcome = match self.collect(&filter).await {
            Ok(table) => normalize(&table, &self.cfg.column_keywords, &self.cfg.aggregate_policy)
                .map(|normalized| Harvest { table, normalized }),
            Err(e) => Err(e),
        };
        if let Ok(h) = &outcome {
            info!(
                pages = h.table.pages(),
                captured = h.table.row_count(),
                records = h.normalized.records.len(),
                "harvest complete"
            );
        }
        self.report(filter, outcome)
    }

    /// Like [`harvest`](Self::harvest) but stops at the merged table, for
    /// layouts (month-wise columns) that have no single count column.
    #[tracing::instrument(level = "info", skip(self, filter), fields(filter = %filter))]
    pub async fn harvest_table(&mut self, filter: FilterConfig) -> HarvestResult<LogicalTable> {
        let outcome = self.collect(&filter).await;
        if let Ok(table) = &outcome {
            info!(
                pages = table.pages(),
                captured = table.row_count(),
                "table harvest complete"
            );
        }
        self.report(filter, outcome)
    }

    fn report<T>(&self, filter: FilterConfig, outcome: Result<T, HarvestError>) -> HarvestResult<T> {
        if let Err(e) = &outcome {
            if e.is_recoverable() {
                warn!(kind = e.kind(), "harvest yielded no data: {}", e);
            } else {
                error!(kind = e.kind(), "harvest failed: {}", e);
            }
            self.observer.on_failure(&filter, e);
        }
        HarvestResult { filter, outcome }
    }

    async fn collect(&mut self, filter: &FilterConfig) -> Result<LogicalTable, HarvestError> {
        let acc = PageWalker::new(
            &mut self.driver,
            &self.clock,
            &self.cfg,
            self.observer.as_ref(),
            filter,
        )
        .walk()
        .await?;

        let table = merge(acc.header, acc.fragments)?;
        self.observer.on_table(filter, &table);
        Ok(table)
    }
}
