// src/harvest/scroll.rs
use std::time::Duration;
use tracing::{debug, info};

use super::merge::{Fragment, Header};
use super::stability::StabilityDetector;
use crate::config::HarvestConfig;
use crate::driver::{Clock, TableDriver};
use crate::error::HarvestError;
use crate::html::{parse_header, parse_rows};

/// What one fully scrolled page yields.
#[derive(Debug, Clone)]
pub struct PageCapture {
    pub fragment: Fragment,
    /// Only present when the caller asked for the header.
    pub header: Option<Header>,
}

/// Pulses the table's lazy loader until the row count settles.
pub struct ScrollDriver<'a, C: Clock> {
    clock: &'a C,
    settle: Duration,
    threshold: usize,
    max_polls: usize,
}

impl<'a, C: Clock> ScrollDriver<'a, C> {
    pub fn new(clock: &'a C, cfg: &HarvestConfig) -> Self {
        Self {
            clock,
            settle: cfg.scroll_settle_delay,
            threshold: cfg.effective_threshold(),
            max_polls: cfg.max_scroll_polls.max(1),
        }
    }

    /// Scroll `page` until stable, then capture its rows (and the header when
    /// `capture_header` is set).
    pub async fn exhaust<D: TableDriver>(
        &self,
        driver: &mut D,
        page: usize,
        capture_header: bool,
    ) -> Result<PageCapture, HarvestError> {
        let settled = self.settle_rows(driver, page).await?;

        let rows = parse_rows(&driver.rows_html().await?);
        if rows.len() != settled {
            // the DOM moved between the last poll and the capture
            return Err(HarvestError::CaptureMismatch {
                page,
                observed: settled,
                captured: rows.len(),
            });
        }

        let header = if capture_header {
            Some(parse_header(&driver.header_html().await?))
        } else {
            None
        };

        info!(page, rows = rows.len(), "captured fragment");
        Ok(PageCapture {
            fragment: Fragment { page, rows },
            header,
        })
    }

    /// Poll, scroll, sleep until the detector reports stable; returns the
    /// settled row count.
    async fn settle_rows<D: TableDriver>(
        &self,
        driver: &mut D,
        page: usize,
    ) -> Result<usize, HarvestError> {
        let mut detector = StabilityDetector::new(self.threshold);
        loop {
            let count = driver.row_count().await?;
            debug!(page, count, "loaded rows so far");
            if detector.observe(count) {
                return Ok(count);
            }
            if detector.observations() >= self.max_polls {
                return Err(HarvestError::StabilityBudgetExhausted {
                    page,
                    polls: detector.observations(),
                    last_count: count,
                });
            }
            driver.scroll_rows_to_end().await?;
            self.clock.sleep(self.settle).await;
        }
    }
}
