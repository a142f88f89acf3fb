// src/harvest/pages.rs
use std::time::Duration;
use tracing::{debug, info};

use super::merge::{Fragment, Header};
use super::observer::HarvestObserver;
use super::scroll::ScrollDriver;
use super::session::FilterConfig;
use crate::config::HarvestConfig;
use crate::driver::{Clock, NextControl, TableDriver};
use crate::error::HarvestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    /// Scrolling the current page until its rows settle.
    Harvesting,
    /// Looking for, and activating, the "next page" control.
    Advancing,
}

/// Ordered fragments plus the header captured on page 1.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    pub header: Option<Header>,
    pub fragments: Vec<Fragment>,
}

/// Walks every page of the table, harvesting each one in turn.
pub struct PageWalker<'a, D: TableDriver, C: Clock> {
    driver: &'a mut D,
    clock: &'a C,
    scroll: ScrollDriver<'a, C>,
    observer: &'a dyn HarvestObserver,
    filter: &'a FilterConfig,
    click_settle: Duration,
    page_settle: Duration,
    max_pages: usize,
}

impl<'a, D: TableDriver, C: Clock> PageWalker<'a, D, C> {
    pub fn new(
        driver: &'a mut D,
        clock: &'a C,
        cfg: &HarvestConfig,
        observer: &'a dyn HarvestObserver,
        filter: &'a FilterConfig,
    ) -> Self {
        Self {
            driver,
            clock,
            scroll: ScrollDriver::new(clock, cfg),
            observer,
            filter,
            click_settle: cfg.next_click_settle,
            page_settle: cfg.page_settle_delay,
            max_pages: cfg.max_pages.max(1),
        }
    }

    pub async fn walk(self) -> Result<Accumulator, HarvestError> {
        let PageWalker {
            driver,
            clock,
            scroll,
            observer,
            filter,
            click_settle,
            page_settle,
            max_pages,
        } = self;

        let mut acc = Accumulator::default();
        let mut state = WalkState::Harvesting;
        let mut page = 1;

        loop {
            state = match state {
                WalkState::Harvesting => {
                    let capture = scroll
                        .exhaust(&mut *driver, page, acc.header.is_none())
                        .await?;
                    if let Some(header) = capture.header {
                        acc.header = Some(header);
                    }
                    observer.on_fragment(filter, &capture.fragment);
                    acc.fragments.push(capture.fragment);
                    WalkState::Advancing
                }
                WalkState::Advancing => match driver.next_page_control().await? {
                    NextControl::Absent | NextControl::Disabled => {
                        debug!(page, "no further page");
                        break;
                    }
                    NextControl::Enabled => {
                        if page >= max_pages {
                            return Err(HarvestError::PageBudgetExhausted { pages: page });
                        }
                        driver.reveal_next_page().await?;
                        clock.sleep(click_settle).await;
                        driver.activate_next_page().await?;
                        clock.sleep(page_settle).await;
                        page += 1;
                        info!(page, "advanced to next page");
                        WalkState::Harvesting
                    }
                },
            };
        }

        Ok(acc)
    }
}
