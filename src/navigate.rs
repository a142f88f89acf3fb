// src/navigate.rs
//! Drives the dashboard's filter dropdowns so the harvester sees the right table.

use anyhow::{Context, Result};
use fantoccini::{Client, Locator};
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

pub const Y_AXIS_DROPDOWN: &str = "yaxisVar";
pub const X_AXIS_DROPDOWN: &str = "xaxisVar";
pub const YEAR_DROPDOWN: &str = "selectedYear";
pub const CATEGORY_DROPDOWN: &str = "vchgroupTable:selectCatgGrp";
pub const REFRESH_BUTTON: &str = "j_idt72";

/// Quote `s` as an XPath string literal, whatever quotes it contains.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{}'", s)
    } else if !s.contains('"') {
        format!("\"{}\"", s)
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

fn option_xpath(option: &str) -> String {
    format!("//li[normalize-space()={}]", xpath_literal(option))
}

/// Applies filter selections. No retries: a failed selection is reported and
/// the caller decides what to skip.
pub struct FilterNavigator {
    client: Client,
    timeout: Duration,
    open_settle: Duration,
    option_settle: Duration,
    refresh_settle: Duration,
}

impl FilterNavigator {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            open_settle: Duration::from_millis(300),
            option_settle: Duration::from_secs(1),
            refresh_settle: Duration::from_secs(2),
        }
    }

    pub async fn open(&self, url: &str) -> Result<()> {
        info!(url, "opening dashboard");
        self.client
            .goto(url)
            .await
            .with_context(|| format!("navigating to {}", url))
    }

    async fn click(&self, locator: Locator<'_>, what: &str) -> Result<()> {
        let el = self
            .client
            .wait()
            .at_most(self.timeout)
            .for_element(locator)
            .await
            .with_context(|| format!("waiting for {}", what))?;
        el.click().await.with_context(|| format!("clicking {}", what))
    }

    /// Open dropdown `id` and pick the entry labelled `option`.
    pub async fn select_option(&self, id: &str, option: &str) -> Result<()> {
        self.click(Locator::Id(id), id).await?;
        sleep(self.open_settle).await;
        let xpath = option_xpath(option);
        self.click(Locator::XPath(&xpath), option).await?;
        sleep(self.option_settle).await;
        info!(dropdown = id, option, "selected");
        Ok(())
    }

    pub async fn refresh(&self) -> Result<()> {
        self.click(Locator::Id(REFRESH_BUTTON), "refresh").await?;
        sleep(self.refresh_settle).await;
        Ok(())
    }

    pub async fn select_y_axis(&self, axis: &str) -> Result<()> {
        self.select_option(Y_AXIS_DROPDOWN, axis).await?;
        self.refresh().await
    }

    /// "Month Wise" spreads the counts over one column per month.
    pub async fn select_x_axis(&self, axis: &str) -> Result<()> {
        self.select_option(X_AXIS_DROPDOWN, axis).await?;
        self.refresh().await
    }

    pub async fn select_year(&self, year: &str) -> Result<()> {
        self.select_option(YEAR_DROPDOWN, year).await?;
        self.refresh().await
    }

    /// The category dropdown re-renders the table on its own.
    pub async fn select_category(&self, category: &str) -> Result<()> {
        self.select_option(CATEGORY_DROPDOWN, category).await
    }
}
