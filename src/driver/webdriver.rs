// src/driver/webdriver.rs
use async_trait::async_trait;
use fantoccini::{elements::Element, error::CmdError, Client, Locator};
use std::time::Duration;
use tracing::{debug, trace};

use super::{NextControl, TableDriver};
use crate::config::HarvestConfig;
use crate::error::DriverError;

// PrimeFaces datatable markup used by the dashboard.
pub const SCROLL_BODY: &str = ".ui-datatable-scrollable-body";
pub const ROWS_TBODY: &str = ".ui-datatable-scrollable-body table tbody";
pub const HEADER_THEAD: &str = ".ui-datatable-scrollable-header table thead";
pub const NEXT_PAGE: &str = "a.ui-paginator-next";
pub const DISABLED_CLASS: &str = "ui-state-disabled";

/// [`TableDriver`] backed by a WebDriver session.
///
/// Only the element waits are bounded here; every settle pause is taken by the
/// harvester through its [`Clock`](super::Clock).
pub struct WebDriverTable {
    client: Client,
    locator_timeout: Duration,
}

impl WebDriverTable {
    pub fn new(client: Client, cfg: &HarvestConfig) -> Self {
        Self {
            client,
            locator_timeout: cfg.locator_timeout,
        }
    }

    fn enabled_next() -> String {
        format!("{}:not(.{})", NEXT_PAGE, DISABLED_CLASS)
    }

    async fn wait_for(&self, css: &str) -> Result<Element, DriverError> {
        self.client
            .wait()
            .at_most(self.locator_timeout)
            .for_element(Locator::Css(css))
            .await
            .map_err(|e| self.map_err(css, e))
    }

    fn map_err(&self, css: &str, err: CmdError) -> DriverError {
        match err {
            CmdError::WaitTimeout => DriverError::LocatorTimeout {
                locator: css.to_string(),
                waited: self.locator_timeout,
            },
            other => DriverError::Command(format!("{}: {}", css, other)),
        }
    }

    fn element_arg(el: &Element) -> Result<serde_json::Value, DriverError> {
        serde_json::to_value(el).map_err(|e| DriverError::Command(e.to_string()))
    }
}

#[async_trait]
impl TableDriver for WebDriverTable {
    async fn scroll_rows_to_end(&mut self) -> Result<(), DriverError> {
        let body = self.wait_for(SCROLL_BODY).await?;
        self.client
            .execute(
                "arguments[0].scrollTop = arguments[0].scrollHeight",
                vec![Self::element_arg(&body)?],
            )
            .await
            .map_err(|e| self.map_err(SCROLL_BODY, e))?;
        Ok(())
    }

    async fn row_count(&mut self) -> Result<usize, DriverError> {
        // the body is re-rendered on every lazy load, so locate it afresh
        let tbody = self.wait_for(ROWS_TBODY).await?;
        let rows = tbody
            .find_all(Locator::Css("tr"))
            .await
            .map_err(|e| self.map_err(ROWS_TBODY, e))?;
        trace!(rows = rows.len(), "row count");
        Ok(rows.len())
    }

    async fn rows_html(&mut self) -> Result<String, DriverError> {
        let tbody = self.wait_for(ROWS_TBODY).await?;
        tbody
            .html(true)
            .await
            .map_err(|e| self.map_err(ROWS_TBODY, e))
    }

    async fn header_html(&mut self) -> Result<String, DriverError> {
        let thead = self.wait_for(HEADER_THEAD).await?;
        thead
            .html(false)
            .await
            .map_err(|e| self.map_err(HEADER_THEAD, e))
    }

    async fn next_page_control(&mut self) -> Result<NextControl, DriverError> {
        let found = self
            .client
            .find_all(Locator::Css(NEXT_PAGE))
            .await
            .map_err(|e| self.map_err(NEXT_PAGE, e))?;
        let Some(next) = found.into_iter().next() else {
            return Ok(NextControl::Absent);
        };
        let class = next
            .attr("class")
            .await
            .map_err(|e| self.map_err(NEXT_PAGE, e))?
            .unwrap_or_default();
        if class.split_whitespace().any(|c| c == DISABLED_CLASS) {
            debug!("next page control disabled");
            return Ok(NextControl::Disabled);
        }
        Ok(NextControl::Enabled)
    }

    async fn reveal_next_page(&mut self) -> Result<(), DriverError> {
        let selector = Self::enabled_next();
        let next = self.wait_for(&selector).await?;
        self.client
            .execute(
                "arguments[0].scrollIntoView(true);",
                vec![Self::element_arg(&next)?],
            )
            .await
            .map_err(|e| self.map_err(&selector, e))?;
        Ok(())
    }

    async fn activate_next_page(&mut self) -> Result<(), DriverError> {
        let selector = Self::enabled_next();
        let next = self.wait_for(&selector).await?;
        next.click().await.map_err(|e| self.map_err(&selector, e))
    }
}
