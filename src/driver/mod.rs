// src/driver/mod.rs
//! The seam between the harvester and whatever is driving the browser.
//!
//! The harvester only ever talks to a [`TableDriver`] and a [`Clock`], so the
//! whole scroll/paginate state machine can be replayed in tests from a script of
//! row counts without a browser or wall-clock time.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::DriverError;

pub mod webdriver;

pub use webdriver::WebDriverTable;

/// State of the table's "next page" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextControl {
    /// No paginator rendered at all (single-page table).
    Absent,
    /// Rendered but marked disabled (last page).
    Disabled,
    Enabled,
}

/// Element-level primitives the harvester needs from the automation driver.
///
/// Every method is expected to apply its own bounded wait and report
/// [`DriverError::LocatorTimeout`] when the element never shows up.
#[async_trait]
pub trait TableDriver: Send {
    /// Push the virtualized table's scroll position to its maximum.
    async fn scroll_rows_to_end(&mut self) -> Result<(), DriverError>;

    /// Number of rows currently present in the DOM.
    async fn row_count(&mut self) -> Result<usize, DriverError>;

    /// Inner markup of the rendered row container.
    async fn rows_html(&mut self) -> Result<String, DriverError>;

    /// Outer markup of the table header.
    async fn header_html(&mut self) -> Result<String, DriverError>;

    async fn next_page_control(&mut self) -> Result<NextControl, DriverError>;

    /// Bring the enabled "next page" control into view. Only called after
    /// `next_page_control` said `Enabled`.
    async fn reveal_next_page(&mut self) -> Result<(), DriverError>;

    /// Click "next page". Always preceded by `reveal_next_page` and a settle.
    async fn activate_next_page(&mut self) -> Result<(), DriverError>;
}

/// Source of settle delays.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
