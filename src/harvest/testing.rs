// src/harvest/testing.rs
//! Scripted stand-ins for the browser, shared by the harvest tests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use crate::driver::{Clock, NextControl, TableDriver};
use crate::error::DriverError;

/// One page of a scripted table.
#[derive(Debug, Clone)]
pub struct ScriptedPage {
    /// Row counts returned by successive `row_count` calls; the last repeats.
    pub counts: Vec<usize>,
    /// Rows rendered once the page has settled.
    pub rows: Vec<Vec<String>>,
}

impl ScriptedPage {
    /// A page that loads `rows` in steps of `batch`.
    pub fn loading(rows: &[&[&str]], batch: usize) -> Self {
        let total = rows.len();
        let mut counts: Vec<usize> = (1..=total.div_ceil(batch.max(1)))
            .map(|i| (i * batch).min(total))
            .collect();
        if counts.is_empty() {
            counts.push(0);
        }
        Self {
            counts,
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }
}

#[derive(Debug)]
pub struct ScriptedTable {
    pub header: Vec<String>,
    pub pages: Vec<ScriptedPage>,
    /// Render a paginator at all.
    pub paginated: bool,
    pub header_timeout: bool,
    pub rows_timeout: bool,

    pub current: usize,
    pub cursor: usize,
    pub header_reads: usize,
    pub header_reads_by_page: Vec<usize>,
    pub scrolls: usize,
    pub reveals: usize,
    pub clicks: usize,
}

impl ScriptedTable {
    pub fn new(header: &[&str], pages: Vec<ScriptedPage>) -> Self {
        Self {
            header: header.iter().map(|h| h.to_string()).collect(),
            paginated: pages.len() > 1,
            pages,
            header_timeout: false,
            rows_timeout: false,
            current: 0,
            cursor: 0,
            header_reads: 0,
            header_reads_by_page: Vec::new(),
            scrolls: 0,
            reveals: 0,
            clicks: 0,
        }
    }

    fn page(&self) -> &ScriptedPage {
        &self.pages[self.current]
    }

    fn timeout(locator: &str) -> DriverError {
        DriverError::LocatorTimeout {
            locator: locator.to_string(),
            waited: Duration::from_secs(20),
        }
    }
}

#[async_trait]
impl TableDriver for ScriptedTable {
    async fn scroll_rows_to_end(&mut self) -> Result<(), DriverError> {
        self.scrolls += 1;
        Ok(())
    }

    async fn row_count(&mut self) -> Result<usize, DriverError> {
        if self.rows_timeout {
            return Err(Self::timeout("tbody"));
        }
        let counts = &self.page().counts;
        let count = counts[self.cursor.min(counts.len() - 1)];
        self.cursor += 1;
        Ok(count)
    }

    async fn rows_html(&mut self) -> Result<String, DriverError> {
        Ok(self
            .page()
            .rows
            .iter()
            .map(|row| {
                let cells: String = row.iter().map(|c| format!("<td>{}</td>", c)).collect();
                format!("<tr>{}</tr>", cells)
            })
            .collect())
    }

    async fn header_html(&mut self) -> Result<String, DriverError> {
        if self.header_timeout {
            return Err(Self::timeout("thead"));
        }
        self.header_reads += 1;
        self.header_reads_by_page.push(self.current + 1);
        let cells: String = self
            .header
            .iter()
            .map(|h| format!("<th>{}</th>", h))
            .collect();
        Ok(format!("<thead><tr>{}</tr></thead>", cells))
    }

    async fn next_page_control(&mut self) -> Result<NextControl, DriverError> {
        if !self.paginated {
            return Ok(NextControl::Absent);
        }
        if self.current + 1 < self.pages.len() {
            Ok(NextControl::Enabled)
        } else {
            Ok(NextControl::Disabled)
        }
    }

    async fn reveal_next_page(&mut self) -> Result<(), DriverError> {
        self.reveals += 1;
        Ok(())
    }

    async fn activate_next_page(&mut self) -> Result<(), DriverError> {
        assert_eq!(self.reveals, self.clicks + 1, "click without reveal");
        self.clicks += 1;
        self.current += 1;
        self.cursor = 0;
        Ok(())
    }
}

/// Records requested sleeps instead of waiting.
#[derive(Debug, Default)]
pub struct RecordingClock {
    pub sleeps: Mutex<Vec<Duration>>,
}

impl RecordingClock {
    pub fn total(&self) -> Duration {
        self.sleeps.lock().unwrap().iter().sum()
    }

    pub fn count(&self) -> usize {
        self.sleeps.lock().unwrap().len()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
