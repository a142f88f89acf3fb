// src/harvest/observer.rs
use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use tracing::warn;

use super::merge::{Fragment, LogicalTable};
use super::session::FilterConfig;
use crate::error::HarvestError;

/// Diagnostic hook called at capture and failure points. Every method is a
/// no-op by default.
pub trait HarvestObserver: Send + Sync {
    fn on_fragment(&self, _filter: &FilterConfig, _fragment: &Fragment) {}

    fn on_table(&self, _filter: &FilterConfig, _table: &LogicalTable) {}

    fn on_failure(&self, _filter: &FilterConfig, _error: &HarvestError) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl HarvestObserver for NoopObserver {}

/// Dumps each assembled table as JSON, and a note for each failure, under `dir`.
#[derive(Debug, Clone)]
pub struct DebugDumpObserver {
    dir: PathBuf,
}

impl DebugDumpObserver {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating debug directory {:?}", &dir))?;
        Ok(Self { dir })
    }

    fn stem(filter: &FilterConfig) -> String {
        format!("{}_{}", filter.category, filter.year).replace(['/', '\\', ' '], "_")
    }

    fn write_table(&self, filter: &FilterConfig, table: &LogicalTable) -> Result<()> {
        let path = self.dir.join(format!("{}.json", Self::stem(filter)));
        let json = serde_json::to_string_pretty(table).context("serializing table")?;
        fs::write(&path, json).with_context(|| format!("writing {:?}", &path))
    }

    fn write_failure(&self, filter: &FilterConfig, error: &HarvestError) -> Result<()> {
        let path = self.dir.join(format!("{}.failure.txt", Self::stem(filter)));
        fs::write(&path, format!("{}: {}\n", error.kind(), error))
            .with_context(|| format!("writing {:?}", &path))
    }
}

impl HarvestObserver for DebugDumpObserver {
    fn on_table(&self, filter: &FilterConfig, table: &LogicalTable) {
        if let Err(e) = self.write_table(filter, table) {
            warn!("debug dump failed: {:#}", e);
        }
    }

    fn on_failure(&self, filter: &FilterConfig, error: &HarvestError) {
        if let Err(e) = self.write_failure(filter, error) {
            warn!("debug dump failed: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_dump_writes_table_and_failure() {
        let tmp = tempdir().unwrap();
        let obs = DebugDumpObserver::new(tmp.path().join("debug")).unwrap();
        let filter = FilterConfig::new("Maker", "2024", "FOUR WHEELER");
        let table = LogicalTable {
            header: vec!["Maker".into(), "TOTAL".into()],
            rows: vec![vec!["TATA".into(), "10".into()]],
            page_rows: vec![1],
        };

        obs.on_table(&filter, &table);
        obs.on_failure(&filter, &HarvestError::EmptyTable);

        let json =
            fs::read_to_string(tmp.path().join("debug/FOUR_WHEELER_2024.json")).unwrap();
        let back: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back["rows"][0][0], "TATA");

        let note =
            fs::read_to_string(tmp.path().join("debug/FOUR_WHEELER_2024.failure.txt")).unwrap();
        assert!(note.starts_with("empty_table"));
    }
}
