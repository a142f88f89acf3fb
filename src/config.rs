// src/config.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf, time::Duration};
use tracing::info;
use url::Url;

use crate::harvest::normalize::{AggregateRowPolicy, ColumnKeywords};

pub const VAHAN_URL: &str =
    "https://vahan.parivahan.gov.in/vahan4dashboard/vahan/view/reportview.xhtml";

/// Timing and budget knobs for one harvest.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Pause after each scroll pulse before the row count is re-read.
    pub scroll_settle_delay: Duration,
    /// Pause after activating "next page" so the new page can render.
    pub page_settle_delay: Duration,
    /// Pause between scrolling the "next" control into view and clicking it.
    pub next_click_settle: Duration,
    /// Consecutive unchanged row counts needed to call a page loaded.
    pub stability_threshold: usize,
    /// Row-count polls allowed per page before giving up.
    pub max_scroll_polls: usize,
    /// Pages allowed per harvest before giving up.
    pub max_pages: usize,
    /// Upper bound for any single element wait in the driver.
    pub locator_timeout: Duration,
    pub column_keywords: ColumnKeywords,
    pub aggregate_policy: AggregateRowPolicy,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            scroll_settle_delay: Duration::from_millis(500),
            page_settle_delay: Duration::from_millis(700),
            next_click_settle: Duration::from_millis(200),
            stability_threshold: 2,
            max_scroll_polls: 200,
            max_pages: 500,
            locator_timeout: Duration::from_secs(20),
            column_keywords: ColumnKeywords::default(),
            aggregate_policy: AggregateRowPolicy::default(),
        }
    }
}

impl HarvestConfig {
    /// Defaults with the two settle delays and the stability threshold replaced.
    pub fn with_delays(
        page_settle_delay: Duration,
        scroll_settle_delay: Duration,
        stability_threshold: usize,
    ) -> Self {
        Self {
            page_settle_delay,
            scroll_settle_delay,
            stability_threshold,
            ..Self::default()
        }
    }

    /// A threshold of zero would declare stability before any observation.
    pub fn effective_threshold(&self) -> usize {
        self.stability_threshold.max(1)
    }
}

/// Millisecond overrides for [`HarvestConfig`] as they appear in YAML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HarvestSection {
    pub scroll_settle_ms: Option<u64>,
    pub page_settle_ms: Option<u64>,
    pub next_click_settle_ms: Option<u64>,
    pub stability_threshold: Option<usize>,
    pub max_scroll_polls: Option<usize>,
    pub max_pages: Option<usize>,
    pub locator_timeout_ms: Option<u64>,
    pub entity_keywords: Option<Vec<String>>,
    pub count_keywords: Option<Vec<String>>,
    pub aggregate_labels: Option<Vec<String>>,
}

impl HarvestSection {
    pub fn to_harvest_config(&self) -> HarvestConfig {
        let mut cfg = HarvestConfig::default();
        if let Some(ms) = self.scroll_settle_ms {
            cfg.scroll_settle_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.page_settle_ms {
            cfg.page_settle_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.next_click_settle_ms {
            cfg.next_click_settle = Duration::from_millis(ms);
        }
        if let Some(n) = self.stability_threshold {
            cfg.stability_threshold = n;
        }
        if let Some(n) = self.max_scroll_polls {
            cfg.max_scroll_polls = n;
        }
        if let Some(n) = self.max_pages {
            cfg.max_pages = n;
        }
        if let Some(ms) = self.locator_timeout_ms {
            cfg.locator_timeout = Duration::from_millis(ms);
        }
        if let Some(kw) = &self.entity_keywords {
            cfg.column_keywords.entity = kw.clone();
        }
        if let Some(kw) = &self.count_keywords {
            cfg.column_keywords.count = kw.clone();
        }
        if let Some(labels) = &self.aggregate_labels {
            cfg.aggregate_policy = AggregateRowPolicy::ExactLabel(labels.clone());
        }
        cfg
    }
}

/// Which table a run harvests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Maker totals per year and category.
    #[default]
    Yearly,
    /// Raw month-wise table per year, all categories.
    Monthly,
}

/// Settings for a full scraping run, loaded from YAML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub mode: RunMode,
    pub dashboard_url: String,
    pub webdriver_url: String,
    pub y_axis: String,
    /// Only selected in monthly mode.
    pub x_axis: String,
    pub years: Vec<String>,
    /// Ignored in monthly mode.
    pub categories: Vec<String>,
    pub output_csv: PathBuf,
    pub output_parquet: Option<PathBuf>,
    pub output_monthly_csv: PathBuf,
    /// When set, each assembled table and each failure is dumped here.
    pub debug_dir: Option<PathBuf>,
    pub harvest: HarvestSection,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Yearly,
            dashboard_url: VAHAN_URL.to_string(),
            webdriver_url: "http://localhost:4444".to_string(),
            y_axis: "Maker".to_string(),
            x_axis: "Month Wise".to_string(),
            years: vec!["2024".into(), "2023".into(), "2022".into()],
            categories: vec![
                "FOUR WHEELER".into(),
                "TWO WHEELER".into(),
                "THREE WHEELER".into(),
            ],
            output_csv: PathBuf::from("vahan_manufacturer_data_clean.csv"),
            output_parquet: None,
            output_monthly_csv: PathBuf::from("vahan_monthly_data.csv"),
            debug_dir: None,
            harvest: HarvestSection::default(),
        }
    }
}

impl ScraperConfig {
    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config {:?}", path))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let cfg: ScraperConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        Url::parse(&self.dashboard_url)
            .with_context(|| format!("invalid dashboard_url {}", self.dashboard_url))?;
        Url::parse(&self.webdriver_url)
            .with_context(|| format!("invalid webdriver_url {}", self.webdriver_url))?;
        if self.years.is_empty() {
            anyhow::bail!("config must list at least one year");
        }
        if self.mode == RunMode::Yearly && self.categories.is_empty() {
            anyhow::bail!("yearly mode needs at least one category");
        }
        Ok(())
    }

    pub fn harvest_config(&self) -> HarvestConfig {
        self.harvest.to_harvest_config()
    }
}
