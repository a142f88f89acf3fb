use anyhow::{Context, Result};
use fantoccini::{Client, ClientBuilder};
use std::{env, path::PathBuf};
use tokio::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use vahanscraper::{
    config::{RunMode, ScraperConfig},
    driver::WebDriverTable,
    harvest::{DebugDumpObserver, FilterConfig, Harvester},
    navigate::FilterNavigator,
    sink::{self, RegistrationRow, YearTable},
};

/// The dashboard's category filter is left untouched in monthly mode.
const ALL_CATEGORIES: &str = "ALL";

enum Collected {
    Yearly(Vec<RegistrationRow>),
    Monthly(Vec<YearTable>),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vahanscraper=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) load config ──────────────────────────────────────────────
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("vahanscraper.yaml"));
    let cfg = ScraperConfig::load(&config_path)?;

    // ─── 3) connect to the webdriver ─────────────────────────────────
    let client = ClientBuilder::native()
        .connect(&cfg.webdriver_url)
        .await
        .with_context(|| format!("connecting to webdriver at {}", cfg.webdriver_url))?;

    // ─── 4) harvest every configuration; always close the browser ───
    let start = Instant::now();
    let outcome = match cfg.mode {
        RunMode::Yearly => run_yearly(&client, &cfg).await.map(Collected::Yearly),
        RunMode::Monthly => run_monthly(&client, &cfg).await.map(Collected::Monthly),
    };
    if let Err(e) = client.close().await {
        warn!("closing browser: {}", e);
    }
    info!("browser closed");

    // ─── 5) write whatever was collected ─────────────────────────────
    match outcome? {
        Collected::Yearly(rows) => {
            if rows.is_empty() {
                warn!("no data was scraped; nothing written");
                return Ok(());
            }
            sink::write_csv(&cfg.output_csv, &rows)?;
            info!(rows = rows.len(), path = %cfg.output_csv.display(), "wrote csv");
            if let Some(path) = &cfg.output_parquet {
                sink::write_parquet(path, &rows)?;
                info!(rows = rows.len(), path = %path.display(), "wrote parquet");
            }
        }
        Collected::Monthly(tables) => {
            if tables.is_empty() {
                warn!("no monthly table was scraped; nothing written");
                return Ok(());
            }
            let path = &cfg.output_monthly_csv;
            sink::write_monthly_csv(path, &tables)?;
            info!(years = tables.len(), path = %path.display(), "wrote monthly csv");
        }
    }

    info!(elapsed = ?start.elapsed(), "all done");
    Ok(())
}

/// Open the dashboard, pick the y-axis and build a harvester on the live table.
async fn prepare(
    client: &Client,
    cfg: &ScraperConfig,
) -> Result<(FilterNavigator, Harvester<WebDriverTable>)> {
    let harvest_cfg = cfg.harvest_config();
    let nav = FilterNavigator::new(client.clone(), harvest_cfg.locator_timeout);

    nav.open(&cfg.dashboard_url).await?;
    nav.select_y_axis(&cfg.y_axis)
        .await
        .with_context(|| format!("selecting y-axis {}", cfg.y_axis))?;

    let table = WebDriverTable::new(client.clone(), &harvest_cfg);
    let mut harvester = Harvester::new(table, harvest_cfg);
    if let Some(dir) = &cfg.debug_dir {
        harvester = harvester.with_observer(DebugDumpObserver::new(dir)?);
    }
    Ok((nav, harvester))
}

async fn run_yearly(client: &Client, cfg: &ScraperConfig) -> Result<Vec<RegistrationRow>> {
    let (nav, mut harvester) = prepare(client, cfg).await?;

    let mut rows = Vec::new();
    let (mut ok, mut failed) = (0usize, 0usize);

    for year in &cfg.years {
        info!(year = %year, "processing year");
        if let Err(e) = nav.select_year(year).await {
            error!(year = %year, "year selection failed: {:#}", e);
            failed += cfg.categories.len();
            continue;
        }

        for category in &cfg.categories {
            if let Err(e) = nav.select_category(category).await {
                error!(year = %year, category = %category, "category selection failed: {:#}", e);
                failed += 1;
                continue;
            }

            let result = harvester
                .harvest(FilterConfig::new(&cfg.y_axis, year, category))
                .await;
            match &result.outcome {
                Ok(harvest) => match sink::tag_records(&result.filter, harvest) {
                    Ok(tagged) => {
                        info!(filter = %result.filter, rows = tagged.len(), "final row count");
                        rows.extend(tagged);
                        ok += 1;
                    }
                    Err(e) => {
                        error!(filter = %result.filter, "tagging failed: {:#}", e);
                        failed += 1;
                    }
                },
                // already logged by the harvester
                Err(_) => failed += 1,
            }
        }
    }

    info!(ok, failed, rows = rows.len(), "harvest run finished");
    Ok(rows)
}

async fn run_monthly(client: &Client, cfg: &ScraperConfig) -> Result<Vec<YearTable>> {
    let (nav, mut harvester) = prepare(client, cfg).await?;
    nav.select_x_axis(&cfg.x_axis)
        .await
        .with_context(|| format!("selecting x-axis {}", cfg.x_axis))?;

    let mut tables = Vec::new();
    let mut failed = 0usize;

    for year in &cfg.years {
        info!(year = %year, "processing year");
        if let Err(e) = nav.select_year(year).await {
            error!(year = %year, "year selection failed: {:#}", e);
            failed += 1;
            continue;
        }

        let result = harvester
            .harvest_table(FilterConfig::new(&cfg.y_axis, year, ALL_CATEGORIES))
            .await;
        match result.outcome {
            Ok(table) => {
                info!(filter = %result.filter, rows = table.row_count(), "final row count");
                tables.push(YearTable {
                    year: year.clone(),
                    table,
                });
            }
            // already logged by the harvester
            Err(_) => failed += 1,
        }
    }

    info!(ok = tables.len(), failed, "monthly run finished");
    Ok(tables)
}
