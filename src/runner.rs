//! Orchestration: scrape each configured site, checkpoint, then process and export.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures::stream::{self, StreamExt};

use crate::checkpoint;
use crate::cli::{ExportArgs, OutputArgs, OutputFormat, RunArgs};
use crate::config::{SiteConfig, SitesFile};
use crate::driver::{DriverOptions, HttpDriver, PageDriver};
use crate::export;
use crate::fetch::{FetchSettings, PageFetcher};
use crate::model::Product;
use crate::processor::{self, Row};
use crate::sites::{self, Discovery, SiteFetcher, SiteScraper, KNOWN_SITES};
use crate::xlsx;

/// Outcome of a whole run
#[derive(Debug, Default)]
pub struct RunReport {
    pub successful_sites: Vec<String>,
    pub failed_sites: Vec<(String, String)>,
    pub products: usize,
    pub rows: usize,
    pub files: Vec<PathBuf>,
}

/// Discover and scrape every product of one site, pausing `delay` between
/// products. Stops early when the fetcher turns unhealthy or the session
/// cannot be restarted; whatever was scraped so far is kept.
pub async fn scrape_site_products<S: SiteScraper + ?Sized>(
    scraper: &S,
    fetcher: &mut SiteFetcher,
    discovery: &Discovery,
    delay: Duration,
) -> crate::error::Result<Vec<Product>> {
    let urls = scraper.product_urls(fetcher, discovery).await?;
    log::info!("[{}] Scraping {} product pages", scraper.name(), urls.len());

    let mut products = Vec::new();
    for (idx, url) in urls.iter().enumerate() {
        if !fetcher.health().check() {
            log::error!(
                "[{}] Site unhealthy ({}), stopping early",
                scraper.name(),
                fetcher.health().summary()
            );
            break;
        }

        log::info!("[{}] [{}/{}] {}", scraper.name(), idx + 1, urls.len(), url);
        match scraper.scrape_product(fetcher, url).await {
            Ok(Some(product)) => products.push(product),
            Ok(None) => {}
            Err(e) => {
                log::error!("[{}] Unrecoverable driver error: {}", scraper.name(), e);
                break;
            }
        }

        if idx + 1 < urls.len() && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    log::info!("[{}] Scraped {} wheel products", scraper.name(), products.len());
    Ok(products)
}

fn fetcher_for(site: &str, args: &RunArgs) -> SiteFetcher {
    let driver: Box<dyn PageDriver> = Box::new(HttpDriver::new(DriverOptions {
        timeout: Duration::from_secs(args.timeout),
        user_agent: args.user_agent.clone(),
        proxy: args.proxy.clone(),
    }));
    let settings = FetchSettings {
        max_retries: args.retries.max(1),
        ..FetchSettings::default()
    };
    PageFetcher::new(site, driver, settings)
}

async fn scrape_site(config: SiteConfig, args: &RunArgs) -> (String, Result<Vec<Product>>) {
    let name = config.name.clone();
    let result = async {
        let scraper = sites::build(&config)?;
        let discovery = Discovery {
            max_pages: args.max_pages,
            limit: args.limit,
            ..Discovery::default()
        };
        let mut fetcher = fetcher_for(&name, args);

        let scraped =
            scrape_site_products(&*scraper, &mut fetcher, &discovery, Duration::from_millis(args.delay))
                .await;
        fetcher.close().await;
        let products = scraped?;

        if !products.is_empty() {
            checkpoint::save_checkpoint(&products, &args.checkpoint_dir, &name)
                .with_context(|| format!("Failed to write checkpoint for {}", name))?;
        }
        Ok::<_, anyhow::Error>(products)
    }
    .await;
    (name, result)
}

/// Split per-site outcomes into the report and the pooled products.
/// A site that produced nothing counts as failed.
fn tally(outcomes: Vec<(String, Result<Vec<Product>>)>) -> (RunReport, Vec<Product>) {
    let mut report = RunReport::default();
    let mut products = Vec::new();
    for (name, outcome) in outcomes {
        match outcome {
            Ok(site_products) if site_products.is_empty() => {
                log::warn!("{}: no products scraped", name);
                report.failed_sites.push((name, "no products scraped".to_string()));
            }
            Ok(mut site_products) => {
                log::info!("{}: {} products", name, site_products.len());
                products.append(&mut site_products);
                report.successful_sites.push(name);
            }
            Err(e) => {
                log::error!("{} failed: {:#}", name, e);
                report.failed_sites.push((name, format!("{:#}", e)));
            }
        }
    }
    (report, products)
}

/// Scrape every selected site, then process and export everything collected
pub async fn run(args: &RunArgs) -> Result<RunReport> {
    let file = SitesFile::load(&args.config)
        .with_context(|| format!("Failed to load sites from {}", args.config.display()))?;
    let selected = file.selected(&args.site);
    if selected.is_empty() {
        bail!("No enabled sites selected in {}", args.config.display());
    }
    log::info!("Scraping {} site(s)", selected.len());

    let outcomes: Vec<(String, Result<Vec<Product>>)> = stream::iter(selected)
        .map(|site| scrape_site(site, args))
        .buffer_unordered(args.concurrency.max(1))
        .collect()
        .await;

    let (mut report, products) = tally(outcomes);
    log::info!(
        "Sites: {} succeeded, {} failed",
        report.successful_sites.len(),
        report.failed_sites.len()
    );
    report.products = products.len();
    if products.is_empty() {
        log::warn!("No products scraped, nothing to export");
        return Ok(report);
    }

    let rows = prepare_rows(&products);
    report.rows = rows.len();
    report.files = write_outputs(&rows, &args.output)?;
    Ok(report)
}

/// Rebuild the exports from checkpoint files
pub fn export(args: &ExportArgs) -> Result<Vec<PathBuf>> {
    let products = checkpoint::load_checkpoints(&args.checkpoints).context("Failed to load checkpoints")?;
    if products.is_empty() {
        bail!("Checkpoints contain no products");
    }
    let rows = prepare_rows(&products);
    write_outputs(&rows, &args.output)
}

/// process, dedupe, clean and report on scraped products
pub fn prepare_rows(products: &[Product]) -> Vec<Row> {
    let rows = processor::clean(processor::dedupe(processor::process(products)));
    processor::validate(&rows);
    rows
}

/// Main workbook, summary workbook, then the optional per-site split and extra formats
pub fn write_outputs(rows: &[Row], output: &OutputArgs) -> Result<Vec<PathBuf>> {
    let dir = &output.output_dir;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let formatting = !output.no_formatting;
    let mut files = Vec::new();

    let main = dir.join(format!("wheels_data_{}.xlsx", stamp));
    xlsx::export_xlsx(rows, &main, formatting)
        .with_context(|| format!("Failed to write {}", main.display()))?;
    files.push(main);

    let stats = processor::summary(rows);
    log::info!(
        "Summary: {} rows, {} unique parts, average price {:.2} ({:.2} - {:.2})",
        stats.total_rows,
        stats.unique_parts,
        stats.average_price,
        stats.min_price,
        stats.max_price
    );
    let summary = dir.join(format!("summary_{}.xlsx", stamp));
    xlsx::export_summary(&stats, &summary)
        .with_context(|| format!("Failed to write {}", summary.display()))?;
    files.push(summary);

    if output.split {
        files.extend(xlsx::split_by_site(rows, dir, formatting).context("Failed to split by site")?);
    }

    for format in &output.format {
        let path = match format {
            OutputFormat::Csv => {
                let path = dir.join(format!("wheels_data_{}.csv", stamp));
                export::export_csv(rows, &path)?;
                path
            }
            OutputFormat::Json => {
                let path = dir.join(format!("wheels_data_{}.json", stamp));
                export::export_json(rows, &path)?;
                path
            }
        };
        files.push(path);
    }

    for file in &files {
        log::info!("Output saved to: {}", file.display());
    }
    Ok(files)
}

/// One line per known site, then per configured site when a file is given
pub fn list_sites(config: Option<&Path>) -> Result<Vec<String>> {
    let mut lines: Vec<String> = KNOWN_SITES
        .iter()
        .map(|s| format!("{:<22} {:<11} {}", s.name, format!("{:?}", s.template), s.base_url))
        .collect();

    if let Some(path) = config {
        let file = SitesFile::load(path).with_context(|| format!("Failed to load sites from {}", path.display()))?;
        for site in &file.sites {
            let template = site
                .template
                .or_else(|| sites::known_site(&site.name).map(|k| k.template))
                .unwrap_or_default();
            lines.push(format!(
                "{:<22} {:<11} {}{}",
                site.name,
                format!("{:?}", template),
                site.base_url,
                if site.enabled { "" } else { " (disabled)" }
            ));
        }
    }
    Ok(lines)
}
