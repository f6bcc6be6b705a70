//! Site scrapers.
//!
//! Dealer sites run on a handful of e-commerce templates, so a scraper is a
//! template plus a base URL. Templates supply the pure parts (listing URLs,
//! link extraction, product parsing); discovery and product scraping share the
//! default async methods on [`SiteScraper`].

mod generic;
mod registry;
mod revolution;
mod simplepart;

use std::collections::HashSet;

use async_trait::async_trait;
use scraper::Html;

use crate::config::{SiteConfig, Template};
use crate::driver::PageDriver;
use crate::error::{Result, ScraperError};
use crate::fetch::PageFetcher;
use crate::model::{Fitment, Product};
use crate::parse::{self, sel};

pub use generic::GenericSite;
pub use registry::{known_site, KnownSite, KNOWN_SITES};
pub use revolution::RevolutionParts;
pub use simplepart::SimplePart;

/// Fetcher over whichever driver the run was configured with
pub type SiteFetcher = PageFetcher<Box<dyn PageDriver>>;

/// Pagination limits for product discovery
#[derive(Debug, Clone)]
pub struct Discovery {
    pub max_pages: u32,
    /// Stop paging after this many pages in a row without new URLs
    pub max_consecutive_empty: u32,
    /// Fewer search results than this also browses the category pages
    pub min_search_results: usize,
    /// Stop once this many product URLs are known
    pub limit: Option<usize>,
}

impl Default for Discovery {
    fn default() -> Self {
        Self {
            max_pages: 2000,
            max_consecutive_empty: 4,
            min_search_results: 10,
            limit: None,
        }
    }
}

#[async_trait]
pub trait SiteScraper: Send + Sync {
    fn name(&self) -> &str;

    fn base_url(&self) -> &str;

    /// Candidate URLs for search results page `page` (1-based), tried in order
    fn search_urls(&self, page: u32) -> Vec<String>;

    /// Category listings browsed as a fallback, or instead of search
    fn category_urls(&self) -> Vec<String>;

    /// Whether discovery starts from search results
    fn search_first(&self) -> bool {
        true
    }

    /// Absolute, normalized product links found on a listing page
    fn product_links(&self, html: &str) -> Vec<String>;

    fn is_product_url(&self, url: &str) -> bool;

    /// Whether a loaded product page has rendered its main content
    fn page_ready(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        parse::first_text(&document, &["h1", "title"]).is_some_and(|t| t.len() >= 3)
    }

    /// Parse a product page. `None` when it has no title or is not a wheel.
    fn parse_product(&self, url: &str, html: &str) -> Option<Product>;

    /// Walk search results (and categories when needed) collecting product URLs
    async fn product_urls(&self, fetcher: &mut SiteFetcher, limits: &Discovery) -> Result<Vec<String>> {
        let mut found = Collected::new(limits.limit);

        if self.search_first() {
            log::info!("[{}] Searching for wheel products...", self.name());
            search_pages(self, fetcher, limits, &mut found).await?;
            log::info!("[{}] Found {} products via search", self.name(), found.urls.len());
        }

        if !self.search_first() || found.urls.len() < limits.min_search_results {
            if self.search_first() {
                log::warn!("[{}] Search returned few results, trying category pages", self.name());
            }
            for category in self.category_urls() {
                if found.full() || !fetcher.health().check() {
                    break;
                }
                log::info!("[{}] Fetching category page: {}", self.name(), category);
                if let Some(html) = fetcher.get_page(&category).await? {
                    let added = found.extend(self, self.product_links(&html));
                    log::info!("[{}] Category page added {} products", self.name(), added);
                }
            }
        }

        log::info!("[{}] Discovered {} unique product URLs", self.name(), found.urls.len());
        Ok(found.urls)
    }

    /// Load and parse one product page; `Ok(None)` for failed loads and non-wheels
    async fn scrape_product(&self, fetcher: &mut SiteFetcher, url: &str) -> Result<Option<Product>> {
        let html = match fetcher.get_page_where(url, |h| self.page_ready(h)).await? {
            Some(html) => html,
            None => {
                log::warn!("[{}] Could not load product page {}", self.name(), url);
                return Ok(None);
            }
        };
        let product = self.parse_product(url, &html);
        match &product {
            Some(p) => log::info!(
                "[{}] Scraped {} ({}) with {} fitments",
                self.name(),
                p.title,
                p.sku,
                p.fitments.len()
            ),
            None => log::info!("[{}] Skipped non-wheel product: {}", self.name(), url),
        }
        Ok(product)
    }
}

/// Ordered, de-duplicated product URLs
struct Collected {
    urls: Vec<String>,
    seen: HashSet<String>,
    limit: Option<usize>,
}

impl Collected {
    fn new(limit: Option<usize>) -> Self {
        Self {
            urls: Vec::new(),
            seen: HashSet::new(),
            limit,
        }
    }

    fn full(&self) -> bool {
        self.limit.is_some_and(|l| self.urls.len() >= l)
    }

    /// Add valid product links, returning how many were new
    fn extend<S: SiteScraper + ?Sized>(&mut self, site: &S, links: Vec<String>) -> usize {
        let mut added = 0;
        for link in links {
            if self.full() {
                break;
            }
            if site.is_product_url(&link) && self.seen.insert(link.clone()) {
                self.urls.push(link);
                added += 1;
            }
        }
        added
    }
}

async fn search_pages<S: SiteScraper + ?Sized>(
    site: &S,
    fetcher: &mut SiteFetcher,
    limits: &Discovery,
    found: &mut Collected,
) -> Result<()> {
    let mut empty_pages = 0;

    for page in 1..=limits.max_pages {
        if found.full() {
            log::info!("[{}] Reached the product limit", site.name());
            break;
        }
        if !fetcher.health().check() {
            log::error!("[{}] Site unhealthy, stopping discovery", site.name());
            break;
        }

        let mut added = None;
        for url in site.search_urls(page) {
            log::debug!("[{}] Trying search page {}: {}", site.name(), page, url);
            let Some(html) = fetcher.get_page(&url).await? else {
                continue;
            };
            let links = site.product_links(&html);
            if links.is_empty() {
                continue;
            }
            added = Some(found.extend(site, links));
            break;
        }

        match added {
            Some(n) if n > 0 => {
                log::info!(
                    "[{}] Page {}: {} new products ({} total)",
                    site.name(),
                    page,
                    n,
                    found.urls.len()
                );
                empty_pages = 0;
            }
            _ => {
                empty_pages += 1;
                log::debug!("[{}] Page {} yielded nothing new ({} in a row)", site.name(), page, empty_pages);
                if empty_pages >= limits.max_consecutive_empty {
                    log::info!(
                        "[{}] Stopping pagination after {} empty pages",
                        site.name(),
                        empty_pages
                    );
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Build the scraper for a configured site. Registry entries fill in anything
/// the configuration leaves out.
pub fn build(config: &SiteConfig) -> Result<Box<dyn SiteScraper>> {
    let known = known_site(&config.name);
    let base_url = if config.base_url.is_empty() {
        known
            .map(|k| k.base_url.to_string())
            .ok_or_else(|| ScraperError::Config(format!("site '{}' has no base_url", config.name)))?
    } else {
        config.base_url.trim_end_matches('/').to_string()
    };
    let template = config
        .template
        .or(known.map(|k| k.template))
        .unwrap_or_default();
    let make = config
        .make
        .clone()
        .or_else(|| known.and_then(|k| k.make).map(str::to_string));

    let category = config
        .category_url
        .clone()
        .or_else(|| known.and_then(|k| k.category_path).map(str::to_string));

    let scraper: Box<dyn SiteScraper> = match template {
        Template::Revolution => {
            let mut site = RevolutionParts::new(&config.name, &base_url)?.with_search_term(&config.search_term);
            if let Some(category) = &category {
                site = site.with_category(category);
            }
            Box::new(site)
        }
        Template::SimplePart => {
            let make = make.ok_or_else(|| {
                ScraperError::Config(format!("SimplePart site '{}' needs a make", config.name))
            })?;
            Box::new(SimplePart::new(&config.name, &base_url, &make)?.with_search_term(&config.search_term))
        }
        Template::Generic => {
            let mut config = config.clone();
            config.base_url = base_url;
            config.category_url = category;
            Box::new(GenericSite::new(config)?)
        }
    };
    log::debug!("Built {:?} scraper for {}", template, scraper.name());
    Ok(scraper)
}

/// Expand a product-data fitment array into one fitment per trim and engine.
/// Empty trim or engine lists count as a single blank entry.
pub(crate) fn fitments_from_json(value: &serde_json::Value) -> Vec<Fitment> {
    let Some(entries) = value.get("fitment").and_then(|f| f.as_array()) else {
        return Vec::new();
    };

    let field = |entry: &serde_json::Value, key: &str| -> String {
        match entry.get(key) {
            Some(serde_json::Value::String(s)) => s.trim().to_string(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    };
    let list = |entry: &serde_json::Value, key: &str| -> Vec<String> {
        let items: Vec<String> = entry
            .get(key)
            .and_then(|v| v.as_array())
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.trim().to_string())
                    .collect()
            })
            .unwrap_or_default();
        if items.is_empty() {
            vec![String::new()]
        } else {
            items
        }
    };

    let mut fitments = Vec::new();
    for entry in entries {
        let (year, make, model) = (field(entry, "year"), field(entry, "make"), field(entry, "model"));
        for trim in list(entry, "trims") {
            for engine in list(entry, "engines") {
                fitments.push(Fitment {
                    year: year.clone(),
                    make: make.clone(),
                    model: model.clone(),
                    trim: trim.clone(),
                    engine,
                });
            }
        }
    }
    fitments
}

/// Fitments from the first embedded JSON blob that carries a `fitment` key
pub(crate) fn fitments_from_scripts(document: &Html, css: &str) -> Vec<Fitment> {
    let Ok(selector) = scraper::Selector::parse(css) else {
        return Vec::new();
    };
    for script in document.select(&selector) {
        let text = script.text().collect::<String>();
        if !text.contains("fitment") {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(text.trim()) {
            Ok(value) => {
                let fitments = fitments_from_json(&value);
                if !fitments.is_empty() {
                    return fitments;
                }
            }
            Err(e) => log::debug!("Unparseable product data script: {}", e),
        }
    }
    Vec::new()
}

/// Year, make, model, trim, engine columns of a fitment table; header row skipped
pub(crate) fn fitments_from_table(document: &Html, table_css: &str) -> Vec<Fitment> {
    let Ok(table) = scraper::Selector::parse(table_css) else {
        return Vec::new();
    };
    let (row, cell) = (sel("tr"), sel("td"));
    let Some(table) = document.select(&table).next() else {
        return Vec::new();
    };

    table
        .select(&row)
        .skip(1)
        .filter_map(|tr| {
            let cells: Vec<String> = tr.select(&cell).map(|td| parse::element_text(&td)).collect();
            if cells.len() < 3 {
                return None;
            }
            let at = |i: usize| cells.get(i).cloned().unwrap_or_default();
            Some(Fitment {
                year: at(0),
                make: at(1),
                model: at(2),
                trim: at(3),
                engine: at(4),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::{ScriptedDriver, Step};
    use crate::fetch::FetchSettings;

    fn fetcher(steps: Vec<Step>) -> SiteFetcher {
        let driver: Box<dyn PageDriver> = Box::new(ScriptedDriver::new(steps));
        PageFetcher::new("test", driver, FetchSettings::default())
    }

    fn listing(paths: &[&str]) -> String {
        let links: String = paths
            .iter()
            .map(|p| format!("<a href=\"{}\">part</a>", p))
            .collect();
        format!("<html><body>{}{}</body></html>", links, "<p>results</p>".repeat(20))
    }

    fn tasca() -> RevolutionParts {
        RevolutionParts::new("tascaparts", "https://www.tascaparts.com")
            .unwrap()
            .with_category("/c/wheelstiresparts")
    }

    #[test]
    fn fitment_json_expands_trims_and_engines() {
        let value = serde_json::json!({
            "fitment": [
                {"year": 2020, "make": "GMC", "model": "Sierra 1500",
                 "trims": ["SLE", "SLT"], "engines": ["5.3L V8", "6.2L V8"]},
                {"year": "2021", "make": "GMC", "model": "Yukon", "trims": [], "engines": []}
            ]
        });
        let fitments = fitments_from_json(&value);
        assert_eq!(fitments.len(), 5);
        assert_eq!(fitments[0].year, "2020");
        assert_eq!(fitments[0].trim, "SLE");
        assert_eq!(fitments[1].engine, "6.2L V8");
        assert_eq!(fitments[3].trim, "SLT");
        assert_eq!(fitments[4].model, "Yukon");
        assert_eq!(fitments[4].trim, "");
        assert!(fitments_from_json(&serde_json::json!({"sku": "x"})).is_empty());
    }

    #[test]
    fn fitment_table_skips_header() {
        let doc = Html::parse_document(
            r#"<table class="fitment-table">
                <tr><th>Year</th><th>Make</th><th>Model</th></tr>
                <tr><td>2019</td><td>Honda</td><td>Civic</td><td>EX</td></tr>
                <tr><td>only</td></tr>
            </table>"#,
        );
        let fitments = fitments_from_table(&doc, "table[class*='fitment']");
        assert_eq!(fitments.len(), 1);
        assert_eq!(fitments[0].model, "Civic");
        assert_eq!(fitments[0].trim, "EX");
        assert_eq!(fitments[0].engine, "");
    }

    #[tokio::test(start_paused = true)]
    async fn discovery_pages_until_empty_streak() {
        let page = |html: String| Step::Page("https://www.tascaparts.com/search".into(), html);
        let mut steps = vec![
            page(listing(&["/oem-parts/gm-wheel-1", "/oem-parts/gm-wheel-2"])),
            page(listing(&["/oem-parts/gm-wheel-2", "/oem-parts/gm-wheel-3", "/about"])),
        ];
        // Four pages of nothing new; each page has one candidate URL that succeeds.
        for _ in 0..4 {
            steps.push(page(listing(&["/oem-parts/gm-wheel-1"])));
        }
        // Category fallback (fewer than 10 results)
        steps.push(page(listing(&["/oem-parts/gm-wheel-4"])));

        let mut fetcher = fetcher(steps);
        let site = tasca();
        let urls = site.product_urls(&mut fetcher, &Discovery::default()).await.unwrap();
        assert_eq!(
            urls,
            vec![
                "https://www.tascaparts.com/oem-parts/gm-wheel-1",
                "https://www.tascaparts.com/oem-parts/gm-wheel-2",
                "https://www.tascaparts.com/oem-parts/gm-wheel-3",
                "https://www.tascaparts.com/oem-parts/gm-wheel-4",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn discovery_respects_limit() {
        let steps = vec![Step::Page(
            "https://www.tascaparts.com/search".into(),
            listing(&["/oem-parts/a", "/oem-parts/b", "/oem-parts/c"]),
        )];
        let mut fetcher = fetcher(steps);
        let limits = Discovery {
            limit: Some(2),
            min_search_results: 0,
            ..Discovery::default()
        };
        let urls = tasca().product_urls(&mut fetcher, &limits).await.unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn build_fills_in_from_registry() {
        let scraper = build(&SiteConfig::new("porsche", "")).unwrap();
        assert_eq!(scraper.base_url(), "https://parts.byersporsche.com");
        assert!(scraper.is_product_url(
            "https://parts.byersporsche.com/p/Porsche__/Wheel/12345/99136213400.html"
        ));

        let err = build(&SiteConfig::new("unknown-dealer", "")).err().unwrap();
        assert!(matches!(err, ScraperError::Config(_)));

        let generic = build(&SiteConfig::new("unknown-dealer", "https://parts.dealer.test/")).unwrap();
        assert_eq!(generic.base_url(), "https://parts.dealer.test");

        let kia = build(&SiteConfig::new("kia", "")).unwrap();
        assert_eq!(kia.category_urls(), vec!["https://www.kiapartsnow.com/accessories/kia-wheels.html"]);
        let mazda = build(&SiteConfig::new("mazda", "")).unwrap();
        assert!(mazda.is_product_url(
            "https://www.jimellismazdaparts.com/products/Mazda/Wheel-Alloy/114372/9965B87080.html"
        ));
    }
}
