//! Fallback scraper for sites without a dedicated template, driven entirely by
//! the site configuration and common e-commerce markup.

use regex::Regex;
use scraper::Html;
use url::Url;

use super::{fitments_from_scripts, fitments_from_table, SiteScraper};
use crate::config::{SearchStrategy, SiteConfig};
use crate::error::{Result, ScraperError};
use crate::model::Product;
use crate::parse::{self, sel};

const TITLE_SELECTORS: &[&str] = &[
    "h1[class*='product'][class*='title']",
    "h1[class*='title']",
    "h1",
    "div[class*='product'][class*='name']",
];
const SKU_SELECTORS: &[&str] = &["span[class*='sku']", "[itemprop='sku']", "div[class*='part-number']"];
const PRICE_SELECTORS: &[&str] = &[
    "strong[class*='sale-price']",
    "span[class*='price-sale']",
    "span[class*='sale-price']",
    "div[class*='price']",
];
const MSRP_SELECTORS: &[&str] = &["span[class*='list-price']", "span[class*='msrp']", "div[class*='retail-price']"];
const IMAGE_SELECTORS: &[&str] = &["img[class*='product-image']", "img[class*='main-image']", "img[itemprop='image']"];
const DESCRIPTION_SELECTORS: &[&str] = &[
    "div[class*='description']",
    "span[class*='description']",
    "p[class*='description']",
];

pub struct GenericSite {
    config: SiteConfig,
    base: Url,
    product_link: Regex,
}

impl GenericSite {
    pub fn new(config: SiteConfig) -> Result<Self> {
        config.validate()?;
        let base = Url::parse(&config.base_url)
            .map_err(|e| ScraperError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        let product_link = Regex::new(r"/(oem-parts|parts|product|p|products|genuine)/")
            .map_err(|e| ScraperError::Config(e.to_string()))?;
        Ok(Self {
            config,
            base,
            product_link,
        })
    }
}

impl SiteScraper for GenericSite {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Common search endpoints; results are not paginated
    fn search_urls(&self, page: u32) -> Vec<String> {
        if page > 1 {
            return Vec::new();
        }
        let (base, term) = (&self.config.base_url, &self.config.search_term);
        vec![
            format!("{}/search?search_str={}", base, term),
            format!("{}/search?q={}", base, term),
            format!("{}/search?search_query={}", base, term),
            format!("{}/s?k={}", base, term),
        ]
    }

    fn category_urls(&self) -> Vec<String> {
        self.config
            .category_url
            .as_deref()
            .and_then(|c| parse::absolutize(&self.base, c))
            .into_iter()
            .collect()
    }

    fn search_first(&self) -> bool {
        self.config.search_strategy == SearchStrategy::Search
    }

    /// Search results also link to unrelated parts, so only links naming the
    /// search term are kept; category listings are taken whole.
    fn product_links(&self, html: &str) -> Vec<String> {
        let term = self.config.search_term.to_lowercase();
        let filter_term = self.search_first();
        let document = Html::parse_document(html);
        let anchors = sel("a[href]");
        document
            .select(&anchors)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| self.product_link.is_match(href))
            .filter(|href| !filter_term || href.to_lowercase().contains(&term))
            .filter_map(|href| parse::absolutize(&self.base, href))
            .collect()
    }

    fn is_product_url(&self, url: &str) -> bool {
        self.product_link.is_match(url)
    }

    fn parse_product(&self, url: &str, html: &str) -> Option<Product> {
        let document = Html::parse_document(html);
        let mut product = Product::new(url);

        product.title = parse::first_text(&document, TITLE_SELECTORS).unwrap_or_default();
        if product.title.len() < 3 {
            return None;
        }
        product.sku = parse::first_text(&document, SKU_SELECTORS).unwrap_or_default();
        product.pn = parse::clean_sku(&product.sku);
        product.description = parse::first_text(&document, DESCRIPTION_SELECTORS).unwrap_or_default();

        if !parse::is_wheel_product(&product.title, &product.description) {
            return None;
        }

        product.actual_price = parse::first_text(&document, PRICE_SELECTORS)
            .map(|p| parse::extract_price(&p))
            .unwrap_or_default();
        product.msrp = parse::first_text(&document, MSRP_SELECTORS)
            .map(|p| parse::extract_price(&p))
            .unwrap_or_default();
        product.image_url = IMAGE_SELECTORS
            .iter()
            .find_map(|css| parse::select_attr(&document, css, &["src", "data-src"]))
            .map(|src| parse::fix_image_url(&src))
            .unwrap_or_default();

        product.fitments = fitments_from_scripts(&document, "script[type='application/json']");
        if product.fitments.is_empty() {
            product.fitments = fitments_from_table(&document, "table[class*='fitment']");
        }
        product.ensure_fitment();
        Some(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(strategy: SearchStrategy) -> GenericSite {
        let mut config = SiteConfig::new("dealer", "https://parts.dealer.test");
        config.search_strategy = strategy;
        config.category_url = Some("/c/wheels".into());
        GenericSite::new(config).unwrap()
    }

    #[test]
    fn search_links_must_name_the_term() {
        let html = r#"<a href="/parts/alloy-wheel-123">a</a>
            <a href="/parts/brake-pad-9">b</a>
            <a href="/about-wheels">c</a>
            <a href="/genuine/kia-wheel-alloy~52910-d4210.html">d</a>"#;
        assert_eq!(
            site(SearchStrategy::Search).product_links(html),
            vec![
                "https://parts.dealer.test/parts/alloy-wheel-123",
                "https://parts.dealer.test/genuine/kia-wheel-alloy~52910-d4210.html",
            ]
        );
        assert_eq!(site(SearchStrategy::Category).product_links(html).len(), 3);
    }

    #[test]
    fn listing_urls_follow_strategy() {
        let search = site(SearchStrategy::Search);
        assert!(search.search_first());
        assert_eq!(search.search_urls(1).len(), 4);
        assert!(search.search_urls(2).is_empty());

        let category = site(SearchStrategy::Category);
        assert!(!category.search_first());
        assert_eq!(category.category_urls(), vec!["https://parts.dealer.test/c/wheels"]);
    }

    #[test]
    fn parses_common_markup() {
        let html = r#"<html><body>
            <h1 class="product-title">18in Alloy Wheel</h1>
            <span class="product-sku">AW-1800</span>
            <div class="product-price">$420.00</div>
            <span class="msrp-value">$500.00</span>
            <img class="main-image" data-src="//img.test/w.jpg">
            <table class="fitment-table">
              <tr><th>Year</th><th>Make</th><th>Model</th></tr>
              <tr><td>2018</td><td>Kia</td><td>Optima</td></tr>
            </table>
        </body></html>"#;
        let product = site(SearchStrategy::Search)
            .parse_product("https://parts.dealer.test/parts/aw-1800", html)
            .unwrap();
        assert_eq!(product.title, "18in Alloy Wheel");
        assert_eq!(product.pn, "AW1800");
        assert_eq!(product.actual_price, "420.00");
        assert_eq!(product.msrp, "500.00");
        assert_eq!(product.image_url, "https://img.test/w.jpg");
        assert_eq!(product.fitments.len(), 1);
        assert_eq!(product.fitments[0].make, "Kia");
    }
}
