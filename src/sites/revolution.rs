//! RevolutionParts storefronts: `/oem-parts/` product pages with fitment in a
//! `product_data` JSON script.

use scraper::Html;
use url::Url;

use super::{fitments_from_scripts, SiteScraper};
use crate::error::{Result, ScraperError};
use crate::model::Product;
use crate::parse::{self, sel};

const TITLE_SELECTORS: &[&str] = &[
    "h1.product-title",
    "h1",
    "h2.product-title",
    "div.product-title",
    "span.product-title",
];
const SALE_PRICE_SELECTORS: &[&str] = &["strong.sale-price-value", "span.sale-price", "div.sale-price"];
const MSRP_SELECTORS: &[&str] = &["span.list-price-value", "span.list-price", "div.msrp"];
const IMAGE_SELECTORS: &[&str] = &["img.product-main-image", "img.product-image", "img#product-image"];
const DESCRIPTION_SELECTORS: &[&str] = &[
    "span.description_body",
    "div.description",
    "p.product-description",
];

pub struct RevolutionParts {
    name: String,
    base_url: String,
    base: Url,
    search_term: String,
    category: Option<String>,
}

impl RevolutionParts {
    pub fn new(name: &str, base_url: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url).map_err(|e| ScraperError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self {
            name: name.to_string(),
            base_url,
            base,
            search_term: "wheel".to_string(),
            category: None,
        })
    }

    pub fn with_search_term(mut self, term: &str) -> Self {
        self.search_term = term.to_string();
        self
    }

    /// Category listing, absolute or relative to the base URL
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = parse::absolutize(&self.base, category);
        self
    }
}

impl SiteScraper for RevolutionParts {
    fn name(&self) -> &str {
        &self.name
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_urls(&self, page: u32) -> Vec<String> {
        let (base, term) = (&self.base_url, &self.search_term);
        if page <= 1 {
            return vec![format!("{}/search?search_str={}", base, term)];
        }
        vec![
            format!("{}/search?search_str={}&page={}", base, term, page),
            format!("{}/search?search_str={}&p={}", base, term, page),
            format!("{}/search?search_str={}&pageNumber={}", base, term, page),
            format!("{}/search?q={}&page={}", base, term, page),
        ]
    }

    fn category_urls(&self) -> Vec<String> {
        self.category.iter().cloned().collect()
    }

    fn product_links(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let links = sel("a[href*='/oem-parts/']");
        document
            .select(&links)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| parse::absolutize(&self.base, href))
            .map(|url| parse::normalize_product_url(&url))
            .collect()
    }

    fn is_product_url(&self, url: &str) -> bool {
        url.contains("/oem-parts/") && !url.ends_with("/oem-parts")
    }

    fn parse_product(&self, url: &str, html: &str) -> Option<Product> {
        let document = Html::parse_document(html);
        let mut product = Product::new(url);

        product.title = parse::first_text(&document, TITLE_SELECTORS)
            .or_else(|| parse::select_attr(&document, "meta[property='og:title']", &["content"]))
            .or_else(|| parse::select_text(&document, "title"))
            .unwrap_or_default();
        if product.title.len() < 3 {
            log::warn!("No valid title found for {}; page may not have loaded", url);
            return None;
        }

        if let Some(sku) = parse::select_text(&document, "span.sku-display") {
            product.pn = parse::clean_sku(&sku);
            product.sku = sku;
        }

        if !parse::is_wheel_product(&product.title, "") {
            return None;
        }

        product.actual_price = parse::first_text(&document, SALE_PRICE_SELECTORS)
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
        product.description = parse::first_text(&document, DESCRIPTION_SELECTORS).unwrap_or_default();
        product.also_known_as = parse::select_text(&document, "li.also_known_as .list-value").unwrap_or_default();
        product.positions = parse::select_text(&document, "li.footnotes .list-value").unwrap_or_default();
        product.replaces =
            parse::select_text(&document, "li.product-superseded-list .list-value").unwrap_or_default();
        product.applications = parse::select_text(&document, "li.applications .list-value").unwrap_or_default();

        product.fitments = fitments_from_scripts(&document, "script#product_data");
        if product.fitments.is_empty() {
            product.fitments = fitments_from_scripts(&document, "script[type='application/json']");
        }
        if product.fitments.is_empty() {
            log::warn!("No fitment data found for {}", product.title);
        }
        product.ensure_fitment();
        Some(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.tascaparts.com/oem-parts/gm-wheel-84585383";

    fn site() -> RevolutionParts {
        RevolutionParts::new("tascaparts", "https://www.tascaparts.com/").unwrap()
    }

    fn product_page() -> String {
        r#"<html><head><title>GM Wheel | Tasca Parts</title></head><body>
            <h1 class="product-title">Wheel, Alloy 20x9</h1>
            <span class="sku-display">84585383</span>
            <strong class="sale-price-value">$612.45</strong>
            <span class="list-price-value">$787.31</span>
            <img class="product-main-image" src="//cdn.revolutionparts.com/wheel.jpg">
            <span class="description_body">Bright machined aluminum.</span>
            <ul>
              <li class="also_known_as"><h2 class="list-value">Rim, Wheel</h2></li>
              <li class="footnotes"><span class="list-value">Front, Rear</span></li>
              <li class="product-superseded-list"><span class="list-value">23376223</span></li>
            </ul>
            <script id="product_data" type="application/json">
              {"sku": "84585383", "fitment": [
                {"year": 2020, "make": "Chevrolet", "model": "Silverado 1500",
                 "trims": ["LT", "RST"], "engines": ["5.3L V8"]}
              ]}
            </script>
        </body></html>"#
            .to_string()
    }

    #[test]
    fn parses_product_page() {
        let product = site().parse_product(URL, &product_page()).unwrap();
        assert_eq!(product.title, "Wheel, Alloy 20x9");
        assert_eq!(product.sku, "84585383");
        assert_eq!(product.pn, "84585383");
        assert_eq!(product.actual_price, "612.45");
        assert_eq!(product.msrp, "787.31");
        assert_eq!(product.image_url, "https://cdn.revolutionparts.com/wheel.jpg");
        assert_eq!(product.description, "Bright machined aluminum.");
        assert_eq!(product.also_known_as, "Rim, Wheel");
        assert_eq!(product.positions, "Front, Rear");
        assert_eq!(product.replaces, "23376223");
        assert_eq!(product.fitments.len(), 2);
        assert_eq!(product.fitments[1].trim, "RST");
        assert_eq!(product.fitments[1].model, "Silverado 1500");
    }

    #[test]
    fn skips_non_wheels_and_untitled_pages() {
        let html = product_page().replace("Wheel, Alloy 20x9", "Wheel Bearing, Front");
        assert!(site().parse_product(URL, &html).is_none());
        assert!(site().parse_product(URL, "<html><body><p>x</p></body></html>").is_none());
    }

    #[test]
    fn product_without_fitment_gets_blank_row() {
        let html = r#"<html><body><h1>Center Cap</h1><span class="sku-display">9597720</span></body></html>"#;
        let product = site().parse_product(URL, html).unwrap();
        assert_eq!(product.fitments.len(), 1);
        assert!(product.fitments[0].is_empty());
    }

    #[test]
    fn listing_links_and_pagination() {
        let html = r#"<a href="/oem-parts/gm-wheel-1?c=abc">a</a>
            <a href="https://www.tascaparts.com/oem-parts/gm-cap-2/">b</a>
            <a href="/accessories">c</a>"#;
        assert_eq!(
            site().product_links(html),
            vec![
                "https://www.tascaparts.com/oem-parts/gm-wheel-1",
                "https://www.tascaparts.com/oem-parts/gm-cap-2",
            ]
        );
        assert_eq!(
            site().search_urls(1),
            vec!["https://www.tascaparts.com/search?search_str=wheel"]
        );
        assert_eq!(
            site().search_urls(3)[0],
            "https://www.tascaparts.com/search?search_str=wheel&page=3"
        );
        assert!(site().category_urls().is_empty());
        assert_eq!(
            site().with_category("/c/wheelstiresparts").category_urls(),
            vec!["https://www.tascaparts.com/c/wheelstiresparts"]
        );
    }
}
