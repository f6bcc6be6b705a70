//! SimplePart storefronts: products live at `/p/<Make>__/<Name>/<id>/<PN>.html`
//! (older stores use `/products/<Make>/...`) and list fitment in a
//! `div#fitment` table.

use regex::Regex;
use scraper::{ElementRef, Html};
use url::Url;

use super::SiteScraper;
use crate::error::{Result, ScraperError};
use crate::model::{Fitment, Product};
use crate::parse::{self, sel};

pub struct SimplePart {
    name: String,
    base_url: String,
    base: Url,
    make: String,
    search_term: String,
    product_path: Regex,
    product_url: Regex,
    category_url: Regex,
}

impl SimplePart {
    pub fn new(name: &str, base_url: &str, make: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url).map_err(|e| ScraperError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        let make_path = regex::escape(make);
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| ScraperError::Config(format!("bad product pattern for {}: {}", make, e)))
        };

        Ok(Self {
            name: name.to_string(),
            base_url,
            base,
            make: make.to_string(),
            search_term: "wheel".to_string(),
            product_path: compile(format!(r"(?i)/(?:p/{m}__|products/{m})/", m = make_path))?,
            product_url: compile(format!(r"(?i)/(?:p/{m}__|products/{m})/[^/]+/\d+/([^/]+)\.html", m = make_path))?,
            category_url: compile(format!(r"(?i)/{}__/[^/]+\.html$|/productSearch\.aspx", make_path))?,
        })
    }

    pub fn with_search_term(mut self, term: &str) -> Self {
        self.search_term = term.to_string();
        self
    }

    /// Part number from the last path segment of a product URL
    fn sku_from_url(&self, url: &str) -> Option<String> {
        self.product_url
            .captures(url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Parse a fitment cell such as `911 Carrera (2012-2016) [3.4L H6]`.
/// The year is the start of the range and the make is the first word.
pub fn parse_fitment_cell(text: &str) -> Option<Fitment> {
    let engine_re = Regex::new(r"\[([^\]]+)\]").ok()?;
    let years_re = Regex::new(r"\((\d{4})-(\d{4})\)").ok()?;

    let text = parse::collapse_ws(text);
    let engine = engine_re
        .captures(&text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    let model = engine_re.replace_all(&text, "").trim().to_string();
    if model.is_empty() {
        return None;
    }

    let year = years_re
        .captures(&model)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let make = years_re
        .replace_all(&model, "")
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string();

    Some(Fitment {
        year,
        make,
        model,
        trim: String::new(),
        engine,
    })
}

/// Text of the `<p>` that holds a `strong.custom-blacktext` label, label removed
fn labelled_paragraph(document: &Html, label: &str) -> Option<String> {
    let strong = sel("strong.custom-blacktext");
    document
        .select(&strong)
        .filter(|s| parse::element_text(s).contains(label))
        .find_map(|s| {
            let paragraph = s
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "p")?;
            let text = parse::strip_label(&parse::element_text(&paragraph), label);
            Some(text).filter(|t| !t.is_empty())
        })
}

impl SiteScraper for SimplePart {
    fn name(&self) -> &str {
        &self.name
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_urls(&self, page: u32) -> Vec<String> {
        let url = format!("{}/productSearch.aspx?searchTerm={}", self.base_url, self.search_term);
        if page <= 1 {
            vec![url]
        } else {
            vec![format!("{}&pageNumber={}", url, page), format!("{}&page={}", url, page)]
        }
    }

    fn category_urls(&self) -> Vec<String> {
        vec![format!("{}/{}__/Tire-and-Wheel.html", self.base_url, self.make)]
    }

    fn product_links(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let anchors = sel("a[href]");
        document
            .select(&anchors)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| self.product_path.is_match(href))
            .filter_map(|href| parse::absolutize(&self.base, href))
            .map(|url| parse::normalize_product_url(&url))
            .collect()
    }

    fn is_product_url(&self, url: &str) -> bool {
        self.product_url.is_match(url) && !self.category_url.is_match(url)
    }

    fn page_ready(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        parse::first_text(&document, &["h1", "h2.subh1"]).is_some()
    }

    fn parse_product(&self, url: &str, html: &str) -> Option<Product> {
        let document = Html::parse_document(html);
        let mut product = Product::new(url);

        product.title = parse::first_text(&document, &["h1 > span", "h1", "h2.subh1"])
            .or_else(|| {
                parse::select_text(&document, "title")
                    .map(|t| t.split('|').next().unwrap_or_default().trim().to_string())
            })
            .unwrap_or_default();
        if product.title.len() < 3 {
            return None;
        }

        product.sku = self
            .sku_from_url(url)
            .or_else(|| {
                parse::select_text(&document, "p.mt-sm").map(|t| parse::strip_label(&t, "Part Number"))
            })
            .unwrap_or_default();
        product.pn = parse::clean_sku(&product.sku);

        if !parse::is_wheel_product(&product.title, "") {
            return None;
        }

        product.actual_price = parse::select_text(&document, "p#part-price-right span.bold.text-lg")
            .map(|p| parse::extract_price(&p))
            .unwrap_or_default();
        product.msrp = parse::first_text(
            &document,
            &["span[class*='list-price']", "span[class*='listprice']", "span[class*='msrp']"],
        )
        .map(|p| parse::extract_price(&p))
        .unwrap_or_default();
        product.image_url = parse::select_attr(
            &document,
            "div#part-image-left a img.img-responsive",
            &["src", "data-src"],
        )
        .map(|src| parse::fix_image_url(&src))
        .unwrap_or_default();

        product.description = labelled_paragraph(&document, "Product Description")
            .filter(|d| d.len() > 10)
            .unwrap_or_default();
        product.also_known_as = labelled_paragraph(&document, "Other Names").unwrap_or_default();
        product.replaces = labelled_paragraph(&document, "Replaces").unwrap_or_default();
        product.positions = labelled_paragraph(&document, "Positions").unwrap_or_default();
        product.applications = labelled_paragraph(&document, "Applications").unwrap_or_default();

        let (rows, cells) = (sel("div#fitment table tr"), sel("td, th"));
        product.fitments = document
            .select(&rows)
            .skip(1)
            .filter_map(|row| row.select(&cells).next())
            .filter_map(|cell| parse_fitment_cell(&parse::element_text(&cell)))
            .collect();

        product.ensure_fitment();
        Some(product)
    }
}
