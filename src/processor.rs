//! Flattens scraped products into spreadsheet rows and reports on them.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::Product;
use crate::parse::collapse_ws;

/// Output headers, in column order. The unnamed and short-code columns are
/// left empty for the client to fill in.
pub const COLUMNS: [&str; 34] = [
    "url",
    "Image",
    "date",
    "sku",
    "PN",
    "CCC",
    "VID",
    "HOL",
    "RVID",
    "RHOL",
    "IID",
    "IDHol",
    "",
    "AC$",
    "Shipping",
    "Price",
    "Core",
    "msrp",
    "STL",
    "CC",
    "RPN",
    "PaintCode",
    "ColDesc",
    "title",
    "also_known_as",
    "positions",
    "description",
    "applications",
    "replaces",
    "year",
    "make",
    "model",
    "trims",
    "engines",
];

/// One product/fitment combination
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Row {
    pub url: String,
    pub image: String,
    pub date: String,
    pub sku: String,
    pub pn: String,
    pub actual_price: String,
    pub msrp: String,
    pub title: String,
    pub also_known_as: String,
    pub positions: String,
    pub description: String,
    pub applications: String,
    pub replaces: String,
    pub year: String,
    pub make: String,
    pub model: String,
    pub trims: String,
    pub engines: String,
}

impl Row {
    /// Cell values in [`COLUMNS`] order
    pub fn values(&self) -> [&str; 34] {
        [
            self.url.as_str(),
            self.image.as_str(),
            self.date.as_str(),
            self.sku.as_str(),
            self.pn.as_str(),
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            self.actual_price.as_str(),
            "",
            "",
            "",
            self.msrp.as_str(),
            "",
            "",
            "",
            "",
            "",
            self.title.as_str(),
            self.also_known_as.as_str(),
            self.positions.as_str(),
            self.description.as_str(),
            self.applications.as_str(),
            self.replaces.as_str(),
            self.year.as_str(),
            self.make.as_str(),
            self.model.as_str(),
            self.trims.as_str(),
            self.engines.as_str(),
        ]
    }

    /// Host of the product URL, `"unknown"` when it has none
    pub fn host(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn has_fitment(&self) -> bool {
        !(self.year.is_empty() && self.make.is_empty())
    }
}

/// One row per fitment; a product without fitments still yields one row
pub fn process(products: &[Product]) -> Vec<Row> {
    log::info!("Processing {} products...", products.len());
    let mut rows = Vec::new();

    for product in products {
        let base = Row {
            url: product.url.clone(),
            image: product.image_url.clone(),
            date: product.date.clone(),
            sku: product.sku.clone(),
            pn: product.pn.clone(),
            actual_price: product.actual_price.clone(),
            msrp: product.msrp.clone(),
            title: product.title.clone(),
            also_known_as: product.also_known_as.clone(),
            positions: product.positions.clone(),
            description: product.description.clone(),
            applications: product.applications.clone(),
            replaces: product.replaces.clone(),
            ..Row::default()
        };

        if product.fitments.is_empty() {
            rows.push(base);
            continue;
        }
        for fitment in &product.fitments {
            rows.push(Row {
                year: fitment.year.clone(),
                make: fitment.make.clone(),
                model: fitment.model.clone(),
                trims: fitment.trim.clone(),
                engines: fitment.engine.clone(),
                ..base.clone()
            });
        }
    }

    log::info!("Processed {} rows from {} products", rows.len(), products.len());
    log::info!("Unique part numbers: {}", unique_parts(&rows));
    rows
}

/// Drop repeated part/url/fitment combinations, keeping the first
pub fn dedupe(rows: Vec<Row>) -> Vec<Row> {
    let before = rows.len();
    let mut seen = HashSet::new();
    let rows: Vec<Row> = rows
        .into_iter()
        .filter(|r| {
            seen.insert((
                r.pn.clone(),
                r.url.clone(),
                r.year.clone(),
                r.make.clone(),
                r.model.clone(),
                r.trims.clone(),
                r.engines.clone(),
            ))
        })
        .collect();
    if rows.len() < before {
        log::info!("Removed {} duplicate rows", before - rows.len());
    }
    rows
}

fn tidy(value: &mut String) {
    let cleaned = collapse_ws(value);
    *value = if cleaned == "nan" { String::new() } else { cleaned };
}

/// Drop rows missing a sku or title and normalize text and price cells
pub fn clean(rows: Vec<Row>) -> Vec<Row> {
    log::info!("Cleaning data...");
    let before = rows.len();

    let rows: Vec<Row> = rows
        .into_iter()
        .filter(|r| !r.sku.trim().is_empty() && !r.title.trim().is_empty())
        .map(|mut r| {
            for field in [
                &mut r.title,
                &mut r.description,
                &mut r.also_known_as,
                &mut r.positions,
                &mut r.applications,
                &mut r.replaces,
                &mut r.make,
                &mut r.model,
                &mut r.trims,
                &mut r.engines,
            ] {
                tidy(field);
            }
            for price in [&mut r.actual_price, &mut r.msrp] {
                let trimmed = price.trim();
                *price = if trimmed == "nan" { String::new() } else { trimmed.to_string() };
            }
            r
        })
        .collect();

    if rows.len() < before {
        log::info!("Removed {} rows with missing critical data", before - rows.len());
    }
    log::info!("Data cleaning complete");
    rows
}

fn unique_parts(rows: &[Row]) -> usize {
    rows.iter()
        .map(|r| r.pn.as_str())
        .filter(|pn| !pn.is_empty())
        .collect::<HashSet<_>>()
        .len()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub total_rows: usize,
    pub unique_parts: usize,
    pub missing_sku: usize,
    pub missing_price: usize,
    pub missing_msrp: usize,
    pub missing_fitment: usize,
    /// Part numbers that appear on more than one row
    pub products_with_multiple_fitments: usize,
}

pub fn validate(rows: &[Row]) -> ValidationReport {
    let mut per_part: HashMap<&str, usize> = HashMap::new();
    for row in rows.iter().filter(|r| !r.pn.is_empty()) {
        *per_part.entry(row.pn.as_str()).or_default() += 1;
    }

    let report = ValidationReport {
        total_rows: rows.len(),
        unique_parts: per_part.len(),
        missing_sku: rows.iter().filter(|r| r.sku.is_empty()).count(),
        missing_price: rows.iter().filter(|r| r.actual_price.is_empty()).count(),
        missing_msrp: rows.iter().filter(|r| r.msrp.is_empty()).count(),
        missing_fitment: rows.iter().filter(|r| !r.has_fitment()).count(),
        products_with_multiple_fitments: per_part.values().filter(|&&n| n > 1).count(),
    };

    log::info!("Data Validation Report:");
    log::info!("  total_rows: {}", report.total_rows);
    log::info!("  unique_parts: {}", report.unique_parts);
    log::info!("  missing_sku: {}", report.missing_sku);
    log::info!("  missing_price: {}", report.missing_price);
    log::info!("  missing_msrp: {}", report.missing_msrp);
    log::info!("  missing_fitment: {}", report.missing_fitment);
    log::info!(
        "  products_with_multiple_fitments: {}",
        report.products_with_multiple_fitments
    );
    report
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total_rows: usize,
    pub unique_parts: usize,
    /// Row counts per make, most common first
    pub products_by_make: Vec<(String, usize)>,
    pub average_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

impl SummaryStats {
    /// Flat `(metric, value)` pairs; nested groups become `"<group> - <key>"`
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries = vec![
            ("total_rows".to_string(), self.total_rows.to_string()),
            ("unique_parts".to_string(), self.unique_parts.to_string()),
        ];
        for (make, count) in &self.products_by_make {
            entries.push((format!("products_by_make - {}", make), count.to_string()));
        }
        entries.push(("average_price".to_string(), format!("{:.2}", self.average_price)));
        entries.push(("price_range - min".to_string(), format!("{:.2}", self.min_price)));
        entries.push(("price_range - max".to_string(), format!("{:.2}", self.max_price)));
        entries
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn summary(rows: &[Row]) -> SummaryStats {
    let mut by_make: HashMap<&str, usize> = HashMap::new();
    for row in rows.iter().filter(|r| !r.make.is_empty()) {
        *by_make.entry(row.make.as_str()).or_default() += 1;
    }
    let mut products_by_make: Vec<(String, usize)> =
        by_make.into_iter().map(|(m, n)| (m.to_string(), n)).collect();
    products_by_make.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let prices: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.actual_price.parse::<f64>().ok())
        .filter(|p| p.is_finite())
        .collect();

    let mut stats = SummaryStats {
        total_rows: rows.len(),
        unique_parts: unique_parts(rows),
        products_by_make,
        ..SummaryStats::default()
    };
    if !prices.is_empty() {
        stats.average_price = round2(prices.iter().sum::<f64>() / prices.len() as f64);
        stats.min_price = round2(prices.iter().copied().fold(f64::INFINITY, f64::min));
        stats.max_price = round2(prices.iter().copied().fold(f64::NEG_INFINITY, f64::max));
    }
    stats
}
