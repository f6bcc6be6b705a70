use serde::{Deserialize, Serialize};

/// A vehicle the part fits. Every fitment becomes its own output row.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, Hash)]
pub struct Fitment {
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub trim: String,
    #[serde(default)]
    pub engine: String,
}

impl Fitment {
    pub fn is_empty(&self) -> bool {
        self.year.is_empty()
            && self.make.is_empty()
            && self.model.is_empty()
            && self.trim.is_empty()
            && self.engine.is_empty()
    }
}

/// One scraped product page
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Product {
    pub url: String,
    #[serde(default)]
    pub image_url: String,
    /// Scrape timestamp, `%Y-%m-%d %H:%M:%S`
    #[serde(default)]
    pub date: String,
    /// Seller stock code as displayed
    #[serde(default)]
    pub sku: String,
    /// Canonical part number (alphanumerics of the SKU)
    #[serde(default)]
    pub pn: String,
    #[serde(default)]
    pub actual_price: String,
    #[serde(default)]
    pub msrp: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub also_known_as: String,
    #[serde(default)]
    pub positions: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub applications: String,
    #[serde(default)]
    pub replaces: String,
    #[serde(default)]
    pub fitments: Vec<Fitment>,
}

impl Product {
    /// Empty record stamped with the current local time
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            date: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            ..Default::default()
        }
    }

    /// Guarantees at least one (possibly empty) fitment so the product yields a row
    pub fn ensure_fitment(&mut self) {
        if self.fitments.is_empty() {
            self.fitments.push(Fitment::default());
        }
    }
}
