use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScraperError};

/// How a configured site finds its product pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    #[default]
    Search,
    Category,
}

/// Which e-commerce template a dealer site runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    Revolution,
    SimplePart,
    #[default]
    Generic,
}

/// One entry of the sites file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub template: Option<Template>,
    /// Make used in the SimplePart `/p/<Make>__/` product paths
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub search_strategy: SearchStrategy,
    #[serde(default = "default_search_term")]
    pub search_term: String,
    #[serde(default)]
    pub category_url: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_search_term() -> String {
    "wheel".to_string()
}

fn default_true() -> bool {
    true
}

impl SiteConfig {
    pub fn new(name: &str, base_url: &str) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            template: None,
            make: None,
            search_strategy: SearchStrategy::default(),
            search_term: default_search_term(),
            category_url: None,
            enabled: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ScraperError::Config("site entry without a name".into()));
        }
        if !self.base_url.is_empty() {
            url::Url::parse(&self.base_url)
                .map_err(|e| ScraperError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        }
        if self.search_strategy == SearchStrategy::Category && self.category_url.is_none() {
            return Err(ScraperError::Config(format!(
                "site '{}' uses the category strategy without a category_url",
                self.name
            )));
        }
        Ok(())
    }
}

/// `{"sites": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SitesFile {
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

impl SitesFile {
    pub fn from_json(text: &str) -> Result<Self> {
        let file: SitesFile = serde_json::from_str(text)?;
        for site in &file.sites {
            site.validate()?;
        }
        Ok(file)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let file = Self::from_json(&text)?;
        log::info!("Loaded {} site configurations from {}", file.sites.len(), path.display());
        Ok(file)
    }

    /// Enabled sites, optionally narrowed to `only`
    pub fn selected(&self, only: &[String]) -> Vec<SiteConfig> {
        self.sites
            .iter()
            .filter(|s| s.enabled)
            .filter(|s| only.is_empty() || only.iter().any(|n| n == &s.name))
            .cloned()
            .collect()
    }
}
