//! Page drivers: the thing that actually loads a URL.
//!
//! The fetch loop only needs to navigate, read back where it ended up and the
//! page source, and restart the session. A headless browser can sit behind
//! [`PageDriver`]; [`HttpDriver`] is the plain-HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION};

use crate::error::{Result, ScraperError};

#[async_trait]
pub trait PageDriver: Send {
    /// Start a fresh session, discarding any previous one
    async fn start(&mut self) -> Result<()>;

    /// Navigate to `url` and wait for the document
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// URL of the loaded document after redirects
    fn current_url(&self) -> String;

    /// Source of the loaded document
    fn page_source(&self) -> String;

    /// Whether the session can still serve requests
    fn is_alive(&self) -> bool;

    async fn quit(&mut self);
}

pub const DESKTOP_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
];

pub fn random_user_agent() -> &'static str {
    DESKTOP_USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(DESKTOP_USER_AGENTS[0])
}

/// Connection options shared by every session of an [`HttpDriver`]
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub timeout: Duration,
    /// Fixed user agent; a random desktop one per session when unset
    pub user_agent: Option<String>,
    pub proxy: Option<String>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
            proxy: None,
        }
    }
}

/// Plain HTTP driver on top of `reqwest`
pub struct HttpDriver {
    options: DriverOptions,
    client: Option<reqwest::Client>,
    current_url: String,
    source: String,
}

impl HttpDriver {
    pub fn new(options: DriverOptions) -> Self {
        Self {
            options,
            client: None,
            current_url: String::new(),
            source: String::new(),
        }
    }

    fn build_client(&self) -> Result<reqwest::Client> {
        let user_agent = self
            .options
            .user_agent
            .clone()
            .unwrap_or_else(|| random_user_agent().to_string());
        log::debug!("Starting HTTP session with user agent: {}", user_agent);

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let mut builder = reqwest::Client::builder()
            .timeout(self.options.timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(8));

        if let Some(proxy_url) = &self.options.proxy {
            log::debug!("Using proxy: {}", proxy_url);
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        Ok(builder.build()?)
    }
}

#[async_trait]
impl PageDriver for HttpDriver {
    async fn start(&mut self) -> Result<()> {
        self.client = Some(self.build_client()?);
        self.current_url.clear();
        self.source.clear();
        Ok(())
    }

    async fn goto(&mut self, url: &str) -> Result<()> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ScraperError::Driver("invalid session id: driver not started".into()))?;
        self.current_url.clear();
        self.source.clear();

        let response = client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ScraperError::Timeout(self.options.timeout.as_secs())
            } else {
                ScraperError::HttpError(e)
            }
        })?;

        let status = response.status();
        self.current_url = response.url().to_string();
        self.source = response.text().await?;

        // Challenge interstitials are served with 403/503; let the detector see them.
        if !status.is_success() && !crate::detect::is_challenge(&self.current_url, &self.source) {
            log::warn!("Non-success status code: {}", status.as_u16());
            return Err(ScraperError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(())
    }

    fn current_url(&self) -> String {
        self.current_url.clone()
    }

    fn page_source(&self) -> String {
        self.source.clone()
    }

    fn is_alive(&self) -> bool {
        self.client.is_some()
    }

    async fn quit(&mut self) {
        self.client = None;
    }
}

/// Lets scrapers hold any driver behind one fetcher type
#[async_trait]
impl<T: PageDriver + ?Sized> PageDriver for Box<T> {
    async fn start(&mut self) -> Result<()> {
        (**self).start().await
    }

    async fn goto(&mut self, url: &str) -> Result<()> {
        (**self).goto(url).await
    }

    fn current_url(&self) -> String {
        (**self).current_url()
    }

    fn page_source(&self) -> String {
        (**self).page_source()
    }

    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }

    async fn quit(&mut self) {
        (**self).quit().await
    }
}
