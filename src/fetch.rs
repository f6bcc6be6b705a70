//! The shared page-fetch loop every site scraper goes through.
//!
//! `get_page` is a bounded retry state machine: load, look for a challenge or
//! block page, wait it out with jittered backoff, restart the session after
//! repeated blocks, and give up with `Ok(None)` once the budget is spent.
//! Only a session that cannot be restarted surfaces as `Err`.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::detect;
use crate::driver::PageDriver;
use crate::error::{Result, ScraperError};
use crate::health::Health;
use crate::retry::{jitter, ErrorHandler, RecoveryAction};

/// Timing and budget knobs for [`PageFetcher`]
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Attempts per page, including the first
    pub max_retries: u32,
    /// Jitter window (seconds) waited after navigation before reading the page
    pub settle: (f64, f64),
    /// Jitter window (seconds) before reloading a page stuck on a challenge
    pub block_backoff: (f64, f64),
    /// How long to wait for a challenge to clear on its own
    pub challenge_timeout: Duration,
    pub challenge_poll: Duration,
    /// Consecutive unresolved challenges before the session is restarted
    pub restart_after_blocks: u32,
    /// Session restart attempts before giving up on the driver
    pub restart_attempts: u32,
    /// How long to keep polling for content after a page-load timeout
    pub content_wait: Duration,
    /// Pages shorter than this are treated as failed loads
    pub min_html: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            settle: (0.5, 1.5),
            block_backoff: (10.0, 15.0),
            challenge_timeout: Duration::from_secs(30),
            challenge_poll: Duration::from_secs(2),
            restart_after_blocks: 2,
            restart_attempts: 3,
            content_wait: Duration::from_secs(8),
            min_html: 100,
        }
    }
}

pub struct PageFetcher<D: PageDriver> {
    site: String,
    driver: D,
    settings: FetchSettings,
    errors: ErrorHandler,
    health: Health,
}

impl<D: PageDriver> PageFetcher<D> {
    pub fn new(site: &str, driver: D, settings: FetchSettings) -> Self {
        Self {
            site: site.to_string(),
            driver,
            settings,
            errors: ErrorHandler::new(),
            health: Health::default(),
        }
    }

    pub fn health(&self) -> &Health {
        &self.health
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Start the driver if it is not running
    pub async fn ensure_driver(&mut self) -> Result<()> {
        if self.driver.is_alive() {
            return Ok(());
        }
        self.restart_session().await
    }

    /// Tear down the current session and start a new one, with progressive backoff
    pub async fn restart_session(&mut self) -> Result<()> {
        let attempts = self.settings.restart_attempts;
        for attempt in 1..=attempts {
            log::warn!(
                "[{}] (Re)starting driver session (attempt {}/{})",
                self.site,
                attempt,
                attempts
            );
            self.driver.quit().await;
            match self.driver.start().await {
                Ok(()) => {
                    log::info!("[{}] Driver session ready", self.site);
                    return Ok(());
                }
                Err(e) if attempt < attempts => {
                    log::warn!("[{}] Driver start failed: {}", self.site, e);
                    sleep(Duration::from_secs(2 * attempt as u64)).await;
                }
                Err(e) => {
                    log::error!(
                        "[{}] Failed to start driver after {} attempts: {}",
                        self.site,
                        attempts,
                        e
                    );
                }
            }
        }
        Err(ScraperError::SessionRestart(attempts))
    }

    /// Fetch a page; `Ok(None)` when it could not be loaded within the retry budget
    pub async fn get_page(&mut self, url: &str) -> Result<Option<String>> {
        self.get_page_where(url, |_| true).await
    }

    /// Like [`get_page`](Self::get_page), but a page failing `accept` counts as
    /// a failed load (missing element) and is retried.
    pub async fn get_page_where<F>(&mut self, url: &str, accept: F) -> Result<Option<String>>
    where
        F: Fn(&str) -> bool + Send,
    {
        let max = self.settings.max_retries;
        let mut attempt = 0u32;
        let mut unresolved_challenges = 0u32;

        while attempt < max {
            self.health.record_attempt();
            log::info!("Fetching: {} (attempt {}/{})", url, attempt + 1, max);

            if let Err(e) = self.ensure_driver().await {
                self.health.record_failure();
                return Err(e);
            }

            let outcome = match self.load(url).await {
                Ok(Some(html)) if accept(&html) => Ok(Some(html)),
                Ok(Some(_)) => Err(ScraperError::MissingContent(url.to_string())),
                other => other,
            };

            match outcome {
                Ok(Some(html)) => {
                    self.health.record_success();
                    return Ok(Some(html));
                }
                Ok(None) => {
                    unresolved_challenges += 1;
                    attempt += 1;
                    if attempt >= max {
                        break;
                    }
                    if unresolved_challenges >= self.settings.restart_after_blocks {
                        log::warn!(
                            "[{}] {} unresolved challenges in a row, restarting session",
                            self.site,
                            unresolved_challenges
                        );
                        if let Err(e) = self.restart_session().await {
                            self.health.record_failure();
                            return Err(e);
                        }
                        unresolved_challenges = 0;
                    }
                    let (lo, hi) = self.settings.block_backoff;
                    let delay = jitter(lo..=hi);
                    log::warn!("Retrying page load in {:.1}s...", delay.as_secs_f64());
                    sleep(delay).await;
                }
                Err(e) => {
                    let recovery = self.errors.handle(&e, attempt);
                    log::debug!("{}: {}", e, recovery.message);

                    if !recovery.should_retry {
                        log::error!("Unrecoverable error fetching {}: {} ({})", url, e, recovery.message);
                        self.health.record_failure();
                        return Ok(None);
                    }

                    if recovery.action == RecoveryAction::WaitForContent {
                        if let Some(html) = self.wait_for_content().await {
                            if accept(&html) {
                                self.health.record_success();
                                return Ok(Some(html));
                            }
                        }
                    }

                    if recovery.restart_session {
                        if let Err(restart) = self.restart_session().await {
                            self.health.record_failure();
                            return Err(restart);
                        }
                    }

                    if attempt + 1 >= max {
                        break;
                    }
                    let delay = recovery.delay();
                    log::warn!("{}, retrying in {:.1}s...", recovery.message, delay.as_secs_f64());
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }

        self.health.record_failure();
        log::error!("Failed to fetch {} after {} attempts", url, max);
        Ok(None)
    }

    /// One navigation. `Ok(None)` means a challenge was served and did not clear.
    async fn load(&mut self, url: &str) -> Result<Option<String>> {
        self.driver.goto(url).await?;

        let current = self.driver.current_url();
        if detect::is_connection_error_url(&current) {
            return Err(ScraperError::Driver(format!(
                "Connection error detected: {}",
                current
            )));
        }

        let (lo, hi) = self.settings.settle;
        sleep(jitter(lo..=hi)).await;

        if detect::is_challenge(&current, &self.driver.page_source()) {
            log::info!("Bot challenge detected on {} - waiting for it to clear...", url);
            if !self.wait_for_challenge(url).await? {
                return Ok(None);
            }
        }

        let html = self.driver.page_source();
        if html.len() < self.settings.min_html {
            return Err(ScraperError::InsufficientContent(html.len()));
        }
        if detect::is_blocked(&html) {
            return Err(ScraperError::Blocked(url.to_string()));
        }
        Ok(Some(html))
    }

    fn challenge_cleared(&self) -> bool {
        let current = self.driver.current_url();
        let html = self.driver.page_source();
        !detect::is_challenge(&current, &html) && detect::has_real_content(&current, &html)
    }

    /// Poll for up to `challenge_timeout` until the interstitial goes away
    async fn poll_challenge(&mut self) -> bool {
        let started = Instant::now();
        while started.elapsed() < self.settings.challenge_timeout {
            sleep(self.settings.challenge_poll).await;
            if self.challenge_cleared() {
                log::info!(
                    "Challenge cleared after {:.1}s",
                    started.elapsed().as_secs_f64()
                );
                return true;
            }
        }
        false
    }

    /// Wait the challenge out, then reload once and wait a second full round
    pub async fn wait_for_challenge(&mut self, target_url: &str) -> Result<bool> {
        if self.poll_challenge().await {
            return Ok(true);
        }

        log::warn!(
            "Challenge still present after {:.1}s, reloading once",
            self.settings.challenge_timeout.as_secs_f64()
        );
        if let Err(e) = self.driver.goto(target_url).await {
            log::warn!("Reload after challenge failed: {}", e);
            return Ok(false);
        }
        if self.poll_challenge().await {
            return Ok(true);
        }
        Ok(self.challenge_cleared())
    }

    /// After a load timeout, keep reading the page until it looks complete
    async fn wait_for_content(&mut self) -> Option<String> {
        let started = Instant::now();
        while started.elapsed() < self.settings.content_wait {
            let html = self.driver.page_source();
            if html.len() > 8000 && crate::parse::body_text_len(&html) > 500 {
                log::info!(
                    "Full content loaded after additional {:.1}s wait ({} chars)",
                    started.elapsed().as_secs_f64(),
                    html.len()
                );
                return Some(html);
            }
            sleep(Duration::from_millis(500)).await;
        }
        log::warn!("Full content not loaded after extended wait");
        None
    }

    /// Retry a fallible operation under the same error policy, `None` once exhausted
    pub async fn safe_execute<T, F, Fut>(&mut self, name: &str, max_retries: u32, mut op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        while attempt < max_retries {
            match op().await {
                Ok(value) => return Some(value),
                Err(e) => {
                    let recovery = self.errors.handle(&e, attempt);
                    if !recovery.should_retry || attempt + 1 >= max_retries {
                        log::warn!("{} failed after {} attempts: {}", name, attempt + 1, e);
                        return None;
                    }
                    let delay = recovery.delay();
                    log::debug!("Retrying {} in {:.1}s...", name, delay.as_secs_f64());
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
        None
    }

    /// Quit the driver and report final health
    pub async fn close(&mut self) {
        self.driver.quit().await;
        log::info!("[{}] Driver closed. Final health: {}", self.site, self.health.summary());
    }
}
