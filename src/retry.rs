//! Error classification and recovery strategies for the page-fetch loop.
//!
//! Every failure seen while loading a page is mapped to an [`ErrorKind`];
//! the kind and the current attempt number select a [`Recovery`] that says
//! whether to retry, how long to wait, and whether the browser session must
//! be restarted first. [`ErrorHandler`] adds a per-kind circuit breaker on top.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use crate::error::ScraperError;

/// Errors of one kind tolerated inside the breaker window before stopping
pub const CIRCUIT_BREAKER_THRESHOLD: u32 = 20;
/// Window after which per-kind error counts are forgotten
pub const CIRCUIT_BREAKER_RESET: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Timeout,
    Blocked,
    InvalidSession,
    PageError,
    ElementNotFound,
    RateLimit,
    Captcha,
    Challenge,
    JavaScript,
    Memory,
    Unknown,
}

impl ErrorKind {
    /// Keyword classification of a free-form error message
    pub fn classify(message: &str) -> Self {
        let msg = message.to_lowercase();
        let has = |keys: &[&str]| keys.iter().any(|k| msg.contains(k));

        if has(&["connection", "network", "dns", "err_", "10060", "timeout", "timed out"]) {
            if has(&["timeout", "timed out"]) {
                return ErrorKind::Timeout;
            }
            return ErrorKind::Network;
        }
        if has(&["invalid session", "session id"]) {
            return ErrorKind::InvalidSession;
        }
        if has(&["blocked", "access denied", "403", "forbidden"]) {
            return ErrorKind::Blocked;
        }
        if has(&["rate limit", "too many requests", "429"]) {
            return ErrorKind::RateLimit;
        }
        if msg.contains("captcha") {
            return ErrorKind::Captcha;
        }
        if has(&["cloudflare", "cf-ray", "checking your browser", "just a moment", "ddos protection"]) {
            return ErrorKind::Challenge;
        }
        if has(&["404", "not found", "page error"]) {
            return ErrorKind::PageError;
        }
        if has(&["no such element", "element not found", "element not visible"]) {
            return ErrorKind::ElementNotFound;
        }
        if has(&["javascript", "js error"]) {
            return ErrorKind::JavaScript;
        }
        if msg.contains("memory") {
            return ErrorKind::Memory;
        }
        ErrorKind::Unknown
    }

    /// Classification of a library error, using structured data where it exists
    pub fn of(error: &ScraperError) -> Self {
        match error {
            ScraperError::HttpStatus { status, .. } => match status {
                403 => ErrorKind::Blocked,
                429 => ErrorKind::RateLimit,
                404 | 410 => ErrorKind::PageError,
                500..=599 => ErrorKind::Network,
                _ => ErrorKind::Unknown,
            },
            ScraperError::Timeout(_) => ErrorKind::Timeout,
            ScraperError::Blocked(_) => ErrorKind::Blocked,
            ScraperError::MissingContent(_) => ErrorKind::ElementNotFound,
            ScraperError::HttpError(e) if e.is_timeout() => ErrorKind::Timeout,
            ScraperError::HttpError(e) if e.is_connect() => ErrorKind::Network,
            other => Self::classify(&other.to_string()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Blocked => "blocked",
            ErrorKind::InvalidSession => "invalid_session",
            ErrorKind::PageError => "page_error",
            ErrorKind::ElementNotFound => "element_not_found",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Captcha => "captcha",
            ErrorKind::Challenge => "challenge",
            ErrorKind::JavaScript => "javascript_error",
            ErrorKind::Memory => "memory_error",
            ErrorKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    WaitAndRetry,
    WaitForContent,
    ExtendedWait,
    RestartSession,
    WaitForChallenge,
    Skip,
    UseFallback,
    Stop,
}

/// What to do after a failed attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Recovery {
    pub kind: ErrorKind,
    pub should_retry: bool,
    /// Jitter window in seconds
    pub wait: (f64, f64),
    pub action: RecoveryAction,
    pub restart_session: bool,
    pub message: String,
}

impl Recovery {
    /// Recovery table. `attempt` is 0-based.
    pub fn strategy(kind: ErrorKind, attempt: u32) -> Self {
        let a = attempt as f64;
        let (should_retry, wait, action, restart_session) = match kind {
            ErrorKind::Network => (attempt < 3, (5.0, 10.0), RecoveryAction::WaitAndRetry, false),
            ErrorKind::Timeout => (attempt < 3, (3.0, 8.0), RecoveryAction::WaitForContent, false),
            ErrorKind::Blocked => (
                attempt < 5,
                (30.0 + a * 10.0, 45.0 + a * 15.0),
                RecoveryAction::ExtendedWait,
                attempt >= 2,
            ),
            ErrorKind::InvalidSession => {
                (attempt < 3, (2.0, 5.0), RecoveryAction::RestartSession, true)
            }
            ErrorKind::RateLimit => (attempt < 3, (60.0, 120.0), RecoveryAction::ExtendedWait, false),
            ErrorKind::Captcha => (false, (0.0, 0.0), RecoveryAction::Stop, false),
            ErrorKind::Challenge => (true, (5.0, 15.0), RecoveryAction::WaitForChallenge, false),
            ErrorKind::PageError => (attempt < 2, (2.0, 5.0), RecoveryAction::Skip, false),
            ErrorKind::ElementNotFound => (attempt < 2, (1.0, 3.0), RecoveryAction::UseFallback, false),
            ErrorKind::JavaScript | ErrorKind::Memory | ErrorKind::Unknown => {
                (attempt < 2, (3.0, 6.0), RecoveryAction::WaitAndRetry, false)
            }
        };
        Self {
            kind,
            should_retry,
            wait,
            action,
            restart_session,
            message: format!("Error type: {}, Strategy: {:?}", kind.as_str(), action),
        }
    }

    fn stop(kind: ErrorKind) -> Self {
        Self {
            kind,
            should_retry: false,
            wait: (0.0, 0.0),
            action: RecoveryAction::Stop,
            restart_session: false,
            message: format!(
                "Circuit breaker triggered for {} - too many consecutive errors",
                kind.as_str()
            ),
        }
    }

    /// Random delay inside the wait window
    pub fn delay(&self) -> Duration {
        jitter(self.wait.0..=self.wait.1)
    }
}

/// Uniform random duration (seconds) inside `range`
pub fn jitter(range: RangeInclusive<f64>) -> Duration {
    let (lo, hi) = (*range.start(), *range.end());
    if hi <= lo {
        return Duration::from_secs_f64(lo.max(0.0));
    }
    Duration::from_secs_f64(rand::thread_rng().gen_range(lo..=hi))
}

/// Classifies errors, tracks them per kind and trips a circuit breaker
#[derive(Debug, Default)]
pub struct ErrorHandler {
    counts: HashMap<ErrorKind, u32>,
    last_seen: HashMap<ErrorKind, Instant>,
}

impl ErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, kind: ErrorKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    fn record(&mut self, kind: ErrorKind) {
        let now = Instant::now();
        if let Some(last) = self.last_seen.get(&kind) {
            if now.duration_since(*last) > CIRCUIT_BREAKER_RESET {
                self.counts.insert(kind, 0);
            }
        }
        *self.counts.entry(kind).or_insert(0) += 1;
        self.last_seen.insert(kind, now);
    }

    fn should_continue(&self, kind: ErrorKind) -> bool {
        if matches!(kind, ErrorKind::Captcha | ErrorKind::Memory) {
            return false;
        }
        if self.count(kind) >= CIRCUIT_BREAKER_THRESHOLD {
            let recent = self
                .last_seen
                .get(&kind)
                .map(|t| t.elapsed() < CIRCUIT_BREAKER_RESET)
                .unwrap_or(false);
            if recent {
                log::error!(
                    "Circuit breaker triggered for {} - too many consecutive errors",
                    kind.as_str()
                );
                return false;
            }
        }
        true
    }

    /// Classify, record and pick a recovery for `error` on 0-based `attempt`
    pub fn handle(&mut self, error: &ScraperError, attempt: u32) -> Recovery {
        self.handle_kind(ErrorKind::of(error), attempt)
    }

    pub fn handle_kind(&mut self, kind: ErrorKind, attempt: u32) -> Recovery {
        self.record(kind);
        if !self.should_continue(kind) {
            return Recovery::stop(kind);
        }
        Recovery::strategy(kind, attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_messages() {
        assert_eq!(ErrorKind::classify("Connection reset by peer"), ErrorKind::Network);
        assert_eq!(ErrorKind::classify("operation timed out"), ErrorKind::Timeout);
        assert_eq!(ErrorKind::classify("invalid session id"), ErrorKind::InvalidSession);
        assert_eq!(ErrorKind::classify("Access Denied"), ErrorKind::Blocked);
        assert_eq!(ErrorKind::classify("Too Many Requests"), ErrorKind::RateLimit);
        assert_eq!(ErrorKind::classify("solve this CAPTCHA"), ErrorKind::Captcha);
        assert_eq!(ErrorKind::classify("Just a moment..."), ErrorKind::Challenge);
        assert_eq!(ErrorKind::classify("page not found"), ErrorKind::PageError);
        assert_eq!(ErrorKind::classify("something odd"), ErrorKind::Unknown);
    }

    #[test]
    fn classifies_status_codes() {
        let status = |status| ScraperError::HttpStatus { status, url: "https://x.test/a".into() };
        assert_eq!(ErrorKind::of(&status(403)), ErrorKind::Blocked);
        assert_eq!(ErrorKind::of(&status(429)), ErrorKind::RateLimit);
        assert_eq!(ErrorKind::of(&status(404)), ErrorKind::PageError);
        assert_eq!(ErrorKind::of(&status(503)), ErrorKind::Network);
        assert_eq!(ErrorKind::of(&ScraperError::Timeout(30)), ErrorKind::Timeout);
    }

    #[test]
    fn blocked_wait_scales_with_attempt() {
        let first = Recovery::strategy(ErrorKind::Blocked, 0);
        let third = Recovery::strategy(ErrorKind::Blocked, 2);
        assert_eq!(first.wait, (30.0, 45.0));
        assert_eq!(third.wait, (50.0, 75.0));
        assert!(!first.restart_session);
        assert!(third.restart_session);
        assert!(!Recovery::strategy(ErrorKind::Blocked, 5).should_retry);
    }

    #[test]
    fn captcha_never_retries() {
        let mut handler = ErrorHandler::new();
        let r = handler.handle_kind(ErrorKind::Captcha, 0);
        assert!(!r.should_retry);
        assert_eq!(r.action, RecoveryAction::Stop);
    }

    #[test]
    fn circuit_breaker_trips() {
        let mut handler = ErrorHandler::new();
        for _ in 0..CIRCUIT_BREAKER_THRESHOLD - 1 {
            assert!(handler.handle_kind(ErrorKind::Challenge, 0).should_retry);
        }
        let r = handler.handle_kind(ErrorKind::Challenge, 0);
        assert!(!r.should_retry);
        assert!(r.message.contains("Circuit breaker"));
    }

    #[tokio::test(start_paused = true)]
    async fn breaker_counts_reset_after_quiet_window() {
        let mut handler = ErrorHandler::new();
        for _ in 0..CIRCUIT_BREAKER_THRESHOLD - 1 {
            handler.handle_kind(ErrorKind::Network, 0);
        }
        assert_eq!(handler.count(ErrorKind::Network), CIRCUIT_BREAKER_THRESHOLD - 1);

        tokio::time::advance(CIRCUIT_BREAKER_RESET + Duration::from_secs(1)).await;
        let r = handler.handle_kind(ErrorKind::Network, 0);
        assert!(r.should_retry);
        assert_eq!(handler.count(ErrorKind::Network), 1);
    }

    #[test]
    fn jitter_stays_in_window() {
        for _ in 0..50 {
            let d = jitter(1.0..=2.0);
            assert!(d >= Duration::from_secs(1) && d <= Duration::from_secs(2));
        }
        assert_eq!(jitter(3.0..=3.0), Duration::from_secs(3));
    }
}
