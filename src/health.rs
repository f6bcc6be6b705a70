use chrono::{DateTime, Local};
use serde::Serialize;

/// Request counters kept by every page fetcher
#[derive(Debug, Clone, Default, Serialize)]
pub struct Health {
    pub consecutive_failures: u32,
    pub total_requests: u32,
    pub successful_requests: u32,
    pub last_success: Option<DateTime<Local>>,
    pub last_failure: Option<DateTime<Local>>,
}

impl Health {
    pub fn record_attempt(&mut self) {
        self.total_requests += 1;
    }

    pub fn record_success(&mut self) {
        self.successful_requests += 1;
        self.consecutive_failures = 0;
        self.last_success = Some(Local::now());
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        self.last_failure = Some(Local::now());
    }

    /// Percentage of successful requests; 0 before the first request
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.successful_requests as f64 / self.total_requests as f64 * 100.0
    }

    pub fn is_healthy(&self) -> bool {
        self.consecutive_failures < 5
    }

    /// Whether the scraper should keep going at all
    pub fn check(&self) -> bool {
        if self.consecutive_failures >= 10 {
            log::error!("Too many consecutive failures, scraper unhealthy");
            return false;
        }
        if self.total_requests > 20 {
            let rate = self.success_rate();
            if rate < 20.0 {
                log::error!("Success rate too low ({:.1}%), scraper unhealthy", rate);
                return false;
            }
        }
        true
    }

    pub fn summary(&self) -> String {
        format!(
            "{:.1}% success rate, {} consecutive failures ({} of {} requests ok)",
            self.success_rate(),
            self.consecutive_failures,
            self.successful_requests,
            self.total_requests
        )
    }
}
