use thiserror::Error;

/// Errors raised by the scraping library
#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("Driver error: {0}")]
    Driver(String),
    #[error("Timeout: page took longer than {0} seconds")]
    Timeout(u64),
    #[error("Insufficient HTML content: {0} chars")]
    InsufficientContent(usize),
    #[error("Blocked page served for {0}")]
    Blocked(String),
    #[error("Expected content missing on {0}")]
    MissingContent(String),
    #[error("Session restart failed after {0} attempts")]
    SessionRestart(u32),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Export failed: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScraperError>;
