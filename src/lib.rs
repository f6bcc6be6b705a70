//! Wheel listing scraper for dealer parts websites.
//!
//! Sites are scraped through a [`fetch::PageFetcher`], which wraps a
//! [`driver::PageDriver`] in a bounded retry loop that recognises bot
//! challenges and block pages. Scraped [`model::Product`]s are flattened into
//! spreadsheet rows by [`processor`] and written out by [`xlsx`] and [`export`].

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod detect;
pub mod driver;
pub mod error;
pub mod export;
pub mod fetch;
pub mod health;
pub mod model;
pub mod parse;
pub mod processor;
pub mod retry;
pub mod runner;
pub mod sites;
pub mod xlsx;

pub use error::{Result, ScraperError};
