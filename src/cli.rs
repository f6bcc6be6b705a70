use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "wheel-scraper")]
#[command(about = "Scrape wheel listings from dealer parts sites into spreadsheets", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape the configured sites and export the results
    Run(RunArgs),
    /// Rebuild spreadsheets from checkpoint files without scraping
    Export(ExportArgs),
    /// List known and configured sites
    Sites(SitesArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Sites configuration file
    #[arg(short, long, default_value = "config/sites.json")]
    pub config: PathBuf,

    /// Only scrape these sites (can provide multiple)
    #[arg(short, long)]
    pub site: Vec<String>,

    /// Request timeout in seconds
    #[arg(short, long, default_value = "30")]
    pub timeout: u64,

    /// Custom user agent; a random desktop one per session when unset
    #[arg(short, long)]
    pub user_agent: Option<String>,

    /// Proxy URL (e.g., http://proxy.example.com:8080)
    #[arg(short, long)]
    pub proxy: Option<String>,

    /// Delay between product pages in milliseconds
    #[arg(short, long, default_value = "1000")]
    pub delay: u64,

    /// Attempts per page before giving up
    #[arg(short, long, default_value = "5")]
    pub retries: u32,

    /// Maximum number of products per site
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Maximum number of search result pages per site
    #[arg(long, default_value = "2000")]
    pub max_pages: u32,

    /// Sites scraped at the same time
    #[arg(long, default_value = "1")]
    pub concurrency: usize,

    /// Where per-site checkpoints are written
    #[arg(long, default_value = "data/checkpoints")]
    pub checkpoint_dir: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ExportArgs {
    /// Checkpoint files or directories
    #[arg(required = true)]
    pub checkpoints: Vec<PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SitesArgs {
    /// Also list the sites in this configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Extra formats written next to the workbook
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

#[derive(clap::Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output directory
    #[arg(short, long, default_value = "data/output")]
    pub output_dir: PathBuf,

    /// Also write one workbook per site
    #[arg(long)]
    pub split: bool,

    /// Plain workbooks without header styling or column widths
    #[arg(long)]
    pub no_formatting: bool,

    /// Extra output formats alongside the workbook
    #[arg(short, long, value_enum)]
    pub format: Vec<OutputFormat>,
}
