use anyhow::Result;
use clap::Parser;

use wheel_scraper::cli::{Args, Command};
use wheel_scraper::runner;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    let log_level = if args.verbose {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match &args.command {
        Command::Run(run) => {
            log::info!("Wheel scraper v{}", env!("CARGO_PKG_VERSION"));
            let report = runner::run(run).await?;
            for (site, error) in &report.failed_sites {
                log::warn!("{}: {}", site, error);
            }
            log::info!(
                "Scraped {} product(s) into {} row(s) from {} site(s)",
                report.products,
                report.rows,
                report.successful_sites.len()
            );
        }
        Command::Export(export) => {
            let files = runner::export(export)?;
            log::info!("Wrote {} file(s)", files.len());
        }
        Command::Sites(sites) => {
            for line in runner::list_sites(sites.config.as_deref())? {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
