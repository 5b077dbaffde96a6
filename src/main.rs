//! downtimerobot - service uptime monitor
//!
//! Probes the configured services, appends each result to the historic
//! data file and generates uptime statistics as static JSON files.

mod cli;
mod config;
mod crawler;
mod probe;
mod statistics;
mod store;

use cli::{Cli, Commands};
use config::Settings;

use chrono::Local;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("downtimerobot=info".parse()?))
        .init();

    let cli = Cli::parse();
    let settings = cli.overrides.apply(Settings::load());
    tracing::debug!("Using settings {:?}", settings);

    match cli.command {
        Commands::Crawl => {
            crawler::crawl_services(&settings).await?;
        }
        Commands::Stats => {
            let services = crawler::load_services(&settings)?;
            write_statistics(&settings, &services)?;
        }
        Commands::Run => {
            let services = crawler::crawl_services(&settings).await?;
            write_statistics(&settings, &services)?;
        }
    }

    Ok(())
}

fn write_statistics(
    settings: &Settings,
    services: &[crawler::MonitoredService],
) -> Result<(), statistics::ExportError> {
    let (list, details) = statistics::generate(services, &Local::now());
    tracing::info!(
        "{} up, {} down, {} disabled",
        list.statistics.counts.up,
        list.statistics.counts.down,
        list.statistics.counts.disabled
    );
    statistics::write_assets(&settings.output_dir, &list, &details)
}
