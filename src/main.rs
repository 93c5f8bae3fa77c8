use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod assets;
mod cli;
mod client;
mod config;
mod extractor;
mod merger;
mod models;
mod pipeline;
mod scrapers;
mod store;
mod traits;

use cli::{Cli, Command};
use config::Config;
use pipeline::CatalogPipeline;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    cli.apply(&mut config);
    config.validate()?;

    info!("Starting game catalog {:?}", cli.command);

    let pipeline = CatalogPipeline::new(config)?;
    let result = match cli.command {
        Command::Extract => pipeline.extract().await.map(|_| ()),
        Command::Merge => pipeline.merge().await.map(|_| ()),
        Command::Images => pipeline.download_images().await.map(|_| ()),
        Command::Run => pipeline.run_all().await,
    };

    if let Err(e) = &result {
        error!("Error: {:#}", e);
    }

    result
}
