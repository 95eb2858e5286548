// src/main.rs

mod carbon;
mod cli;
mod clustering;
mod config;
mod decision;
mod encroachment;
mod error;
mod pipeline;
mod raster;
mod report;
mod temporal;
mod types;
mod vegetation;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use cli::Cli;
use report::OutputRecord;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use types::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the single result line, diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("forest_audit=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let record = match run().await {
        Ok(record) => record,
        Err(e) => {
            error!("Audit failed: {:#}", e);
            OutputRecord::error(e.to_string())
        }
    };

    record.emit(&mut std::io::stdout().lock())
}

async fn run() -> Result<OutputRecord> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let message = e.kind().to_string();
            return Ok(OutputRecord::error(format!("Invalid arguments: {}", message)));
        }
    };
    let request = cli.into_request()?;

    info!("🌍 Forest audit starting");
    info!("  current:    {}", request.current.display());
    info!("  historical: {}", request.historical.display());
    info!("  high-res:   {}", request.high_res.display());

    let config = Config::resolve()?;
    let detector = pipeline::build_detector(&config)?;

    let report = pipeline::run_audit(&request, &config, &detector).await?;
    info!(
        "✓ Audit complete: {} (biomass {:.2}, carbon {}t)",
        report.status.as_str(),
        report.biomass_score,
        report.carbon_tonnes
    );

    Ok(OutputRecord::Report(report))
}
