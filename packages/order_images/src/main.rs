//! A CLI tool that keeps local copies of the images referenced by an orders export.
//!
//! It reads a JSON file of orders, creates `delivery_photos/` and
//! `product_thumbnails/` next to it, and downloads every delivery photo and
//! product thumbnail that is not already on disk. Images that fail are listed
//! at the end without stopping the others.

mod config;
mod download;
mod error;
mod loader;
mod models;
mod orchestrate;
mod paths;
#[cfg(test)]
mod test_support;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Args, Settings};
use log::{error, info};
use orchestrate::{Report, run};

fn print_report(report: &Report) {
    println!(
        "Downloaded: {}, skipped: {}, failed: {}",
        report.downloaded(),
        report.skipped(),
        report.failed()
    );
    for (outcome, e) in report.failures() {
        let label = outcome.label.as_deref().unwrap_or("-");
        match &outcome.destination {
            Some(path) => println!(
                "  FAILED {} [{}] {} -> {}: {}",
                outcome.kind,
                label,
                outcome.url,
                path.display(),
                e
            ),
            None => println!("  FAILED {} [{}] {}: {}", outcome.kind, label, outcome.url, e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = Settings::resolve(&args)?;

    let report = run(&args.orders, &settings)
        .await
        .with_context(|| format!("Failed to process {}", args.orders.display()))?;

    print_report(&report);
    if report.failed() > 0 {
        error!("{} image(s) could not be downloaded", report.failed());
    } else {
        info!("All referenced images are present");
    }

    Ok(())
}
