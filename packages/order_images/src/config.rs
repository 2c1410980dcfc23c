use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Command-line arguments for the order image downloader
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the orders JSON file; images are saved next to it
    pub orders: PathBuf,
    /// Optional settings file in YAML format
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Maximum number of downloads in flight (1 = sequential)
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,
    /// Per-request timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,
    /// Hide download progress bars
    #[arg(long)]
    pub no_progress: bool,
}

/// Settings file structure
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Maximum number of downloads in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Per-request timeout in seconds, none by default
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Whether to draw progress bars
    #[serde(default = "default_progress")]
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: None,
            user_agent: default_user_agent(),
            progress: default_progress(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}
fn default_user_agent() -> String {
    format!("order-images/{}", env!("CARGO_PKG_VERSION"))
}
fn default_progress() -> bool {
    true
}

/// Effective run settings after merging the settings file and the flags
#[derive(Debug, Clone)]
pub struct Settings {
    pub concurrency: usize,
    pub timeout: Option<Duration>,
    pub user_agent: String,
    pub progress: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(Config::default())
    }
}

impl Settings {
    fn from_config(config: Config) -> Self {
        Self {
            concurrency: config.concurrency,
            timeout: config.timeout_secs.map(Duration::from_secs),
            user_agent: config.user_agent,
            progress: config.progress,
        }
    }

    /// Builds the settings for a run. Flags override the settings file.
    pub fn resolve(args: &Args) -> Result<Self> {
        let config = match &args.config {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };

        let mut settings = Self::from_config(config);
        if let Some(concurrency) = args.concurrency {
            settings.concurrency = concurrency;
        }
        if let Some(secs) = args.timeout {
            settings.timeout = Some(Duration::from_secs(secs));
        }
        if args.no_progress {
            settings.progress = false;
        }

        if settings.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        Ok(settings)
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let config_file = File::open(path)
        .with_context(|| format!("Failed to open config file {}", path.display()))?;
    let reader = BufReader::new(config_file);
    serde_yaml::from_reader(reader).context("Failed to parse config YAML")
}
