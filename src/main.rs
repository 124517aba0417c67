//! encore - karaoke video library scraper and API server.
//!
//! Usage:
//!   encore serve [--config FILE]          Run the HTTP API
//!   encore scrape PATH [--config FILE]    Scrape one directory and print the result
//!   encore presets [--config FILE]        List filename presets
//!   encore --help                         Show help

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{bail, Context, Result};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use encore_core::{MemoryCatalog, ScrapeStatus};
use encore_scrape::{PresetTable, ScrapeEngine};
use encore_server::{logging, shutdown_signal, AppConfig, ConfigSource};

#[derive(Parser)]
#[command(
    name = "encore",
    version,
    about = "Karaoke video library scraper",
    long_about = "encore walks directories of karaoke videos, extracts metadata from \
                  their content and file names, and keeps a catalog of them.\n\n\
                  Run `encore serve` for the HTTP API or `encore scrape PATH` for a \
                  one-shot scrape."
)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API until interrupted
    Serve,

    /// Scrape one directory into a fresh catalog and print the result
    Scrape {
        /// Directory to scrape
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List the available filename presets
    Presets,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let (config, source) =
        AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    logging::set_log(&config.log.level);
    match source {
        ConfigSource::Missing(path) => {
            warn!(path = %path.display(), "Config file not found, using defaults")
        }
        ConfigSource::File(path) => debug!(path = %path.display(), "Loaded config file"),
        ConfigSource::Defaults => {}
    }

    match cli.command {
        Command::Serve => run_serve(config).await,
        Command::Scrape { path, format } => run_scrape(config, &path, format).await,
        Command::Presets => run_presets(&config),
    }
}

async fn run_serve(config: AppConfig) -> Result<()> {
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Cannot listen on {}", config.listen))?;
    encore_server::serve(config, listener, shutdown_signal())
        .await
        .context("Server failed")
}

async fn run_scrape(config: AppConfig, path: &Path, format: OutputFormat) -> Result<()> {
    let catalog = Arc::new(MemoryCatalog::new());
    let engine = ScrapeEngine::from_config(&config.scrape, catalog.clone())
        .context("Invalid scrape configuration")?;

    let queued = engine.start(path).await.context("Scrape rejected")?;
    info!(root = %queued.root_path.display(), "Scraping");

    let record = tokio::select! {
        record = engine.wait(&queued.root_path) => record?,
        _ = shutdown_signal() => {
            engine.stop_all().await?;
            engine.status(&queued.root_path).await?
        }
    };
    let Some(record) = record else {
        bail!("Scrape of {} disappeared", queued.root_path.display());
    };

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "scrape": record,
                "videos": catalog.list(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("{}", "─".repeat(60));
            println!(" {} - {}", record.root_path.display(), record.status);
            println!(
                " {} scraped ({} new, {} updated), {} skipped",
                record.files_scraped, record.new_files, record.updated_files, record.files_skipped
            );
            if let Some(reason) = &record.failure_reason {
                println!(" Failed: {reason}");
            }
            println!("{}", "─".repeat(60));
            for video in catalog.list() {
                println!(
                    " {:<30} {:<20} {:<6} {}",
                    video.title,
                    video.artist,
                    video.language,
                    video.file_name.display()
                );
            }
        }
    }

    if record.status == ScrapeStatus::Failed {
        bail!("Scrape failed");
    }
    Ok(())
}

fn run_presets(config: &AppConfig) -> Result<()> {
    let presets = PresetTable::with_custom(&config.scrape.custom_presets)
        .context("Invalid custom preset")?;

    for preset in presets.iter() {
        let active = config
            .scrape
            .filename_presets
            .iter()
            .any(|name| name == preset.name());
        let fields: Vec<String> = preset
            .fields()
            .iter()
            .map(|(field, index)| format!("{field}={index}"))
            .collect();
        println!(
            "{} {}\n    {}\n    {}",
            if active { "*" } else { " " },
            preset.name(),
            preset.pattern().as_str(),
            fields.join(", ")
        );
    }
    Ok(())
}
