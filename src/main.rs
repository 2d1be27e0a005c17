//! DateLens - production date recognition for product packaging photos
//!
//! Reads OCR output for each image through the sidecar engine, extracts
//! production dates and prints a batch report.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use date_lens::batch::{collect_images, BatchProcessor};
use date_lens::config::{self, AppConfig};
use date_lens::recognition::DateRecognizer;
use date_lens::storage;
use date_lens::vision::SidecarOcrEngine;

/// DateLens - find production dates on packaging photos
#[derive(Parser, Debug)]
#[command(name = "date-lens")]
#[command(about = "Recognize and normalize production dates in product photos")]
struct Args {
    /// Image files or folders to process
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Configuration file (defaults to config.toml in the config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short, long)]
    workers: Option<usize>,

    /// Per-image timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Only scan the top level of folders
    #[arg(long)]
    no_recursive: bool,

    /// Print the JSON export instead of the text report
    #[arg(long)]
    json: bool,

    /// Also write the text report to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Also write the JSON export to this file
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG takes precedence
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => load_or_default_config(),
    };
    apply_overrides(&mut config, &args);
    config.validate()?;

    let engine = Arc::new(SidecarOcrEngine::new());
    let recognizer = Arc::new(DateRecognizer::new(&config, engine)?);
    let processor = BatchProcessor::new(&config, recognizer)?;

    let images = collect_images(&args.paths, &config.scan)?;
    info!("Processing {} image(s) with {} worker(s)", images.len(), processor.workers());

    let batch = processor.process_paths(describe_source(&args.paths), &images);

    if args.json {
        println!("{}", batch.to_json()?);
    } else {
        print!("{}", batch.generate_report());
    }

    if let Some(path) = &args.report {
        storage::save_report(&batch, path)?;
    }
    if let Some(path) = &args.export {
        storage::save_json(&batch, path)?;
    }

    Ok(())
}

/// Load configuration from the config directory or fall back to defaults
fn load_or_default_config() -> AppConfig {
    if let Ok(config_dir) = storage::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            match config::load_config(&config_path) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", config_path);
                    return config;
                }
                Err(e) => warn!("Ignoring unreadable configuration {:?}: {}", config_path, e),
            }
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(workers) = args.workers {
        config.performance.max_workers = workers;
    }
    if let Some(timeout) = args.timeout {
        config.performance.single_image_timeout_secs = timeout;
    }
    if args.no_recursive {
        config.scan.recursive = false;
    }
}

fn describe_source(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
