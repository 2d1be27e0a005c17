//! Storage Layer
//!
//! Application directories and export of batch results to disk.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::batch::BatchResult;

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "datelens", "DateLens")
        .ok_or_else(|| anyhow::anyhow!("Could not determine application directories"))
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = project_dirs()?.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Write the text report of a batch
pub fn save_report(batch: &BatchResult, path: &Path) -> Result<()> {
    write_creating_parent(path, &batch.generate_report())?;
    info!("Saved report to {}", path.display());
    Ok(())
}

/// Write the JSON export of a batch
pub fn save_json(batch: &BatchResult, path: &Path) -> Result<()> {
    let json = batch.to_json().context("Failed to serialize batch result")?;
    write_creating_parent(path, &json)?;
    info!("Saved JSON export to {}", path.display());
    Ok(())
}

fn write_creating_parent(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
