//! Scan command - show which model each file maps to

use crate::cli::app::ScanArgs;
use anyhow::{Context, Result};
use model_deployer_core::ModelId;
use model_deployer_core::monitor::Scanner;
use std::path::PathBuf;

pub async fn execute(args: ScanArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config_path.as_deref())?;
    let dir = match args.dir {
        Some(dir) => dir,
        None => config.model_dir().context("No directory given and none configured")?.to_path_buf(),
    };

    let snapshot = Scanner::new(&dir).scan().await?;

    println!("Scanning: {}", dir.display());
    for line in describe(&snapshot) {
        println!("  {}", line);
    }

    let models = snapshot.identifiers();
    println!("\n{} files, {} models", snapshot.len(), models.len());
    if snapshot.skipped > 0 {
        println!("{} entries could not be read", snapshot.skipped);
    }

    Ok(())
}

/// One line per file: `name -> id`, or why it is ignored
fn describe(snapshot: &model_deployer_core::monitor::Snapshot) -> Vec<String> {
    snapshot
        .iter()
        .map(|entry| {
            let name = entry.path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            match ModelId::from_path(&entry.path) {
                Some(id) => format!("{} -> {}", name, id),
                None => format!("{} (ignored: no model identifier)", name),
            }
        })
        .collect()
}
