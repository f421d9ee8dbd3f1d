use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$RUFOUS_HOME`, or `~/.rufous`.
pub fn rufous_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("RUFOUS_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".rufous"))
}

pub fn ensure_rufous_home() -> Result<PathBuf> {
    let dir = rufous_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn default_ledger_path() -> Result<PathBuf> {
    Ok(ensure_rufous_home()?.join("ledger.db"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_rufous_home()?.join("config.toml"))
}
