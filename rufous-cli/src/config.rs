use anyhow::{Context, Result, anyhow, ensure};
use chrono_tz::Tz;
use rufous_core::{Category, CategorySet};
use rufous_finance::ExecutorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::default_ledger_path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ledger: LedgerSection,
    pub query: QuerySection,

    /// Replaces the built-in category set when present. Order is priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    /// SQLite file (default: ~/.rufous/ledger.db)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySection {
    pub default_top_n: usize,
    pub max_top_n: usize,
    pub max_rows: usize,
    pub max_series_points: usize,
    /// IANA zone used for "today" when `ask` gets no `--now`
    pub timezone: String,
}

impl Default for QuerySection {
    fn default() -> Self {
        let limits = ExecutorConfig::default();
        Self {
            default_top_n: limits.default_top_n,
            max_top_n: limits.max_top_n,
            max_rows: limits.max_rows,
            max_series_points: limits.max_series_points,
            timezone: "America/Toronto".to_string(),
        }
    }
}

/// What `config init` found at the target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Written,
    AlreadyPresent,
}

impl Config {
    /// Parse and check a config file's text. Every mistake is reported
    /// here, before any command runs.
    pub fn from_toml(text: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// A missing file is the default configuration.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text).with_context(|| format!("load {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).context("serialize config")?;
        fs::write(path, text).with_context(|| format!("write {}", path.display()))
    }

    /// Write the defaults unless a file is already there.
    pub fn init(path: &Path) -> Result<InitOutcome> {
        if path.exists() {
            return Ok(InitOutcome::AlreadyPresent);
        }
        Self::default().save(path)?;
        Ok(InitOutcome::Written)
    }

    fn validate(&self) -> Result<()> {
        self.timezone()?;
        let q = &self.query;
        ensure!(q.max_top_n > 0, "query.max_top_n must be at least 1");
        ensure!(
            (1..=q.max_top_n).contains(&q.default_top_n),
            "query.default_top_n must be between 1 and query.max_top_n ({})",
            q.max_top_n
        );
        ensure!(q.max_rows > 0, "query.max_rows must be at least 1");
        ensure!(q.max_series_points > 0, "query.max_series_points must be at least 1");
        if let Some(categories) = &self.categories {
            if let Some(blank) = categories.iter().position(|c| c.label.trim().is_empty()) {
                return Err(anyhow!("categories[{blank}] has an empty label"));
            }
        }
        Ok(())
    }

    pub fn ledger_path(&self) -> Result<PathBuf> {
        match &self.ledger.path {
            Some(p) => Ok(p.clone()),
            None => default_ledger_path(),
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            default_top_n: self.query.default_top_n,
            max_top_n: self.query.max_top_n,
            max_rows: self.query.max_rows,
            max_series_points: self.query.max_series_points,
        }
    }

    pub fn category_set(&self) -> CategorySet {
        match &self.categories {
            Some(categories) => CategorySet::new(categories.clone()),
            None => CategorySet::builtin(),
        }
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.query
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("query.timezone {:?}: {e}", self.query.timezone))
    }
}
