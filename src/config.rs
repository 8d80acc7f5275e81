use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::{cache, defaults, limits};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub archive: ArchiveConfig,

    pub cache: CacheConfig,

    pub query: QueryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    #[serde(default)]
    pub suppress_connection_errors: bool,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            suppress_connection_errors: false,
            worker_threads: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Base URL of the archive backend (PostgREST-style API).
    pub base_url: String,

    /// Anon API key sent with every request. Usually supplied via
    /// `TRENDLENS_ARCHIVE_KEY` rather than the config file.
    pub api_key: String,

    pub request_timeout_seconds: u64,

    /// Per-keyword cap on returned tweet rows.
    pub fetch_limit: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: "https://fabxmporizzqflnftavs.supabase.co".to_string(),
            api_key: String::new(),
            request_timeout_seconds: 30,
            fetch_limit: limits::DEFAULT_FETCH_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: cache::QUERY_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_keywords: Vec<String>,

    /// ISO date used as the start of the range when none is given.
    pub default_start_date: String,

    pub max_keywords: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_keywords: defaults::KEYWORDS.iter().map(ToString::to_string).collect(),
            default_start_date: defaults::START_DATE.to_string(),
            max_keywords: limits::MAX_KEYWORDS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            archive: ArchiveConfig::default(),
            cache: CacheConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                let mut config = Self::load_from_path(path)?;
                config.apply_env_overrides();
                return Ok(config);
            }
        }

        info!("No config file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Environment wins over file contents for the backend endpoint, so a
    /// `.env` alongside the binary can point at a different archive.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("TRENDLENS_ARCHIVE_URL")
            && !url.is_empty()
        {
            self.archive.base_url = url;
        }
        if let Ok(key) = std::env::var("TRENDLENS_ARCHIVE_KEY")
            && !key.is_empty()
        {
            self.archive.api_key = key;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("trendlens").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".trendlens").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.archive.base_url.is_empty() {
            anyhow::bail!("Archive base URL cannot be empty");
        }

        if self.cache.ttl_seconds == 0 {
            anyhow::bail!("Cache TTL must be > 0 seconds");
        }

        if self.archive.fetch_limit == 0 {
            anyhow::bail!("Fetch limit must be > 0");
        }

        if self.query.max_keywords == 0 || self.query.max_keywords > limits::MAX_KEYWORDS {
            anyhow::bail!(
                "max_keywords must be between 1 and {}",
                limits::MAX_KEYWORDS
            );
        }

        self.default_start_date()
            .with_context(|| format!("Invalid default_start_date: {}", self.query.default_start_date))?;

        Ok(())
    }

    pub fn default_start_date(&self) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(&self.query.default_start_date, "%Y-%m-%d")
            .context("default_start_date must be YYYY-MM-DD")
    }
}
