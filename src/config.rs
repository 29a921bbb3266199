use crate::error::UserError;
use anyhow::{Context, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "LEXARCHIVE_DATA_DIR";
const DEFAULT_DATA_DIR: &str = "data";
const CONFIG_FILE: &str = "config.json";
const DB_FILE: &str = "lexarchive.db";
const FILES_DIR: &str = "files";
pub const DEFAULT_RECENT_LIMIT: usize = 20;
const DEFAULT_SEARCH_LIMIT: usize = 100;
const MAX_LIST_LIMIT: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub files_dir: PathBuf,
    pub recent_limit: usize,
    pub search_limit: usize,
    pub launch_on_open: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::for_data_dir(Path::new(DEFAULT_DATA_DIR))
    }
}

impl Config {
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self {
            db_path: data_dir.join(DB_FILE),
            files_dir: data_dir.join(FILES_DIR),
            recent_limit: DEFAULT_RECENT_LIMIT,
            search_limit: DEFAULT_SEARCH_LIMIT,
            launch_on_open: true,
        }
    }

    /// `--data-dir` wins over `LEXARCHIVE_DATA_DIR`, which wins over `./data`.
    pub fn resolve_data_dir(flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| {
                std::env::var(DATA_DIR_ENV)
                    .ok()
                    .filter(|value| !value.trim().is_empty())
                    .map(|value| expand_home(&value))
            })
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
    }

    pub fn config_path(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE)
    }

    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = Self::config_path(data_dir);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        check_limit("recent_limit", config.recent_limit)
            .and_then(|_| check_limit("search_limit", config.search_limit))
            .with_context(|| format!("Invalid config file: {}", config_path.display()))?;

        Ok(config)
    }

    /// Loads the config, writing the defaults first when none exists yet.
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        if Self::config_path(data_dir).exists() {
            return Self::load(data_dir);
        }

        let config = Self::for_data_dir(data_dir);
        config.save(data_dir)?;
        Ok(config)
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir).with_context(|| {
            format!("Failed to create data directory: {}", data_dir.display())
        })?;

        let config_path = Self::config_path(data_dir);
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    pub fn ensure_directories(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        fs::create_dir_all(&self.files_dir).with_context(|| {
            format!(
                "Failed to create files directory: {}",
                self.files_dir.display()
            )
        })?;

        Ok(())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "db_path" => {
                self.db_path = non_empty_path("db_path", value)?;
            }
            "files_dir" => {
                self.files_dir = non_empty_path("files_dir", value)?;
            }
            "recent_limit" => {
                self.recent_limit = parse_limit("recent_limit", value)?;
            }
            "search_limit" => {
                self.search_limit = parse_limit("search_limit", value)?;
            }
            "launch_on_open" => {
                self.launch_on_open =
                    value
                        .trim()
                        .parse::<bool>()
                        .map_err(|_| UserError::InvalidConfigValue {
                            key: "launch_on_open",
                            reason: "must be true/false".to_string(),
                        })?;
            }
            _ => return Err(UserError::UnknownConfigKey(key.to_string()).into()),
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "db_path" => Some(self.db_path.display().to_string()),
            "files_dir" => Some(self.files_dir.display().to_string()),
            "recent_limit" => Some(self.recent_limit.to_string()),
            "search_limit" => Some(self.search_limit.to_string()),
            "launch_on_open" => Some(self.launch_on_open.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "db_path" | "db.path" => "db_path",
        "files_dir" | "files.dir" => "files_dir",
        "recent_limit" | "recent.limit" => "recent_limit",
        "search_limit" | "search.limit" => "search_limit",
        "launch_on_open" | "open.launch" => "launch_on_open",
        _ => key,
    }
}

fn parse_limit(key: &'static str, value: &str) -> Result<usize> {
    let parsed = value
        .trim()
        .parse::<usize>()
        .map_err(|_| UserError::InvalidConfigValue {
            key,
            reason: "must be a number".to_string(),
        })?;

    check_limit(key, parsed)?;
    Ok(parsed)
}

fn check_limit(key: &'static str, value: usize) -> Result<()> {
    if !(1..=MAX_LIST_LIMIT).contains(&value) {
        return Err(UserError::InvalidConfigValue {
            key,
            reason: format!("must be between 1 and {MAX_LIST_LIMIT}"),
        }
        .into());
    }

    Ok(())
}

fn non_empty_path(key: &'static str, value: &str) -> Result<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(UserError::InvalidConfigValue {
            key,
            reason: "must not be empty".to_string(),
        }
        .into());
    }

    Ok(expand_home(trimmed))
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}
