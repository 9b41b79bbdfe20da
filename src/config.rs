use std::{
    collections::HashSet,
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use figment::providers::{Format, Toml};
use figment::Figment;
use serde::Deserialize;

use crate::{debounce::DEFAULT_DEBOUNCE, query::SortKey};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("HOME is not set")]
    NoHome,

    #[error("failed to parse config {}: {error}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        error: Box<figment::Error>,
    },
}

#[derive(Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    bookmarks: Option<String>,
    #[serde(default)]
    search_debounce_ms: Option<u64>,
    #[serde(default)]
    default_sort: Option<SortKey>,
    #[serde(default)]
    log_file: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub bookmarks: Option<PathBuf>,
    pub search_debounce: Duration,
    pub default_sort: SortKey,
    pub log_file: Option<PathBuf>,
    pub loaded_from: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bookmarks: None,
            search_debounce: DEFAULT_DEBOUNCE,
            default_sort: SortKey::default(),
            log_file: None,
            loaded_from: Vec::new(),
        }
    }
}

pub fn home_dir() -> Result<PathBuf, ConfigError> {
    env::var("HOME")
        .map(PathBuf::from)
        .map_err(|_| ConfigError::NoHome)
}

/// Merges every config file that exists; later files win key by key.
pub fn load_config(home: &Path) -> Result<Config, ConfigError> {
    load_from_paths(&config_paths(home), home)
}

pub fn load_from_paths(paths: &[PathBuf], home: &Path) -> Result<Config, ConfigError> {
    let mut config = Config::default();

    for path in paths {
        if !path.is_file() {
            continue;
        }
        let base_dir = path.parent().unwrap_or(home);
        let file: ConfigFile = Figment::from(Toml::file(path))
            .extract()
            .map_err(|error| ConfigError::Parse {
                path: path.clone(),
                error: Box::new(error),
            })?;
        if let Some(raw) = file.bookmarks.as_deref() {
            if let Some(resolved) = normalize_path(raw, base_dir, home) {
                config.bookmarks = Some(resolved);
            }
        }
        if let Some(ms) = file.search_debounce_ms {
            config.search_debounce = Duration::from_millis(ms);
        }
        if let Some(sort) = file.default_sort {
            config.default_sort = sort;
        }
        if let Some(raw) = file.log_file.as_deref() {
            if let Some(resolved) = normalize_path(raw, base_dir, home) {
                config.log_file = Some(resolved);
            }
        }
        config.loaded_from.push(path.clone());
    }

    Ok(config)
}

/// Lowest precedence first.
pub fn config_paths(home: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    paths.push(PathBuf::from("/etc/marklist/config.toml"));
    let xdg = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home.join(".config"));
    paths.push(xdg.join("marklist/config.toml"));
    paths.push(home.join(".config/marklist/config.toml"));
    paths.push(home.join(".marklist.toml"));
    if let Ok(cwd) = env::current_dir() {
        paths.push(cwd.join(".marklist.toml"));
    }
    if let Ok(path) = env::var("MARKLIST_CONFIG") {
        if !path.trim().is_empty() {
            paths.push(PathBuf::from(path));
        }
    }

    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for path in paths {
        let key = path.to_string_lossy().to_string();
        if seen.insert(key) {
            unique.push(path);
        }
    }
    unique
}

pub fn normalize_path(raw: &str, base_dir: &Path, home: &Path) -> Option<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut value = trimmed.to_string();
    if value.starts_with("~/") {
        value = value.replacen('~', &home.to_string_lossy(), 1);
    }
    if value.contains("$HOME") {
        value = value.replace("$HOME", &home.to_string_lossy());
    }
    let mut path = PathBuf::from(value);
    if path.is_relative() {
        path = base_dir.join(path);
    }
    Some(path)
}
