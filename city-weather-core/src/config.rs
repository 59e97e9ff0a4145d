use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use crate::{model::DEFAULT_CITIES, provider::RetryPolicy};

/// Environment variable holding the provider credential.
pub const API_KEY_VAR: &str = "API_KEY";

pub const CSV_FILE_NAME: &str = "weather_data.csv";
pub const JSON_FILE_NAME: &str = "weather_data.json";

/// Provider credential. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for an empty or whitespace-only key.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into().trim().to_string();
        (!key.is_empty()).then_some(Self(key))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// cities = ["Seattle", "Mumbai"]
/// output_dir = "/tmp/weather"
///
/// [retry]
/// max_retries = 3
/// backoff_factor = 0.3
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overridden by the `API_KEY` environment variable when that is set.
    pub api_key: Option<String>,
    pub cities: Vec<String>,
    /// Directory for the CSV and JSON exports; current directory when unset.
    pub output_dir: Option<PathBuf>,
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            cities: DEFAULT_CITIES.iter().map(|c| c.to_string()).collect(),
            output_dir: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "city-weather", "city-weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Resolve the credential, preferring the environment value over the file.
    pub fn resolve_api_key(&self, env_value: Option<String>) -> Option<ApiKey> {
        env_value
            .and_then(ApiKey::new)
            .or_else(|| self.api_key.clone().and_then(ApiKey::new))
    }

    /// [`Config::resolve_api_key`] against the process environment.
    pub fn api_key_from_env(&self) -> Option<ApiKey> {
        self.resolve_api_key(std::env::var(API_KEY_VAR).ok())
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output_dir().join(CSV_FILE_NAME)
    }

    pub fn json_path(&self) -> PathBuf {
        self.output_dir().join(JSON_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_lists_fixed_cities() {
        let cfg = Config::default();

        assert_eq!(cfg.cities, vec!["Seattle", "Mumbai", "Los Angeles"]);
        assert_eq!(cfg.retry, RetryPolicy::default());
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn env_key_wins_over_file_key() {
        let cfg = Config {
            api_key: Some("FILE_KEY".into()),
            ..Config::default()
        };

        let key = cfg.resolve_api_key(Some("ENV_KEY".into())).unwrap();
        assert_eq!(key.expose(), "ENV_KEY");
    }

    #[test]
    fn blank_env_key_falls_back_to_file() {
        let cfg = Config {
            api_key: Some("FILE_KEY".into()),
            ..Config::default()
        };

        let key = cfg.resolve_api_key(Some("   ".into())).unwrap();
        assert_eq!(key.expose(), "FILE_KEY");
    }

    #[test]
    fn missing_key_everywhere_is_none() {
        let cfg = Config::default();
        assert!(cfg.resolve_api_key(None).is_none());
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("secret").unwrap();
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(cfg.cities.len(), 3);
    }

    #[test]
    fn save_then_load_keeps_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let cfg = Config {
            api_key: Some("KEY".into()),
            cities: vec!["Oslo".into()],
            output_dir: Some(PathBuf::from("/tmp/out")),
            retry: RetryPolicy::new(5, 0.5),
        };
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("KEY"));
        assert_eq!(loaded.cities, vec!["Oslo"]);
        assert_eq!(loaded.csv_path(), PathBuf::from("/tmp/out/weather_data.csv"));
        assert_eq!(loaded.retry, RetryPolicy::new(5, 0.5));
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "cities = 42").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
