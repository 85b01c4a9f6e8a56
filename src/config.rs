use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_CACHE_FILE, DEFAULT_FTP_PORT, DEFAULT_LOG_DIR, DEFAULT_SHEETS_BASE_URL,
    DEFAULT_TIMEOUT_SECS, DEFAULT_WORKSHEET,
};
use crate::error::{DashboardError, Result};

/// Runtime configuration: optional TOML file, then environment overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transfer: TransferConfig,
    pub scoring: ScoringConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Back-office file-transfer endpoint
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub filename: Option<String>,
    pub timeout_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_FTP_PORT,
            username: None,
            password: None,
            filename: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for TransferConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("filename", &self.filename)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Scoring spreadsheet (Sheets v4 values API)
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub spreadsheet_id: Option<String>,
    pub worksheet: String,
    pub access_token: Option<String>,
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            worksheet: DEFAULT_WORKSHEET.to_string(),
            access_token: None,
            api_key: None,
            base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for ScoringConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringConfig")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("worksheet", &self.worksheet)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CACHE_FILE),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

impl Config {
    /// Load `.env`, the optional TOML file, then apply process environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let base = match config_path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    DashboardError::Config(format!(
                        "Failed to read config file '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                toml::from_str(&content)?
            }
            None => Config::default(),
        };

        base.with_env(|key| std::env::var(key).ok())
    }

    /// Overlay values from an environment lookup
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("FTP_HOST") {
            self.transfer.host = Some(v);
        }
        if let Some(v) = get("FTP_PORT") {
            self.transfer.port = parse_number("FTP_PORT", &v)?;
        }
        if let Some(v) = get("FTP_USERNAME") {
            self.transfer.username = Some(v);
        }
        if let Some(v) = get("FTP_PASSWORD") {
            self.transfer.password = Some(v);
        }
        if let Some(v) = get("FTP_FILENAME") {
            self.transfer.filename = Some(v);
        }
        if let Some(v) = get("FTP_TIMEOUT_SECS") {
            self.transfer.timeout_secs = parse_number("FTP_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("CACHE_FILE") {
            self.cache.path = PathBuf::from(v);
        }
        if let Some(v) = get("SHEETS_SPREADSHEET_ID") {
            self.scoring.spreadsheet_id = Some(v);
        }
        if let Some(v) = get("SHEETS_WORKSHEET") {
            self.scoring.worksheet = v;
        }
        if let Some(v) = get("SHEETS_ACCESS_TOKEN") {
            self.scoring.access_token = Some(v);
        }
        if let Some(v) = get("SHEETS_API_KEY") {
            self.scoring.api_key = Some(v);
        }
        if let Some(v) = get("SHEETS_BASE_URL") {
            self.scoring.base_url = v;
        }
        if let Some(v) = get("SHEETS_TIMEOUT_SECS") {
            self.scoring.timeout_secs = parse_number("SHEETS_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("LOG_DIR") {
            self.logging.dir = PathBuf::from(v);
        }
        Ok(self)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| DashboardError::Config(format!("{} must be a number, got {:?}", key, value)))
}

/// Fetch a required option or fail naming the environment key
pub fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| DashboardError::Config(format!("missing required setting {}", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache.path, PathBuf::from("cache/yesterday_data.json"));
        assert_eq!(config.transfer.port, 21);
        assert_eq!(config.scoring.worksheet, "Scoring");
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default()
            .with_env(env(&[
                ("FTP_HOST", "ftp.example.org"),
                ("FTP_USERNAME", "reader"),
                ("FTP_PASSWORD", "secret"),
                ("FTP_FILENAME", "export.xlsx"),
                ("FTP_TIMEOUT_SECS", "5"),
                ("CACHE_FILE", "/tmp/snap.json"),
            ]))
            .unwrap();
        assert_eq!(config.transfer.host.as_deref(), Some("ftp.example.org"));
        assert_eq!(config.transfer.timeout_secs, 5);
        assert_eq!(config.cache.path, PathBuf::from("/tmp/snap.json"));
        assert!(!format!("{:?}", config.transfer).contains("secret"));
    }

    #[test]
    fn test_bad_number_is_config_error() {
        let err = Config::default()
            .with_env(env(&[("FTP_PORT", "twenty-one")]))
            .unwrap_err();
        assert!(matches!(err, DashboardError::Config(_)));
    }

    #[test]
    fn test_toml_then_env() {
        let parsed: Config = toml::from_str(
            r#"
            [transfer]
            host = "from-file"
            filename = "file.xlsx"

            [cache]
            path = "snapshots/bo.json"
            "#,
        )
        .unwrap();
        let config = parsed.with_env(env(&[("FTP_HOST", "from-env")])).unwrap();
        assert_eq!(config.transfer.host.as_deref(), Some("from-env"));
        assert_eq!(config.transfer.filename.as_deref(), Some("file.xlsx"));
        assert_eq!(config.transfer.port, 21);
        assert_eq!(config.cache.path, PathBuf::from("snapshots/bo.json"));
    }

    #[test]
    fn test_required_names_missing_key() {
        let err = required(&None, "FTP_HOST").unwrap_err();
        assert!(err.to_string().contains("FTP_HOST"));
    }
}
