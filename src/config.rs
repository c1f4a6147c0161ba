use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::{fmt, EnvFilter};

use crate::pagination::DEFAULT_MAX_LIMIT;
use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "QREMIS_API_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
    /// `pretty` or `json`
    pub log_format: String,
    pub server: ServerConfig,
    pub pagination: PaginationConfig,
    pub storage: StorageConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".into(),
            log_format: "pretty".into(),
            server: ServerConfig::default(),
            pagination: PaginationConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8910,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub max_limit: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// One of `redis`, `sqlite`, `memory`
    pub backend: Option<String>,
    pub redis: RedisConfig,
    pub sqlite: SqliteConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub host: Option<String>,
    pub port: u16,
    pub db: i64,
    pub pool_size: u32,
    pub connect_timeout_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 6379,
            db: 0,
            pool_size: 8,
            connect_timeout_secs: 5,
        }
    }
}

impl RedisConfig {
    pub fn url(&self) -> String {
        format!(
            "redis://{}:{}/{}",
            self.host.as_deref().unwrap_or("localhost"),
            self.port,
            self.db
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    pub path: Option<PathBuf>,
}

/// The persistence engines a service can be configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Sorted-index backend over Redis
    Redis,
    /// Document backend over SQLite
    Sqlite,
    /// Sorted-index backend over in-process sets
    Memory,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Redis => "redis",
            BackendKind::Sqlite => "sqlite",
            BackendKind::Memory => "memory",
        }
    }

    pub fn all() -> &'static [BackendKind] {
        &[BackendKind::Redis, BackendKind::Sqlite, BackendKind::Memory]
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BackendKind::all()
            .iter()
            .copied()
            .find(|b| b.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let valid: Vec<_> = BackendKind::all().iter().map(BackendKind::as_str).collect();
                Error::Config(format!(
                    "Invalid storage backend '{}'! Valid options: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ServiceConfig {
    /// Configuration written by `qremis init`
    pub fn starter() -> Self {
        let mut config = Self::default();
        config.storage.backend = Some(BackendKind::Sqlite.as_str().into());
        config.storage.sqlite.path = Some(PathBuf::from("qremis.db"));
        config
    }

    /// Initialize the tracing subscriber. `RUST_LOG` wins over both
    /// `verbose` and the configured level.
    pub fn init_logging(&self, verbose: bool) {
        let level = if verbose { "debug" } else { self.log_level.as_str() };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        match self.log_format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).with_writer(std::io::stderr).init();
            }
            _ => {
                fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
            }
        }
    }

    /// Check everything the service needs before it may serve traffic
    pub fn validate(&self) -> Result<BackendKind> {
        if self.pagination.max_limit == 0 {
            return Err(Error::Config("pagination.max_limit must be at least 1".into()));
        }
        self.storage.backend_kind()
    }
}

impl StorageConfig {
    /// Resolve the selected backend and confirm its connection parameters
    pub fn backend_kind(&self) -> Result<BackendKind> {
        let name = self
            .backend
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| Error::Config("No storage backend provided!".into()))?;
        let kind: BackendKind = name.parse()?;

        match kind {
            BackendKind::Redis if self.redis.host.is_none() => {
                Err(Error::Config("No storage.redis.host provided!".into()))
            }
            BackendKind::Sqlite if self.sqlite.path.is_none() => {
                Err(Error::Config("No storage.sqlite.path provided!".into()))
            }
            _ => Ok(kind),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("qremis.toml")
}

pub fn load_config(path: Option<&Path>) -> Result<Option<ServiceConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: ServiceConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &ServiceConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        )));
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("could not serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_backend_is_config_error() {
        let err = ServiceConfig::default().validate().unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("No storage backend")));
    }

    #[test]
    fn test_unknown_backend_lists_options() {
        let mut config = ServiceConfig::default();
        config.storage.backend = Some("mongo".into());
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("redis, sqlite, memory")));
    }

    #[test]
    fn test_redis_requires_host() {
        let mut config = ServiceConfig::default();
        config.storage.backend = Some("redis".into());
        assert!(config.validate().is_err());

        config.storage.redis.host = Some("cache.internal".into());
        assert_eq!(config.validate().unwrap(), BackendKind::Redis);
        assert_eq!(config.storage.redis.url(), "redis://cache.internal:6379/0");
    }

    #[test]
    fn test_zero_max_limit_rejected() {
        let mut config = ServiceConfig::starter();
        config.pagination.max_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [storage]
            backend = "sqlite"

            [storage.sqlite]
            path = "/var/lib/qremis/records.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.validate().unwrap(), BackendKind::Sqlite);
        assert_eq!(config.pagination.max_limit, 1000);
        assert_eq!(config.storage.redis.port, 6379);
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qremis.toml");
        write_config(&path, &ServiceConfig::starter(), false).unwrap();
        assert!(write_config(&path, &ServiceConfig::starter(), false).is_err());

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, ServiceConfig::starter());
        assert!(load_config(Some(&dir.path().join("absent.toml"))).unwrap().is_none());
    }
}
