use anyhow::{Context, Result, ensure};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_ETFCHANNEL_URL: &str = "https://www.etfchannel.com";

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct EtfChannelConfig {
    pub base_url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for EtfChannelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ETFCHANNEL_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl EtfChannelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub etfchannel: EtfChannelConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub path: Option<String>,
    pub expiration_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            expiration_hours: 7 * 24,
        }
    }
}

impl CacheConfig {
    pub fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_hours * 60 * 60)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PaginationConfig {
    pub page_size: usize,
    /// Hard ceiling on fetched pages per fund
    pub max_pages: usize,
}

impl PaginationConfig {
    /// Both limits must be at least one page.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.page_size > 0, "pagination.page_size must be greater than 0");
        ensure!(self.max_pages > 0, "pagination.max_pages must be greater than 0");
        Ok(())
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_pages: 100,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

impl AppConfig {
    /// Loads the default config file, falling back to built-in defaults when
    /// it does not exist.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "etfc", "etfc")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn validate(&self) -> Result<()> {
        self.pagination.validate()
    }

    pub fn cache_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.cache.path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "etfc", "etfc")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.cache_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
providers:
  etfchannel:
    base_url: "http://example.com/etfchannel"
    timeout_secs: 5
cache:
  path: "/tmp/etfc-cache"
  expiration_hours: 12
pagination:
  page_size: 50
  max_pages: 10
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(
            config.providers.etfchannel.base_url,
            "http://example.com/etfchannel"
        );
        assert_eq!(config.providers.etfchannel.timeout(), Duration::from_secs(5));
        assert_eq!(config.cache_path().unwrap(), PathBuf::from("/tmp/etfc-cache"));
        assert_eq!(config.cache.expiration(), Duration::from_secs(12 * 60 * 60));
        assert_eq!(config.pagination.page_size, 50);
        assert_eq!(config.pagination.max_pages, 10);
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("cache:\n  expiration_hours: 1\n").unwrap();
        assert_eq!(config.providers.etfchannel.base_url, DEFAULT_ETFCHANNEL_URL);
        assert_eq!(config.providers.etfchannel.timeout_secs, 30);
        assert!(config.cache.path.is_none());
        assert_eq!(config.cache.expiration_hours, 1);
        assert_eq!(config.pagination, PaginationConfig::default());
    }

    #[test]
    fn test_load_rejects_zero_pagination() {
        let dir = tempfile::tempdir().unwrap();
        for (name, yaml, field) in [
            ("page.yaml", "pagination:\n  page_size: 0\n", "page_size"),
            ("max.yaml", "pagination:\n  max_pages: 0\n", "max_pages"),
        ] {
            let path = dir.path().join(name);
            fs::write(&path, yaml).unwrap();

            let err = AppConfig::load_from_path(&path).unwrap_err();
            assert!(err.to_string().starts_with("Invalid config file"));
            assert_eq!(
                err.root_cause().to_string(),
                format!("pagination.{field} must be greater than 0")
            );
        }
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        let err = AppConfig::load_from_path(&missing).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read config file"));
    }
}
