//! fwfinder configuration management

use common::{Error, Result};
use finder::GroupingOptions;
use model::location::MAX_PORT_DEPTH;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinderConfig {
    #[serde(default)]
    pub finder: FinderSettings,
    /// External rule table
    #[serde(default)]
    pub rules: RuleSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinderSettings {
    #[serde(default = "FinderSettings::default_log_level")]
    pub log_level: String,
    /// Timeout for each USB string descriptor read in milliseconds
    #[serde(default = "FinderSettings::default_descriptor_timeout_ms")]
    pub descriptor_timeout_ms: u64,
    /// Hops searched above a node for the hub it belongs to
    #[serde(default = "FinderSettings::default_max_hops")]
    pub max_hops: usize,
}

impl Default for FinderSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            descriptor_timeout_ms: Self::default_descriptor_timeout_ms(),
            max_hops: Self::default_max_hops(),
        }
    }
}

impl FinderSettings {
    fn default_log_level() -> String {
        "info".to_string()
    }

    fn default_descriptor_timeout_ms() -> u64 {
        finder::enumerator::DEFAULT_DESCRIPTOR_TIMEOUT.as_millis() as u64
    }

    fn default_max_hops() -> usize {
        finder::topology::DEFAULT_MAX_HOPS
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSettings {
    /// Rule table file, `~` is expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl FinderConfig {
    /// Load configuration from the specified path
    ///
    /// Without a path the default locations are tried in order.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => Self::candidates()
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| Error::Config("No configuration file found".to_string()))?,
        };

        let content = fs::read_to_string(&config_path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {}",
                config_path.display(),
                e
            ))
        })?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", config_path.display(), e)))?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: FinderConfig = toml::from_str(content)
            .map_err(|e| Error::Serialization(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the first configuration file found in the default locations
    ///
    /// Returns `None` when there is none.
    pub fn load_default() -> Result<Option<Self>> {
        match Self::candidates().into_iter().find(|p| p.exists()) {
            Some(path) => Self::load(Some(path)).map(Some),
            None => Ok(None),
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("fwfinder").join("config.toml")
        } else {
            PathBuf::from(".config/fwfinder/config.toml")
        }
    }

    fn candidates() -> Vec<PathBuf> {
        vec![
            Self::default_path(),
            PathBuf::from("/etc/fwfinder/config.toml"),
        ]
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.finder.log_level.as_str()) {
            return Err(Error::Config(format!(
                "Invalid log level '{}', must be one of: {}",
                self.finder.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.finder.descriptor_timeout_ms == 0 {
            return Err(Error::Config(
                "descriptor_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if !(1..=MAX_PORT_DEPTH).contains(&self.finder.max_hops) {
            return Err(Error::Config(format!(
                "max_hops must be between 1 and {}, got {}",
                MAX_PORT_DEPTH, self.finder.max_hops
            )));
        }

        if self.rules.path.as_deref().is_some_and(str::is_empty) {
            return Err(Error::Config("Empty rule table path".to_string()));
        }

        Ok(())
    }

    pub fn descriptor_timeout(&self) -> Duration {
        Duration::from_millis(self.finder.descriptor_timeout_ms)
    }

    pub fn grouping(&self) -> GroupingOptions {
        GroupingOptions {
            max_hops: self.finder.max_hops,
        }
    }

    /// Rule table path with `~` expanded
    pub fn rules_path(&self) -> Option<PathBuf> {
        self.rules
            .path
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FinderConfig::default();
        assert_eq!(config.finder.log_level, "info");
        assert_eq!(config.finder.descriptor_timeout_ms, 100);
        assert_eq!(config.finder.max_hops, 2);
        assert!(config.rules.path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = FinderConfig::from_toml_str("").unwrap();
        assert_eq!(config, FinderConfig::default());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = FinderConfig::default();
        config.finder.max_hops = 3;
        config.rules.path = Some("/etc/fwfinder/rules.toml".to_string());

        let toml_str = toml::to_string(&config).unwrap();
        let parsed = FinderConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = FinderConfig::default();
        config.finder.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.finder.log_level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_timeout_and_hops() {
        let mut config = FinderConfig::default();
        config.finder.descriptor_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = FinderConfig::default();
        config.finder.max_hops = 0;
        assert!(config.validate().is_err());
        config.finder.max_hops = 8;
        assert!(config.validate().is_err());
        config.finder.max_hops = 7;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rules_path_expands_tilde() {
        let mut config = FinderConfig::default();
        config.rules.path = Some("~/rules.toml".to_string());

        let path = config.rules_path().unwrap();
        assert!(path.ends_with("rules.toml"));
        if let Some(home) = dirs::home_dir() {
            assert!(path.starts_with(home));
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = FinderConfig::default();
        config.finder.descriptor_timeout_ms = 250;
        config.save(&path).unwrap();

        let loaded = FinderConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.descriptor_timeout(), Duration::from_millis(250));
        assert_eq!(loaded.grouping().max_hops, 2);
    }

    #[test]
    fn test_load_missing_file() {
        let result = FinderConfig::load(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
