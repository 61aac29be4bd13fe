use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_STREAM_URL: &str = "https://media-ssl.musicradio.com/CapitalUK";
pub const DEFAULT_PORT: u16 = 3838;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: u32,
    pub radio: RadioConfig,
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    pub stream_url: String,
    /// Linear gain, 0.0 to 1.0.
    pub volume: f32,
    pub auto_start_on_mount: bool,
    pub auto_stop_on_dismount: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            radio: RadioConfig::default(),
            service: ServiceConfig::default(),
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            stream_url: DEFAULT_STREAM_URL.to_string(),
            volume: 0.5,
            auto_start_on_mount: true,
            auto_stop_on_dismount: true,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let mut config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        config.radio.volume = config.radio.volume.clamp(0.0, 1.0);

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, 1);
        assert_eq!(config.radio.stream_url, DEFAULT_STREAM_URL);
        assert_eq!(config.radio.volume, 0.5);
        assert!(config.radio.auto_start_on_mount);
        assert!(config.radio.auto_stop_on_dismount);
        assert_eq!(config.service.port, DEFAULT_PORT);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.radio, RadioConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.radio.stream_url = "http://radio.example/live".to_string();
        config.radio.volume = 0.25;
        config.radio.auto_start_on_mount = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.radio.stream_url, "http://radio.example/live");
        assert_eq!(loaded.radio.volume, 0.25);
        assert!(!loaded.radio.auto_start_on_mount);
        assert!(loaded.radio.auto_stop_on_dismount);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[radio]\nvolume = 3.0\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.radio.volume, 1.0);
        assert_eq!(loaded.radio.stream_url, DEFAULT_STREAM_URL);
        assert_eq!(loaded.service.port, DEFAULT_PORT);
    }
}
