//! # Configuration Management Module
//!
//! Persistent scanner settings stored in platform-appropriate locations.
//! Handles loading, saving, and providing defaults for configuration options.
//!
//! ## Settings
//! - `adapter_index`: Which Bluetooth adapter to scan with
//! - `required_capabilities`: Capabilities requested before every scan
//! - `unknown_device_label`: Shown in place of a missing advertised name
//! - `log_discoveries`: Log each newly discovered peripheral
//!
//! ## Storage Location
//! - macOS: ~/Library/Application Support/ble-scanner/config.toml
//! - Linux: ~/.config/ble-scanner/config.toml
//! - Windows: %APPDATA%\ble-scanner\config.toml

use crate::error::ConfigError;
use crate::permission::Capability;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub adapter_index: usize,
    pub required_capabilities: Vec<Capability>,
    pub unknown_device_label: String,
    pub log_discoveries: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            required_capabilities: Capability::all(),
            unknown_device_label: "Unknown Device".to_string(),
            log_discoveries: true,
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ble-scanner")
            .join("config.toml")
    }

    /// Load config from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(ConfigError::ParseFailed),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save_to(path)?;
                Ok(config)
            }
            Err(e) => Err(ConfigError::ReadFailed(e)),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::WriteFailed)?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(ConfigError::SerializeFailed)?;
        fs::write(path, toml_string).map_err(ConfigError::WriteFailed)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.adapter_index, 0);
        assert_eq!(config.unknown_device_label, "Unknown Device");
        assert!(config.log_discoveries);
        assert_eq!(config.required_capabilities.len(), 3);
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            adapter_index = 1
            required_capabilities = ["bluetooth_scan"]
            log_discoveries = false
        "#;

        let config: Config = toml::from_str(toml_str).expect("Failed to deserialize");
        assert_eq!(config.adapter_index, 1);
        assert_eq!(config.required_capabilities, vec![Capability::BluetoothScan]);
        assert!(!config.log_discoveries);
        // Missing fields fall back to defaults
        assert_eq!(config.unknown_device_label, "Unknown Device");
    }

    #[test]
    fn test_load_creates_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).expect("Failed to load config");
        assert_eq!(config, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            adapter_index: 2,
            unknown_device_label: "???".to_string(),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("adapter_index = 2"));
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "adapter_index = \"zero\"").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::ParseFailed(_))));
    }
}
