//! Configuration management
//!
//! Loads the YAML application config: MIDI port names, touchscreen link
//! parameters, and the storage image location. All fields have defaults so
//! the binary runs with no config file present.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub screen: ScreenConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// MIDI port configuration. Empty names mean "first available port".
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MidiConfig {
    #[serde(default)]
    pub input_port: String,
    #[serde(default)]
    pub output_port: String,
}

/// Touchscreen link configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScreenConfig {
    #[serde(default = "default_low_baud")]
    pub low_baud: u32,
    #[serde(default = "default_high_baud")]
    pub high_baud: u32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            low_baud: default_low_baud(),
            high_baud: default_high_baud(),
        }
    }
}

/// Storage image configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Path of the flat image file. Defaults to the platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
}

impl StorageConfig {
    pub fn image_path(&self) -> PathBuf {
        self.image.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("footctl")
                .join("fram.bin")
        })
    }
}

fn default_low_baud() -> u32 {
    9600
}

fn default_high_baud() -> u32 {
    921_600
}

impl AppConfig {
    /// Load from a YAML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}
