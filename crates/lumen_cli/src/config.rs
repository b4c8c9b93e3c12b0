//! Lumen configuration file handling

use anyhow::{Context, Result};
use lumen_core::ContextSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "lumen.toml";

/// Top-level probe configuration (lumen.toml)
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct LumenConfig {
    #[serde(default)]
    pub context: ContextSettings,
    #[serde(default)]
    pub surface: SurfaceConfig,
}

/// Where the probe renders
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceMode {
    /// Private hidden surface
    #[default]
    Offscreen,
    /// A real window created through winit
    Windowed,
}

/// Surface and presentation configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SurfaceConfig {
    /// Requested bits per pixel, the screen's depth when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bits_per_pixel: Option<u32>,
    #[serde(default = "default_true")]
    pub vertical_sync: bool,
    #[serde(default)]
    pub mode: SurfaceMode,
    /// Frames presented before exiting
    #[serde(default = "default_frames")]
    pub frames: u32,
}

fn default_true() -> bool {
    true
}

fn default_frames() -> u32 {
    3
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            bits_per_pixel: None,
            vertical_sync: true,
            mode: SurfaceMode::default(),
            frames: default_frames(),
        }
    }
}

impl LumenConfig {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, `lumen.toml` in the working
    /// directory is used when present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) if path.is_dir() => path.join(DEFAULT_CONFIG_FILE),
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = Path::new(DEFAULT_CONFIG_FILE);
                if !candidate.exists() {
                    return Ok(Self::default());
                }
                candidate.to_path_buf()
            }
        };

        if !config_path.exists() {
            anyhow::bail!("No configuration found at {}", config_path.display());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
