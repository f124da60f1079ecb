// src/config.rs
//! Configuration management with file-based storage

use crate::error::{MapError, Result};
use crate::map::TileSource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Tile layer attached to every newly initialized map
    pub tile_source: TileSource,
    /// Fraction each side of the layer bounds grows by in fit_bounds
    pub fit_padding: f64,
    /// One-shot wait before retrying an initialize whose surface is missing
    pub surface_wait_ms: u64,
    /// Pixel size assumed for surfaces mounted without explicit dimensions
    pub surface_width: f64,
    pub surface_height: f64,
    pub tile_cache_dir: Option<PathBuf>,
    pub user_agent: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            tile_source: TileSource::openstreetmap(),
            fit_padding: 0.1,
            surface_wait_ms: 100,
            surface_width: 800.0,
            surface_height: 600.0,
            tile_cache_dir: None,
            user_agent: "MapBridge/0.1 (Rust map interop)".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| MapError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| MapError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MapError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| MapError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| MapError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !self.fit_padding.is_finite() || self.fit_padding < 0.0 {
            return Err(MapError::Config(format!(
                "fit_padding must be a non-negative number, got {}",
                self.fit_padding
            )));
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.surface_width) || !positive(self.surface_height) {
            return Err(MapError::Config("surface size must be positive".to_string()));
        }
        Ok(())
    }

    fn config_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| MapError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".config").join("map-bridge"))
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Tile cache directory, defaulting to `~/.config/map-bridge/tiles`
    pub fn resolved_tile_cache_dir(&self) -> Result<PathBuf> {
        match &self.tile_cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::config_dir()?.join("tiles")),
        }
    }

    pub fn surface_wait(&self) -> Duration {
        Duration::from_millis(self.surface_wait_ms)
    }

    pub fn surface_size(&self) -> (f64, f64) {
        (self.surface_width, self.surface_height)
    }
}
