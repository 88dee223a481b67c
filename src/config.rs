//! Gallery configuration
//!
//! Read from JSON. Every field has a default, so a partial file (or none at
//! all) is valid. Lookup order:
//! 1. `$ADAPTIVE_GALLERY_CONFIG`
//! 2. `<config dir>/adaptive-gallery/config.json`
//! 3. built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::responsive::candidates::{DisplayHints, DEFAULT_ALTERNATE_FORMAT, DEFAULT_BREAKPOINTS};
use crate::responsive::observer::DEFAULT_MARGIN;
use crate::responsive::sizes::SizesDescriptor;

/// Environment variable pointing at a config file
pub const CONFIG_ENV: &str = "ADAPTIVE_GALLERY_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory image URLs are resolved against
    pub asset_root: PathBuf,
    /// Product list; when absent the asset root is scanned
    pub catalog: Option<PathBuf>,
    /// Candidate widths
    pub breakpoints: Vec<u32>,
    /// Extension of the alternate encoding, without the dot
    pub alternate_format: String,
    /// Whether the alternate encoding may be chosen
    pub supports_alternate: bool,
    pub sizes: SizesDescriptor,
    /// Pixels around the viewport that count as "near"
    pub proximity_margin: f32,
    /// Default for new installs; the stored setting wins afterwards
    pub defer_loading: bool,
    pub columns: usize,
    pub tile_size: f32,
    pub spacing: f32,
    /// Device pixels per logical pixel
    pub density: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            catalog: None,
            breakpoints: DEFAULT_BREAKPOINTS.to_vec(),
            alternate_format: DEFAULT_ALTERNATE_FORMAT.to_string(),
            supports_alternate: true,
            sizes: SizesDescriptor::default(),
            proximity_margin: DEFAULT_MARGIN,
            defer_loading: true,
            columns: 4,
            tile_size: 240.0,
            spacing: 16.0,
            density: 1.0,
        }
    }
}

impl Config {
    /// Load from the first location that exists, or fall back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                tracing::info!("⚙️  No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        tracing::info!("⚙️  Loaded config from {}", path.display());
        Ok(config)
    }

    fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("adaptive-gallery");
        path.push("config.json");
        Some(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.columns == 0 {
            return Err(ConfigError::Invalid("columns must be at least 1".into()));
        }
        if self.tile_size <= 0.0 || self.spacing < 0.0 {
            return Err(ConfigError::Invalid("tile_size must be positive and spacing non-negative".into()));
        }
        if self.density <= 0.0 {
            return Err(ConfigError::Invalid("density must be positive".into()));
        }
        if self.proximity_margin < 0.0 {
            return Err(ConfigError::Invalid("proximity_margin must be non-negative".into()));
        }
        if self.breakpoints.contains(&0) {
            return Err(ConfigError::Invalid("breakpoints must be positive".into()));
        }
        Ok(())
    }

    /// Display hints for one image under this config
    pub fn hints(&self, defer_loading: bool) -> DisplayHints {
        DisplayHints {
            sizes: self.sizes.clone(),
            breakpoints: self.breakpoints.clone(),
            defer_loading,
        }
    }
}
