//! Configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user `config.toml` is merged on top key by key, so a file
//! only needs the values it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! output_root = "responsive_images"  # Where tier directories are written
//!
//! [quality]
//! photo = 85                # Lossy WebP quality for camera sources (1-100)
//! graphic = 90              # Quality for PNG and alpha sources (1-100)
//!
//! [background]
//! color = [255, 255, 255]   # Transparency is flattened onto this RGB color
//!
//! [markup]
//! sizes = "(max-width: 640px) 100vw, (max-width: 1024px) 50vw, 33vw"
//! url_prefix = "responsive_images/"
//! lazy = true               # loading="lazy" on the fallback <img>
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! The tier widths themselves are not configurable: they must match existing
//! derivative sets exactly.
//!
//! Unknown keys are rejected to catch typos early.

use crate::generate::GenerateOptions;
use crate::imaging::{Background, Quality, QualityPolicy};
use crate::markup::{DEFAULT_SIZES, DEFAULT_URL_PREFIX, PictureOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration loaded from `config.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root of the `{tier}/{base}.webp` tree.
    pub output_root: String,
    pub quality: QualityConfig,
    pub background: BackgroundConfig,
    pub markup: MarkupConfig,
    pub processing: ProcessingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_root: "responsive_images".to_string(),
            quality: QualityConfig::default(),
            background: BackgroundConfig::default(),
            markup: MarkupConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("quality.photo", self.quality.photo),
            ("quality.graphic", self.quality.graphic),
        ] {
            if !(1..=100).contains(&value) {
                return Err(ConfigError::Validation(format!("{key} must be 1-100")));
            }
        }
        if self.output_root.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output_root must not be empty".into(),
            ));
        }
        if self.markup.sizes.trim().is_empty() {
            return Err(ConfigError::Validation(
                "markup.sizes must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            quality: QualityPolicy {
                photographic: Quality::new(self.quality.photo),
                graphic: Quality::new(self.quality.graphic),
            },
            background: self.background.color,
        }
    }

    pub fn picture_options(&self) -> PictureOptions {
        PictureOptions {
            sizes: self.markup.sizes.clone(),
            url_prefix: self.markup.url_prefix.clone(),
            lazy: self.markup.lazy,
        }
    }
}

/// Encode quality per source kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityConfig {
    /// JPEG, TIFF and other opaque camera sources.
    pub photo: u32,
    /// PNG and anything with an alpha channel.
    pub graphic: u32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            photo: 85,
            graphic: 90,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundConfig {
    pub color: Background,
}

/// `<picture>` rendering settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkupConfig {
    pub sizes: String,
    pub url_prefix: String,
    pub lazy: bool,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            sizes: DEFAULT_SIZES.to_string(),
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
            lazy: true,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a TOML file as a raw value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load configuration.
///
/// An explicit path must exist. Without one, `config.toml` in `dir` is used
/// when present and stock defaults otherwise.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<Config, ConfigError> {
    let overlay = match explicit {
        Some(path) => Some(load_raw_config(path)?),
        None => {
            let default_path = dir.join(CONFIG_FILE);
            if default_path.exists() {
                Some(load_raw_config(&default_path)?)
            } else {
                None
            }
        }
    };
    resolve_config(overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# srcset-ladder Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Only the keys you want to change are needed.
# Unknown keys will cause an error.

# Directory the tier folders (thumb/, small/, medium/, large/, full/) live in.
output_root = "responsive_images"

# ---------------------------------------------------------------------------
# Encoding quality
# ---------------------------------------------------------------------------
[quality]
# Lossy WebP quality (1 = worst, 100 = best) for camera-style sources.
photo = 85

# Quality for sources that were lossless graphics (PNG, anything with alpha).
graphic = 90

# ---------------------------------------------------------------------------
# Transparency
# ---------------------------------------------------------------------------
[background]
# Derivatives are always opaque. Transparent pixels are blended onto this
# RGB color.
color = [255, 255, 255]

# ---------------------------------------------------------------------------
# <picture> markup
# ---------------------------------------------------------------------------
[markup]
# The sizes attribute emitted next to the srcset.
sizes = "(max-width: 640px) 100vw, (max-width: 1024px) 50vw, 33vw"

# Prepended to every candidate path in the srcset.
url_prefix = "responsive_images/"

# Add loading="lazy" decoding="async" to the fallback <img>.
lazy = true

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
