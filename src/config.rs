//! Configuration for the xconsole demo.
//!
//! Settings are read from `~/.xconsole/config.toml` (or the file given with
//! `--config`). The file is optional and never written; every key falls back
//! to its default.
//!
//! ```toml
//! # Color model: auto, attribute, palette
//! color_model = "auto"
//!
//! # Redraw pacing for the arrow-key demo
//! frame_interval_ms = 50
//!
//! [log]
//! level = "debug"
//! file = "/tmp/xconsole.log"
//!
//! [theme.title]
//! foreground = "yellow"
//! background = "blue"
//! foreground_bold = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::palette::{BaseColor, ColorModel, ColorSpec};
use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Color model selection
    pub color_model: ColorModelChoice,
    /// Frame interval for paced redraws
    pub frame_interval_ms: u64,
    /// Logging settings
    pub log: LogConfig,
    /// Demo colors
    pub theme: ThemeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            color_model: ColorModelChoice::Auto,
            frame_interval_ms: 50,
            log: LogConfig::default(),
            theme: ThemeConfig::default(),
        }
    }
}

/// Color model as written in the config file or on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorModelChoice {
    Auto,
    Attribute,
    Palette,
}

impl ColorModelChoice {
    pub fn resolve(self) -> ColorModel {
        match self {
            ColorModelChoice::Auto => ColorModel::native(),
            ColorModelChoice::Attribute => ColorModel::Attribute,
            ColorModelChoice::Palette => ColorModel::Palette,
        }
    }
}

impl FromStr for ColorModelChoice {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ColorModelChoice::Auto),
            "attribute" => Ok(ColorModelChoice::Attribute),
            "palette" => Ok(ColorModelChoice::Palette),
            other => Err(format!("Unknown color model: {}", other)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Log file; defaults to `~/.xconsole/xconsole.log`
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LogConfig {
    pub fn file_path(&self) -> PathBuf {
        self.file.clone().unwrap_or_else(|| {
            config_dir()
                .map(|dir| dir.join("xconsole.log"))
                .unwrap_or_else(|| PathBuf::from("xconsole.log"))
        })
    }
}

/// One color entry of the theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorEntry {
    pub foreground: BaseColor,
    pub background: BaseColor,
    #[serde(default)]
    pub foreground_bold: bool,
    #[serde(default)]
    pub background_bold: bool,
}

impl ColorEntry {
    const fn new(foreground: BaseColor, background: BaseColor, foreground_bold: bool) -> Self {
        Self {
            foreground,
            background,
            foreground_bold,
            background_bold: false,
        }
    }
}

impl From<ColorEntry> for ColorSpec {
    fn from(entry: ColorEntry) -> Self {
        ColorSpec {
            foreground: entry.foreground,
            background: entry.background,
            foreground_bold: entry.foreground_bold,
            background_bold: entry.background_bold,
        }
    }
}

/// Colors used by the demo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub text: ColorEntry,
    pub title: ColorEntry,
    pub prompt: ColorEntry,
    pub marker: ColorEntry,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            text: ColorEntry::new(BaseColor::White, BaseColor::Black, false),
            title: ColorEntry::new(BaseColor::Yellow, BaseColor::Blue, true),
            prompt: ColorEntry::new(BaseColor::Cyan, BaseColor::Black, true),
            marker: ColorEntry::new(BaseColor::Green, BaseColor::Black, true),
        }
    }
}

impl Config {
    /// Load configuration, falling back to defaults.
    ///
    /// With no explicit path the default location is used; a missing file
    /// there is not an error. Unreadable or malformed files are logged.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) if p.exists() => p,
                _ => return Self::default(),
            },
        };

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Using default config: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Get config file path
    pub fn default_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }
}

/// `~/.xconsole`
fn config_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".xconsole"))
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}
