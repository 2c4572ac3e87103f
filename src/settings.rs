//! Persistent user settings (theme, download directory, proxy toggle).
//!
//! The settings document is a small JSON object. Loading never fails: a
//! missing or unreadable file yields defaults, and keys absent from the file
//! are filled in from [`Settings::default`]. Saving is best-effort; failures
//! are logged and swallowed so a read-only config directory cannot take the
//! application down. Keys this version does not know about are carried
//! through a load/save cycle untouched.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{PathConfig, config_dir};

/// Colour scheme of the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    /// Returns the other theme.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    /// Lowercase name as stored in the settings document.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

/// User-facing settings persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    pub download_dir: PathBuf,
    pub proxy_enabled: bool,
    /// Keys written by other versions, preserved on save.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            download_dir: PathConfig::default().download_dir,
            proxy_enabled: false,
            extra: Map::new(),
        }
    }
}

/// Loads and saves [`Settings`] at a fixed path.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location (`{config_dir}/reel-dl/settings.json`).
    #[must_use]
    pub fn at_default_path() -> Self {
        Self::new(config_dir().join("settings.json"))
    }

    /// Path of the settings document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the settings document, falling back to defaults on any error.
    #[must_use]
    pub fn load(&self) -> Settings {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Settings::default(),
            Err(e) => {
                log::warn!("Error loading settings from {}: {e}", self.path.display());
                return Settings::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("Ignoring malformed settings in {}: {e}", self.path.display());
            Settings::default()
        })
    }

    /// Loads settings and makes them authoritative for `paths`.
    ///
    /// On first run (no document yet) the configured download directory
    /// seeds the settings, which are then saved. Afterwards the stored
    /// download directory overrides the configured one.
    pub fn load_seeded(&self, paths: &mut PathConfig) -> Settings {
        if self.path.exists() {
            let settings = self.load();
            paths.download_dir.clone_from(&settings.download_dir);
            settings
        } else {
            let settings = Settings {
                download_dir: paths.download_dir.clone(),
                ..Settings::default()
            };
            self.save(&settings);
            settings
        }
    }

    /// Writes the settings document. Errors are logged, never returned.
    pub fn save(&self, settings: &Settings) {
        if let Err(e) = self.try_save(settings) {
            log::warn!("Error saving settings to {}: {e}", self.path.display());
        }
    }

    /// Writes to a temporary sibling and renames it over the target.
    fn try_save(&self, settings: &Settings) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)
    }
}
