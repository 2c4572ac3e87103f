//! Configuration types for download operations.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "REEL_CONFIG";

/// Configuration for download operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Whether a failed download is retried once through the system proxy.
    pub fallback_retry: bool,
    /// Minimum change in progress fraction before a new update is emitted.
    pub progress_threshold: f64,
    /// Container that separate video/audio streams are merged into.
    pub merge_output_format: Option<String>,
    /// Upper bound on a metadata fetch, in seconds. `None` waits forever.
    pub fetch_timeout_secs: Option<u64>,
    /// Whether missing startup dependencies abort the program.
    pub strict_dependencies: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            fallback_retry: true,
            progress_threshold: 0.001,
            merge_output_format: Some("mp4".to_string()),
            fetch_timeout_secs: Some(60),
            strict_dependencies: false,
        }
    }
}

impl DownloadConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether failed downloads are retried through the proxy.
    #[must_use]
    pub const fn with_fallback_retry(mut self, retry: bool) -> Self {
        self.fallback_retry = retry;
        self
    }

    /// Sets the progress suppression threshold.
    #[must_use]
    pub const fn with_progress_threshold(mut self, threshold: f64) -> Self {
        self.progress_threshold = threshold;
        self
    }

    /// Sets the metadata fetch timeout.
    #[must_use]
    pub const fn with_fetch_timeout(mut self, secs: Option<u64>) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }

    /// Sets whether missing dependencies are fatal.
    #[must_use]
    pub const fn with_strict_dependencies(mut self, strict: bool) -> Self {
        self.strict_dependencies = strict;
        self
    }

    /// Returns the metadata fetch timeout as a `Duration`.
    #[must_use]
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Locations of downloads and external resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Root directory for downloads.
    pub download_dir: PathBuf,
    /// Netscape-format cookie file exported from a browser.
    pub cookie_file: PathBuf,
    /// ffmpeg executable, either a path or a bare name looked up in `PATH`.
    pub ffmpeg: PathBuf,
    /// yt-dlp executable, either a path or a bare name looked up in `PATH`.
    pub yt_dlp: PathBuf,
    /// Additional files that must exist before start-up (e.g. image assets).
    pub assets: Vec<PathBuf>,
}

impl Default for PathConfig {
    fn default() -> Self {
        let download_root = dirs::download_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            download_dir: download_root.join("reel-dl"),
            cookie_file: config_dir().join("cookies.txt"),
            ffmpeg: PathBuf::from("ffmpeg"),
            yt_dlp: PathBuf::from("yt-dlp"),
            assets: Vec::new(),
        }
    }
}

impl PathConfig {
    /// Directory that video downloads are written to.
    #[must_use]
    pub fn video_dir(&self) -> PathBuf {
        self.download_dir.join("Videos")
    }

    /// Directory that audio-only downloads are written to.
    #[must_use]
    pub fn audio_dir(&self) -> PathBuf {
        self.download_dir.join("Audios")
    }
}

/// Complete application configuration combining download and path settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Download configuration.
    pub download: DownloadConfig,
    /// Path configuration.
    pub paths: PathConfig,
}

/// Directory holding the config file, the settings document and cookies.
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reel-dl")
}

impl AppConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location, honouring `REEL_CONFIG`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map_or_else(|| config_dir().join("config.toml"), PathBuf::from)
    }

    /// Loads configuration from `path`, writing a default template first if
    /// the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or created.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            log::info!("Wrote default config to {}", path.display());
            return Ok(config);
        }

        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Loads configuration from the default location, falling back to
    /// defaults (with a warning) when it cannot be read.
    #[must_use]
    pub fn load() -> Self {
        let path = Self::default_path();
        Self::load_or_create(&path).unwrap_or_else(|e| {
            log::warn!("Using default configuration: {e}");
            Self::default()
        })
    }

    /// Writes the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_download_config() {
        let config = DownloadConfig::default();
        assert!(config.fallback_retry);
        assert!((config.progress_threshold - 0.001).abs() < f64::EPSILON);
        assert_eq!(config.merge_output_format.as_deref(), Some("mp4"));
        assert_eq!(config.fetch_timeout(), Some(Duration::from_secs(60)));
        assert!(!config.strict_dependencies);
    }

    #[test]
    fn download_config_builder_pattern() {
        let config = DownloadConfig::new()
            .with_fallback_retry(false)
            .with_progress_threshold(0.05)
            .with_fetch_timeout(None)
            .with_strict_dependencies(true);

        assert!(!config.fallback_retry);
        assert!((config.progress_threshold - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.fetch_timeout(), None);
        assert!(config.strict_dependencies);
    }

    #[test]
    fn zero_timeout_means_unbounded() {
        let config = DownloadConfig::new().with_fetch_timeout(Some(0));
        assert_eq!(config.fetch_timeout(), None);
    }

    #[test]
    fn derived_output_dirs() {
        let paths = PathConfig {
            download_dir: PathBuf::from("/data/reel"),
            ..PathConfig::default()
        };
        assert_eq!(paths.video_dir(), PathBuf::from("/data/reel/Videos"));
        assert_eq!(paths.audio_dir(), PathBuf::from("/data/reel/Audios"));
    }

    #[test]
    fn app_config_serializes_to_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [download]
            fallback_retry = false

            [paths]
            ffmpeg = "/opt/ffmpeg/bin/ffmpeg"
            "#,
        )
        .unwrap();
        assert!(!config.download.fallback_retry);
        assert_eq!(config.download.merge_output_format.as_deref(), Some("mp4"));
        assert_eq!(config.paths.ffmpeg, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.paths.yt_dlp, PathBuf::from("yt-dlp"));
    }

    #[test]
    fn load_or_create_writes_template() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.toml");

        let created = AppConfig::load_or_create(&path).unwrap();
        assert!(path.exists());
        let loaded = AppConfig::load_or_create(&path).unwrap();
        assert_eq!(created, loaded);
    }

    #[test]
    fn load_or_create_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "download = [not toml").unwrap();

        let err = AppConfig::load_or_create(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
