//! reel-dl - A library for downloading online videos through yt-dlp.
//!
//! This library provides the download core (metadata fetch, single-flight
//! downloads with cooperative cancellation, proxy fallback and throttled
//! progress), abstracted from any specific UI or display framework.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use reel_dl::{AppConfig, FormatSelection, NoProgress, Orchestrator};
//!
//! # async fn example() -> reel_dl::Result<()> {
//! let config = AppConfig::load();
//! let orchestrator = Orchestrator::new(&config);
//!
//! let info = orchestrator
//!     .fetch_metadata("https://www.youtube.com/watch?v=...")
//!     .await?;
//!
//! let handle = orchestrator.start_download(
//!     &info,
//!     FormatSelection::Video { height: 720 },
//!     Arc::new(NoProgress),
//! )?;
//! let done = handle.wait().await?;
//! println!("Saved {}", done.request.sanitized_filename);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod backend;
pub mod config;
pub mod deps;
pub mod download;
pub mod error;
pub mod format;
pub mod fs;
pub mod progress;
pub mod proxy;
pub mod request;
pub mod settings;
pub mod state;
pub mod url;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export main types for convenience
pub use backend::{BackendError, MediaBackend, YtDlp};
pub use config::{AppConfig, DownloadConfig, PathConfig};
pub use download::{
    CompletedDownload, DownloadHandle, DownloadOutcome, DownloadProgress, NoProgress,
    Orchestrator,
};
pub use error::{Error, MetadataErrorKind, Result};
pub use format::{elide, format_bytes, format_eta, format_speed};
pub use fs::{FileSystem, TokioFileSystem};
pub use progress::{ProgressSnapshot, ProgressStatus, ProgressUpdate};
pub use proxy::ProxyResolver;
pub use request::{DownloadRequest, FormatSelection, MediaInfo, RESOLUTIONS, sanitize_filename};
pub use settings::{Settings, SettingsStore, Theme};
pub use state::{Notice, Phase, StatusTone, ViewEvent, ViewState};
pub use url::extract_url;
