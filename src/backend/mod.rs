//! Media backend abstraction.
//!
//! A backend resolves metadata for a URL and performs a download, reporting
//! progress through a hook. The hook returning [`ControlFlow::Break`] asks
//! the backend to abort, after which it must return [`BackendError::Aborted`].

mod ytdlp;

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::looks_like_credential_problem;
use crate::progress::ProgressSnapshot;
use crate::request::MediaInfo;

pub use ytdlp::YtDlp;

/// Progress hook invoked for every snapshot the backend produces.
pub type ProgressHook<'a> = &'a (dyn Fn(&ProgressSnapshot) -> ControlFlow<()> + Send + Sync);

/// Errors reported by a media backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The backend ran and reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The progress hook asked for an abort.
    #[error("aborted")]
    Aborted,

    /// Metadata output could not be parsed.
    #[error("unreadable metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    /// I/O error while talking to the backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation did not finish in time.
    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

impl BackendError {
    /// Whether the backend itself rejected the stored cookies.
    ///
    /// Only messages produced by the backend program are inspected; errors
    /// raised locally (parsing, I/O, spawning, timeouts) never qualify.
    #[must_use]
    pub fn is_credential_problem(&self) -> bool {
        matches!(self, Self::Failed(message) if looks_like_credential_problem(message))
    }
}

/// Options for a metadata fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub cookie_file: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub proxy: Option<String>,
}

/// Options for a single download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub url: String,
    /// Format selection rule understood by the backend.
    pub format: String,
    /// Output path template, extension left to the backend.
    pub output_template: PathBuf,
    pub merge_output_format: Option<String>,
    pub cookie_file: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub proxy: Option<String>,
}

impl DownloadOptions {
    /// Returns a copy of these options routed through `proxy`.
    #[must_use]
    pub fn with_proxy(&self, proxy: Option<String>) -> Self {
        Self {
            proxy,
            ..self.clone()
        }
    }
}

/// Resolves metadata and downloads media for a URL.
#[async_trait]
pub trait MediaBackend: Send + Sync + 'static {
    /// Fetches metadata for `url` without downloading anything.
    async fn fetch_info(&self, url: &str, options: &FetchOptions)
    -> Result<MediaInfo, BackendError>;

    /// Downloads according to `options`, calling `hook` for every snapshot.
    async fn download(
        &self,
        options: &DownloadOptions,
        hook: ProgressHook<'_>,
    ) -> Result<(), BackendError>;
}
