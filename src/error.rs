//! Error types for the reel-dl library.

use thiserror::Error;

/// Substrings (matched case-insensitively) that mark a failure as caused by a
/// stale or invalid cookie file rather than by the network or the URL.
const CREDENTIAL_MARKERS: [&str; 4] = ["cookie", "invalid", "expired", "sign in"];

/// Why a metadata fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataErrorKind {
    /// The stored cookies need to be re-exported.
    CredentialProblem,
    /// The URL only exposes images, there is nothing to download.
    ImagesOnly,
    /// Any other failure (private video, network error, bad URL, ...).
    Generic,
}

/// Errors that can occur while fetching metadata or downloading.
#[derive(Error, Debug)]
pub enum Error {
    /// No URL was supplied.
    #[error("no URL provided")]
    EmptyUrl,

    /// The media backend could not resolve the URL.
    #[error("metadata fetch failed: {message}")]
    Metadata {
        /// Classification used by the UI to pick a prompt.
        kind: MetadataErrorKind,
        /// Raw message from the backend.
        message: String,
    },

    /// The download was cancelled by the user.
    #[error("download cancelled")]
    Cancelled,

    /// The download failed because the stored cookies were rejected.
    #[error("cookies may be invalid or expired: {0}")]
    CredentialProblem(String),

    /// Every attempt (direct and fallback) failed.
    #[error("download failed: {}", .attempts.join(" | "))]
    DownloadFailed {
        /// Error message of each attempt, in order.
        attempts: Vec<String>,
    },

    /// A download is already running on this orchestrator.
    #[error("a download is already in progress")]
    Busy,

    /// The worker task panicked or was aborted.
    #[error("download worker stopped unexpectedly: {0}")]
    Worker(String),

    /// Required external resources are missing and the policy is strict.
    #[error("missing dependencies:\n{}", .0.join("\n"))]
    MissingDependencies(Vec<String>),

    /// Command-line arguments could not be understood.
    #[error("invalid arguments: {0}")]
    Usage(String),

    /// Configuration file could not be parsed or written.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true when the user should be asked to refresh their cookies.
    #[must_use]
    pub const fn is_credential_problem(&self) -> bool {
        matches!(
            self,
            Self::CredentialProblem(_)
                | Self::Metadata {
                    kind: MetadataErrorKind::CredentialProblem,
                    ..
                }
        )
    }
}

/// Returns true if a backend error message points at the cookie file.
#[must_use]
pub fn looks_like_credential_problem(message: &str) -> bool {
    let lower = message.to_lowercase();
    CREDENTIAL_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// A specialized `Result` type for reel-dl operations.
pub type Result<T> = std::result::Result<T, Error>;
