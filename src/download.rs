//! Download orchestration: metadata fetch, single-flight downloads,
//! cooperative cancellation and proxy fallback.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backend::{BackendError, DownloadOptions, FetchOptions, MediaBackend, YtDlp};
use crate::config::{AppConfig, DownloadConfig, PathConfig};
use crate::error::{Error, MetadataErrorKind, Result};
use crate::fs::{FileSystem, TokioFileSystem, is_partial_file};
use crate::progress::{ProgressSnapshot, ProgressStatus, ProgressThrottle, ProgressUpdate};
use crate::proxy::ProxyResolver;
use crate::request::{DownloadRequest, FormatSelection, MediaInfo};

/// Trait for receiving download progress updates.
///
/// Callbacks run on the download worker task. Implementations that drive a
/// UI should forward them to the UI loop rather than touch view state.
/// All methods have default no-op implementations for convenience.
pub trait DownloadProgress: Send + Sync {
    /// Called once the output directory exists and the first attempt starts.
    fn on_start(&self, _request: &DownloadRequest) {}

    /// Called with throttled progress updates.
    fn on_progress(&self, _update: &ProgressUpdate) {}

    /// Called when a file finished transferring and post-processing begins.
    fn on_processing(&self) {}

    /// Called before the single retry through the system proxy.
    fn on_fallback(&self, _proxy: Option<&str>, _first_error: &str) {}

    /// Called exactly once when the request reaches a terminal state.
    fn on_finished(&self, _outcome: &DownloadOutcome) {}
}

/// A null progress implementation that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl DownloadProgress for NoProgress {}

/// Terminal state of a download request, as reported to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed { via_fallback: bool },
    Cancelled,
    CredentialProblem(String),
    Failed(String),
}

impl DownloadOutcome {
    fn of(result: &Result<CompletedDownload>) -> Self {
        match result {
            Ok(done) => Self::Completed {
                via_fallback: done.via_fallback,
            },
            Err(Error::Cancelled) => Self::Cancelled,
            Err(Error::CredentialProblem(message)) => Self::CredentialProblem(message.clone()),
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

/// A finished download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedDownload {
    pub request: DownloadRequest,
    /// Whether the proxy retry was the attempt that succeeded.
    pub via_fallback: bool,
}

/// Handle to a running download.
#[derive(Debug)]
pub struct DownloadHandle {
    request: DownloadRequest,
    token: CancellationToken,
    join: JoinHandle<Result<CompletedDownload>>,
}

impl DownloadHandle {
    /// The request being downloaded.
    #[must_use]
    pub const fn request(&self) -> &DownloadRequest {
        &self.request
    }

    /// Requests cancellation. Takes effect at the next progress callback.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Waits for the worker to finish.
    ///
    /// # Errors
    ///
    /// Returns the terminal error of the request, or [`Error::Worker`] if the
    /// worker task panicked.
    pub async fn wait(self) -> Result<CompletedDownload> {
        self.join
            .await
            .map_err(|e| Error::Worker(e.to_string()))?
    }
}

/// Clears the active flag when the worker ends, even by panic.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Inner<B, F> {
    backend: B,
    fs: F,
    config: DownloadConfig,
    paths: PathConfig,
    proxy: ProxyResolver,
    proxy_enabled: AtomicBool,
    active: Arc<AtomicBool>,
    token: Mutex<CancellationToken>,
}

/// Runs metadata fetches and at most one download at a time.
///
/// Cloning is cheap; clones share the same single-flight state.
pub struct Orchestrator<B: MediaBackend = YtDlp, F: FileSystem = TokioFileSystem> {
    inner: Arc<Inner<B, F>>,
}

impl<B: MediaBackend, F: FileSystem> Clone for Orchestrator<B, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Orchestrator<YtDlp, TokioFileSystem> {
    /// Orchestrator driving the configured yt-dlp with the system proxy.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self::with_parts(
            YtDlp::new(config.paths.yt_dlp.clone()),
            TokioFileSystem::new(),
            config,
            ProxyResolver::system(),
        )
    }
}

impl<B: MediaBackend, F: FileSystem + 'static> Orchestrator<B, F> {
    /// Creates an orchestrator from explicit parts.
    #[must_use]
    pub fn with_parts(backend: B, fs: F, config: &AppConfig, proxy: ProxyResolver) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                fs,
                config: config.download.clone(),
                paths: config.paths.clone(),
                proxy,
                proxy_enabled: AtomicBool::new(false),
                active: Arc::new(AtomicBool::new(false)),
                token: Mutex::new(CancellationToken::new()),
            }),
        }
    }

    /// Returns a reference to the media backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// Returns a reference to the download configuration.
    #[must_use]
    pub fn config(&self) -> &DownloadConfig {
        &self.inner.config
    }

    /// Returns a reference to the path configuration.
    #[must_use]
    pub fn paths(&self) -> &PathConfig {
        &self.inner.paths
    }

    /// Whether the first attempt of each download goes through the proxy.
    #[must_use]
    pub fn proxy_enabled(&self) -> bool {
        self.inner.proxy_enabled.load(Ordering::Acquire)
    }

    /// Sets whether downloads use the detected system proxy up front.
    pub fn set_proxy_enabled(&self, enabled: bool) {
        self.inner.proxy_enabled.store(enabled, Ordering::Release);
        log::info!("Proxy {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Whether a download is in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Cancels the active download. Returns false if nothing was running.
    pub fn cancel(&self) -> bool {
        if !self.is_active() {
            return false;
        }
        lock(&self.inner.token).cancel();
        log::info!("Cancellation requested");
        true
    }

    /// Reports missing external resources. Empty when everything is present.
    pub async fn check_dependencies(&self) -> Vec<String> {
        crate::deps::check(&self.inner.paths, &self.inner.fs).await
    }

    /// Creates the download, video and audio directories.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub async fn ensure_directories(&self) -> Result<()> {
        for dir in self.output_dirs() {
            self.inner.fs.create_dir_all(&dir).await?;
        }
        Ok(())
    }

    /// Removes leftover `*.part` files and returns how many were deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing directory cannot be listed. Files
    /// that cannot be removed are logged and skipped.
    pub async fn clear_partial_files(&self) -> Result<usize> {
        let mut removed = 0;
        for dir in self.output_dirs() {
            if !self.inner.fs.exists(&dir).await {
                continue;
            }
            for file in self.inner.fs.list_files(&dir).await? {
                if !is_partial_file(&file) {
                    continue;
                }
                match self.inner.fs.remove_file(&file).await {
                    Ok(()) => {
                        log::debug!("Removed {}", file.display());
                        removed += 1;
                    }
                    Err(e) => log::warn!("Could not remove {}: {e}", file.display()),
                }
            }
        }
        log::info!("Removed {removed} partial file(s)");
        Ok(removed)
    }

    fn output_dirs(&self) -> [PathBuf; 3] {
        let paths = &self.inner.paths;
        [paths.download_dir.clone(), paths.video_dir(), paths.audio_dir()]
    }

    /// Resolves metadata for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyUrl`] for a blank URL and [`Error::Metadata`]
    /// when the backend fails, times out, or the URL exposes only images.
    pub async fn fetch_metadata(&self, url: &str) -> Result<MediaInfo> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::EmptyUrl);
        }

        let options = FetchOptions {
            cookie_file: self.inner.cookie_file().await,
            ffmpeg: self.inner.ffmpeg_location().await,
            proxy: self.inner.initial_proxy(),
        };

        log::info!("Fetching metadata for {url}");
        let fetch = self.inner.backend.fetch_info(url, &options);
        let result = match self.inner.config.fetch_timeout() {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .unwrap_or(Err(BackendError::TimedOut(limit))),
            None => fetch.await,
        };

        let info = result.map_err(|e| {
            let message = e.to_string();
            let kind = if e.is_credential_problem() {
                MetadataErrorKind::CredentialProblem
            } else {
                MetadataErrorKind::Generic
            };
            log::warn!("Metadata fetch failed for {url}: {message}");
            Error::Metadata { kind, message }
        })?;

        if info.images_only {
            return Err(Error::Metadata {
                kind: MetadataErrorKind::ImagesOnly,
                message: "this URL only contains images, there is no video to download"
                    .to_string(),
            });
        }

        log::info!("Resolved \"{}\"", info.title);
        Ok(info)
    }

    /// Starts downloading `info` on a worker task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] without starting anything when a download is
    /// already active.
    pub fn start_download(
        &self,
        info: &MediaInfo,
        selection: FormatSelection,
        sink: Arc<dyn DownloadProgress>,
    ) -> Result<DownloadHandle> {
        // The token lock is held while publishing `active` so a concurrent
        // `cancel()` always reaches the new token.
        let token = CancellationToken::new();
        let guard = {
            let mut current = lock(&self.inner.token);
            if self
                .inner
                .active
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                log::warn!("Rejected download of \"{}\": busy", info.title);
                return Err(Error::Busy);
            }
            *current = token.clone();
            ActiveGuard(Arc::clone(&self.inner.active))
        };

        let request = DownloadRequest::new(info, selection, &self.inner.paths);

        log::info!(
            "Downloading \"{}\" ({selection}) to {}",
            info.title,
            request.output_dir().display()
        );

        let inner = Arc::clone(&self.inner);
        let worker_request = request.clone();
        let worker_token = token.clone();
        let join = tokio::spawn(async move {
            let result = inner.run(&worker_request, &worker_token, sink.as_ref()).await;
            drop(guard);

            match &result {
                Ok(done) => log::info!(
                    "Finished {}{}",
                    done.request.sanitized_filename,
                    if done.via_fallback { " via proxy" } else { "" }
                ),
                Err(Error::Cancelled) => log::info!("Cancelled {}", worker_request.sanitized_filename),
                Err(e) => log::error!("Download failed: {e}"),
            }
            sink.on_finished(&DownloadOutcome::of(&result));
            result
        });

        Ok(DownloadHandle {
            request,
            token,
            join,
        })
    }
}

impl<B: MediaBackend, F: FileSystem> Inner<B, F> {
    async fn existing(&self, path: &Path) -> Option<PathBuf> {
        self.fs.exists(path).await.then(|| path.to_path_buf())
    }

    async fn cookie_file(&self) -> Option<PathBuf> {
        self.existing(&self.paths.cookie_file).await
    }

    /// An explicit ffmpeg path is passed when it exists; a bare program name
    /// is left for the backend to find in `PATH`.
    async fn ffmpeg_location(&self) -> Option<PathBuf> {
        if self.paths.ffmpeg.components().count() <= 1 {
            return None;
        }
        self.existing(&self.paths.ffmpeg).await
    }

    fn initial_proxy(&self) -> Option<String> {
        if self.proxy_enabled.load(Ordering::Acquire) {
            self.proxy.detect()
        } else {
            None
        }
    }

    async fn download_options(&self, request: &DownloadRequest) -> DownloadOptions {
        DownloadOptions {
            url: request.url.clone(),
            format: request.selection.format_rule(),
            output_template: request.output_template(),
            merge_output_format: match request.selection {
                FormatSelection::Video { .. } => self.config.merge_output_format.clone(),
                FormatSelection::AudioOnly => None,
            },
            cookie_file: self.cookie_file().await,
            ffmpeg: self.ffmpeg_location().await,
            proxy: self.initial_proxy(),
        }
    }

    async fn run(
        &self,
        request: &DownloadRequest,
        token: &CancellationToken,
        sink: &dyn DownloadProgress,
    ) -> Result<CompletedDownload> {
        self.fs.create_dir_all(request.output_dir()).await?;
        let options = self.download_options(request).await;
        sink.on_start(request);

        let (first_error, rejected) = match self.attempt(&options, token, sink).await {
            Ok(()) => return Self::settle(request, token, false),
            Err(BackendError::Aborted) => return Err(Error::Cancelled),
            Err(e) => (e.to_string(), e.is_credential_problem()),
        };
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if rejected {
            log::warn!("Download rejected, cookies need refreshing: {first_error}");
            return Err(Error::CredentialProblem(first_error));
        }
        if !self.config.fallback_retry {
            return Err(Error::DownloadFailed {
                attempts: vec![first_error],
            });
        }

        let proxy = self.proxy.detect();
        log::warn!(
            "Download failed ({first_error}), retrying once via proxy {}",
            proxy.as_deref().unwrap_or("none")
        );
        sink.on_fallback(proxy.as_deref(), &first_error);

        match self.attempt(&options.with_proxy(proxy), token, sink).await {
            Ok(()) => Self::settle(request, token, true),
            Err(BackendError::Aborted) => Err(Error::Cancelled),
            Err(_) if token.is_cancelled() => Err(Error::Cancelled),
            Err(e) => Err(Error::DownloadFailed {
                attempts: vec![first_error, e.to_string()],
            }),
        }
    }

    /// A success reported after cancellation still counts as cancelled.
    fn settle(
        request: &DownloadRequest,
        token: &CancellationToken,
        via_fallback: bool,
    ) -> Result<CompletedDownload> {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(CompletedDownload {
            request: request.clone(),
            via_fallback,
        })
    }

    async fn attempt(
        &self,
        options: &DownloadOptions,
        token: &CancellationToken,
        sink: &dyn DownloadProgress,
    ) -> std::result::Result<(), BackendError> {
        let throttle = Mutex::new(ProgressThrottle::new(self.config.progress_threshold));

        let hook = |snapshot: &ProgressSnapshot| {
            if token.is_cancelled() {
                return ControlFlow::Break(());
            }
            match snapshot.status {
                ProgressStatus::Downloading => {
                    let update = lock(&throttle).observe(snapshot);
                    if let Some(update) = update {
                        sink.on_progress(&update);
                    }
                }
                ProgressStatus::Finished => {
                    lock(&throttle).reset();
                    sink.on_processing();
                }
            }
            ControlFlow::Continue(())
        };

        self.backend.download(options, &hook).await
    }
}
