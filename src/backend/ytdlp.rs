//! yt-dlp child-process backend.

use std::ffi::OsString;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::{BackendError, DownloadOptions, FetchOptions, MediaBackend, ProgressHook};
use crate::progress::{ProgressSnapshot, ProgressStatus};
use crate::request::MediaInfo;

/// Prefix marking our progress lines on stdout.
const PROGRESS_PREFIX: &str = "reel-progress:";

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Runs the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlp {
    /// Backend running the given executable (a path or a name in `PATH`).
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The executable this backend runs.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, args: &[OsString]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> BackendError {
        BackendError::Spawn {
            program: self.program.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl MediaBackend for YtDlp {
    async fn fetch_info(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<MediaInfo, BackendError> {
        let args = fetch_args(url, options);
        log::debug!("Fetching metadata for {url}");

        let output = self
            .command(&args)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::Failed(failure_message(&stderr, output.status)));
        }

        parse_info(&output.stdout, url)
    }

    async fn download(
        &self,
        options: &DownloadOptions,
        hook: ProgressHook<'_>,
    ) -> Result<(), BackendError> {
        let args = download_args(options);
        log::debug!(
            "Starting yt-dlp for {} (proxy: {})",
            options.url,
            options.proxy.as_deref().unwrap_or("none")
        );

        let mut child = self.command(&args).spawn().map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("failed to capture yt-dlp stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("failed to capture yt-dlp stderr"))?;

        let stderr_reader = tokio::spawn(async move {
            let mut text = String::new();
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            while let Ok(Some(line)) = next_lossy_line(&mut reader, &mut buf).await {
                text.push_str(&line);
                text.push('\n');
            }
            text
        });

        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        while let Some(line) = next_lossy_line(&mut reader, &mut buf).await? {
            let Some(snapshot) = parse_progress_line(&line) else {
                continue;
            };
            if hook(&snapshot).is_break() {
                log::info!("Aborting yt-dlp for {}", options.url);
                let _ = child.kill().await;
                stderr_reader.abort();
                return Err(BackendError::Aborted);
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_reader.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(BackendError::Failed(failure_message(&stderr, status)))
        }
    }
}

/// Reads one line, replacing bytes that are not UTF-8. `None` at end of stream.
///
/// yt-dlp writes file names in the console code page on some systems.
async fn next_lossy_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn common_args(
    cookie_file: Option<&Path>,
    ffmpeg: Option<&Path>,
    proxy: Option<&str>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "--no-warnings",
        "--no-playlist",
        "--no-check-certificates",
        "--encoding",
        "utf-8",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();

    if let Some(cookies) = cookie_file {
        args.push("--cookies".into());
        args.push(cookies.into());
    }
    if let Some(ffmpeg) = ffmpeg {
        args.push("--ffmpeg-location".into());
        args.push(ffmpeg.into());
    }
    if let Some(proxy) = proxy {
        args.push("--proxy".into());
        args.push(proxy.into());
    }
    args
}

fn fetch_args(url: &str, options: &FetchOptions) -> Vec<OsString> {
    let mut args = vec![
        OsString::from("--dump-single-json"),
        OsString::from("--skip-download"),
    ];
    args.extend(common_args(
        options.cookie_file.as_deref(),
        options.ffmpeg.as_deref(),
        options.proxy.as_deref(),
    ));
    args.push("--".into());
    args.push(url.into());
    args
}

fn download_args(options: &DownloadOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--newline".into(),
        "--progress-template".into(),
        format!("download:{PROGRESS_PREFIX}%(progress)j").into(),
        "-f".into(),
        options.format.as_str().into(),
        "-o".into(),
        options.output_template.as_os_str().to_owned(),
    ];
    if let Some(container) = &options.merge_output_format {
        args.push("--merge-output-format".into());
        args.push(container.into());
    }
    args.extend(common_args(
        options.cookie_file.as_deref(),
        options.ffmpeg.as_deref(),
        options.proxy.as_deref(),
    ));
    args.push("--".into());
    args.push(options.url.as_str().into());
    args
}

/// Picks the most useful line out of yt-dlp's stderr.
fn failure_message(stderr: &str, status: ExitStatus) -> String {
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR:"))
        .collect();
    if !errors.is_empty() {
        return errors.join("\n");
    }

    stderr
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .map_or_else(|| format!("yt-dlp exited with {status}"), str::to_string)
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    title: Option<String>,
    webpage_url: Option<String>,
    original_url: Option<String>,
    filesize_approx: Option<f64>,
    filesize: Option<f64>,
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    vcodec: Option<String>,
    acodec: Option<String>,
    ext: Option<String>,
}

impl RawFormat {
    fn carries(codec: Option<&str>) -> bool {
        codec.is_some_and(|c| c != "none")
    }

    fn is_playable(&self) -> bool {
        Self::carries(self.vcodec.as_deref()) || Self::carries(self.acodec.as_deref())
    }

    fn is_image(&self) -> bool {
        self.ext
            .as_deref()
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn non_negative(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value.round() as u64)
}

fn parse_info(stdout: &[u8], requested_url: &str) -> Result<MediaInfo, BackendError> {
    let raw: RawInfo = serde_json::from_slice(stdout)?;

    let images_only = !raw.formats.is_empty()
        && !raw.formats.iter().any(RawFormat::is_playable)
        && raw.formats.iter().any(RawFormat::is_image);

    Ok(MediaInfo {
        title: raw
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "video".to_string()),
        webpage_url: raw
            .webpage_url
            .or(raw.original_url)
            .unwrap_or_else(|| requested_url.to_string()),
        approx_filesize: raw
            .filesize_approx
            .or(raw.filesize)
            .and_then(non_negative),
        images_only,
    })
}

#[derive(Debug, Deserialize)]
struct RawProgress {
    status: String,
    downloaded_bytes: Option<f64>,
    total_bytes: Option<f64>,
    total_bytes_estimate: Option<f64>,
    speed: Option<f64>,
    eta: Option<f64>,
}

/// Parses one stdout line emitted by our progress template.
fn parse_progress_line(line: &str) -> Option<ProgressSnapshot> {
    let json = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let raw: RawProgress = match serde_json::from_str(json) {
        Ok(raw) => raw,
        Err(e) => {
            log::debug!("Skipping unreadable progress line: {e}");
            return None;
        }
    };

    let status = match raw.status.as_str() {
        "downloading" => ProgressStatus::Downloading,
        "finished" => ProgressStatus::Finished,
        _ => return None,
    };

    let total_bytes = raw
        .total_bytes
        .or(raw.total_bytes_estimate)
        .and_then(non_negative);
    let downloaded_bytes = raw
        .downloaded_bytes
        .and_then(non_negative)
        .or(match status {
            ProgressStatus::Finished => total_bytes,
            ProgressStatus::Downloading => None,
        })
        .unwrap_or(0);

    Some(ProgressSnapshot {
        status,
        downloaded_bytes,
        total_bytes,
        speed: raw.speed.filter(|s| s.is_finite() && *s >= 0.0),
        eta: raw.eta.and_then(non_negative),
    })
}
