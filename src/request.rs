//! Media metadata, format selection and download request construction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::PathConfig;

static ILLEGAL_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).expect("valid regex"));

/// Resolutions offered by the presentation layer.
pub const RESOLUTIONS: [u32; 3] = [1080, 720, 480];

/// Metadata resolved for a URL by the media backend.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// Human-readable title as reported by the site.
    pub title: String,
    /// Canonical URL handed to the download step.
    pub webpage_url: String,
    /// Rough size estimate in bytes, informational only.
    pub approx_filesize: Option<u64>,
    /// True when the URL exposes only images (no video or audio streams).
    pub images_only: bool,
}

/// What to download from a media page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSelection {
    /// Video capped at the given height, merged with audio.
    Video { height: u32 },
    /// Best audio stream only.
    AudioOnly,
}

impl FormatSelection {
    /// Filename suffix distinguishing selections of the same title.
    #[must_use]
    pub fn suffix(self) -> String {
        match self {
            Self::Video { height } => format!("{height}p"),
            Self::AudioOnly => "audio".to_string(),
        }
    }

    /// yt-dlp format rule for this selection.
    ///
    /// Video prefers a pre-muxed mp4 at or below the height, then separate
    /// best video + best audio streams, then anything at or below the
    /// height, and finally whatever is available.
    #[must_use]
    pub fn format_rule(self) -> String {
        match self {
            Self::Video { height } => format!(
                "best[height<={height}][ext=mp4]/bestvideo[height<={height}][ext=mp4]+bestaudio[ext=m4a]/best[height<={height}]/best"
            ),
            Self::AudioOnly => "bestaudio[ext=m4a]/bestaudio/best".to_string(),
        }
    }
}

impl fmt::Display for FormatSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video { height } => write!(f, "{height}p"),
            Self::AudioOnly => f.write_str("audio only"),
        }
    }
}

/// Everything needed to run one download. Not mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub selection: FormatSelection,
    pub output_dir: PathBuf,
    pub sanitized_filename: String,
}

impl DownloadRequest {
    /// Builds a request for `info`, writing under the directory matching the
    /// selection (videos or audios).
    #[must_use]
    pub fn new(info: &MediaInfo, selection: FormatSelection, paths: &PathConfig) -> Self {
        let output_dir = match selection {
            FormatSelection::Video { .. } => paths.video_dir(),
            FormatSelection::AudioOnly => paths.audio_dir(),
        };
        Self {
            url: info.webpage_url.clone(),
            selection,
            output_dir,
            sanitized_filename: format!(
                "{}_{}",
                sanitize_filename(&info.title),
                selection.suffix()
            ),
        }
    }

    /// yt-dlp output template, leaving the extension to the backend.
    #[must_use]
    pub fn output_template(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.%(ext)s", self.sanitized_filename))
    }

    /// Directory the finished file lands in.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

/// Replaces characters that are illegal in file names with `_`.
#[must_use]
pub fn sanitize_filename(title: &str) -> String {
    ILLEGAL_FILENAME_CHARS.replace_all(title, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(title: &str) -> MediaInfo {
        MediaInfo {
            title: title.to_string(),
            webpage_url: "https://www.youtube.com/watch?v=abc".to_string(),
            approx_filesize: None,
            images_only: false,
        }
    }

    fn paths() -> PathConfig {
        PathConfig {
            download_dir: PathBuf::from("/dl"),
            ..PathConfig::default()
        }
    }

    #[test]
    fn sanitize_replaces_forbidden_characters() {
        assert_eq!(sanitize_filename(r#"a<b>c:d"e/f\g|h?i*j"#), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_filename("tab\there\nnewline\u{1f}"), "tab_here_newline_");
        assert_eq!(sanitize_filename("Plain title (2024) - Live!"), "Plain title (2024) - Live!");
    }

    #[test]
    fn sanitize_keeps_unicode() {
        assert_eq!(sanitize_filename("ویدیو: تست"), "ویدیو_ تست");
    }

    #[test]
    fn video_request_naming() {
        let request = DownloadRequest::new(
            &info("Song: Live / 2024"),
            FormatSelection::Video { height: 720 },
            &paths(),
        );
        assert_eq!(request.sanitized_filename, "Song_ Live _ 2024_720p");
        assert_eq!(request.output_dir(), Path::new("/dl/Videos"));
        assert_eq!(
            request.output_template(),
            PathBuf::from("/dl/Videos/Song_ Live _ 2024_720p.%(ext)s")
        );
        assert_eq!(request.url, "https://www.youtube.com/watch?v=abc");
    }

    #[test]
    fn audio_request_goes_to_audio_dir() {
        let request = DownloadRequest::new(&info("Podcast"), FormatSelection::AudioOnly, &paths());
        assert_eq!(request.sanitized_filename, "Podcast_audio");
        assert_eq!(request.output_dir(), Path::new("/dl/Audios"));
    }

    #[test]
    fn video_format_rule_falls_back_to_best() {
        let rule = FormatSelection::Video { height: 480 }.format_rule();
        let alternatives: Vec<&str> = rule.split('/').collect();
        assert_eq!(
            alternatives,
            vec![
                "best[height<=480][ext=mp4]",
                "bestvideo[height<=480][ext=mp4]+bestaudio[ext=m4a]",
                "best[height<=480]",
                "best",
            ]
        );
    }

    #[test]
    fn selection_display() {
        assert_eq!(FormatSelection::Video { height: 1080 }.to_string(), "1080p");
        assert_eq!(FormatSelection::AudioOnly.to_string(), "audio only");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

        proptest! {
            #[test]
            fn sanitize_is_idempotent(title in ".*") {
                let once = sanitize_filename(&title);
                prop_assert_eq!(sanitize_filename(&once), once);
            }

            #[test]
            fn sanitize_leaves_no_forbidden_chars(title in ".*") {
                let clean = sanitize_filename(&title);
                prop_assert!(!clean.chars().any(|c| FORBIDDEN.contains(&c) || (c as u32) < 0x20));
                prop_assert_eq!(clean.chars().count(), title.chars().count());
            }
        }
    }
}
