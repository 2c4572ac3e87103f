//! Presentation state as a pure transition function.
//!
//! Every orchestrator callback and user action becomes a [`ViewEvent`];
//! [`ViewState::apply`] folds it into the next state. Front-ends only render
//! the resulting value.

use crate::download::DownloadOutcome;
use crate::error::{Error, MetadataErrorKind};
use crate::format::elide;
use crate::progress::ProgressUpdate;
use crate::request::{FormatSelection, MediaInfo};

/// Titles longer than this are shown shortened.
pub const TITLE_LIMIT: usize = 60;

/// Where the current request is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    FetchingMetadata,
    AwaitingChoice,
    Downloading,
    Processing,
    Completed,
    Cancelled,
    Failed,
}

/// Colour class of the status label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusTone {
    #[default]
    Idle,
    InFlight,
    Completed,
    Cancelled,
    Failed,
}

/// A popup shown over the main view until dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A download was requested while another one is running.
    Busy,
    /// The stored cookies were rejected; the user should re-export them.
    CredentialPrompt(String),
    /// Missing external resources found at start-up.
    StartupProblems(Vec<String>),
}

/// Inputs to [`ViewState::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    FetchStarted,
    MetadataReady(MediaInfo),
    MetadataFailed {
        kind: MetadataErrorKind,
        message: String,
    },
    DownloadStarted(FormatSelection),
    Progress(ProgressUpdate),
    Processing,
    Fallback {
        proxy: Option<String>,
    },
    Finished(DownloadOutcome),
    Busy,
    Cleared {
        removed: usize,
    },
    StartupProblems(Vec<String>),
    DismissNotice,
}

impl ViewEvent {
    /// Event for a failed [`fetch_metadata`](crate::Orchestrator::fetch_metadata).
    #[must_use]
    pub fn metadata_failed(error: &Error) -> Self {
        match error {
            Error::Metadata { kind, message } => Self::MetadataFailed {
                kind: *kind,
                message: message.clone(),
            },
            other => Self::MetadataFailed {
                kind: MetadataErrorKind::Generic,
                message: other.to_string(),
            },
        }
    }
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub phase: Phase,
    /// Elided title of the fetched media.
    pub title: Option<String>,
    pub status: String,
    pub tone: StatusTone,
    /// Latest progress; `None` hides the numeric display.
    pub progress: Option<ProgressUpdate>,
    /// Inline error shown in place of the selection panel.
    pub error: Option<String>,
    pub notice: Option<Notice>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            title: None,
            status: "Ready".to_string(),
            tone: StatusTone::Idle,
            progress: None,
            error: None,
            notice: None,
        }
    }
}

impl ViewState {
    /// Whether URL entry and selection accept input.
    #[must_use]
    pub const fn inputs_enabled(&self) -> bool {
        !matches!(
            self.phase,
            Phase::FetchingMetadata | Phase::Downloading | Phase::Processing
        )
    }

    /// Whether the resolution choices are offered.
    #[must_use]
    pub fn choices_visible(&self) -> bool {
        self.phase == Phase::AwaitingChoice
    }

    fn with_status(mut self, phase: Phase, status: impl Into<String>, tone: StatusTone) -> Self {
        self.phase = phase;
        self.status = status.into();
        self.tone = tone;
        self
    }

    /// Returns the state after `event`.
    #[must_use]
    pub fn apply(self, event: ViewEvent) -> Self {
        match event {
            ViewEvent::FetchStarted => Self {
                notice: self.notice,
                ..Self::default()
            }
            .with_status(
                Phase::FetchingMetadata,
                "Fetching video information...",
                StatusTone::InFlight,
            ),

            ViewEvent::MetadataReady(info) => {
                let mut next = self.with_status(
                    Phase::AwaitingChoice,
                    "Select a resolution",
                    StatusTone::Idle,
                );
                next.title = Some(elide(&info.title, TITLE_LIMIT));
                next.error = None;
                next
            }

            ViewEvent::MetadataFailed { kind, message } => {
                let mut next =
                    self.with_status(Phase::Failed, "Could not fetch video", StatusTone::Failed);
                next.title = None;
                match kind {
                    MetadataErrorKind::CredentialProblem => {
                        next.status = "Cookies need refreshing".to_string();
                        next.error = Some(message.clone());
                        next.notice = Some(Notice::CredentialPrompt(message));
                    }
                    MetadataErrorKind::ImagesOnly => {
                        next.error =
                            Some("This URL only contains images. Video download is not possible.".to_string());
                    }
                    MetadataErrorKind::Generic => next.error = Some(message),
                }
                next
            }

            ViewEvent::DownloadStarted(selection) => {
                let mut next = self.with_status(
                    Phase::Downloading,
                    format!("Downloading {selection}..."),
                    StatusTone::InFlight,
                );
                next.progress = None;
                next.error = None;
                next
            }

            ViewEvent::Progress(update) => {
                if !matches!(self.phase, Phase::Downloading | Phase::Processing) {
                    return self;
                }
                let mut next = self;
                next.phase = Phase::Downloading;
                next.progress = Some(update);
                next
            }

            ViewEvent::Processing => {
                if !matches!(self.phase, Phase::Downloading | Phase::Processing) {
                    return self;
                }
                let mut next =
                    self.with_status(Phase::Processing, "Processing...", StatusTone::InFlight);
                next.progress = None;
                next
            }

            ViewEvent::Fallback { proxy } => {
                let status = proxy.map_or_else(
                    || "Download failed, retrying...".to_string(),
                    |p| format!("Download failed, retrying via {p}..."),
                );
                let mut next = self.with_status(Phase::Downloading, status, StatusTone::InFlight);
                next.progress = None;
                next
            }

            ViewEvent::Finished(outcome) => self.finish(outcome),

            ViewEvent::Busy => {
                let mut next = self;
                next.notice = Some(Notice::Busy);
                next
            }

            ViewEvent::Cleared { removed } => Self::default().with_status(
                Phase::Idle,
                format!("Cleared ({removed} partial file(s) removed)"),
                StatusTone::Idle,
            ),

            ViewEvent::StartupProblems(problems) => {
                let mut next = self;
                if !problems.is_empty() {
                    next.notice = Some(Notice::StartupProblems(problems));
                }
                next
            }

            ViewEvent::DismissNotice => {
                let mut next = self;
                next.notice = None;
                next
            }
        }
    }

    fn finish(self, outcome: DownloadOutcome) -> Self {
        let mut next = match outcome {
            DownloadOutcome::Completed { via_fallback } => {
                let status = if via_fallback {
                    "Download completed (via proxy)!"
                } else {
                    "Download completed!"
                };
                self.with_status(Phase::Completed, status, StatusTone::Completed)
            }
            DownloadOutcome::Cancelled => {
                self.with_status(Phase::Cancelled, "Download cancelled", StatusTone::Cancelled)
            }
            DownloadOutcome::CredentialProblem(message) => {
                let mut next = self.with_status(
                    Phase::Failed,
                    "Download failed: cookies need refreshing",
                    StatusTone::Failed,
                );
                next.error = Some(message.clone());
                next.notice = Some(Notice::CredentialPrompt(message));
                next
            }
            DownloadOutcome::Failed(message) => {
                let mut next = self.with_status(Phase::Failed, "Download failed", StatusTone::Failed);
                next.error = Some(message);
                next
            }
        };
        next.progress = None;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(title: &str) -> MediaInfo {
        MediaInfo {
            title: title.to_string(),
            webpage_url: "https://x".to_string(),
            approx_filesize: None,
            images_only: false,
        }
    }

    fn update(fraction: f64) -> ProgressUpdate {
        ProgressUpdate {
            fraction,
            downloaded_bytes: 0,
            total_bytes: 1,
            speed: "N/A".to_string(),
            eta: "?".to_string(),
        }
    }

    fn run(events: Vec<ViewEvent>) -> ViewState {
        events.into_iter().fold(ViewState::default(), ViewState::apply)
    }

    #[test]
    fn happy_path() {
        let state = run(vec![ViewEvent::FetchStarted]);
        assert_eq!(state.phase, Phase::FetchingMetadata);
        assert!(!state.inputs_enabled());

        let state = state.apply(ViewEvent::MetadataReady(info("Clip")));
        assert!(state.choices_visible());
        assert!(state.inputs_enabled());
        assert_eq!(state.title.as_deref(), Some("Clip"));

        let state = state.apply(ViewEvent::DownloadStarted(FormatSelection::Video { height: 720 }));
        assert_eq!(state.status, "Downloading 720p...");
        assert_eq!(state.tone, StatusTone::InFlight);
        assert!(!state.inputs_enabled());

        let state = state.apply(ViewEvent::Progress(update(0.5)));
        assert!((state.progress.as_ref().unwrap().fraction - 0.5).abs() < 1e-9);

        let state = state.apply(ViewEvent::Processing);
        assert_eq!(state.phase, Phase::Processing);
        assert!(state.progress.is_none());

        let state = state.apply(ViewEvent::Finished(DownloadOutcome::Completed {
            via_fallback: false,
        }));
        assert_eq!(state.phase, Phase::Completed);
        assert_eq!(state.tone, StatusTone::Completed);
        assert!(state.inputs_enabled());
    }

    #[test]
    fn long_titles_are_elided() {
        let title = "x".repeat(80);
        let state = run(vec![ViewEvent::MetadataReady(info(&title))]);
        let shown = state.title.unwrap();
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), TITLE_LIMIT + 3);
    }

    #[test]
    fn cancelled_is_not_failed() {
        let state = run(vec![
            ViewEvent::DownloadStarted(FormatSelection::AudioOnly),
            ViewEvent::Finished(DownloadOutcome::Cancelled),
        ]);
        assert_eq!(state.phase, Phase::Cancelled);
        assert_eq!(state.tone, StatusTone::Cancelled);
        assert_eq!(state.status, "Download cancelled");
        assert!(state.error.is_none());
    }

    #[test]
    fn busy_keeps_status_and_raises_notice() {
        let state = run(vec![ViewEvent::DownloadStarted(FormatSelection::AudioOnly)]);
        let before = state.status.clone();
        let state = state.apply(ViewEvent::Busy);
        assert_eq!(state.status, before);
        assert_eq!(state.phase, Phase::Downloading);
        assert_eq!(state.notice, Some(Notice::Busy));

        let state = state.apply(ViewEvent::DismissNotice);
        assert!(state.notice.is_none());
    }

    #[test]
    fn credential_failure_prompts() {
        let state = run(vec![
            ViewEvent::FetchStarted,
            ViewEvent::MetadataFailed {
                kind: MetadataErrorKind::CredentialProblem,
                message: "cookies expired".to_string(),
            },
        ]);
        assert_eq!(state.phase, Phase::Failed);
        assert!(matches!(state.notice, Some(Notice::CredentialPrompt(_))));
        assert!(state.inputs_enabled());
    }

    #[test]
    fn generic_failure_shows_inline_message() {
        let state = run(vec![
            ViewEvent::FetchStarted,
            ViewEvent::metadata_failed(&Error::Metadata {
                kind: MetadataErrorKind::Generic,
                message: "Video unavailable".to_string(),
            }),
        ]);
        assert_eq!(state.error.as_deref(), Some("Video unavailable"));
        assert_eq!(state.tone, StatusTone::Failed);
        assert!(state.notice.is_none());
        assert!(!state.choices_visible());
    }

    #[test]
    fn non_metadata_errors_map_to_generic() {
        assert_eq!(
            ViewEvent::metadata_failed(&Error::EmptyUrl),
            ViewEvent::MetadataFailed {
                kind: MetadataErrorKind::Generic,
                message: "no URL provided".to_string(),
            }
        );
    }

    #[test]
    fn images_only_message() {
        let state = run(vec![ViewEvent::MetadataFailed {
            kind: MetadataErrorKind::ImagesOnly,
            message: String::new(),
        }]);
        assert!(state.error.unwrap().contains("only contains images"));
    }

    #[test]
    fn late_progress_after_terminal_state_is_ignored() {
        let state = run(vec![
            ViewEvent::DownloadStarted(FormatSelection::AudioOnly),
            ViewEvent::Finished(DownloadOutcome::Cancelled),
            ViewEvent::Progress(update(0.9)),
            ViewEvent::Processing,
        ]);
        assert_eq!(state.phase, Phase::Cancelled);
        assert!(state.progress.is_none());
    }

    #[test]
    fn fallback_and_failure() {
        let state = run(vec![
            ViewEvent::DownloadStarted(FormatSelection::Video { height: 480 }),
            ViewEvent::Fallback {
                proxy: Some("http://p:1".to_string()),
            },
        ]);
        assert_eq!(state.status, "Download failed, retrying via http://p:1...");
        assert!(!state.inputs_enabled());

        let state = state.apply(ViewEvent::Finished(DownloadOutcome::Failed("a | b".to_string())));
        assert_eq!(state.phase, Phase::Failed);
        assert_eq!(state.error.as_deref(), Some("a | b"));
    }

    #[test]
    fn clear_resets_everything() {
        let state = run(vec![
            ViewEvent::MetadataReady(info("Clip")),
            ViewEvent::Busy,
            ViewEvent::Cleared { removed: 2 },
        ]);
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.title.is_none());
        assert!(state.notice.is_none());
        assert_eq!(state.status, "Cleared (2 partial file(s) removed)");
    }

    #[test]
    fn empty_startup_report_raises_nothing() {
        assert!(run(vec![ViewEvent::StartupProblems(Vec::new())]).notice.is_none());
        let state = run(vec![ViewEvent::StartupProblems(vec!["ffmpeg not found".to_string()])]);
        assert!(matches!(state.notice, Some(Notice::StartupProblems(ref p)) if p.len() == 1));
    }
}
