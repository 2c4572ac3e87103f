//! Worker task management and event handling.

use std::sync::Arc;
use std::time::Duration;

use crate::{Error, FormatSelection, ViewEvent, extract_url};

use super::app::App;
use super::event::{TuiProgress, UiEvent};

/// How long a clear waits for a cancelled download to release its files.
const CLEAR_GRACE: Duration = Duration::from_secs(5);

/// Starts fetching metadata for the URL in the input bar.
pub fn start_fetch(app: &mut App) {
    if app.orchestrator.is_active() {
        app.apply(ViewEvent::Busy);
        return;
    }

    let Some(url) = extract_url(&app.url_input) else {
        app.apply(ViewEvent::metadata_failed(&Error::EmptyUrl));
        return;
    };
    app.url_input.clone_from(&url);

    app.generation += 1;
    app.media = None;
    app.apply(ViewEvent::FetchStarted);

    let generation = app.generation;
    let orchestrator = app.orchestrator.clone();
    let tx = app.event_tx.clone();
    tokio::spawn(async move {
        let event = match orchestrator.fetch_metadata(&url).await {
            Ok(info) => ViewEvent::MetadataReady(info),
            Err(e) => ViewEvent::metadata_failed(&e),
        };
        let _ = tx.send(UiEvent::Metadata { generation, event });
    });
}

/// Starts downloading the fetched media with `selection`.
pub fn start_download(app: &mut App, selection: FormatSelection) {
    let Some(info) = app.media.clone() else {
        return;
    };

    let sink = Arc::new(TuiProgress::new(app.event_tx.clone(), app.generation));
    match app.orchestrator.start_download(&info, selection, sink) {
        // The worker reports through the sink; the handle is not needed.
        Ok(_handle) => app.apply(ViewEvent::DownloadStarted(selection)),
        Err(Error::Busy) => app.apply(ViewEvent::Busy),
        Err(e) => app.apply(ViewEvent::Finished(crate::DownloadOutcome::Failed(
            e.to_string(),
        ))),
    }
}

/// Cancels any running work, removes partial files and resets the view.
pub fn clear(app: &mut App) {
    app.orchestrator.cancel();
    app.generation += 1;
    app.media = None;
    app.url_input.clear();

    let orchestrator = app.orchestrator.clone();
    let tx = app.event_tx.clone();
    tokio::spawn(async move {
        let deadline = tokio::time::Instant::now() + CLEAR_GRACE;
        while orchestrator.is_active() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        let result = orchestrator
            .clear_partial_files()
            .await
            .map_err(|e| e.to_string());
        let _ = tx.send(UiEvent::Cleared { result });
    });
}

/// Applies one worker event to the app.
pub fn handle_ui_event(app: &mut App, event: UiEvent) {
    match event {
        UiEvent::Metadata { generation, event } | UiEvent::Download { generation, event } => {
            if generation != app.generation {
                log::debug!("Dropping stale event {event:?}");
                return;
            }
            if let ViewEvent::MetadataReady(ref info) = event {
                app.media = Some(info.clone());
            }
            app.apply(event);
        }
        UiEvent::Cleared { result } => {
            let removed = result.unwrap_or_else(|e| {
                log::error!("Failed to clear partial files: {e}");
                0
            });
            app.apply(ViewEvent::Cleared { removed });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::app::test_support::test_app;
    use super::*;
    use crate::{MediaInfo, Phase};
    use tempfile::TempDir;

    fn info() -> MediaInfo {
        MediaInfo {
            title: "Clip".to_string(),
            webpage_url: "https://x".to_string(),
            approx_filesize: None,
            images_only: false,
        }
    }

    #[tokio::test]
    async fn empty_input_fails_without_spawning() {
        let dir = TempDir::new().unwrap();
        let (mut app, mut rx) = test_app(&dir);
        start_fetch(&mut app);
        assert_eq!(app.view.phase, Phase::Failed);
        assert_eq!(app.view.error.as_deref(), Some("no URL provided"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stale_events_are_dropped() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = test_app(&dir);
        app.generation = 3;

        handle_ui_event(
            &mut app,
            UiEvent::Metadata {
                generation: 2,
                event: ViewEvent::MetadataReady(info()),
            },
        );
        assert!(app.media.is_none());
        assert_eq!(app.view.phase, Phase::Idle);

        handle_ui_event(
            &mut app,
            UiEvent::Metadata {
                generation: 3,
                event: ViewEvent::MetadataReady(info()),
            },
        );
        assert_eq!(app.media, Some(info()));
        assert!(app.view.choices_visible());
    }

    #[tokio::test]
    async fn download_failure_reaches_view() {
        let dir = TempDir::new().unwrap();
        let (mut app, mut rx) = test_app(&dir);
        app.media = Some(info());

        start_download(&mut app, FormatSelection::AudioOnly);
        assert_eq!(app.view.phase, Phase::Downloading);

        // The configured yt-dlp does not exist, so both attempts fail.
        while app.view.phase == Phase::Downloading {
            let event = rx.recv().await.unwrap();
            handle_ui_event(&mut app, event);
        }
        assert_eq!(app.view.phase, Phase::Failed);
        assert!(app.view.error.as_deref().unwrap().contains("no-such-yt-dlp"));
    }

    #[tokio::test]
    async fn clear_reports_removed_files() {
        let dir = TempDir::new().unwrap();
        let (mut app, mut rx) = test_app(&dir);
        let videos = dir.path().join("downloads/Videos");
        std::fs::create_dir_all(&videos).unwrap();
        std::fs::write(videos.join("x.mp4.part"), "x").unwrap();
        app.url_input = "https://x".to_string();

        clear(&mut app);
        assert!(app.url_input.is_empty());
        let event = rx.recv().await.unwrap();
        handle_ui_event(&mut app, event);
        assert_eq!(app.view.status, "Cleared (1 partial file(s) removed)");
    }
}
