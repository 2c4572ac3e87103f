//! Event types for TUI mode.

use tokio::sync::mpsc;

use crate::{DownloadOutcome, DownloadProgress, ProgressUpdate, ViewEvent};

/// Events sent from worker tasks to the TUI loop.
///
/// `generation` tags results of work started before the last clear so the
/// loop can drop them.
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Result of a metadata fetch.
    Metadata { generation: u64, event: ViewEvent },
    /// Callback from the running download.
    Download { generation: u64, event: ViewEvent },
    /// Partial-file cleanup finished.
    Cleared { result: Result<usize, String> },
}

/// Progress sink that forwards download callbacks onto the UI channel.
pub struct TuiProgress {
    tx: mpsc::UnboundedSender<UiEvent>,
    generation: u64,
}

impl TuiProgress {
    pub const fn new(tx: mpsc::UnboundedSender<UiEvent>, generation: u64) -> Self {
        Self { tx, generation }
    }

    fn send(&self, event: ViewEvent) {
        let _ = self.tx.send(UiEvent::Download {
            generation: self.generation,
            event,
        });
    }
}

impl DownloadProgress for TuiProgress {
    fn on_progress(&self, update: &ProgressUpdate) {
        self.send(ViewEvent::Progress(update.clone()));
    }

    fn on_processing(&self) {
        self.send(ViewEvent::Processing);
    }

    fn on_fallback(&self, proxy: Option<&str>, _first_error: &str) {
        self.send(ViewEvent::Fallback {
            proxy: proxy.map(str::to_string),
        });
    }

    fn on_finished(&self, outcome: &DownloadOutcome) {
        self.send(ViewEvent::Finished(outcome.clone()));
    }
}
