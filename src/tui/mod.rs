//! Interactive TUI for fetching and downloading videos.

mod app;
mod download;
mod draw;
mod event;
mod input;

use std::io;
use std::time::Duration;

use crossterm::event::{Event, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;

use crate::{AppConfig, Orchestrator, SettingsStore, ViewEvent};

use self::app::App;
use self::download::handle_ui_event;
use self::draw::draw;
use self::event::UiEvent;
use self::input::{handle_input, handle_paste};

/// RAII guard that ensures terminal cleanup on drop.
/// Restores terminal to normal mode even if a panic occurs.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        crossterm::execute!(
            io::stdout(),
            EnterAlternateScreen,
            crossterm::event::EnableBracketedPaste
        )?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = crossterm::execute!(
            io::stdout(),
            crossterm::event::DisableBracketedPaste,
            LeaveAlternateScreen
        );
    }
}

/// Run the interactive TUI.
///
/// Persisted settings are loaded (or seeded from `config` on first run),
/// the download folders are created, and any missing dependency is shown
/// in a popup before the first frame.
///
/// # Errors
/// Returns an error if terminal setup fails or TUI operations encounter I/O errors.
pub async fn run(mut config: AppConfig) -> io::Result<()> {
    let store = SettingsStore::at_default_path();
    let settings = store.load_seeded(&mut config.paths);
    let orchestrator: Orchestrator = Orchestrator::new(&config);

    if let Err(e) = orchestrator.ensure_directories().await {
        log::warn!("Could not create download folders: {e}");
    }
    let problems = orchestrator.check_dependencies().await;

    // Initialize terminal with RAII guard for automatic cleanup
    let _terminal_guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let mut app = App::new(orchestrator, settings, store, event_tx);

    if !problems.is_empty() {
        for problem in &problems {
            log::warn!("{problem}");
        }
        app.apply(ViewEvent::StartupProblems(problems));
    }

    loop {
        terminal.draw(|f| draw(f, &app))?;

        // Poll for events with 100ms timeout
        if crossterm::event::poll(Duration::from_millis(100))? {
            match crossterm::event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_input(&mut app, key),
                Event::Paste(text) => handle_paste(&mut app, &text),
                _ => {}
            }
        }

        // Drain worker events (non-blocking)
        while let Ok(event) = event_rx.try_recv() {
            handle_ui_event(&mut app, event);
        }

        if app.should_quit {
            if app.orchestrator.cancel() {
                log::info!("Cancelled running download on exit");
            }
            break;
        }
    }

    // Show cursor before exit (terminal cleanup handled by RAII guard)
    terminal.show_cursor()?;

    Ok(())
}
