//! Application state model.

use tokio::sync::mpsc;

use crate::{MediaInfo, Orchestrator, Settings, SettingsStore, Theme, ViewEvent, ViewState};

use super::event::UiEvent;

pub struct App {
    pub should_quit: bool,
    // URL input (top bar)
    pub url_input: String,
    // Rendered state, only changed through `apply`
    pub view: ViewState,
    // Metadata of the URL awaiting a resolution choice
    pub media: Option<MediaInfo>,
    // Bumped on every fetch and clear; stale worker events are dropped
    pub generation: u64,
    // Persistence
    pub settings: Settings,
    pub store: SettingsStore,
    // Core
    pub orchestrator: Orchestrator,
    // Channels
    pub event_tx: mpsc::UnboundedSender<UiEvent>,
}

impl App {
    pub fn new(
        orchestrator: Orchestrator,
        settings: Settings,
        store: SettingsStore,
        event_tx: mpsc::UnboundedSender<UiEvent>,
    ) -> Self {
        orchestrator.set_proxy_enabled(settings.proxy_enabled);
        Self {
            should_quit: false,
            url_input: String::new(),
            view: ViewState::default(),
            media: None,
            generation: 0,
            settings,
            store,
            orchestrator,
            event_tx,
        }
    }

    /// Folds `event` into the view state.
    pub fn apply(&mut self, event: ViewEvent) {
        let view = std::mem::take(&mut self.view);
        self.view = view.apply(event);
    }

    pub const fn theme(&self) -> Theme {
        self.settings.theme
    }

    pub fn toggle_theme(&mut self) {
        self.settings.theme = self.settings.theme.toggled();
        self.store.save(&self.settings);
        log::info!("Theme set to {}", self.settings.theme.as_str());
    }

    pub fn toggle_proxy(&mut self) {
        self.settings.proxy_enabled = !self.settings.proxy_enabled;
        self.orchestrator
            .set_proxy_enabled(self.settings.proxy_enabled);
        self.store.save(&self.settings);
    }
}
