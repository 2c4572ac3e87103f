//! Keyboard and paste input handling.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::{FormatSelection, RESOLUTIONS, ViewEvent, extract_url};

use super::app::App;
use super::download::{clear, start_download, start_fetch};

pub fn handle_input(app: &mut App, key: KeyEvent) {
    // Global quit
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    // Any key dismisses a popup
    if app.view.notice.is_some() {
        app.apply(ViewEvent::DismissNotice);
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('l') => clear(app),
            KeyCode::Char('t') => app.toggle_theme(),
            KeyCode::Char('p') => app.toggle_proxy(),
            _ => {}
        }
        return;
    }

    if app.view.choices_visible()
        && let Some(selection) = selection_for(key.code)
    {
        start_download(app, selection);
        return;
    }

    handle_main_input(app, key);
}

/// Maps `1`/`2`/`3` to the offered resolutions and `a` to audio only.
fn selection_for(code: KeyCode) -> Option<FormatSelection> {
    match code {
        KeyCode::Char('a') => Some(FormatSelection::AudioOnly),
        KeyCode::Char(c) => {
            let index = c.to_digit(10)?.checked_sub(1)?;
            RESOLUTIONS
                .get(usize::try_from(index).ok()?)
                .map(|&height| FormatSelection::Video { height })
        }
        _ => None,
    }
}

fn handle_main_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            if app.orchestrator.is_active() {
                app.apply(ViewEvent::Busy);
            } else if app.view.inputs_enabled() {
                start_fetch(app);
            }
        }
        KeyCode::Esc => {
            if app.url_input.is_empty() {
                app.should_quit = true;
            } else {
                app.url_input.clear();
            }
        }
        KeyCode::Char(c) if app.view.inputs_enabled() => {
            app.url_input.push(c);
        }
        KeyCode::Backspace if app.view.inputs_enabled() => {
            app.url_input.pop();
        }
        _ => {}
    }
}

pub fn handle_paste(app: &mut App, text: &str) {
    if !app.view.inputs_enabled() || app.view.notice.is_some() {
        return;
    }
    // Keep only the URL out of whatever was pasted
    match extract_url(text) {
        Some(url) => app.url_input = url,
        None => app.url_input.push_str(&text.replace(['\n', '\r'], " ")),
    }
}
