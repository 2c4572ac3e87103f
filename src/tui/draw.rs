//! All drawing / rendering functions.

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap};

use crate::{Notice, Phase, RESOLUTIONS, StatusTone, Theme, format_bytes};

use super::app::App;

const ORANGE: Color = Color::Rgb(255, 165, 0);

/// Colours for one theme.
struct Palette {
    fg: Color,
    bg: Color,
    accent: Color,
    muted: Color,
}

impl Palette {
    const fn of(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                fg: Color::White,
                bg: Color::Reset,
                accent: Color::Cyan,
                muted: Color::DarkGray,
            },
            Theme::Light => Self {
                fg: Color::Black,
                bg: Color::White,
                accent: Color::Blue,
                muted: Color::Gray,
            },
        }
    }
}

const fn tone_color(tone: StatusTone) -> Color {
    match tone {
        StatusTone::Idle => Color::Gray,
        StatusTone::InFlight | StatusTone::Cancelled => ORANGE,
        StatusTone::Completed => Color::Green,
        StatusTone::Failed => Color::Red,
    }
}

pub fn draw(frame: &mut ratatui::Frame, app: &App) {
    let palette = Palette::of(app.theme());
    draw_main(frame, app, &palette);
    match &app.view.notice {
        None => {}
        Some(Notice::Busy) => draw_popup(
            frame,
            &palette,
            " Busy ",
            ORANGE,
            &["A download is already in progress.".to_string()],
        ),
        Some(Notice::CredentialPrompt(message)) => draw_popup(
            frame,
            &palette,
            " Cookies need refreshing ",
            Color::Red,
            &[
                "Your cookies appear to be invalid or expired.".to_string(),
                format!("Please re-export them to {}", app.orchestrator.paths().cookie_file.display()),
                String::new(),
                message.clone(),
            ],
        ),
        Some(Notice::StartupProblems(problems)) => draw_popup(
            frame,
            &palette,
            " Missing dependencies ",
            Color::Red,
            problems,
        ),
    }
}

fn draw_main(frame: &mut ratatui::Frame, app: &App, palette: &Palette) {
    let area = frame.area();
    let base = Style::default().fg(palette.fg).bg(palette.bg);

    let title_right = format!(
        " proxy: {} | theme: {} ",
        if app.settings.proxy_enabled { "on" } else { "off" },
        app.theme().as_str()
    );
    let outer = Block::default()
        .title(" reel-dl ")
        .title_alignment(Alignment::Left)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .style(base);
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    // Render title-right manually in the top border
    let right_x = area
        .x
        .saturating_add(area.width)
        .saturating_sub(u16::try_from(title_right.len()).unwrap_or(u16::MAX) + 1);
    if right_x > area.x + 1 {
        frame.render_widget(
            Paragraph::new(title_right).style(Style::default().fg(palette.accent)),
            Rect::new(
                right_x,
                area.y,
                area.width.saturating_sub(right_x - area.x),
                1,
            ),
        );
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // URL input bar
            Constraint::Length(3), // Title
            Constraint::Min(3),    // Choices or error
            Constraint::Length(3), // Progress gauge
            Constraint::Length(1), // Speed / ETA
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Controls bar
        ])
        .split(inner);

    // --- URL input bar ---
    let url_style = if app.view.inputs_enabled() && app.view.notice.is_none() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(palette.muted)
    };
    let url_input = Paragraph::new(app.url_input.as_str())
        .block(
            Block::default()
                .title(" Video URL: ")
                .borders(Borders::ALL)
                .border_style(url_style),
        )
        .style(base);
    frame.render_widget(url_input, chunks[0]);

    // --- Title ---
    let title = app
        .view
        .title
        .as_deref()
        .unwrap_or("No video loaded");
    let mut title_spans = vec![Span::styled(title, base.add_modifier(Modifier::BOLD))];
    if app.view.title.is_some()
        && let Some(size) = app.media.as_ref().and_then(|m| m.approx_filesize)
    {
        title_spans.push(Span::styled(
            format!("  (~{})", format_size(size)),
            Style::default().fg(palette.muted),
        ));
    }
    let title_widget = Paragraph::new(Line::from(title_spans))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(palette.muted)))
        .style(base);
    frame.render_widget(title_widget, chunks[1]);

    draw_choices(frame, app, palette, chunks[2]);

    // --- Progress ---
    let (ratio, label) = match (&app.view.progress, app.view.phase) {
        (Some(update), _) => (update.fraction, update.summary()),
        (None, Phase::Processing) => (1.0, "Processing...".to_string()),
        (None, Phase::Completed) => (1.0, "Done".to_string()),
        (None, _) => (0.0, String::new()),
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(palette.muted)))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(label);
    frame.render_widget(gauge, chunks[3]);

    let rate = app
        .view
        .progress
        .as_ref()
        .map(crate::ProgressUpdate::rate_line)
        .unwrap_or_default();
    frame.render_widget(
        Paragraph::new(rate).style(Style::default().fg(palette.muted)),
        chunks[4],
    );

    // --- Status line ---
    let status_line = Paragraph::new(Line::from(vec![
        Span::styled(" Status: ", Style::default().fg(palette.muted)),
        Span::styled(
            app.view.status.as_str(),
            Style::default().fg(tone_color(app.view.tone)),
        ),
    ]));
    frame.render_widget(status_line, chunks[5]);

    // --- Controls bar ---
    let controls = "Enter:fetch  ^L:clear  ^T:theme  ^P:proxy  Esc:quit";
    let controls_bar = Paragraph::new(controls)
        .style(Style::default().fg(palette.muted))
        .alignment(Alignment::Center);
    frame.render_widget(controls_bar, chunks[6]);
}

fn draw_choices(frame: &mut ratatui::Frame, app: &App, palette: &Palette, area: Rect) {
    let block = Block::default()
        .title(" Download ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.muted));

    if let Some(error) = &app.view.error {
        let widget = Paragraph::new(error.as_str())
            .block(block)
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true });
        frame.render_widget(widget, area);
        return;
    }

    let line = if app.view.choices_visible() {
        let mut spans: Vec<Span> = RESOLUTIONS
            .iter()
            .enumerate()
            .flat_map(|(i, height)| {
                [
                    Span::styled(
                        format!("[{}]", i + 1),
                        Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(format!(" {height}p   "), Style::default().fg(palette.fg)),
                ]
            })
            .collect();
        spans.push(Span::styled(
            "[a]",
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(" audio only", Style::default().fg(palette.fg)));
        Line::from(spans)
    } else {
        Line::from(Span::styled(
            "Paste a URL and press Enter",
            Style::default().fg(palette.muted),
        ))
    };
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_popup(
    frame: &mut ratatui::Frame,
    palette: &Palette,
    title: &str,
    color: Color,
    lines: &[String],
) {
    let width = frame.area().width.saturating_sub(8).min(72);
    let height = u16::try_from(lines.len().saturating_mul(2) + 4).unwrap_or(u16::MAX);
    let area = centered_rect(width, height, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .style(Style::default().fg(palette.fg).bg(palette.bg));

    let mut text: Vec<Line> = lines.iter().map(|l| Line::from(l.as_str())).collect();
    text.push(Line::from(""));
    text.push(Line::from(Span::styled(
        "Press any key to close",
        Style::default().fg(palette.muted),
    )));

    let widget = Paragraph::new(text).block(block).wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    format_bytes(bytes as f64)
}

/// Returns a centered rectangle of the given size within `area`.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
