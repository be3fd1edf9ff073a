//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`. All
//! playback information comes from the snapshot stored on `App`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock, time::Duration};

use crate::app::App;
use crate::audio::PlaybackSnapshot;
use crate::catalog::Track;
use crate::config::{ControlsSettings, TimeField, TrackDisplayField, UiSettings};

static CONTROLS_MAP: LazyLock<BTreeMap<String, String>> = LazyLock::new(|| {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    map.insert("j/k".to_string(), "up/down".to_string());
    map.insert("gg/G".to_string(), "top/bottom".to_string());
    map.insert("enter".to_string(), "play selected song".to_string());
    map.insert("space/p".to_string(), "play/pause".to_string());
    map.insert("h/l".to_string(), "prev/next song".to_string());
    map.insert("tab".to_string(), "library/playlists".to_string());
    // H/L and +/- are filled dynamically from config.
    map.insert("/".to_string(), "filter".to_string());
    map.insert("?".to_string(), "search all".to_string());
    map.insert("0-9".to_string(), "seek to 0-90%".to_string());
    map.insert("s".to_string(), "shuffle".to_string());
    map.insert("r".to_string(), "repeat".to_string());
    map.insert("K".to_string(), "metadata".to_string());
    map.insert("q".to_string(), "quit".to_string());
    map
});

/// Render the controls help text, incorporating scrub seconds and volume step.
fn controls_text(controls: &ControlsSettings) -> String {
    // Keep the rendered order stable and human-friendly.
    let order = [
        "j/k", "h/l", "H/L", "0-9", "+/-", "enter", "space/p", "tab", "gg/G", "K", "/", "?", "s",
        "r", "q",
    ];
    order
        .iter()
        .filter_map(|k| match *k {
            "H/L" => Some(format!("[H/L] scrub -/+{}s", controls.scrub_seconds)),
            "+/-" => Some(format!("[+/-] volume ±{}", controls.volume_step)),
            _ => CONTROLS_MAP.get(*k).map(|v| format!("[{}] {}", k, v)),
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn non_blank(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

/// Build the "now playing" track text according to `ui` settings.
fn now_playing_track_text(track: &Track, ui: &UiSettings) -> String {
    let mut parts: Vec<String> = Vec::new();

    for f in &ui.now_playing_track_fields {
        let part = match f {
            TrackDisplayField::Display => Some(track.display()),
            TrackDisplayField::Title => non_blank(&track.title).map(str::to_string),
            TrackDisplayField::Artist => non_blank(&track.artist).map(str::to_string),
            TrackDisplayField::Album => non_blank(&track.album).map(str::to_string),
            TrackDisplayField::Locator => non_blank(&track.audio_url).map(str::to_string),
        };
        if let Some(p) = part {
            parts.push(p);
        }
    }

    if parts.is_empty() {
        track.display()
    } else {
        parts.join(&ui.now_playing_track_separator)
    }
}

/// Build the now-playing time text (elapsed/total/remaining) per `UiSettings`.
fn now_playing_time_text(elapsed: Duration, total: Duration, ui: &UiSettings) -> Option<String> {
    let parts: Vec<String> = ui
        .now_playing_time_fields
        .iter()
        .map(|f| match f {
            TimeField::Elapsed => format_mmss(elapsed),
            TimeField::Total => format_mmss(total),
            TimeField::Remaining => format!("-{}", format_mmss(total.saturating_sub(elapsed))),
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(&ui.now_playing_time_separator))
    }
}

/// Fraction of the track already played, for the progress gauge.
fn progress_ratio(snapshot: &PlaybackSnapshot) -> f64 {
    let total = snapshot.duration().as_secs_f64();
    if total <= 0.0 {
        return 0.0;
    }
    (snapshot.position.as_secs_f64() / total).clamp(0.0, 1.0)
}

fn state_text(snapshot: &PlaybackSnapshot) -> &'static str {
    match (&snapshot.track, snapshot.playing) {
        (None, _) => "Stopped",
        (Some(_), true) => "Playing",
        (Some(_), false) => "Paused",
    }
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    // Keep the popup smaller and avoid covering the entire UI.
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

/// Format whole seconds as `M:SS (Ns)`; zero means the catalog doesn't know.
fn format_duration_secs(secs: u32) -> String {
    if secs == 0 {
        return "-".to_string();
    }
    format!("{}:{:02} ({}s)", secs / 60, secs % 60, secs)
}

fn status_text(app: &App) -> String {
    let mut parts: Vec<String> = Vec::new();
    let snapshot = &app.snapshot;

    parts.push(format!(" VIEW: {}", app.context_name()));

    if app.follow_playback {
        parts.push("CURSOR: Follow".to_string());
    } else {
        parts.push("CURSOR: Free-roam".to_string());
    }

    if app.search_mode {
        parts.push(format!("SEARCH: {}", app.search_query));
    }

    let q = app.filter_query.trim();
    if app.filter_mode || !q.is_empty() {
        let mut filter_part = String::from("FILTER:");
        if !q.is_empty() {
            filter_part.push(' ');
            filter_part.push_str(q);
        }
        parts.push(filter_part);
    }

    match snapshot.queue_position {
        Some(p) => parts.push(format!("Queue: {}/{}", p + 1, snapshot.queue_len)),
        None => parts.push(format!("Queue: {}", snapshot.queue_len)),
    }

    parts.push(format!(
        "Shuffle: {}",
        if snapshot.shuffle { "ON" } else { "OFF" }
    ));
    parts.push(format!(
        "Repeat: {}",
        if snapshot.repeat { "ON" } else { "OFF" }
    ));

    if let Some(dir) = &app.current_dir {
        parts.push(format!("Dir: {}", dir));
    }

    parts.join(" • ")
}

fn player_bar_title(snapshot: &PlaybackSnapshot, ui: &UiSettings) -> String {
    let mut title = format!(" {} ", state_text(snapshot));
    if let Some(track) = &snapshot.track {
        title.push_str(&format!("• {} ", now_playing_track_text(track, ui)));
    }
    title
}

fn player_bar_label(snapshot: &PlaybackSnapshot, ui: &UiSettings) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(track) = &snapshot.track {
        if let Some(time) = now_playing_time_text(snapshot.position, snapshot.duration(), ui) {
            parts.push(time);
        }
        if let Some(cover) = track.cover_url.as_deref() {
            parts.push(format!("cover {}", cover));
        }
    }
    parts.push(format!("vol {}%", snapshot.volume));
    if let Some(err) = &snapshot.error {
        parts.push(format!("error: {}", err));
    }
    parts.join("  ")
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    display: &[usize],
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(4),
        ])
        .split(frame.area());
    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" encore ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    let status_par = Paragraph::new(status_text(app))
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    // Main list
    {
        let q = app.filter_query.trim();
        let query_lower = if q.is_empty() {
            None
        } else if app.uses_lower_titles() {
            Some(q.to_ascii_lowercase())
        } else {
            None
        };
        let playing = app.playing_index();

        // Center the selected item when possible by creating a visible window.
        // Only build ListItems for the visible window.
        let total = display.len();
        let list_height = chunks[2].height.saturating_sub(2) as usize;
        let sel_pos = display.iter().position(|&i| i == app.selected).unwrap_or(0);
        let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
            (0, total, sel_pos)
        } else {
            let half = list_height / 2;
            let mut start = sel_pos.saturating_sub(half);
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height, sel_pos - start)
        };

        let visible_items: Vec<ListItem> = display[start..end]
            .iter()
            .map(|&i| {
                let title = app.catalog.tracks()[i].display();
                let positions = if q.is_empty() {
                    None
                } else {
                    match query_lower.as_deref() {
                        Some(ql) => app.fuzzy_match_positions_for_track_lower(i, ql),
                        None => App::fuzzy_match_positions(&title, q),
                    }
                };

                let rendered = match positions {
                    Some(positions) => {
                        let mut rendered = String::new();
                        let mut pos_iter = positions.into_iter();
                        let mut next_pos = pos_iter.next();

                        for (ci, ch) in title.chars().enumerate() {
                            if next_pos == Some(ci) {
                                for up in ch.to_uppercase() {
                                    rendered.push(up);
                                }
                                next_pos = pos_iter.next();
                            } else {
                                rendered.push(ch);
                            }
                        }
                        rendered
                    }
                    None => title,
                };

                if playing == Some(i) {
                    ListItem::new(format!("♪ {}", rendered)).bold()
                } else {
                    ListItem::new(format!("  {}", rendered))
                }
            })
            .collect();

        let list_title = format!(" {} ({}) ", app.context_name(), total);
        let list = List::new(visible_items)
            .block(Block::default().borders(Borders::ALL).title(list_title))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ratatui::widgets::ListState::default();
        if total > 0 {
            state.select(Some(selected_pos_in_visible));
        }
        frame.render_stateful_widget(list, chunks[2], &mut state);
    }

    // Overlay metadata popup (keeps list visible under it)
    if app.metadata_window {
        // Keep the popup inside the list area so it doesn't cover header/status/footer.
        let list_area = chunks[2];
        let popup_area = centered_rect_sized(72, 10, list_area);
        frame.render_widget(Clear, popup_area);

        let meta = match app.selected_track() {
            Some(track) => format!(
                "Title: {}\nArtist: {}\nAlbum: {}\nDuration: {}\nAudio: {}\nCover: {}",
                track.title,
                non_blank(&track.artist).unwrap_or("-"),
                non_blank(&track.album).unwrap_or("-"),
                format_duration_secs(track.duration),
                track.audio_url,
                track.cover_url.as_deref().unwrap_or("-"),
            ),
            None => "No track selected".to_string(),
        };
        let meta_paragraph = Paragraph::new(meta)
            .block(
                Block::default()
                    .padding(Padding {
                        left: 1,
                        right: 0,
                        top: 0,
                        bottom: 0,
                    })
                    .borders(Borders::ALL)
                    .title(" metadata (K closes) "),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(meta_paragraph, popup_area);
    }

    // Player bar
    let snapshot = &app.snapshot;
    let gauge_color = if snapshot.error.is_some() {
        Color::Red
    } else {
        Color::Cyan
    };
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(player_bar_title(snapshot, ui_settings)),
        )
        .gauge_style(Style::default().fg(gauge_color))
        .ratio(progress_ratio(snapshot))
        .label(player_bar_label(snapshot, ui_settings));
    frame.render_widget(gauge, chunks[3]);

    let footer = Paragraph::new(controls_text(controls_settings))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(footer, chunks[4]);
}
