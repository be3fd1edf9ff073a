use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Context};
use crate::catalog::Track;
use crate::config;

/// Something the event loop must ask the player to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCmd {
    Quit,
    PlayPause,
    Next,
    Prev,
    Seek(f64),
    SeekBy(f64),
    SetVolume(i32),
    ToggleShuffle,
    ToggleRepeat,
    /// Replace the queue with the visible tracks and start `start`.
    PlaySelection { queue: Vec<Track>, start: Track },
    /// Adopt the visible tracks as the queue without touching playback.
    SetQueue(Vec<Track>),
    /// Play one track without replacing the queue first.
    Play(Track),
}

/// Multi-key prefixes carried between key presses.
#[derive(Debug, Default)]
pub struct KeyState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
}

fn is_playing(app: &App, track: &Track) -> bool {
    app.snapshot.playing && app.snapshot.track.as_ref().map(|t| &t.id) == Some(&track.id)
}

/// Enter on the selection. Search results play the track on its own; any
/// other view becomes the queue. Selecting the track that is already playing
/// only swaps the queue so the view's order applies from here on.
fn play_selection(app: &mut App) -> Option<ControlCmd> {
    let (queue, start) = app.queue_for_selection()?;
    if app.context == Context::Search {
        if is_playing(app, &start) {
            return None;
        }
        app.follow_playback_on();
        return Some(ControlCmd::Play(start));
    }
    if is_playing(app, &start) {
        return Some(ControlCmd::SetQueue(queue));
    }
    app.follow_playback_on();
    Some(ControlCmd::PlaySelection { queue, start })
}

/// `0`-`9` jump to that tenth of the current track.
fn seek_to_tenth(app: &App, digit: u32) -> Option<ControlCmd> {
    app.snapshot.track.as_ref()?;
    let total = app.snapshot.duration().as_secs_f64();
    Some(ControlCmd::Seek(total * f64::from(digit) / 10.0))
}

fn volume_by(app: &App, delta: i32) -> ControlCmd {
    ControlCmd::SetVolume(i32::from(app.snapshot.volume) + delta)
}

fn handle_search_key(key: KeyEvent, app: &mut App) -> Option<ControlCmd> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => app.cancel_search(),
        KeyCode::Backspace => app.pop_search_char(),
        KeyCode::Char('j') | KeyCode::Char('n') if ctrl => app.next(),
        KeyCode::Char('k') | KeyCode::Char('p') if ctrl => app.prev(),
        KeyCode::Char(c) if !c.is_control() => app.push_search_char(c),
        KeyCode::Enter => {
            app.exit_search_mode();
            return play_selection(app);
        }
        _ => {}
    }
    None
}

fn handle_filter_key(key: KeyEvent, app: &mut App) -> Option<ControlCmd> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => app.clear_filter(),
        KeyCode::Backspace => app.pop_filter_char(),
        KeyCode::Char('j') | KeyCode::Char('n') if ctrl => {
            app.follow_playback_off();
            app.next();
        }
        KeyCode::Char('k') | KeyCode::Char('p') if ctrl => {
            app.follow_playback_off();
            app.prev();
        }
        KeyCode::Char(c) if !c.is_control() => app.push_filter_char(c),
        KeyCode::Enter => {
            if !app.has_tracks() {
                return None;
            }
            app.exit_filter_mode();
            return play_selection(app);
        }
        _ => {}
    }
    None
}

/// Apply a key press to the UI model and return the player command it maps
/// to, if any.
pub fn handle_key(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    state: &mut KeyState,
) -> Option<ControlCmd> {
    if app.search_mode {
        state.pending_gg = false;
        return handle_search_key(key, app);
    }
    if app.filter_mode {
        state.pending_gg = false;
        return handle_filter_key(key, app);
    }

    if key.code != KeyCode::Char('g') {
        state.pending_gg = false;
    }

    let scrub = settings.controls.scrub_seconds as f64;
    let step = i32::from(settings.controls.volume_step);

    match key.code {
        KeyCode::Char('q') => Some(ControlCmd::Quit),
        KeyCode::Char('/') => {
            app.enter_filter_mode();
            None
        }
        KeyCode::Char('?') => {
            app.enter_search_mode();
            None
        }
        KeyCode::Tab => {
            app.cycle_context(true);
            None
        }
        KeyCode::BackTab => {
            app.cycle_context(false);
            None
        }
        KeyCode::Char('g') => {
            if state.pending_gg {
                state.pending_gg = false;
                app.follow_playback_off();
                if let Some(&first) = app.display_indices().first() {
                    app.set_selected(first);
                }
            } else {
                state.pending_gg = true;
            }
            None
        }
        KeyCode::Char('G') => {
            app.follow_playback_off();
            if let Some(&last) = app.display_indices().last() {
                app.set_selected(last);
            }
            None
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.follow_playback_off();
            app.next();
            None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.follow_playback_off();
            app.prev();
            None
        }
        KeyCode::Enter => play_selection(app),
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            app.follow_playback_on();
            Some(ControlCmd::PlayPause)
        }
        KeyCode::Char('l') => {
            app.follow_playback_on();
            Some(ControlCmd::Next)
        }
        KeyCode::Char('h') => {
            app.follow_playback_on();
            Some(ControlCmd::Prev)
        }
        KeyCode::Char('L') => Some(ControlCmd::SeekBy(scrub)),
        KeyCode::Char('H') => Some(ControlCmd::SeekBy(-scrub)),
        KeyCode::Char(c @ '0'..='9') => seek_to_tenth(app, c.to_digit(10).unwrap_or(0)),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(volume_by(app, step)),
        KeyCode::Char('-') => Some(volume_by(app, -step)),
        KeyCode::Char('s') => Some(ControlCmd::ToggleShuffle),
        KeyCode::Char('r') => Some(ControlCmd::ToggleRepeat),
        KeyCode::Char('K') => {
            app.toggle_metadata_window();
            None
        }
        _ => None,
    }
}
