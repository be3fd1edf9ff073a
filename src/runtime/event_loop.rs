use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::audio::{AudioPlayer, PlayerError, PlayerEvent};
use crate::config;
use crate::runtime::keys::{ControlCmd, KeyState, handle_key};
use crate::ui;

/// Send `cmd` to the player. Returns `Ok(true)` when the app should exit.
fn apply(cmd: ControlCmd, audio_player: &AudioPlayer) -> Result<bool, PlayerError> {
    match cmd {
        ControlCmd::Quit => return Ok(true),
        ControlCmd::PlayPause => audio_player.play_pause()?,
        ControlCmd::Next => audio_player.next()?,
        ControlCmd::Prev => audio_player.previous()?,
        ControlCmd::Seek(secs) => audio_player.seek(secs)?,
        ControlCmd::SeekBy(delta) => audio_player.seek_by(delta)?,
        ControlCmd::SetVolume(v) => audio_player.set_volume(v)?,
        ControlCmd::ToggleShuffle => audio_player.toggle_shuffle()?,
        ControlCmd::ToggleRepeat => audio_player.toggle_repeat()?,
        ControlCmd::PlaySelection { queue, start } => {
            audio_player.set_queue(queue)?;
            audio_player.play(start)?;
        }
        ControlCmd::SetQueue(queue) => audio_player.set_queue(queue)?,
        ControlCmd::Play(track) => audio_player.play(track)?,
    }
    Ok(false)
}

/// Drain pending player notifications into `app`. Returns `false` once the
/// audio thread has gone away.
fn drain_events(app: &mut App, events: &Receiver<PlayerEvent>) -> bool {
    loop {
        match events.try_recv() {
            Ok(PlayerEvent::Changed(snapshot)) => app.apply_snapshot(snapshot),
            Ok(PlayerEvent::Closed) | Err(TryRecvError::Disconnected) => return false,
            Err(TryRecvError::Empty) => return true,
        }
    }
}

/// Main terminal event loop: applies player notifications, draws the UI and
/// maps key presses to player commands. Returns `Ok(())` when shutdown is
/// requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    audio_player: &AudioPlayer,
    events: &Receiver<PlayerEvent>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut state = KeyState::default();

    loop {
        if !drain_events(app, events) {
            tracing::warn!("audio thread stopped, leaving");
            return Ok(());
        }

        let display = app.display_indices();
        terminal.draw(|f| ui::draw(f, app, &display, &settings.ui, &settings.controls))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(cmd) = handle_key(key, settings, app, &mut state) {
                    if apply(cmd, audio_player)? {
                        return Ok(());
                    }
                }
            }
        }
    }
}
