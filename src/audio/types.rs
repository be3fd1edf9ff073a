//! Audio-related small types and handles.
//!
//! Commands sent to the audio thread, the read-only playback snapshot the
//! UI renders from, and the notifications pushed to subscribers.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::catalog::Track;

/// Which way to move through the queue.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

#[derive(Debug)]
pub enum AudioCmd {
    /// Play the given track, reusing the queue when it already holds it.
    Play(Track),
    /// Toggle pause/resume of the current track.
    TogglePause,
    /// Skip to the next track in the queue.
    Next,
    /// Go to the previous track, or restart the current one when past the threshold.
    Prev,
    /// Seek to an absolute position in seconds (clamped to the track).
    Seek(f64),
    /// Seek relative to the current position, in seconds (positive or negative).
    SeekBy(f64),
    /// Set the volume (clamped to 0..=100).
    SetVolume(i32),
    ToggleShuffle,
    ToggleRepeat,
    /// Replace the queue contents.
    SetQueue(Vec<Track>),
    /// Register a listener; it immediately receives the current snapshot.
    Subscribe(Sender<PlayerEvent>),
    /// Quit the audio thread, optionally fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

/// Read side of the transport, published after every transition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackSnapshot {
    /// The track bound to the output, with its metadata for the player bar.
    pub track: Option<Track>,
    pub playing: bool,
    /// Position within `track`, never past its duration.
    pub position: Duration,
    /// 0-100.
    pub volume: u8,
    pub shuffle: bool,
    pub repeat: bool,
    pub queue_len: usize,
    /// Cursor into the queue, if any.
    pub queue_position: Option<usize>,
    /// Last load/playback failure for the current track.
    pub error: Option<String>,
}

impl PlaybackSnapshot {
    /// Authoritative length of the current track.
    pub fn duration(&self) -> Duration {
        self.track
            .as_ref()
            .map_or(Duration::ZERO, |t| Duration::from_secs(u64::from(t.duration)))
    }
}

/// Notification pushed to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// The snapshot changed.
    Changed(PlaybackSnapshot),
    /// The audio thread has stopped; no further events follow.
    Closed,
}

pub type SnapshotHandle = Arc<Mutex<PlaybackSnapshot>>;
