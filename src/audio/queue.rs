//! The play queue: an ordered list of tracks and a cursor into it.
//!
//! The queue is replaced wholesale whenever the UI starts a new playback
//! context (a playlist, the library, search results). The cursor is either
//! unset or a valid index.

use crate::catalog::Track;

use super::types::Direction;

#[derive(Debug, Clone, Default)]
pub struct Queue {
    tracks: Vec<Track>,
    cursor: Option<usize>,
}

impl Queue {
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    /// Replace the sequence. `current` is the track bound to the output: the
    /// cursor follows it into the new sequence, or is unset when it's absent.
    pub fn set(&mut self, tracks: Vec<Track>, current: Option<&Track>) {
        self.tracks = tracks;
        self.cursor = current.and_then(|t| self.position_of(&t.id));
    }

    /// Point the cursor at `track`. A track from outside the loaded context
    /// starts a fresh single-item queue instead.
    pub fn play_track(&mut self, track: &Track) -> usize {
        match self.position_of(&track.id) {
            Some(pos) => {
                self.cursor = Some(pos);
                pos
            }
            None => {
                self.tracks = vec![track.clone()];
                self.cursor = Some(0);
                0
            }
        }
    }

    /// Move the cursor and return the newly selected track.
    ///
    /// With shuffle the pick is uniform over the whole queue, so the current
    /// track can come up again. Without it the cursor wraps at both ends.
    pub fn advance(&mut self, direction: Direction, shuffle: bool) -> Option<&Track> {
        let len = self.tracks.len();
        if len == 0 {
            return None;
        }

        let next = if shuffle {
            rand::random_range(0..len)
        } else {
            match (direction, self.cursor) {
                (Direction::Next, Some(i)) => (i + 1) % len,
                (Direction::Next, None) => 0,
                (Direction::Previous, Some(0) | None) => len - 1,
                (Direction::Previous, Some(i)) => i - 1,
            }
        };

        self.cursor = Some(next);
        self.tracks.get(next)
    }
}

#[cfg(test)]
impl Queue {
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn current(&self) -> Option<&Track> {
        self.cursor.and_then(|i| self.tracks.get(i))
    }
}
