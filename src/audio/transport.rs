//! The transport state machine.
//!
//! Owns the queue, the track bound to the output and the transport flags,
//! and is the only thing that talks to the [`AudioOutput`]. Every command
//! and every output event is applied as one discrete transition; the audio
//! thread guarantees they never interleave.

use std::time::Duration;

use crate::catalog::Track;
use crate::config::PlaybackSettings;

use super::output::{AudioOutput, OutputEvent};
use super::queue::Queue;
use super::types::{Direction, PlaybackSnapshot};

/// How far into a track "previous" restarts it instead of going back.
pub const RESTART_THRESHOLD: Duration = Duration::from_secs(3);

fn gain(volume: u8) -> f32 {
    f32::from(volume) / 100.0
}

pub struct Transport<O: AudioOutput> {
    output: O,
    queue: Queue,
    current: Option<Track>,
    playing: bool,
    position: Duration,
    volume: u8,
    shuffle: bool,
    repeat: bool,

    /// Bumped on every load; output events from older loads are stale.
    generation: u64,
    /// The current track failed to load or start; resuming retries it.
    failed: bool,
    error: Option<String>,
}

impl<O: AudioOutput> Transport<O> {
    pub fn new(mut output: O, defaults: &PlaybackSettings) -> Self {
        let volume = defaults.volume.min(100);
        output.set_gain(gain(volume));
        Self {
            output,
            queue: Queue::default(),
            current: None,
            playing: false,
            position: Duration::ZERO,
            volume,
            shuffle: defaults.shuffle,
            repeat: defaults.repeat,
            generation: 0,
            failed: false,
            error: None,
        }
    }

    fn duration(&self) -> Duration {
        self.current
            .as_ref()
            .map_or(Duration::ZERO, |t| Duration::from_secs(u64::from(t.duration)))
    }

    /// Bind `track` to the output under a fresh generation and start it.
    fn start(&mut self, track: Track) {
        self.generation += 1;
        tracing::info!(
            id = %track.id,
            title = %track.title,
            generation = self.generation,
            "starting track"
        );
        self.output.load(&track.audio_url, self.generation);
        self.output.play();
        self.current = Some(track);
        self.position = Duration::ZERO;
        self.playing = true;
        self.failed = false;
        self.error = None;
    }

    fn step(&mut self, direction: Direction) {
        let Some(track) = self.queue.advance(direction, self.shuffle).cloned() else {
            return;
        };
        self.start(track);
    }

    pub fn play(&mut self, track: Track) {
        self.queue.play_track(&track);
        self.start(track);
    }

    pub fn toggle_play_pause(&mut self) {
        let Some(track) = self.current.as_ref() else {
            return;
        };

        if self.playing {
            self.output.pause();
            self.playing = false;
        } else if self.failed {
            self.generation += 1;
            tracing::info!(id = %track.id, generation = self.generation, "retrying track");
            self.output.load(&track.audio_url, self.generation);
            self.output.seek(self.position);
            self.output.play();
            self.playing = true;
            self.failed = false;
            self.error = None;
        } else {
            self.output.play();
            self.playing = true;
        }
    }

    pub fn next(&mut self) {
        self.step(Direction::Next);
    }

    pub fn previous(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        if self.current.is_some() && self.position > RESTART_THRESHOLD {
            self.seek_to(Duration::ZERO);
            return;
        }
        self.step(Direction::Previous);
    }

    fn seek_to(&mut self, position: Duration) {
        self.position = position;
        self.output.seek(position);
    }

    /// Seek to `secs`, clamped into the current track.
    pub fn seek(&mut self, secs: f64) {
        if self.current.is_none() {
            return;
        }
        let max = self.duration().as_secs_f64();
        let secs = if secs.is_nan() { 0.0 } else { secs.clamp(0.0, max) };
        self.seek_to(Duration::from_secs_f64(secs));
    }

    pub fn seek_by(&mut self, delta_secs: f64) {
        self.seek(self.position.as_secs_f64() + delta_secs);
    }

    pub fn set_volume(&mut self, volume: i32) {
        self.volume = volume.clamp(0, 100) as u8;
        self.output.set_gain(gain(self.volume));
    }

    pub fn toggle_shuffle(&mut self) {
        self.shuffle = !self.shuffle;
    }

    pub fn toggle_repeat(&mut self) {
        self.repeat = !self.repeat;
    }

    pub fn set_queue(&mut self, tracks: Vec<Track>) {
        self.queue.set(tracks, self.current.as_ref());
    }

    fn on_ended(&mut self) {
        if self.repeat {
            self.seek_to(Duration::ZERO);
            self.output.play();
            self.playing = true;
        } else if self.queue.is_empty() {
            // Stop at the end; the output must not resume on a later seek.
            self.output.pause();
            self.position = self.duration();
            self.playing = false;
        } else {
            self.step(Direction::Next);
        }
    }

    pub fn handle_output_event(&mut self, event: OutputEvent) {
        if event.generation() != self.generation {
            tracing::trace!(
                stale = event.generation(),
                current = self.generation,
                "discarding stale output event"
            );
            return;
        }

        match event {
            OutputEvent::Position { position, .. } => {
                if self.current.is_some() {
                    self.position = position.min(self.duration());
                }
            }
            OutputEvent::Ended { .. } => self.on_ended(),
            OutputEvent::Failed { error, .. } => {
                tracing::warn!(
                    id = self.current.as_ref().map(|t| t.id.as_str()).unwrap_or("-"),
                    error = %error,
                    "playback failed"
                );
                self.playing = false;
                self.failed = true;
                self.error = Some(error.to_string());
            }
        }
    }

    /// Apply everything the output has reported since the last pump.
    pub fn pump(&mut self) {
        for event in self.output.poll() {
            self.handle_output_event(event);
        }
    }

    pub fn shutdown(&mut self, fade_out: Duration) {
        if self.playing {
            self.output.fade_out(fade_out);
        }
        self.output.teardown();
        self.playing = false;
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            track: self.current.clone(),
            playing: self.playing,
            position: self.position,
            volume: self.volume,
            shuffle: self.shuffle,
            repeat: self.repeat,
            queue_len: self.queue.len(),
            queue_position: self.queue.cursor(),
            error: self.error.clone(),
        }
    }
}

#[cfg(test)]
impl<O: AudioOutput> Transport<O> {
    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
