//! Clock and end-of-media bookkeeping for one loaded source.
//!
//! Kept apart from the device so the rules can be exercised without audio
//! hardware. Callers pass `now` in; the sink itself only reports whether it
//! has drained.

use std::time::{Duration, Instant};

use super::output::OutputEvent;

/// What the output must do with its sink after a play request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum PlayStep {
    /// The source was consumed; rebuild from the top.
    Restart,
    /// Start (or resume) the existing sink, if there is one yet.
    Resume,
    /// Already running.
    Nothing,
}

#[derive(Debug, Default)]
pub(super) struct Playhead {
    generation: u64,
    /// Playback was requested; honoured as soon as a sink exists.
    want_play: bool,
    /// Position at the last rebuild/pause.
    offset: Duration,
    started_at: Option<Instant>,
    ended: bool,
}

impl Playhead {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Where a freshly built sink must start.
    pub fn offset(&self) -> Duration {
        self.offset
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn position(&self, now: Instant) -> Duration {
        self.offset
            + self
                .started_at
                .map_or(Duration::ZERO, |st| now.saturating_duration_since(st))
    }

    /// A new source under `generation`: back to a stopped clock at zero.
    pub fn load(&mut self, generation: u64) {
        *self = Self {
            generation,
            ..Self::default()
        };
    }

    pub fn play(&mut self) -> PlayStep {
        self.want_play = true;
        if self.ended {
            self.offset = Duration::ZERO;
            PlayStep::Restart
        } else if self.started_at.is_none() {
            PlayStep::Resume
        } else {
            PlayStep::Nothing
        }
    }

    /// The sink was started at `now`.
    pub fn started(&mut self, now: Instant) {
        self.started_at = Some(now);
    }

    pub fn pause(&mut self, now: Instant) {
        self.want_play = false;
        self.offset = self.position(now);
        self.started_at = None;
    }

    /// Move to `position`. Applied by the next rebuild, which happens right
    /// away when the source is ready or once it arrives.
    pub fn seek(&mut self, position: Duration) {
        self.offset = position;
        self.started_at = None;
        self.ended = false;
    }

    /// A sink was rebuilt at `offset`. Returns whether it must be started.
    pub fn rebuilt(&mut self, now: Instant) -> bool {
        self.ended = false;
        self.started_at = self.want_play.then_some(now);
        self.want_play
    }

    /// Playback stopped for good (failure or teardown).
    pub fn halt(&mut self) {
        self.want_play = false;
        self.started_at = None;
    }

    /// Report progress. `drained` is whether the sink has played everything.
    ///
    /// `Ended` is reported once per completion; nothing follows until the
    /// source is rebuilt or replaced.
    pub fn tick(&mut self, now: Instant, drained: bool) -> Option<OutputEvent> {
        if self.started_at.is_none() || self.ended {
            return None;
        }
        if drained {
            self.offset = self.position(now);
            self.started_at = None;
            self.ended = true;
            self.want_play = false;
            Some(OutputEvent::Ended {
                generation: self.generation,
            })
        } else {
            Some(OutputEvent::Position {
                generation: self.generation,
                position: self.position(now),
            })
        }
    }
}
