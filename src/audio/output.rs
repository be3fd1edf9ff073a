//! The boundary between the transport and a real-time playback resource.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("no audio output device: {0}")]
    Device(String),
    #[error("failed to read {locator}: {source}")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {locator}: {source}")]
    Http {
        locator: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unsupported or corrupt audio in {locator}: {message}")]
    Decode { locator: String, message: String },
    #[error("failed to initialise HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("loader for {0} stopped without a result")]
    LoaderGone(String),
    #[error("nothing loaded")]
    NotLoaded,
}

/// Asynchronous notifications from the output, tagged with the generation of
/// the load they belong to so superseded loads can be ignored.
#[derive(Debug)]
pub enum OutputEvent {
    /// Periodic while playing.
    Position { generation: u64, position: Duration },
    /// Once per completion of the loaded source.
    Ended { generation: u64 },
    /// Loading or starting playback failed.
    Failed { generation: u64, error: OutputError },
}

impl OutputEvent {
    pub fn generation(&self) -> u64 {
        match self {
            OutputEvent::Position { generation, .. }
            | OutputEvent::Ended { generation }
            | OutputEvent::Failed { generation, .. } => *generation,
        }
    }
}

/// One playback resource, owned for the whole session.
///
/// Commands never block on I/O; their outcome surfaces later through `poll`.
pub trait AudioOutput {
    /// Point the resource at a new source. Does not start playback.
    fn load(&mut self, locator: &str, generation: u64);

    fn play(&mut self);

    fn pause(&mut self);

    fn seek(&mut self, position: Duration);

    /// 0.0-1.0.
    fn set_gain(&mut self, gain: f32);

    /// Drain pending notifications.
    fn poll(&mut self) -> Vec<OutputEvent>;

    /// Ramp the gain down before shutdown.
    fn fade_out(&mut self, _over: Duration) {}

    /// Stop and release the resource. Safe to call more than once.
    fn teardown(&mut self);
}
