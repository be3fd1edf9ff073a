//! `rodio`-backed [`AudioOutput`].
//!
//! One `OutputStream` lives for the whole session. Each load fetches the
//! locator on a background thread; once the bytes arrive a paused `Sink` is
//! built from them. Seeking rebuilds the sink at the new offset, which also
//! works after the source has been fully consumed.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source as _};

use super::locator::{fetch, resolve};
use super::output::{AudioOutput, OutputError, OutputEvent};
use super::playhead::{PlayStep, Playhead};

/// Fetched audio, shared between successive sinks of the same load.
#[derive(Clone)]
struct SharedBytes(Arc<[u8]>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Create a paused `Sink` over `bytes` that starts playback at `start_at`.
fn create_sink_at(
    stream: &OutputStream,
    bytes: &SharedBytes,
    locator: &str,
    start_at: Duration,
) -> Result<Sink, OutputError> {
    let source = Decoder::new(Cursor::new(bytes.clone()))
        .map_err(|e| OutputError::Decode {
            locator: locator.to_string(),
            message: e.to_string(),
        })?
        // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
        .skip_duration(start_at);

    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.pause();
    Ok(sink)
}

type LoadResult = Result<SharedBytes, OutputError>;

pub struct RodioOutput {
    stream: Option<OutputStream>,
    client: reqwest::blocking::Client,
    base_url: Option<String>,

    locator: String,
    loading: Option<Receiver<LoadResult>>,
    bytes: Option<SharedBytes>,
    sink: Option<Sink>,

    playhead: Playhead,
    gain: f32,

    events: Vec<OutputEvent>,
}

impl RodioOutput {
    /// Open the default output device.
    pub fn open(base_url: Option<String>) -> Result<Self, OutputError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| OutputError::Device(e.to_string()))?;
        // rodio logs to stderr when OutputStream is dropped, which would
        // scribble over the TUI.
        stream.log_on_drop(false);

        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(OutputError::Client)?;

        Ok(Self {
            stream: Some(stream),
            client,
            base_url,
            locator: String::new(),
            loading: None,
            bytes: None,
            sink: None,
            playhead: Playhead::default(),
            gain: 1.0,
            events: Vec::new(),
        })
    }

    fn fail(&mut self, error: OutputError) {
        tracing::warn!(locator = %self.locator, error = %error, "audio output failure");
        self.playhead.halt();
        self.events.push(OutputEvent::Failed {
            generation: self.playhead.generation(),
            error,
        });
    }

    fn stop_sink(&mut self) {
        if let Some(s) = self.sink.take() {
            s.stop();
        }
    }

    /// Replace the sink with a fresh one positioned at the playhead offset.
    fn rebuild(&mut self) {
        self.stop_sink();

        let (Some(stream), Some(bytes)) = (self.stream.as_ref(), self.bytes.as_ref()) else {
            return;
        };

        match create_sink_at(stream, bytes, &self.locator, self.playhead.offset()) {
            Ok(sink) => {
                sink.set_volume(self.gain);
                if self.playhead.rebuilt(Instant::now()) {
                    sink.play();
                }
                self.sink = Some(sink);
            }
            Err(e) => self.fail(e),
        }
    }

    fn finish_loading(&mut self) {
        let Some(rx) = self.loading.as_ref() else {
            return;
        };
        match rx.try_recv() {
            Ok(Ok(bytes)) => {
                self.loading = None;
                tracing::debug!(locator = %self.locator, bytes = bytes.0.len(), "source ready");
                self.bytes = Some(bytes);
                self.rebuild();
            }
            Ok(Err(e)) => {
                self.loading = None;
                self.fail(e);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.loading = None;
                let locator = self.locator.clone();
                self.fail(OutputError::LoaderGone(locator));
            }
        }
    }
}

impl AudioOutput for RodioOutput {
    fn load(&mut self, locator: &str, generation: u64) {
        self.stop_sink();
        self.bytes = None;
        self.locator = locator.to_string();
        self.playhead.load(generation);

        if self.stream.is_none() {
            self.fail(OutputError::Device("output already torn down".to_string()));
            return;
        }

        // Replacing the receiver drops any in-flight load; its result is discarded.
        let (tx, rx) = mpsc::channel::<LoadResult>();
        self.loading = Some(rx);

        let source = resolve(locator, self.base_url.as_deref());
        let client = self.client.clone();
        let locator = locator.to_string();
        thread::spawn(move || {
            let result = fetch(&source, &client, &locator).map(|b| SharedBytes(b.into()));
            let _ = tx.send(result);
        });
    }

    fn play(&mut self) {
        if self.stream.is_none() {
            self.fail(OutputError::Device("output already torn down".to_string()));
            return;
        }

        match self.playhead.play() {
            PlayStep::Restart => self.rebuild(),
            PlayStep::Resume => {
                if let Some(s) = self.sink.as_ref() {
                    s.play();
                    self.playhead.started(Instant::now());
                } else if self.loading.is_none() {
                    self.fail(OutputError::NotLoaded);
                }
            }
            PlayStep::Nothing => {}
        }
    }

    fn pause(&mut self) {
        self.playhead.pause(Instant::now());
        if let Some(s) = self.sink.as_ref() {
            s.pause();
        }
    }

    fn seek(&mut self, position: Duration) {
        self.playhead.seek(position);
        if self.bytes.is_some() {
            self.rebuild();
        }
        // Still loading: the offset is applied once the sink is built.
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
        if let Some(s) = self.sink.as_ref() {
            s.set_volume(self.gain);
        }
    }

    fn poll(&mut self) -> Vec<OutputEvent> {
        self.finish_loading();

        if let Some(s) = self.sink.as_ref() {
            if let Some(event) = self.playhead.tick(Instant::now(), s.empty()) {
                self.events.push(event);
            }
        }

        std::mem::take(&mut self.events)
    }

    fn fade_out(&mut self, over: Duration) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        if !self.playhead.is_running() {
            return;
        }
        let fade_out_ms = over.as_millis() as u64;
        if fade_out_ms == 0 {
            sink.set_volume(0.0);
            return;
        }
        let steps: u64 = 20;
        let step_ms = (fade_out_ms / steps).max(1);
        for step in 1..=steps {
            let t = step as f32 / steps as f32;
            sink.set_volume(self.gain * (1.0 - t));
            thread::sleep(Duration::from_millis(step_ms));
        }
        sink.set_volume(0.0);
    }

    fn teardown(&mut self) {
        self.stop_sink();
        self.loading = None;
        self.bytes = None;
        self.playhead.halt();
        if self.stream.take().is_some() {
            tracing::debug!("audio output released");
        }
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        self.teardown();
    }
}
