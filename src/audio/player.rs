use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;

use crate::catalog::Track;
use crate::config::{AudioSettings, PlaybackSettings};

use super::output::{AudioOutput, OutputError};
use super::thread::{ThreadConfig, spawn_audio_thread};
use super::types::{AudioCmd, PlaybackSnapshot, PlayerEvent, SnapshotHandle};

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error(transparent)]
    Output(#[from] OutputError),
    #[error("failed to start audio thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("audio thread is not running")]
    Disconnected,
}

/// The playback façade: the only entry point UI code uses.
///
/// Commands are queued to the audio thread and applied in order; the read
/// side is a snapshot refreshed after every transition.
pub struct AudioPlayer {
    tx: Sender<AudioCmd>,
    snapshot: SnapshotHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    /// Start the audio thread around the output built by `make_output`.
    ///
    /// Blocks until the output is open so a missing device is reported here.
    pub fn spawn<F, O>(
        make_output: F,
        audio: &AudioSettings,
        playback: &PlaybackSettings,
    ) -> Result<Self, PlayerError>
    where
        F: FnOnce() -> Result<O, OutputError> + Send + 'static,
        O: AudioOutput + 'static,
    {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let snapshot: SnapshotHandle = Arc::new(Mutex::new(PlaybackSnapshot::default()));

        let config = ThreadConfig {
            playback: playback.clone(),
            tick: Duration::from_millis(audio.tick_ms.max(1)),
        };
        let join = spawn_audio_thread(make_output, rx, snapshot.clone(), config, ready_tx)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = join.join();
                return Err(e.into());
            }
            Err(_) => {
                let _ = join.join();
                return Err(PlayerError::Disconnected);
            }
        }

        Ok(Self {
            tx,
            snapshot,
            join: Mutex::new(Some(join)),
        })
    }

    fn send(&self, cmd: AudioCmd) -> Result<(), PlayerError> {
        self.tx.send(cmd).map_err(|_| PlayerError::Disconnected)
    }

    pub fn play(&self, track: Track) -> Result<(), PlayerError> {
        self.send(AudioCmd::Play(track))
    }

    pub fn play_pause(&self) -> Result<(), PlayerError> {
        self.send(AudioCmd::TogglePause)
    }

    pub fn next(&self) -> Result<(), PlayerError> {
        self.send(AudioCmd::Next)
    }

    pub fn previous(&self) -> Result<(), PlayerError> {
        self.send(AudioCmd::Prev)
    }

    pub fn seek(&self, secs: f64) -> Result<(), PlayerError> {
        self.send(AudioCmd::Seek(secs))
    }

    pub fn seek_by(&self, delta_secs: f64) -> Result<(), PlayerError> {
        self.send(AudioCmd::SeekBy(delta_secs))
    }

    pub fn set_volume(&self, volume: i32) -> Result<(), PlayerError> {
        self.send(AudioCmd::SetVolume(volume))
    }

    pub fn toggle_shuffle(&self) -> Result<(), PlayerError> {
        self.send(AudioCmd::ToggleShuffle)
    }

    pub fn toggle_repeat(&self) -> Result<(), PlayerError> {
        self.send(AudioCmd::ToggleRepeat)
    }

    pub fn set_queue(&self, tracks: Vec<Track>) -> Result<(), PlayerError> {
        self.send(AudioCmd::SetQueue(tracks))
    }

    /// Latest published state.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshot
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    /// Receive a [`PlayerEvent::Changed`] after every state change, starting
    /// with the current state.
    pub fn subscribe(&self) -> Result<Receiver<PlayerEvent>, PlayerError> {
        let (tx, rx) = mpsc::channel();
        self.send(AudioCmd::Subscribe(tx))?;
        Ok(rx)
    }

    /// Stop playback, release the output and wait for the audio thread.
    /// Calling it again is a no-op.
    pub fn shutdown(&self, fade_out: Duration) {
        let _ = self.send(AudioCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.shutdown(Duration::ZERO);
    }
}
