use std::io;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::PlaybackSettings;

use super::output::{AudioOutput, OutputError};
use super::transport::Transport;
use super::types::{AudioCmd, PlaybackSnapshot, PlayerEvent, SnapshotHandle};

/// Everything the audio thread needs besides the output itself.
pub(super) struct ThreadConfig {
    pub playback: PlaybackSettings,
    /// Poll interval for position updates and end-of-media.
    pub tick: Duration,
}

/// Publishes snapshots to the shared handle and to subscribers.
struct Publisher {
    handle: SnapshotHandle,
    subscribers: Vec<Sender<PlayerEvent>>,
    last: Option<PlaybackSnapshot>,
}

impl Publisher {
    fn publish(&mut self, snapshot: PlaybackSnapshot) {
        if self.last.as_ref() == Some(&snapshot) {
            return;
        }
        if let Ok(mut shared) = self.handle.lock() {
            *shared = snapshot.clone();
        }
        self.subscribers
            .retain(|tx| tx.send(PlayerEvent::Changed(snapshot.clone())).is_ok());
        self.last = Some(snapshot);
    }

    fn subscribe(&mut self, tx: Sender<PlayerEvent>) {
        if let Some(s) = self.last.as_ref() {
            if tx.send(PlayerEvent::Changed(s.clone())).is_err() {
                return;
            }
        }
        self.subscribers.push(tx);
    }

    fn close(&mut self) {
        for tx in self.subscribers.drain(..) {
            let _ = tx.send(PlayerEvent::Closed);
        }
    }
}

fn dispatch<O: AudioOutput>(transport: &mut Transport<O>, cmd: AudioCmd) {
    tracing::debug!(?cmd, "audio command");
    match cmd {
        AudioCmd::Play(track) => transport.play(track),
        AudioCmd::TogglePause => transport.toggle_play_pause(),
        AudioCmd::Next => transport.next(),
        AudioCmd::Prev => transport.previous(),
        AudioCmd::Seek(secs) => transport.seek(secs),
        AudioCmd::SeekBy(delta) => transport.seek_by(delta),
        AudioCmd::SetVolume(v) => transport.set_volume(v),
        AudioCmd::ToggleShuffle => transport.toggle_shuffle(),
        AudioCmd::ToggleRepeat => transport.toggle_repeat(),
        AudioCmd::SetQueue(tracks) => transport.set_queue(tracks),
        // Handled by the loop itself.
        AudioCmd::Subscribe(_) | AudioCmd::Quit { .. } => {}
    }
}

/// Spawn the thread that owns the output and the transport.
///
/// The output is created on the audio thread (some platform streams can't
/// move between threads); `ready` reports whether that worked.
pub(super) fn spawn_audio_thread<F, O>(
    make_output: F,
    rx: Receiver<AudioCmd>,
    snapshot: SnapshotHandle,
    config: ThreadConfig,
    ready: SyncSender<Result<(), OutputError>>,
) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() -> Result<O, OutputError> + Send + 'static,
    O: AudioOutput + 'static,
{
    thread::Builder::new()
        .name("encore-audio".to_string())
        .spawn(move || {
            let output = match make_output() {
                Ok(o) => {
                    let _ = ready.send(Ok(()));
                    o
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to open audio output");
                    let _ = ready.send(Err(e));
                    return;
                }
            };

            let mut transport = Transport::new(output, &config.playback);
            let mut publisher = Publisher {
                handle: snapshot,
                subscribers: Vec::new(),
                last: None,
            };
            publisher.publish(transport.snapshot());

            loop {
                match rx.recv_timeout(config.tick) {
                    Ok(AudioCmd::Quit { fade_out_ms }) => {
                        transport.shutdown(Duration::from_millis(fade_out_ms));
                        publisher.publish(transport.snapshot());
                        break;
                    }
                    Ok(AudioCmd::Subscribe(tx)) => publisher.subscribe(tx),
                    Ok(cmd) => dispatch(&mut transport, cmd),
                    // periodic check for position and end-of-media
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        transport.shutdown(Duration::ZERO);
                        break;
                    }
                }

                transport.pump();
                publisher.publish(transport.snapshot());
            }

            publisher.close();
            tracing::debug!("audio thread stopped");
        })
}
