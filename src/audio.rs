//! Playback core: queue, transport state machine, audio output binding and
//! the `AudioPlayer` façade that UI code talks to.
//!
//! All state lives on one audio thread. The façade sends [`AudioCmd`]s; the
//! output's position/end/failure events are polled on the same thread, so
//! commands and events are applied strictly one after another.

mod locator;
mod output;
mod playhead;
mod player;
mod queue;
mod sink;
mod thread;
mod transport;
mod types;

pub use locator::{Source, resolve};
pub use output::{AudioOutput, OutputError, OutputEvent};
pub use player::{AudioPlayer, PlayerError};
pub use queue::Queue;
pub use sink::RodioOutput;
pub use transport::{RESTART_THRESHOLD, Transport};
pub use types::*;

#[cfg(test)]
mod tests;
