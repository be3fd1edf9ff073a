use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use proptest::prelude::*;

use super::*;
use crate::catalog::Track;
use crate::config::{AudioSettings, PlaybackSettings};

fn t(id: &str, duration: u32) -> Track {
    Track {
        id: id.into(),
        title: format!("Title {id}"),
        artist: "Artist".into(),
        album: "Album".into(),
        duration,
        audio_url: format!("/music/{id}.mp3"),
        cover_url: None,
    }
}

fn abc() -> Vec<Track> {
    vec![t("A", 200), t("B", 203), t("C", 215)]
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Load(String, u64),
    Play,
    Pause,
    Seek(Duration),
    Gain(f32),
    FadeOut,
    Teardown,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    pending: Vec<OutputEvent>,
}

/// Records every command and hands back whatever events the test queued.
#[derive(Clone, Default)]
struct FakeOutput(Arc<Mutex<FakeState>>);

impl FakeOutput {
    fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().calls.clone()
    }

    fn clear(&self) {
        self.0.lock().unwrap().calls.clear();
    }

    fn emit(&self, event: OutputEvent) {
        self.0.lock().unwrap().pending.push(event);
    }

    fn record(&self, call: Call) {
        self.0.lock().unwrap().calls.push(call);
    }
}

impl AudioOutput for FakeOutput {
    fn load(&mut self, locator: &str, generation: u64) {
        self.record(Call::Load(locator.to_string(), generation));
    }

    fn play(&mut self) {
        self.record(Call::Play);
    }

    fn pause(&mut self) {
        self.record(Call::Pause);
    }

    fn seek(&mut self, position: Duration) {
        self.record(Call::Seek(position));
    }

    fn set_gain(&mut self, gain: f32) {
        self.record(Call::Gain(gain));
    }

    fn poll(&mut self) -> Vec<OutputEvent> {
        std::mem::take(&mut self.0.lock().unwrap().pending)
    }

    fn fade_out(&mut self, _over: Duration) {
        self.record(Call::FadeOut);
    }

    fn teardown(&mut self) {
        self.record(Call::Teardown);
    }
}

fn transport() -> (Transport<FakeOutput>, FakeOutput) {
    let out = FakeOutput::default();
    let tr = Transport::new(out.clone(), &PlaybackSettings::default());
    out.clear();
    (tr, out)
}

/// Transport playing `queue[start]` with `queue` loaded as the context.
fn playing(queue: Vec<Track>, start: usize) -> (Transport<FakeOutput>, FakeOutput) {
    let (mut tr, out) = transport();
    let track = queue[start].clone();
    tr.set_queue(queue);
    tr.play(track);
    out.clear();
    (tr, out)
}

fn at_position(tr: &mut Transport<FakeOutput>, out: &FakeOutput, secs: u64) {
    out.emit(OutputEvent::Position {
        generation: tr.generation(),
        position: Duration::from_secs(secs),
    });
    tr.pump();
}

fn current_id<O: AudioOutput>(tr: &Transport<O>) -> Option<&str> {
    tr.current().map(|t| t.id.as_str())
}

fn assert_cursor_matches_current<O: AudioOutput>(tr: &Transport<O>) {
    if let Some(cursor) = tr.queue().cursor() {
        assert_eq!(tr.queue().tracks()[cursor].id, current_id(tr).unwrap());
    }
}

// ===== Queue =====

#[test]
fn queue_play_track_reuses_loaded_context() {
    let mut q = Queue::default();
    q.set(abc(), None);

    assert_eq!(q.play_track(&t("B", 203)), 1);
    assert_eq!(q.len(), 3);
    assert_eq!(q.cursor(), Some(1));
    assert_eq!(q.current().unwrap().id, "B");
}

#[test]
fn queue_play_track_outside_context_starts_single_item_queue() {
    let mut q = Queue::default();
    q.set(abc(), None);

    assert_eq!(q.play_track(&t("Z", 90)), 0);
    assert_eq!(q.len(), 1);
    assert_eq!(q.cursor(), Some(0));
    assert_eq!(q.tracks()[0].id, "Z");
}

#[test]
fn queue_advance_on_empty_queue_is_noop() {
    let mut q = Queue::default();
    assert!(q.advance(Direction::Next, false).is_none());
    assert!(q.advance(Direction::Previous, true).is_none());
    assert_eq!(q.cursor(), None);
}

#[test]
fn queue_advance_wraps_in_both_directions() {
    let mut q = Queue::default();
    q.set(abc(), None);
    q.play_track(&t("C", 215));

    assert_eq!(q.advance(Direction::Next, false).unwrap().id, "A");
    assert_eq!(q.advance(Direction::Previous, false).unwrap().id, "C");
}

#[test]
fn queue_advance_from_unset_cursor_starts_at_an_end() {
    let mut q = Queue::default();
    q.set(abc(), None);
    assert_eq!(q.advance(Direction::Next, false).unwrap().id, "A");

    let mut q = Queue::default();
    q.set(abc(), None);
    assert_eq!(q.advance(Direction::Previous, false).unwrap().id, "C");
}

#[test]
fn queue_set_follows_current_track() {
    let mut q = Queue::default();
    let b = t("B", 203);
    q.set(abc(), Some(&b));
    assert_eq!(q.cursor(), Some(1));

    q.set(vec![t("X", 10), b.clone()], Some(&b));
    assert_eq!(q.cursor(), Some(1));

    q.set(vec![t("X", 10)], Some(&b));
    assert_eq!(q.cursor(), None);
}

// ===== Transport =====

#[test]
fn play_binds_track_and_starts_output() {
    let (mut tr, out) = transport();
    tr.play(t("A", 200));

    assert_eq!(current_id(&tr), Some("A"));
    assert!(tr.is_playing());
    assert_eq!(tr.position(), Duration::ZERO);
    assert_eq!(
        out.calls(),
        vec![Call::Load("/music/A.mp3".into(), 1), Call::Play]
    );
}

#[test]
fn new_transport_applies_default_volume_as_gain() {
    let out = FakeOutput::default();
    let tr = Transport::new(out.clone(), &PlaybackSettings::default());
    assert_eq!(tr.volume(), 70);
    assert_eq!(out.calls(), vec![Call::Gain(0.7)]);
}

#[test]
fn next_walks_the_queue_and_wraps() {
    let (mut tr, _out) = playing(abc(), 0);

    tr.next();
    assert_eq!(tr.queue().cursor(), Some(1));
    assert_eq!(current_id(&tr), Some("B"));
    tr.next();
    assert_eq!(tr.queue().cursor(), Some(2));
    assert_eq!(current_id(&tr), Some("C"));
    tr.next();
    assert_eq!(tr.queue().cursor(), Some(0));
    assert_eq!(current_id(&tr), Some("A"));
}

#[test]
fn previous_from_first_wraps_to_last() {
    let (mut tr, _out) = playing(abc(), 0);
    tr.previous();
    assert_eq!(tr.queue().cursor(), Some(2));
    assert_eq!(current_id(&tr), Some("C"));
}

#[test]
fn next_then_previous_returns_to_start() {
    let (mut tr, _out) = playing(abc(), 1);
    tr.next();
    tr.previous();
    assert_eq!(tr.queue().cursor(), Some(1));
    assert_eq!(current_id(&tr), Some("B"));
}

#[test]
fn previous_past_threshold_restarts_current_track() {
    let (mut tr, out) = playing(abc(), 1);
    at_position(&mut tr, &out, 4);
    let generation = tr.generation();

    tr.previous();

    assert_eq!(tr.queue().cursor(), Some(1));
    assert_eq!(current_id(&tr), Some("B"));
    assert_eq!(tr.position(), Duration::ZERO);
    assert_eq!(tr.generation(), generation);
    assert_eq!(out.calls(), vec![Call::Seek(Duration::ZERO)]);
}

#[test]
fn previous_at_threshold_still_moves_back() {
    let (mut tr, out) = playing(abc(), 1);
    at_position(&mut tr, &out, 3);

    tr.previous();
    assert_eq!(tr.queue().cursor(), Some(0));
}

#[test]
fn previous_and_next_on_empty_queue_do_nothing() {
    let (mut tr, out) = transport();
    tr.next();
    tr.previous();
    assert!(tr.current().is_none());
    assert!(out.calls().is_empty());
}

#[test]
fn set_volume_clamps() {
    let (mut tr, out) = transport();
    tr.set_volume(150);
    assert_eq!(tr.volume(), 100);
    tr.set_volume(-5);
    assert_eq!(tr.volume(), 0);
    tr.set_volume(42);
    assert_eq!(tr.volume(), 42);
    assert_eq!(
        out.calls(),
        vec![Call::Gain(1.0), Call::Gain(0.0), Call::Gain(0.42)]
    );
}

#[test]
fn seek_clamps_into_track() {
    let (mut tr, out) = playing(abc(), 0);

    tr.seek(-10.0);
    assert_eq!(tr.position(), Duration::ZERO);
    tr.seek(300.0);
    assert_eq!(tr.position(), Duration::from_secs(200));
    tr.seek(f64::NAN);
    assert_eq!(tr.position(), Duration::ZERO);
    assert_eq!(
        out.calls(),
        vec![
            Call::Seek(Duration::ZERO),
            Call::Seek(Duration::from_secs(200)),
            Call::Seek(Duration::ZERO),
        ]
    );
}

#[test]
fn seek_past_end_of_213s_track_lands_on_213() {
    let (mut tr, out) = playing(vec![t("D", 213)], 0);
    at_position(&mut tr, &out, 45);
    assert_eq!(tr.position(), Duration::from_secs(45));

    tr.seek(500.0);
    assert_eq!(tr.position(), Duration::from_secs(213));
}

#[test]
fn seek_without_track_is_noop() {
    let (mut tr, out) = transport();
    tr.seek(10.0);
    tr.seek_by(5.0);
    assert_eq!(tr.position(), Duration::ZERO);
    assert!(out.calls().is_empty());
}

#[test]
fn seek_by_is_relative_and_clamped() {
    let (mut tr, out) = playing(abc(), 0);
    at_position(&mut tr, &out, 10);

    tr.seek_by(5.0);
    assert_eq!(tr.position(), Duration::from_secs(15));
    tr.seek_by(-60.0);
    assert_eq!(tr.position(), Duration::ZERO);
}

#[test]
fn play_track_outside_queue_replaces_queue() {
    let (mut tr, _out) = playing(abc(), 1);
    tr.play(t("Z", 60));

    assert_eq!(tr.queue().len(), 1);
    assert_eq!(tr.queue().cursor(), Some(0));
    assert_eq!(current_id(&tr), Some("Z"));
}

#[test]
fn play_track_inside_queue_keeps_queue() {
    let (mut tr, _out) = playing(abc(), 0);
    tr.play(t("C", 215));

    let ids: Vec<&str> = tr.queue().tracks().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
    assert_eq!(tr.queue().cursor(), Some(2));
}

#[test]
fn ended_with_repeat_restarts_same_track() {
    let (mut tr, out) = playing(abc(), 1);
    tr.toggle_repeat();
    at_position(&mut tr, &out, 150);
    out.clear();
    let generation = tr.generation();

    out.emit(OutputEvent::Ended { generation });
    tr.pump();

    assert_eq!(current_id(&tr), Some("B"));
    assert_eq!(tr.queue().cursor(), Some(1));
    assert_eq!(tr.position(), Duration::ZERO);
    assert!(tr.is_playing());
    assert_eq!(tr.generation(), generation);
    assert_eq!(out.calls(), vec![Call::Seek(Duration::ZERO), Call::Play]);
}

#[test]
fn ended_without_repeat_at_last_wraps_to_first() {
    let (mut tr, out) = playing(abc(), 2);
    out.emit(OutputEvent::Ended {
        generation: tr.generation(),
    });
    tr.pump();

    assert_eq!(tr.queue().cursor(), Some(0));
    assert_eq!(current_id(&tr), Some("A"));
    assert!(tr.is_playing());
}

#[test]
fn ended_ignores_restart_threshold() {
    let (mut tr, out) = playing(abc(), 0);
    at_position(&mut tr, &out, 199);
    out.emit(OutputEvent::Ended {
        generation: tr.generation(),
    });
    tr.pump();
    assert_eq!(current_id(&tr), Some("B"));
}

#[test]
fn ended_with_emptied_queue_stops_at_end() {
    let (mut tr, out) = playing(abc(), 0);
    tr.set_queue(Vec::new());
    out.emit(OutputEvent::Ended {
        generation: tr.generation(),
    });
    tr.pump();

    assert_eq!(current_id(&tr), Some("A"));
    assert!(!tr.is_playing());
    assert_eq!(tr.position(), Duration::from_secs(200));
}

#[test]
fn ended_with_emptied_queue_pauses_output_before_later_seek() {
    let (mut tr, out) = playing(abc(), 0);
    tr.set_queue(Vec::new());
    out.emit(OutputEvent::Ended {
        generation: tr.generation(),
    });
    tr.pump();
    tr.seek(50.0);

    assert_eq!(
        out.calls(),
        vec![Call::Pause, Call::Seek(Duration::from_secs(50))]
    );
    assert!(!tr.is_playing());
    assert!(!tr.snapshot().playing);
}

#[test]
fn stale_events_from_superseded_load_are_discarded() {
    let (mut tr, out) = playing(abc(), 0);
    let stale = tr.generation();
    tr.next();

    out.emit(OutputEvent::Position {
        generation: stale,
        position: Duration::from_secs(120),
    });
    out.emit(OutputEvent::Ended { generation: stale });
    out.emit(OutputEvent::Failed {
        generation: stale,
        error: OutputError::NotLoaded,
    });
    tr.pump();

    assert_eq!(current_id(&tr), Some("B"));
    assert_eq!(tr.position(), Duration::ZERO);
    assert!(tr.is_playing());
    assert!(tr.snapshot().error.is_none());
}

#[test]
fn position_updates_are_clamped_to_duration() {
    let (mut tr, out) = playing(abc(), 0);
    at_position(&mut tr, &out, 205);
    assert_eq!(tr.position(), Duration::from_secs(200));
}

#[test]
fn load_failure_pauses_and_keeps_track() {
    let (mut tr, out) = playing(abc(), 1);
    out.emit(OutputEvent::Failed {
        generation: tr.generation(),
        error: OutputError::Decode {
            locator: "/music/B.mp3".into(),
            message: "bad header".into(),
        },
    });
    tr.pump();

    assert!(!tr.is_playing());
    assert_eq!(current_id(&tr), Some("B"));
    let snap = tr.snapshot();
    assert!(snap.error.unwrap().contains("bad header"));
}

#[test]
fn resume_after_failure_retries_the_load() {
    let (mut tr, out) = playing(abc(), 1);
    let failed_generation = tr.generation();
    out.emit(OutputEvent::Failed {
        generation: failed_generation,
        error: OutputError::NotLoaded,
    });
    tr.pump();
    out.clear();

    tr.toggle_play_pause();

    assert!(tr.is_playing());
    assert_eq!(tr.generation(), failed_generation + 1);
    assert!(tr.snapshot().error.is_none());
    assert_eq!(
        out.calls(),
        vec![
            Call::Load("/music/B.mp3".into(), failed_generation + 1),
            Call::Seek(Duration::ZERO),
            Call::Play,
        ]
    );
}

#[test]
fn toggle_play_pause_without_track_is_noop() {
    let (mut tr, out) = transport();
    tr.toggle_play_pause();
    assert!(!tr.is_playing());
    assert!(out.calls().is_empty());
}

#[test]
fn toggle_play_pause_flips_and_forwards() {
    let (mut tr, out) = playing(abc(), 0);
    tr.toggle_play_pause();
    assert!(!tr.is_playing());
    tr.toggle_play_pause();
    assert!(tr.is_playing());
    assert_eq!(out.calls(), vec![Call::Pause, Call::Play]);
}

#[test]
fn shuffle_and_repeat_toggles_do_not_touch_output() {
    let (mut tr, out) = playing(abc(), 0);
    tr.toggle_shuffle();
    tr.toggle_repeat();
    let snap = tr.snapshot();
    assert!(snap.shuffle);
    assert!(snap.repeat);
    assert!(out.calls().is_empty());
}

#[test]
fn set_queue_keeps_current_track_and_repoints_cursor() {
    let (mut tr, _out) = playing(abc(), 1);

    tr.set_queue(vec![t("B", 203), t("X", 100)]);
    assert_eq!(current_id(&tr), Some("B"));
    assert_eq!(tr.queue().cursor(), Some(0));

    tr.set_queue(vec![t("X", 100), t("Y", 100)]);
    assert_eq!(current_id(&tr), Some("B"));
    assert_eq!(tr.queue().cursor(), None);
    assert!(tr.is_playing());

    tr.next();
    assert_eq!(current_id(&tr), Some("X"));
    assert_eq!(tr.queue().cursor(), Some(0));
}

#[test]
fn snapshot_exposes_track_metadata_and_queue_position() {
    let (mut tr, out) = playing(abc(), 2);
    at_position(&mut tr, &out, 12);
    tr.set_volume(55);

    let snap = tr.snapshot();
    let track = snap.track.clone().unwrap();
    assert_eq!(track.title, "Title C");
    assert_eq!(track.artist, "Artist");
    assert!(snap.playing);
    assert_eq!(snap.position, Duration::from_secs(12));
    assert_eq!(snap.duration(), Duration::from_secs(215));
    assert_eq!(snap.volume, 55);
    assert_eq!(snap.queue_len, 3);
    assert_eq!(snap.queue_position, Some(2));
}

#[test]
fn shutdown_fades_and_releases_output() {
    let (mut tr, out) = playing(abc(), 0);
    tr.shutdown(Duration::from_millis(10));
    assert!(!tr.is_playing());
    assert_eq!(out.calls(), vec![Call::FadeOut, Call::Teardown]);
}

// ===== Properties =====

fn queue_of(len: usize) -> Vec<Track> {
    (0..len).map(|i| t(&format!("t{i}"), 100 + i as u32)).collect()
}

proptest! {
    #[test]
    fn next_then_previous_is_identity(len in 1usize..20, start in 0usize..20) {
        let start = start % len;
        let (mut tr, _out) = playing(queue_of(len), start);

        tr.next();
        tr.previous();

        prop_assert_eq!(tr.queue().cursor(), Some(start));
        assert_cursor_matches_current(&tr);
    }

    #[test]
    fn volume_always_lands_in_range(v in any::<i32>()) {
        let (mut tr, _out) = transport();
        tr.set_volume(v);
        prop_assert_eq!(i32::from(tr.volume()), v.clamp(0, 100));
    }

    #[test]
    fn seek_never_leaves_the_track(duration in 0u32..3600, secs in -10_000f64..10_000f64) {
        let (mut tr, _out) = playing(vec![t("x", duration)], 0);
        tr.seek(secs);
        prop_assert!(tr.position() <= Duration::from_secs(u64::from(duration)));
    }

    #[test]
    fn cursor_always_points_at_current_track(
        len in 1usize..15,
        ops in prop::collection::vec(0u8..6, 1..40),
    ) {
        let (mut tr, out) = playing(queue_of(len), 0);
        for op in ops {
            match op {
                0 => tr.next(),
                1 => tr.previous(),
                2 => tr.toggle_shuffle(),
                3 => {
                    out.emit(OutputEvent::Ended { generation: tr.generation() });
                    tr.pump();
                }
                4 => at_position(&mut tr, &out, 10),
                _ => tr.toggle_repeat(),
            }
            let cursor = tr.queue().cursor();
            prop_assert!(cursor.is_some_and(|c| c < len));
            assert_cursor_matches_current(&tr);
        }
    }
}

// ===== Façade =====

fn wait_for(
    rx: &Receiver<PlayerEvent>,
    mut pred: impl FnMut(&PlaybackSnapshot) -> bool,
) -> PlaybackSnapshot {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(PlayerEvent::Changed(s)) if pred(&s) => return s,
            Ok(_) => continue,
            Err(e) => panic!("no matching snapshot: {e}"),
        }
    }
}

fn spawn_player(out: FakeOutput) -> AudioPlayer {
    let audio = AudioSettings {
        tick_ms: 5,
        quit_fade_out_ms: 0,
    };
    AudioPlayer::spawn(move || Ok(out), &audio, &PlaybackSettings::default()).unwrap()
}

#[test]
fn player_applies_commands_in_order_and_notifies_subscribers() {
    let out = FakeOutput::default();
    let player = spawn_player(out.clone());
    let rx = player.subscribe().unwrap();

    let initial = wait_for(&rx, |_| true);
    assert!(initial.track.is_none());
    assert_eq!(initial.volume, 70);

    player.set_queue(abc()).unwrap();
    player.play(t("B", 203)).unwrap();
    player.next().unwrap();

    let snap = wait_for(&rx, |s| {
        s.track.as_ref().is_some_and(|t| t.id == "C") && s.queue_position == Some(2)
    });
    assert!(snap.playing);
    assert_eq!(snap.queue_len, 3);
    assert_eq!(player.snapshot().queue_position, Some(2));

    player.shutdown(Duration::ZERO);
}

#[test]
fn player_feeds_output_events_back_into_transport() {
    let out = FakeOutput::default();
    let player = spawn_player(out.clone());
    let rx = player.subscribe().unwrap();

    player.set_queue(abc()).unwrap();
    player.play(t("A", 200)).unwrap();
    wait_for(&rx, |s| s.track.is_some());

    out.emit(OutputEvent::Position {
        generation: 1,
        position: Duration::from_secs(30),
    });
    wait_for(&rx, |s| s.position == Duration::from_secs(30));

    out.emit(OutputEvent::Ended { generation: 1 });
    let snap = wait_for(&rx, |s| s.queue_position == Some(1));
    assert_eq!(snap.track.unwrap().id, "B");
    assert_eq!(snap.position, Duration::ZERO);

    player.shutdown(Duration::ZERO);
}

#[test]
fn player_shutdown_releases_output_and_closes_subscribers() {
    let out = FakeOutput::default();
    let player = spawn_player(out.clone());
    let rx = player.subscribe().unwrap();

    player.shutdown(Duration::ZERO);
    player.shutdown(Duration::ZERO);

    assert_eq!(
        out.calls().iter().filter(|c| **c == Call::Teardown).count(),
        1
    );
    assert!(rx.iter().any(|e| e == PlayerEvent::Closed));
    assert!(matches!(player.next(), Err(PlayerError::Disconnected)));
}

#[test]
fn player_spawn_reports_missing_device() {
    let result = AudioPlayer::spawn(
        || Err::<FakeOutput, _>(OutputError::Device("none".into())),
        &AudioSettings::default(),
        &PlaybackSettings::default(),
    );
    assert!(matches!(
        result,
        Err(PlayerError::Output(OutputError::Device(_)))
    ));
}

// ===== Playhead =====

use super::playhead::{PlayStep, Playhead};

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

#[test]
fn playhead_counts_time_only_while_running() {
    let t0 = Instant::now();
    let mut ph = Playhead::default();
    ph.load(1);

    assert_eq!(ph.play(), PlayStep::Resume);
    ph.started(t0);
    assert_eq!(ph.play(), PlayStep::Nothing);
    assert_eq!(ph.position(t0 + secs(4)), secs(4));

    ph.pause(t0 + secs(4));
    assert!(!ph.is_running());
    assert_eq!(ph.position(t0 + secs(60)), secs(4));

    assert_eq!(ph.play(), PlayStep::Resume);
    ph.started(t0 + secs(10));
    assert_eq!(ph.position(t0 + secs(13)), secs(7));
}

#[test]
fn playhead_reports_ended_once_until_rebuilt() {
    let t0 = Instant::now();
    let mut ph = Playhead::default();
    ph.load(3);
    ph.play();
    ph.started(t0);

    assert!(matches!(
        ph.tick(t0 + secs(1), false),
        Some(OutputEvent::Position { generation: 3, position }) if position == secs(1)
    ));
    assert!(matches!(
        ph.tick(t0 + secs(2), true),
        Some(OutputEvent::Ended { generation: 3 })
    ));
    assert!(ph.tick(t0 + secs(3), true).is_none());
    assert!(ph.tick(t0 + secs(4), false).is_none());
    assert_eq!(ph.position(t0 + secs(9)), secs(2));

    // a seek rebuilds the sink paused; playing starts counting again
    ph.seek(Duration::ZERO);
    assert!(!ph.rebuilt(t0 + secs(5)));
    assert!(ph.tick(t0 + secs(5), false).is_none());
    assert_eq!(ph.play(), PlayStep::Resume);
    ph.started(t0 + secs(5));
    assert!(matches!(
        ph.tick(t0 + secs(6), false),
        Some(OutputEvent::Position { position, .. }) if position == secs(1)
    ));
}

#[test]
fn playhead_play_after_end_restarts_from_top() {
    let t0 = Instant::now();
    let mut ph = Playhead::default();
    ph.load(1);
    ph.play();
    ph.started(t0);
    ph.tick(t0 + secs(200), true);

    assert_eq!(ph.play(), PlayStep::Restart);
    assert_eq!(ph.offset(), Duration::ZERO);
    assert!(ph.rebuilt(t0 + secs(201)));
    assert_eq!(ph.position(t0 + secs(202)), secs(1));
}

#[test]
fn playhead_seek_while_loading_starts_at_offset() {
    let t0 = Instant::now();
    let mut ph = Playhead::default();
    ph.load(2);
    ph.play();
    ph.seek(secs(30));
    assert_eq!(ph.offset(), secs(30));
    assert!(!ph.is_running());

    // bytes arrive: the sink is built at the offset and started
    assert!(ph.rebuilt(t0));
    assert_eq!(ph.position(t0 + secs(2)), secs(32));
}

#[test]
fn playhead_load_resets_and_halt_stops() {
    let t0 = Instant::now();
    let mut ph = Playhead::default();
    ph.load(1);
    ph.play();
    ph.started(t0);
    ph.tick(t0 + secs(5), true);

    ph.load(2);
    assert_eq!(ph.generation(), 2);
    assert_eq!(ph.position(t0 + secs(9)), Duration::ZERO);
    assert_eq!(ph.play(), PlayStep::Resume);

    ph.halt();
    assert!(!ph.rebuilt(t0));
    assert!(ph.tick(t0, false).is_none());
}

// ===== Locators =====

#[test]
fn resolve_classifies_locators() {
    assert_eq!(
        resolve("http://localhost:8000/a.mp3", None),
        Source::Http("http://localhost:8000/a.mp3".into())
    );
    assert_eq!(
        resolve("file:///music/a.mp3", None),
        Source::File("/music/a.mp3".into())
    );
    assert_eq!(
        resolve("/uploads/audio/a.mp3", Some("http://localhost:5000/")),
        Source::Http("http://localhost:5000/uploads/audio/a.mp3".into())
    );
    assert_eq!(
        resolve("/uploads/audio/a.mp3", None),
        Source::File("/uploads/audio/a.mp3".into())
    );
    assert_eq!(
        resolve("Songs/a.mp3", Some("http://localhost:5000")),
        Source::File("Songs/a.mp3".into())
    );
}

#[test]
fn fetch_reads_files_and_reports_missing_ones() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.mp3");
    std::fs::write(&path, b"bytes").unwrap();
    let client = reqwest::blocking::Client::new();

    let locator = path.display().to_string();
    let bytes = locator::fetch(&resolve(&locator, None), &client, &locator).unwrap();
    assert_eq!(bytes, b"bytes");

    let missing = dir.path().join("gone.mp3").display().to_string();
    let err = locator::fetch(&resolve(&missing, None), &client, &missing).unwrap_err();
    assert!(matches!(err, OutputError::Io { .. }));
}
