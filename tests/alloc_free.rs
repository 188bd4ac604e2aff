//! Allocation-free render path tests.
//!
//! These tests verify that `Renderer::render_block()` neither allocates nor
//! frees while rendering. They run a busy session for several seconds and
//! push graph edits between blocks, so that command application, voice
//! stealing and retirement are all exercised on the render path.
//!
//! Just run `cargo test`; no feature flags needed.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use std::sync::Arc;

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use slotmap::DenseSlotMap;
use tw_engine::{
    ChainTarget, Command, EffectKey, Frame, RenderBackend, RenderSettings, Renderer, Report,
    ScheduledNote, SharedState, SoftwareBackend, TrackChannel, TrackKey,
};
use tw_ir::{
    ChannelControls, EffectKind, InstrumentKind, InstrumentSpec, MusicalTime, TransportAction,
};

const SR: u32 = 44_100;
const BLOCK: u16 = 256;

struct Session {
    renderer: Renderer,
    commands: HeapProd<Command>,
    reports: HeapCons<Report>,
    tracks: Vec<TrackKey>,
    effects: Vec<EffectKey>,
    effect_keys: DenseSlotMap<EffectKey, ()>,
    out: Vec<Frame>,
}

/// Four tracks, one per instrument kind plus a spare, each with a filter
/// and a delay, a master reverb, and eight overlapping notes per beat.
fn busy_session(polyphony: usize) -> Session {
    let settings = RenderSettings {
        block_size: BLOCK,
        max_tracks: 8,
        max_pending_events: 2048,
        late_tolerance_samples: 4410,
        retire_capacity: 256,
        initial_bpm: 140.0,
    };
    let (mut commands, rx) = HeapRb::<Command>::new(4096).split();
    let (report_tx, reports) = HeapRb::<Report>::new(4096).split();
    let renderer = Renderer::new(settings, SR, rx, report_tx, Arc::new(SharedState::new(140.0)));

    let mut track_keys: DenseSlotMap<TrackKey, ()> = DenseSlotMap::with_key();
    let mut effect_keys: DenseSlotMap<EffectKey, ()> = DenseSlotMap::with_key();
    let mut tracks = Vec::new();
    let mut effects = Vec::new();
    let backend = SoftwareBackend;

    let kinds = [InstrumentKind::Basic, InstrumentKind::Fm, InstrumentKind::Am, InstrumentKind::Basic];
    for (i, kind) in kinds.into_iter().enumerate() {
        let key = track_keys.insert(());
        let mut channel = Box::new(TrackChannel::new(BLOCK));
        let spec = InstrumentSpec::new(kind);
        channel.replace_instrument(Some(backend.create_instrument(&spec, polyphony, SR)));
        assert!(commands.try_push(Command::AddTrack { key, channel }).is_ok());

        for fx in [EffectKind::Filter, EffectKind::Delay] {
            let fx_key = effect_keys.insert(());
            let effect = backend.create_effect(fx, SR);
            let target = ChainTarget::Track(key);
            assert!(commands.try_push(Command::InsertEffect { target, key: fx_key, effect, index: usize::MAX }).is_ok());
            effects.push(fx_key);
        }

        for step in 0..64u32 {
            let note = ScheduledNote {
                track: key,
                frequency: 110.0 * (i + 1) as f32 * (1.0 + (step % 5) as f32 / 4.0),
                velocity: 0.7,
                start: MusicalTime::zero().add_steps(step, 8),
                duration_beats: 1.5,
            };
            assert!(commands.try_push(Command::Schedule(note)).is_ok());
        }
        tracks.push(key);
    }

    let reverb_key = effect_keys.insert(());
    let reverb = backend.create_effect(EffectKind::Reverb, SR);
    assert!(commands
        .try_push(Command::InsertEffect { target: ChainTarget::Master, key: reverb_key, effect: reverb, index: 0 })
        .is_ok());
    effects.push(reverb_key);
    assert!(commands.try_push(Command::Transport(TransportAction::Start)).is_ok());

    Session {
        renderer,
        commands,
        reports,
        tracks,
        effects,
        effect_keys,
        out: vec![Frame::silence(); BLOCK as usize],
    }
}

impl Session {
    /// Render `frames` worth of blocks, aborting on any heap activity.
    fn render_alloc_free(&mut self, frames: usize) {
        let Self { renderer, out, .. } = self;
        assert_no_alloc(|| {
            for _ in 0..frames / BLOCK as usize {
                renderer.render_block(out);
            }
        });
    }

    fn send(&mut self, command: Command) {
        assert!(self.commands.try_push(command).is_ok());
    }

    /// Free whatever came back, outside the no-alloc scope.
    fn drain_reports(&mut self) -> usize {
        let mut n = 0;
        while self.reports.try_pop().is_some() {
            n += 1;
        }
        n
    }
}

#[test]
fn steady_state_render_is_alloc_free() {
    let mut session = busy_session(16);
    session.render_alloc_free(SR as usize * 5);
    session.drain_reports();
}

#[test]
fn voice_stealing_is_alloc_free() {
    // Two voices for eight overlapping notes per beat.
    let mut session = busy_session(2);
    session.render_alloc_free(SR as usize * 3);
    assert!(session.drain_reports() > 0);
}

#[test]
fn graph_edits_are_alloc_free() {
    let mut session = busy_session(8);
    session.render_alloc_free(SR as usize);

    // Edits are built here, applied inside the no-alloc scope.
    let t0 = session.tracks[0];
    let t1 = session.tracks[1];
    let t2 = session.tracks[2];
    let filter = session.effects[0];
    let delay = session.effects[1];
    let spec = InstrumentSpec::new(InstrumentKind::Fm);
    let replacement = SoftwareBackend.create_instrument(&spec, 8, SR);
    let extra = session.effect_keys.insert(());
    let distortion = SoftwareBackend.create_effect(EffectKind::Distortion, SR);

    session.send(Command::SetEffectParam { target: ChainTarget::Track(t0), key: filter, param: 0, value: 400.0 });
    session.send(Command::SetEffectEnabled { target: ChainTarget::Track(t0), key: delay, enabled: false });
    session.send(Command::MoveEffect { target: ChainTarget::Track(t0), key: delay, index: 0 });
    session.send(Command::InsertEffect { target: ChainTarget::Track(t1), key: extra, effect: distortion, index: 0 });
    session.send(Command::SetInstrument { track: t1, instrument: Some(replacement) });
    session.send(Command::SetControls {
        track: t1,
        controls: ChannelControls { solo: true, ..Default::default() },
    });
    session.send(Command::RemoveEffect { target: ChainTarget::Track(t0), key: filter });
    session.send(Command::RemoveTrack(t2));
    session.send(Command::SetBpm(90.0));
    session.render_alloc_free(SR as usize * 2);

    // Old instrument, filter, and the track with its chain all came back.
    assert!(session.drain_reports() >= 3);
    assert_eq!(session.renderer.track_count(), 3);
}

#[test]
fn stop_and_restart_is_alloc_free() {
    let mut session = busy_session(16);
    session.render_alloc_free(SR as usize);
    session.send(Command::Transport(TransportAction::Stop));
    session.render_alloc_free(SR as usize / 2);
    session.send(Command::Transport(TransportAction::Start));
    session.render_alloc_free(SR as usize);
    session.drain_reports();
}
