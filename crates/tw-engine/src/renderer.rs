//! The render context.
//!
//! A [`Renderer`] owns the whole mixer graph. Once per block it applies the
//! commands published since the previous block, dispatches due notes,
//! processes every track channel and mixes the master bus. Nothing here
//! allocates, locks or performs I/O: storage is sized at construction and
//! every removed graph piece travels back to the control side as a
//! [`Retired`] report to be freed there.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use ringbuf::traits::{Consumer, Producer};
use ringbuf::{HeapCons, HeapProd};
use slotmap::SecondaryMap;
use tw_ir::{MusicalTime, RunState, TransportAction};

use crate::channel::TrackChannel;
use crate::command::{ChainTarget, Command, Report, Retired};
use crate::effect_chain::{EffectChain, EffectNode};
use crate::event_queue::ScheduledNote;
use crate::frame::Frame;
use crate::keys::TrackKey;
use crate::master::{any_solo, MasterBus};
use crate::scheduler::{Enqueued, Scheduler};
use crate::transport::{Transport, TransportClock};
use crate::voice::NoteTrigger;

/// Sizes fixed for the lifetime of a renderer.
#[derive(Clone, Copy, Debug)]
pub struct RenderSettings {
    pub block_size: u16,
    pub max_tracks: usize,
    pub max_pending_events: usize,
    /// How late a note may arrive and still be played, in samples.
    pub late_tolerance_samples: u32,
    /// Room for retired graph pieces when the report ring is full.
    pub retire_capacity: usize,
    pub initial_bpm: f64,
}

/// Transport snapshot the renderer publishes after every block.
#[derive(Debug)]
pub struct SharedState {
    position_bits: AtomicU64,
    bpm_bits: AtomicU64,
    run_state: AtomicU8,
    frames_rendered: AtomicU64,
}

impl SharedState {
    pub fn new(bpm: f64) -> Self {
        Self {
            position_bits: AtomicU64::new(0f64.to_bits()),
            bpm_bits: AtomicU64::new(bpm.to_bits()),
            run_state: AtomicU8::new(RunState::Stopped as u8),
            frames_rendered: AtomicU64::new(0),
        }
    }

    pub fn position_beats(&self) -> f64 {
        f64::from_bits(self.position_bits.load(Ordering::Acquire))
    }

    pub fn bpm(&self) -> f64 {
        f64::from_bits(self.bpm_bits.load(Ordering::Acquire))
    }

    pub fn run_state(&self) -> RunState {
        RunState::from_u8(self.run_state.load(Ordering::Acquire))
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Acquire)
    }

    fn publish(&self, clock: &TransportClock, frames: usize) {
        self.position_bits.store(clock.position_beats().to_bits(), Ordering::Release);
        self.bpm_bits.store(clock.bpm().to_bits(), Ordering::Release);
        self.run_state.store(clock.run_state() as u8, Ordering::Release);
        self.frames_rendered.fetch_add(frames as u64, Ordering::AcqRel);
    }
}

/// Report ring plus a preallocated spill area for retired pieces, which
/// must never be dropped in the render context.
struct Outbox {
    reports: HeapProd<Report>,
    spill: Vec<Retired>,
}

impl Outbox {
    /// Informational reports are discarded when the ring is full.
    fn report(&mut self, report: Report) {
        let _ = self.reports.try_push(report);
    }

    fn retire(&mut self, retired: Retired) {
        if let Err(Report::Retired(r)) = self.reports.try_push(Report::Retired(retired)) {
            // Never grows: `has_room` gates every command that can retire.
            self.spill.push(r);
        }
    }

    fn has_room(&self) -> bool {
        self.spill.len() < self.spill.capacity()
    }

    fn flush(&mut self) {
        while let Some(r) = self.spill.pop() {
            if let Err(Report::Retired(r)) = self.reports.try_push(Report::Retired(r)) {
                self.spill.push(r);
                break;
            }
        }
    }
}

pub struct Renderer {
    sample_rate: u32,
    block_size: usize,
    max_tracks: usize,
    clock: TransportClock,
    scheduler: Scheduler,
    tracks: SecondaryMap<TrackKey, Box<TrackChannel>>,
    master: MasterBus,
    commands: HeapCons<Command>,
    outbox: Outbox,
    shared: Arc<SharedState>,
}

impl Renderer {
    /// Build a renderer. All render-time storage is reserved here.
    pub fn new(
        settings: RenderSettings,
        sample_rate: u32,
        commands: HeapCons<Command>,
        reports: HeapProd<Report>,
        shared: Arc<SharedState>,
    ) -> Self {
        let clock = TransportClock::new(sample_rate, settings.initial_bpm);
        shared.publish(&clock, 0);
        Self {
            sample_rate,
            block_size: settings.block_size as usize,
            max_tracks: settings.max_tracks,
            clock,
            scheduler: Scheduler::new(settings.max_pending_events, settings.late_tolerance_samples),
            // Slot indices start at 1.
            tracks: SecondaryMap::with_capacity(settings.max_tracks + 1),
            master: MasterBus::new(settings.block_size),
            commands,
            outbox: Outbox { reports, spill: Vec::with_capacity(settings.retire_capacity.max(1)) },
            shared,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn transport(&self) -> &TransportClock {
        &self.clock
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Render one block into `out`, which should be `block_size` frames
    /// long. Frames past the block are silenced.
    pub fn render_block(&mut self, out: &mut [Frame]) {
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.render_inner(out));
        #[cfg(not(feature = "alloc_check"))]
        self.render_inner(out);
    }

    fn render_inner(&mut self, out: &mut [Frame]) {
        self.apply_pending();

        let frames = self.block_size;
        let tracks = &mut self.tracks;
        let outbox = &mut self.outbox;
        self.scheduler.dispatch(&self.clock, frames, |note, placement| {
            trigger(
                tracks,
                outbox,
                note,
                NoteTrigger {
                    frequency: note.frequency,
                    velocity: note.velocity,
                    offset: placement.offset,
                    gate: placement.gate,
                },
            );
        });

        for channel in self.tracks.values_mut() {
            channel.process();
        }
        let solo = any_solo(self.tracks.values().map(|c| &**c));
        let (head, tail) = out.split_at_mut(frames.min(out.len()));
        self.master.mix(self.tracks.values().map(|c| &**c), solo, head);
        tail.fill(Frame::silence());

        self.clock.advance(frames);
        self.shared.publish(&self.clock, frames);
    }

    /// Apply queued commands without rendering. For hosts that drive the
    /// renderer from the control thread.
    pub fn apply_pending(&mut self) {
        self.outbox.flush();
        self.apply_commands();
    }

    fn apply_commands(&mut self) {
        // Each command retires at most one piece, so stop while the spill
        // area could not hold it.
        while self.outbox.has_room() {
            let Some(command) = self.commands.try_pop() else { break };
            self.apply(command);
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::AddTrack { key, channel } => {
                if self.tracks.len() >= self.max_tracks && !self.tracks.contains_key(key) {
                    self.outbox.retire(Retired::Track(channel));
                } else if let Some(old) = self.tracks.insert(key, channel) {
                    self.outbox.retire(Retired::Track(old));
                }
            }
            Command::RemoveTrack(key) => {
                if let Some(channel) = self.tracks.remove(key) {
                    self.outbox.retire(Retired::Track(channel));
                }
            }
            Command::SetControls { track, controls } => {
                if let Some(channel) = self.tracks.get_mut(track) {
                    channel.controls = controls;
                }
            }
            Command::SetMasterControls(controls) => self.master.controls = controls,
            Command::SetInstrument { track, instrument } => match self.tracks.get_mut(track) {
                Some(channel) => {
                    if let Some(old) = channel.replace_instrument(instrument) {
                        self.outbox.retire(Retired::Instrument(old));
                    }
                }
                None => {
                    if let Some(unused) = instrument {
                        self.outbox.retire(Retired::Instrument(unused));
                    }
                }
            },
            Command::SetEnvelope { track, envelope } => {
                if let Some(inst) = self.tracks.get_mut(track).and_then(|c| c.instrument.as_mut()) {
                    inst.set_envelope(envelope);
                }
            }
            Command::InsertEffect { target, key, effect, index } => {
                let node = EffectNode::new(key, effect);
                let rejected = match self.chain_mut(target) {
                    Some(chain) => chain.insert(index, node).err(),
                    None => Some(node),
                };
                if let Some(node) = rejected {
                    self.outbox.retire(Retired::Effect(node.processor));
                }
            }
            Command::RemoveEffect { target, key } => {
                if let Some(node) = self.chain_mut(target).and_then(|c| c.remove(key)) {
                    self.outbox.retire(Retired::Effect(node.processor));
                }
            }
            Command::MoveEffect { target, key, index } => {
                if let Some(chain) = self.chain_mut(target) {
                    chain.move_to(key, index);
                }
            }
            Command::SetEffectParam { target, key, param, value } => {
                if let Some(node) = self.chain_mut(target).and_then(|c| c.get_mut(key)) {
                    node.processor.set_param(param, value);
                }
            }
            Command::SetEffectEnabled { target, key, enabled } => {
                if let Some(node) = self.chain_mut(target).and_then(|c| c.get_mut(key)) {
                    if node.enabled != enabled {
                        // Re-entering the signal path starts from clean state.
                        node.processor.reset();
                        node.enabled = enabled;
                    }
                }
            }
            Command::Schedule(note) => {
                let track = note.track;
                let outcome = self.scheduler.enqueue(note, &self.clock);
                self.report_enqueued(track, outcome);
            }
            Command::ScheduleNow(note) => {
                let track = note.track;
                let outcome = self.scheduler.enqueue_now(note, &self.clock);
                self.report_enqueued(track, outcome);
            }
            Command::Audition(a) => {
                let note = ScheduledNote {
                    track: a.track,
                    frequency: a.frequency,
                    velocity: a.velocity,
                    start: MusicalTime::from_beats_f64(self.clock.position_beats()),
                    duration_beats: 0.0,
                };
                let trigger_at = NoteTrigger {
                    frequency: a.frequency,
                    velocity: a.velocity,
                    offset: 0,
                    gate: a.gate_samples,
                };
                trigger(&mut self.tracks, &mut self.outbox, &note, trigger_at);
            }
            Command::Transport(action) => {
                self.clock.apply(action);
                if action == TransportAction::Stop {
                    self.scheduler.flush();
                }
            }
            Command::SetBpm(bpm) => self.clock.set_bpm(bpm),
        }
    }

    fn chain_mut(&mut self, target: ChainTarget) -> Option<&mut EffectChain> {
        match target {
            ChainTarget::Track(key) => self.tracks.get_mut(key).map(|c| &mut c.chain),
            ChainTarget::Master => Some(&mut self.master.chain),
        }
    }

    fn report_enqueued(&mut self, track: TrackKey, outcome: Enqueued) {
        match outcome {
            Enqueued::OnTime => {}
            Enqueued::Clamped { late_beats } => {
                self.outbox.report(Report::LateEventClamped { track, late_beats })
            }
            Enqueued::Dropped { late_beats } => {
                self.outbox.report(Report::LateEventDropped { track, late_beats })
            }
            Enqueued::Full => self.outbox.report(Report::EventQueueFull { track }),
        }
    }

    /// Take the graph apart, handing every remaining piece to `retired`.
    /// Used on the control side after the render context has stopped.
    pub fn teardown(&mut self, mut retired: impl FnMut(Retired)) {
        self.scheduler.flush();
        for r in self.outbox.spill.drain(..) {
            retired(r);
        }
        for (_, channel) in self.tracks.drain() {
            retired(Retired::Track(channel));
        }
        let keys: Vec<_> = self.master.chain.keys().collect();
        for key in keys {
            if let Some(node) = self.master.chain.remove(key) {
                retired(Retired::Effect(node.processor));
            }
        }
        while let Some(command) = self.commands.try_pop() {
            drop(command);
        }
        self.clock.apply(TransportAction::Stop);
        self.shared.publish(&self.clock, 0);
    }
}

/// Start a note on its track's instrument, reporting unbound tracks and
/// stolen voices. Notes for tracks that no longer exist vanish.
fn trigger(
    tracks: &mut SecondaryMap<TrackKey, Box<TrackChannel>>,
    outbox: &mut Outbox,
    note: &ScheduledNote,
    at: NoteTrigger,
) {
    let Some(channel) = tracks.get_mut(note.track) else { return };
    match channel.instrument.as_mut() {
        Some(inst) => {
            if inst.note_on(at) {
                outbox.report(Report::VoiceStolen { track: note.track });
            }
        }
        None => outbox.report(Report::UnboundTrackEvent {
            track: note.track,
            start_beats: note.start.as_beats_f64(),
        }),
    }
}
