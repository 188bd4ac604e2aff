//! The engine facade.
//!
//! A [`Controller`] owns the control-side registries and the render
//! context's lifecycle. Every mutation is validated here, applied to the
//! registry, then published to the renderer as a [`Command`]; the renderer
//! picks it up at its next block boundary. Nothing in this module ever
//! waits on the render context except [`Controller::dispose`], which joins
//! it.

use std::collections::VecDeque;
use std::sync::Arc;

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tw_audio::{CpalDevice, OutputDevice};
use tw_engine::{
    effects, Audition, ChainTarget, Command, Frame, RenderBackend, RenderSettings, Renderer,
    Report, ScheduledNote, SharedState, SoftwareBackend, TrackChannel, MAX_BPM, MIN_BPM,
};
use tw_ir::{
    AdsrParams, ChannelControls, EffectId, EffectKind, InstrumentId, InstrumentKind,
    InstrumentSpec, MusicalTime, NoteEvent, Pitch, RunState, TransportAction, DEFAULT_VELOCITY,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::playback::Playback;
use crate::registry::{EffectSnapshot, InstrumentEntry, Registry, TrackInfo};
use crate::report::{self, EngineReport};
use crate::wav::frames_to_wav;

/// Where rendered blocks go.
enum Host {
    Realtime(Playback),
    /// Rendered on demand by [`Controller::render`]. `carry` holds the
    /// unread tail of the last block.
    Offline { renderer: Box<Renderer>, carry: Vec<Frame>, used: usize },
}

/// Everything that exists only between `initialize` and `dispose`.
struct Session {
    commands: HeapProd<Command>,
    reports: HeapCons<Report>,
    shared: Arc<SharedState>,
    sample_rate: u32,
    host: Host,
}

/// The audio engine as the rest of the application sees it.
///
/// Construct one, call [`initialize`](Self::initialize), then mutate the
/// mixer graph and drive the transport. Dropping the controller disposes it.
pub struct Controller {
    config: EngineConfig,
    /// `None` for an offline engine.
    device: Option<Arc<dyn OutputDevice>>,
    backend: Arc<dyn RenderBackend>,
    session: Option<Session>,
    registry: Registry,
    reports: VecDeque<EngineReport>,
    bpm: f64,
    run_state: RunState,
}

impl Controller {
    /// Realtime engine on the host's default output device.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_device(config, CpalDevice)
    }

    /// Realtime engine on `device`.
    pub fn with_device(config: EngineConfig, device: impl OutputDevice + 'static) -> Result<Self> {
        Self::build(config, Some(Arc::new(device)))
    }

    /// Engine without a device, rendered on demand with [`render`](Self::render).
    pub fn offline(config: EngineConfig) -> Result<Self> {
        Self::build(config, None)
    }

    fn build(config: EngineConfig, device: Option<Arc<dyn OutputDevice>>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            bpm: config.initial_bpm.clamp(MIN_BPM, MAX_BPM),
            config,
            device,
            backend: Arc::new(SoftwareBackend),
            session: None,
            registry: Registry::default(),
            reports: VecDeque::new(),
            run_state: RunState::Stopped,
        })
    }

    /// Use `backend` for instruments and effects created from now on.
    pub fn with_backend(mut self, backend: impl RenderBackend + 'static) -> Self {
        self.backend = Arc::new(backend);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Lifecycle ---

    /// Acquire the output device and start the render context. A second
    /// call while initialized does nothing.
    pub fn initialize(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }

        let capacity = self.config.command_capacity;
        let (commands, command_rx) = HeapRb::<Command>::new(capacity).split();
        let (report_tx, reports) = HeapRb::<Report>::new(capacity).split();
        let shared = Arc::new(SharedState::new(self.bpm));
        let block_size = self.config.block_size as usize;

        let (host, sample_rate) = match &self.device {
            Some(device) => {
                let config = self.config.clone();
                let render_shared = shared.clone();
                let spawned = Playback::spawn(device.clone(), config.output_buffer_ms, move |sr| {
                    Renderer::new(render_settings(&config, sr), sr, command_rx, report_tx, render_shared)
                });
                let (playback, sample_rate) = spawned.map_err(|e| {
                    tracing::error!(error = %e, "engine failed to initialize");
                    EngineError::EngineInit(e)
                })?;
                tracing::info!(device = %device.name(), sample_rate, "output device acquired");
                (Host::Realtime(playback), sample_rate)
            }
            None => {
                let sr = self.config.sample_rate;
                let renderer =
                    Renderer::new(render_settings(&self.config, sr), sr, command_rx, report_tx, shared.clone());
                let host = Host::Offline {
                    renderer: Box::new(renderer),
                    carry: vec![Frame::silence(); block_size],
                    used: block_size,
                };
                (host, sr)
            }
        };

        self.session = Some(Session { commands, reports, shared, sample_rate, host });
        self.run_state = RunState::Stopped;
        tracing::info!(sample_rate, block_size, "engine initialized");
        Ok(())
    }

    /// Stop the render context, then free every instrument and effect and
    /// clear the registries. Safe to call any number of times.
    pub fn dispose(&mut self) {
        let Some(mut session) = self.session.take() else { return };

        let renderer = match session.host {
            Host::Realtime(mut playback) => playback.join().and_then(|exit| {
                if let Some(e) = exit.error {
                    tracing::warn!(error = %e, "output device failed while rendering");
                }
                exit.renderer
            }),
            Host::Offline { renderer, .. } => Some(*renderer),
        };
        // The render context has stopped; everything is freed on this thread.
        if let Some(mut renderer) = renderer {
            renderer.teardown(drop);
        }
        while session.reports.try_pop().is_some() {}

        self.registry.clear();
        self.reports.clear();
        self.run_state = RunState::Stopped;
        self.bpm = self.config.initial_bpm.clamp(MIN_BPM, MAX_BPM);
        tracing::info!("engine disposed");
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Sample rate of the running session.
    pub fn sample_rate(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.sample_rate)
    }

    /// False once a realtime render thread has exited on its own (for
    /// instance when the device went away).
    pub fn is_rendering(&self) -> bool {
        match self.session.as_ref().map(|s| &s.host) {
            Some(Host::Realtime(playback)) => playback.is_running(),
            Some(Host::Offline { .. }) => true,
            None => false,
        }
    }

    // --- Tracks ---

    pub fn create_track(&mut self, id: &str, name: &str) -> Result<()> {
        self.ready()?;
        self.registry.check_new_track(id)?;
        if self.registry.track_count() >= self.config.max_tracks {
            return Err(EngineError::CapacityExceeded { what: "track", limit: self.config.max_tracks });
        }
        self.reserve()?;
        let key = self.registry.insert_track(id.into(), name.to_string());
        let channel = Box::new(TrackChannel::new(self.config.block_size));
        tracing::debug!(track = id, name, "track created");
        self.publish(Command::AddTrack { key, channel })
    }

    /// Delete a track with its instrument and every effect in its chain.
    /// The id cannot be used again in this session.
    pub fn delete_track(&mut self, id: &str) -> Result<()> {
        self.ready()?;
        let key = self.registry.track_key(id)?;
        self.reserve()?;
        self.registry.remove_track(key);
        tracing::debug!(track = id, "track deleted");
        self.publish(Command::RemoveTrack(key))
    }

    pub fn rename_track(&mut self, id: &str, name: &str) -> Result<()> {
        self.ready()?;
        let key = self.registry.track_key(id)?;
        self.registry.track_mut(key).name = name.to_string();
        Ok(())
    }

    pub fn set_volume(&mut self, id: &str, volume: f32) -> Result<()> {
        self.ready()?;
        check_range("volume", volume, 0.0, 1.0)?;
        self.update_controls(id, |c| c.volume = volume)
    }

    pub fn set_pan(&mut self, id: &str, pan: f32) -> Result<()> {
        self.ready()?;
        check_range("pan", pan, -1.0, 1.0)?;
        self.update_controls(id, |c| c.pan = pan)
    }

    pub fn set_mute(&mut self, id: &str, muted: bool) -> Result<()> {
        self.ready()?;
        self.update_controls(id, |c| c.muted = muted)
    }

    pub fn set_solo(&mut self, id: &str, solo: bool) -> Result<()> {
        self.ready()?;
        self.update_controls(id, |c| c.solo = solo)
    }

    fn update_controls(&mut self, id: &str, edit: impl FnOnce(&mut ChannelControls)) -> Result<()> {
        let key = self.registry.track_key(id)?;
        self.reserve()?;
        let controls = &mut self.registry.track_mut(key).controls;
        edit(controls);
        let controls = *controls;
        tracing::debug!(track = id, ?controls, "channel controls updated");
        self.publish(Command::SetControls { track: key, controls })
    }

    pub fn track(&self, id: &str) -> Result<TrackInfo> {
        let key = self.registry.track_key(id)?;
        Ok(self.registry.track_info(key))
    }

    pub fn tracks(&self) -> Vec<TrackInfo> {
        self.registry.track_infos()
    }

    pub fn track_count(&self) -> usize {
        self.registry.track_count()
    }

    /// True if any track is soloed, in which case only soloed tracks are
    /// heard.
    pub fn any_solo(&self) -> bool {
        self.registry.any_solo()
    }

    // --- Master bus ---

    pub fn set_master_volume(&mut self, volume: f32) -> Result<()> {
        self.ready()?;
        check_range("master volume", volume, 0.0, 1.0)?;
        self.update_master(|c| c.volume = volume)
    }

    pub fn set_master_pan(&mut self, pan: f32) -> Result<()> {
        self.ready()?;
        check_range("master pan", pan, -1.0, 1.0)?;
        self.update_master(|c| c.pan = pan)
    }

    fn update_master(&mut self, edit: impl FnOnce(&mut ChannelControls)) -> Result<()> {
        self.reserve()?;
        edit(&mut self.registry.master_controls);
        self.publish(Command::SetMasterControls(self.registry.master_controls))
    }

    pub fn master_controls(&self) -> ChannelControls {
        self.registry.master_controls
    }

    pub fn master_effects(&self) -> Vec<EffectId> {
        self.registry.master_effects()
    }

    // --- Instruments ---

    /// Bind a new instrument of `kind` to a track, replacing (and silencing)
    /// any instrument already there.
    ///
    /// `kind` is an [`InstrumentKind`] or a name such as `"fm"`.
    pub fn create_instrument<K>(&mut self, track: &str, kind: K) -> Result<InstrumentId>
    where
        K: TryInto<InstrumentKind>,
        EngineError: From<K::Error>,
    {
        self.ready()?;
        let kind = kind.try_into()?;
        let key = self.registry.track_key(track)?;
        let sample_rate = self.session_ref()?.sample_rate;
        self.reserve()?;

        let spec = InstrumentSpec::new(kind);
        let instrument = self.backend.create_instrument(&spec, self.config.polyphony, sample_rate);
        let id = self.registry.next_instrument_id();
        self.registry.set_instrument(key, Some(InstrumentEntry { id, spec }));
        tracing::debug!(track, %kind, instrument = %id, "instrument created");
        self.publish(Command::SetInstrument { track: key, instrument: Some(instrument) })?;
        Ok(id)
    }

    pub fn remove_instrument(&mut self, track: &str) -> Result<()> {
        self.ready()?;
        let key = self.registry.track_key(track)?;
        self.reserve()?;
        self.registry.set_instrument(key, None);
        tracing::debug!(track, "instrument removed");
        self.publish(Command::SetInstrument { track: key, instrument: None })
    }

    /// Replace the envelope for notes started from now on.
    pub fn set_envelope(&mut self, track: &str, envelope: AdsrParams) -> Result<()> {
        self.ready()?;
        if let Some((name, value)) = envelope.invalid_field() {
            return Err(EngineError::InvalidParameter { name, value: value as f64 });
        }
        let key = self.registry.track_key(track)?;
        if self.registry.track(key).instrument.is_none() {
            return Err(EngineError::UnboundTrackEvent(track.into()));
        }
        self.reserve()?;
        self.registry.set_envelope(key, envelope);
        self.publish(Command::SetEnvelope { track: key, envelope })
    }

    // --- Effects ---

    /// Append an effect of `kind` to a track's chain.
    pub fn create_effect<K>(&mut self, effect_id: &str, kind: K, track: &str) -> Result<EffectId>
    where
        K: TryInto<EffectKind>,
        EngineError: From<K::Error>,
    {
        self.ready()?;
        let kind = kind.try_into()?;
        let key = self.registry.track_key(track)?;
        self.add_effect(effect_id, kind, ChainTarget::Track(key))
    }

    /// Append an effect of `kind` to the master chain.
    pub fn create_master_effect<K>(&mut self, effect_id: &str, kind: K) -> Result<EffectId>
    where
        K: TryInto<EffectKind>,
        EngineError: From<K::Error>,
    {
        self.ready()?;
        let kind = kind.try_into()?;
        self.add_effect(effect_id, kind, ChainTarget::Master)
    }

    fn add_effect(&mut self, id: &str, kind: EffectKind, target: ChainTarget) -> Result<EffectId> {
        self.registry.check_new_effect(id)?;
        self.registry.check_chain_room(target)?;
        let sample_rate = self.session_ref()?.sample_rate;
        self.reserve()?;

        let effect = self.backend.create_effect(kind, sample_rate);
        let (key, index) = self.registry.push_effect(id.into(), kind, target);
        tracing::debug!(effect = id, %kind, ?target, index, "effect created");
        self.publish(Command::InsertEffect { target, key, effect, index })?;
        Ok(id.into())
    }

    /// Set a parameter by name. Values are clamped to the parameter's range;
    /// the value actually applied is returned. Takes effect at the next
    /// block boundary.
    pub fn set_effect_param(&mut self, effect_id: &str, name: &str, value: f32) -> Result<f32> {
        self.ready()?;
        let key = self.registry.effect_key(effect_id)?;
        let (kind, target) = {
            let e = self.registry.effect(key);
            (e.kind, e.target)
        };
        let param = effects::info_for(kind)
            .param(name)
            .ok_or_else(|| EngineError::UnknownParameter { kind, name: name.to_string() })?;
        if !value.is_finite() {
            return Err(EngineError::InvalidParameter { name: param.name, value: value as f64 });
        }
        let value = param.sanitize(value);
        self.reserve()?;
        self.registry.effect_mut(key).params[param.id as usize] = value;
        self.publish(Command::SetEffectParam { target, key, param: param.id, value })?;
        Ok(value)
    }

    pub fn effect_params(&self, effect_id: &str) -> Result<Vec<(&'static str, f32)>> {
        Ok(self.effect(effect_id)?.params)
    }

    pub fn effect(&self, effect_id: &str) -> Result<EffectSnapshot> {
        let key = self.registry.effect_key(effect_id)?;
        Ok(self.registry.effect_snapshot(key))
    }

    /// Enable or bypass an effect. A bypassed effect passes its input
    /// through untouched.
    pub fn set_effect_enabled(&mut self, effect_id: &str, enabled: bool) -> Result<()> {
        self.ready()?;
        let key = self.registry.effect_key(effect_id)?;
        self.reserve()?;
        let entry = self.registry.effect_mut(key);
        entry.enabled = enabled;
        let target = entry.target;
        self.publish(Command::SetEffectEnabled { target, key, enabled })
    }

    /// Move an effect to `index` within its chain.
    pub fn move_effect(&mut self, effect_id: &str, index: usize) -> Result<()> {
        self.ready()?;
        let key = self.registry.effect_key(effect_id)?;
        let target = self.registry.effect(key).target;
        let len = self.registry.chain(target).len();
        if index >= len {
            return Err(EngineError::EffectOutOfRange { index, len });
        }
        self.reserve()?;
        self.registry.move_effect(key, index)?;
        tracing::debug!(effect = effect_id, index, "effect moved");
        self.publish(Command::MoveEffect { target, key, index })
    }

    pub fn delete_effect(&mut self, effect_id: &str) -> Result<()> {
        self.ready()?;
        let key = self.registry.effect_key(effect_id)?;
        self.reserve()?;
        let target = self.registry.effect(key).target;
        self.registry.remove_effect(key);
        tracing::debug!(effect = effect_id, "effect deleted");
        self.publish(Command::RemoveEffect { target, key })
    }

    // --- Notes ---

    /// Play a note at the current transport position, lasting
    /// `duration_beats`. If the transport is not running the note waits for
    /// it.
    pub fn play_note<P>(&mut self, track: &str, pitch: P, duration_beats: f64) -> Result<()>
    where
        P: TryInto<Pitch>,
        EngineError: From<P::Error>,
    {
        self.ready()?;
        let pitch = pitch.try_into()?;
        check_duration(duration_beats)?;
        let key = self.registry.track_key(track)?;
        self.reserve()?;
        self.publish(Command::ScheduleNow(ScheduledNote {
            track: key,
            frequency: pitch.frequency(),
            velocity: DEFAULT_VELOCITY,
            start: MusicalTime::zero(),
            duration_beats,
        }))
    }

    /// Queue a note at its own start time. Notes already behind the
    /// transport are played immediately if only slightly late, otherwise
    /// dropped; either way an [`EngineReport`] says so.
    pub fn schedule_note(&mut self, event: &NoteEvent) -> Result<()> {
        self.ready()?;
        check_duration(event.duration_beats)?;
        check_range("velocity", event.velocity, 0.0, 1.0)?;
        let key = self.registry.track_key(event.track.as_str())?;
        self.reserve()?;
        self.publish(Command::Schedule(ScheduledNote {
            track: key,
            frequency: event.pitch.frequency(),
            velocity: event.velocity,
            start: event.start,
            duration_beats: event.duration_beats,
        }))
    }

    /// Sound a note right away for `seconds`, whatever the transport is
    /// doing.
    pub fn audition_note<P>(&mut self, track: &str, pitch: P, seconds: f64) -> Result<()>
    where
        P: TryInto<Pitch>,
        EngineError: From<P::Error>,
    {
        self.ready()?;
        let pitch = pitch.try_into()?;
        check_duration(seconds)?;
        let key = self.registry.track_key(track)?;
        if self.registry.track(key).instrument.is_none() {
            return Err(EngineError::UnboundTrackEvent(track.into()));
        }
        let sample_rate = self.session_ref()?.sample_rate;
        self.reserve()?;
        let gate_samples = (seconds * sample_rate as f64).round().min(u32::MAX as f64) as u32;
        self.publish(Command::Audition(Audition {
            track: key,
            frequency: pitch.frequency(),
            velocity: DEFAULT_VELOCITY,
            gate_samples,
        }))
    }

    // --- Transport ---

    /// Change tempo immediately. Beats already elapsed are kept.
    pub fn set_bpm(&mut self, bpm: f64) -> Result<()> {
        self.ready()?;
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(EngineError::InvalidTempo(bpm));
        }
        self.reserve()?;
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        tracing::debug!(bpm = self.bpm, "tempo changed");
        self.publish(Command::SetBpm(bpm))
    }

    pub fn start(&mut self) -> Result<RunState> {
        self.transport(TransportAction::Start)
    }

    pub fn pause(&mut self) -> Result<RunState> {
        self.transport(TransportAction::Pause)
    }

    /// Stop and rewind to zero. Pending notes are discarded; notes already
    /// sounding ring out.
    pub fn stop(&mut self) -> Result<RunState> {
        self.transport(TransportAction::Stop)
    }

    fn transport(&mut self, action: TransportAction) -> Result<RunState> {
        self.ready()?;
        self.reserve()?;
        self.publish(Command::Transport(action))?;
        self.run_state = self.run_state.apply(action);
        tracing::debug!(?action, state = %self.run_state, "transport");
        Ok(self.run_state)
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn transport_state(&self) -> RunState {
        self.run_state
    }

    /// Transport position as of the last rendered block.
    pub fn position_beats(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.shared.position_beats())
    }

    /// Frames rendered since `initialize`.
    pub fn frames_rendered(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.shared.frames_rendered())
    }

    // --- Reports ---

    /// Take every report received since the last call.
    pub fn poll_reports(&mut self) -> Vec<EngineReport> {
        self.pump();
        self.reports.drain(..).collect()
    }

    // --- Offline rendering ---

    /// Render `frames` frames. Offline engines only.
    pub fn render(&mut self, frames: usize) -> Result<Vec<Frame>> {
        let session = self.session.as_mut().ok_or(EngineError::NotReady)?;
        let Host::Offline { renderer, carry, used } = &mut session.host else {
            return Err(EngineError::NotOffline);
        };
        let sample_rate = session.sample_rate as f64;
        if frames as f64 > MAX_OFFLINE_SECONDS * sample_rate {
            return Err(EngineError::InvalidDuration(frames as f64 / sample_rate));
        }

        let mut out = Vec::with_capacity(frames);
        while out.len() < frames {
            if *used == carry.len() {
                renderer.render_block(carry);
                *used = 0;
                report::drain(&mut session.reports, &self.registry, &mut self.reports, self.config.command_capacity);
            }
            let take = (frames - out.len()).min(carry.len() - *used);
            out.extend_from_slice(&carry[*used..*used + take]);
            *used += take;
        }
        Ok(out)
    }

    /// Render `seconds` of audio as a 16-bit stereo WAV file. Offline
    /// engines only.
    pub fn bounce_to_wav(&mut self, seconds: f64) -> Result<Vec<u8>> {
        check_duration(seconds)?;
        if seconds > MAX_OFFLINE_SECONDS {
            return Err(EngineError::InvalidDuration(seconds));
        }
        let sample_rate = self.session_ref()?.sample_rate;
        let frames = self.render((seconds * sample_rate as f64).round() as usize)?;
        Ok(frames_to_wav(&frames, sample_rate))
    }

    // --- Plumbing ---

    fn ready(&self) -> Result<()> {
        self.session_ref().map(|_| ())
    }

    fn session_ref(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(EngineError::NotReady)
    }

    /// Make room for one command so registry changes made before publishing
    /// never need rolling back.
    fn reserve(&mut self) -> Result<()> {
        self.pump();
        let session = self.session.as_mut().ok_or(EngineError::NotReady)?;
        if session.commands.is_full() {
            if let Host::Offline { renderer, .. } = &mut session.host {
                renderer.apply_pending();
            }
            report::drain(&mut session.reports, &self.registry, &mut self.reports, self.config.command_capacity);
        }
        if session.commands.is_full() {
            return Err(EngineError::CommandQueueFull);
        }
        Ok(())
    }

    fn publish(&mut self, command: Command) -> Result<()> {
        let session = self.session.as_mut().ok_or(EngineError::NotReady)?;
        session.commands.try_push(command).map_err(|_| EngineError::CommandQueueFull)
    }

    /// Pull reports off the ring, freeing retired graph pieces.
    fn pump(&mut self) {
        if let Some(session) = self.session.as_mut() {
            report::drain(&mut session.reports, &self.registry, &mut self.reports, self.config.command_capacity);
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn render_settings(config: &EngineConfig, sample_rate: u32) -> RenderSettings {
    RenderSettings {
        block_size: config.block_size,
        max_tracks: config.max_tracks,
        max_pending_events: config.max_pending_events,
        late_tolerance_samples: config.late_tolerance_samples(sample_rate),
        retire_capacity: config.command_capacity,
        initial_bpm: config.initial_bpm,
    }
}

fn check_range(name: &'static str, value: f32, min: f32, max: f32) -> Result<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(EngineError::InvalidParameter { name, value: value as f64 })
    }
}

/// Longest offline render, in seconds.
const MAX_OFFLINE_SECONDS: f64 = 3600.0;

fn check_duration(value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidDuration(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tw_audio::NullDevice;

    fn offline() -> Controller {
        let mut c = Controller::offline(EngineConfig { sample_rate: 48_000, ..Default::default() }).unwrap();
        c.initialize().unwrap();
        c
    }

    #[test]
    fn mutations_before_initialize_are_rejected() {
        let mut c = Controller::offline(EngineConfig::default()).unwrap();
        assert!(matches!(c.create_track("t1", "Lead"), Err(EngineError::NotReady)));
        assert!(matches!(c.set_bpm(90.0), Err(EngineError::NotReady)));
        assert!(matches!(c.start(), Err(EngineError::NotReady)));
        assert!(matches!(c.render(16), Err(EngineError::NotReady)));
        assert_eq!(c.track_count(), 0);
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = EngineConfig { block_size: 0, ..Default::default() };
        assert!(matches!(Controller::offline(config), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn kinds_accept_names_and_values() {
        let mut c = offline();
        c.create_track("t1", "").unwrap();
        let a = c.create_instrument("t1", "fmSynth").unwrap();
        let b = c.create_instrument("t1", InstrumentKind::Am).unwrap();
        assert_ne!(a, b);
        assert!(matches!(
            c.create_instrument("t1", "kazoo"),
            Err(EngineError::InvalidInstrumentKind(_))
        ));
        assert_eq!(c.track("t1").unwrap().instrument.map(|i| i.spec.kind), Some(InstrumentKind::Am));

        assert!(matches!(c.create_effect("fx", "flanger", "t1"), Err(EngineError::InvalidEffectKind(_))));
        assert!(c.create_effect("fx", EffectKind::Delay, "t1").is_ok());
    }

    #[test]
    fn unknown_ids_do_not_create_entries() {
        let mut c = offline();
        assert!(matches!(c.create_instrument("ghost", "basic"), Err(EngineError::UnknownTrackId(_))));
        assert!(matches!(c.play_note("ghost", "C4", 1.0), Err(EngineError::UnknownTrackId(_))));
        assert!(matches!(c.create_effect("fx", "delay", "ghost"), Err(EngineError::UnknownTrackId(_))));
        assert!(matches!(c.set_effect_enabled("fx", false), Err(EngineError::UnknownEffectId(_))));
        assert_eq!(c.track_count(), 0);
    }

    #[test]
    fn validation_errors() {
        let mut c = offline();
        c.create_track("t1", "").unwrap();
        assert!(matches!(c.set_bpm(0.0), Err(EngineError::InvalidTempo(_))));
        assert!(matches!(c.set_bpm(-10.0), Err(EngineError::InvalidTempo(_))));
        assert!(matches!(c.set_volume("t1", 1.5), Err(EngineError::InvalidParameter { .. })));
        assert!(matches!(c.set_pan("t1", f32::NAN), Err(EngineError::InvalidParameter { .. })));
        assert!(matches!(c.play_note("t1", "H4", 1.0), Err(EngineError::InvalidPitch(_))));
        assert!(matches!(c.play_note("t1", "C4", -1.0), Err(EngineError::InvalidDuration(_))));
        assert!(matches!(
            c.set_envelope("t1", AdsrParams::default()),
            Err(EngineError::UnboundTrackEvent(_))
        ));
        assert_eq!(c.bpm(), 120.0);
    }

    #[test]
    fn oversized_offline_renders_are_refused() {
        let mut c = offline();
        assert!(matches!(c.bounce_to_wav(1e12), Err(EngineError::InvalidDuration(_))));
        assert!(matches!(c.bounce_to_wav(f64::MAX), Err(EngineError::InvalidDuration(_))));
        assert!(matches!(c.render(usize::MAX), Err(EngineError::InvalidDuration(_))));
        assert_eq!(c.render(16).unwrap().len(), 16);
    }

    #[test]
    fn effect_params_are_clamped_and_named() {
        let mut c = offline();
        c.create_track("t1", "").unwrap();
        c.create_effect("lp", "filter", "t1").unwrap();
        assert_eq!(c.set_effect_param("lp", "frequency", 50_000.0).unwrap(), 20_000.0);
        assert!(matches!(
            c.set_effect_param("lp", "feedback", 0.5),
            Err(EngineError::UnknownParameter { .. })
        ));
        assert!(c.effect_params("lp").unwrap().contains(&("frequency", 20_000.0)));
    }

    #[test]
    fn chain_capacity_is_enforced() {
        let mut c = offline();
        c.create_track("t1", "").unwrap();
        for i in 0..tw_engine::MAX_CHAIN_LEN {
            c.create_effect(&format!("fx{i}"), "distortion", "t1").unwrap();
        }
        assert!(matches!(
            c.create_effect("one-too-many", "distortion", "t1"),
            Err(EngineError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn track_ids_are_never_reused() {
        let mut c = offline();
        c.create_track("t1", "").unwrap();
        c.delete_track("t1").unwrap();
        assert!(matches!(c.create_track("t1", ""), Err(EngineError::DuplicateTrackId(_))));
    }

    #[test]
    fn render_requires_offline_engine() {
        let mut c = Controller::with_device(EngineConfig::default(), NullDevice::new(48_000)).unwrap();
        c.initialize().unwrap();
        assert!(matches!(c.render(16), Err(EngineError::NotOffline)));
        c.dispose();
    }

    #[test]
    fn render_handles_partial_blocks() {
        let mut c = offline();
        c.start().unwrap();
        let mut total = 0;
        for n in [100, 300, 57, 1] {
            total += c.render(n).unwrap().len();
        }
        assert_eq!(total, 458);
        // Whole blocks are rendered ahead; 458 frames need two 256-frame blocks.
        assert_eq!(c.frames_rendered(), 512);
        assert_relative_eq!(c.position_beats(), 512.0 * 2.0 / 48_000.0, epsilon = 1e-9);
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut c = offline();
        c.create_track("t1", "").unwrap();
        c.dispose();
        c.dispose();
        assert!(!c.is_initialized());
        assert_eq!(c.track_count(), 0);
        assert!(matches!(c.set_mute("t1", true), Err(EngineError::NotReady)));

        // A fresh session starts clean, with old ids free again.
        c.initialize().unwrap();
        assert!(c.create_track("t1", "").is_ok());
    }
}
