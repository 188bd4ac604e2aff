//! Lifecycle of a realtime engine on a headless output device.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tw_master::{
    AudioError, AudioOutput, Controller, EngineConfig, EngineError, NullDevice, OutputDevice, RunState,
};

/// Refuses to open for the first `failures` attempts, then behaves like a
/// null device.
#[derive(Clone)]
struct FlakyDevice {
    inner: NullDevice,
    failures: usize,
    attempts: Arc<AtomicUsize>,
}

impl FlakyDevice {
    fn new(failures: usize) -> Self {
        Self { inner: NullDevice::new(48_000), failures, attempts: Arc::new(AtomicUsize::new(0)) }
    }
}

impl OutputDevice for FlakyDevice {
    fn name(&self) -> String {
        "flaky".to_string()
    }

    fn open(&self, buffer_ms: u32) -> Result<Box<dyn AudioOutput>, AudioError> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(AudioError::DeviceInit("permission denied".into()));
        }
        self.inner.open(buffer_ms)
    }
}

fn engine(device: &NullDevice) -> Controller {
    Controller::with_device(EngineConfig::default(), device.clone()).unwrap()
}

/// Poll until `cond` holds or a generous deadline passes.
fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn initialize_twice_acquires_the_device_once() {
    let device = NullDevice::new(48_000);
    let mut ctrl = engine(&device);
    ctrl.initialize().unwrap();
    ctrl.initialize().unwrap();
    assert_eq!(device.open_count(), 1);
    assert!(ctrl.is_initialized());
    assert_eq!(ctrl.sample_rate(), Some(48_000));
    ctrl.dispose();
}

#[test]
fn dispose_is_idempotent_and_blocks_mutations() {
    let device = NullDevice::new(48_000);
    let mut ctrl = engine(&device);
    ctrl.initialize().unwrap();
    ctrl.create_track("t1", "Lead").unwrap();
    ctrl.create_instrument("t1", "basic").unwrap();
    ctrl.create_effect("fx1", "delay", "t1").unwrap();

    ctrl.dispose();
    ctrl.dispose();
    assert!(!ctrl.is_initialized());
    assert!(!ctrl.is_rendering());

    assert!(matches!(ctrl.create_track("t2", ""), Err(EngineError::NotReady)));
    assert!(matches!(ctrl.set_volume("t1", 0.5), Err(EngineError::NotReady)));
    assert!(matches!(ctrl.create_instrument("t1", "fm"), Err(EngineError::NotReady)));
    assert!(matches!(ctrl.set_effect_param("fx1", "wet", 0.5), Err(EngineError::NotReady)));
    assert!(matches!(ctrl.play_note("t1", "A4", 1.0), Err(EngineError::NotReady)));
    assert!(matches!(ctrl.set_bpm(100.0), Err(EngineError::NotReady)));
    assert!(matches!(ctrl.start(), Err(EngineError::NotReady)));
}

#[test]
fn reinitialize_after_dispose_reopens_the_device() {
    let device = NullDevice::new(48_000);
    let mut ctrl = engine(&device);
    ctrl.initialize().unwrap();
    ctrl.dispose();
    ctrl.initialize().unwrap();
    assert_eq!(device.open_count(), 2);
    assert_eq!(ctrl.track_count(), 0);
}

#[test]
fn transport_advances_on_the_render_thread() {
    let device = NullDevice::new(48_000);
    let mut ctrl = engine(&device);
    ctrl.initialize().unwrap();
    ctrl.create_track("t1", "Lead").unwrap();
    ctrl.create_instrument("t1", "fmSynth").unwrap();
    ctrl.play_note("t1", "A4", 1.0).unwrap();

    assert_eq!(ctrl.start().unwrap(), RunState::Running);
    assert!(wait_for(|| ctrl.position_beats() > 0.1));
    assert!(ctrl.frames_rendered() > 0);

    assert_eq!(ctrl.pause().unwrap(), RunState::Paused);
    assert_eq!(ctrl.stop().unwrap(), RunState::Stopped);
    assert!(wait_for(|| ctrl.position_beats() == 0.0));
    ctrl.dispose();
}

#[test]
fn dropping_an_initialized_engine_stops_rendering() {
    let device = NullDevice::new(48_000);
    let mut ctrl = engine(&device);
    ctrl.initialize().unwrap();
    ctrl.start().unwrap();
    drop(ctrl);
    assert_eq!(device.open_count(), 1);
}

#[test]
fn failed_device_leaves_engine_uninitialized() {
    let device = FlakyDevice::new(usize::MAX);
    let mut ctrl = Controller::with_device(EngineConfig::default(), device.clone()).unwrap();

    let err = ctrl.initialize().unwrap_err();
    assert!(matches!(err, EngineError::EngineInit(AudioError::DeviceInit(_))));
    assert!(!ctrl.is_initialized());
    assert!(!ctrl.is_rendering());
    assert!(matches!(ctrl.create_track("t1", ""), Err(EngineError::NotReady)));
    assert!(matches!(ctrl.start(), Err(EngineError::NotReady)));
    assert_eq!(device.inner.open_count(), 0);
    ctrl.dispose();
}

#[test]
fn initialize_can_be_retried_after_a_device_failure() {
    let device = FlakyDevice::new(1);
    let mut ctrl = Controller::with_device(EngineConfig::default(), device.clone()).unwrap();

    assert!(matches!(ctrl.initialize(), Err(EngineError::EngineInit(_))));
    assert!(!ctrl.is_initialized());

    ctrl.initialize().unwrap();
    assert!(ctrl.is_initialized());
    assert_eq!(device.inner.open_count(), 1);
    ctrl.create_track("t1", "Lead").unwrap();
    assert_eq!(ctrl.track_count(), 1);
    ctrl.dispose();
}
