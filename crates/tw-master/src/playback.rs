//! Realtime hosting: a dedicated render thread feeding an output device.
//!
//! The thread opens the device itself (some backends' streams cannot cross
//! threads), builds the renderer once the sample rate is known, then loops
//! render → write until told to stop. The renderer comes back through the
//! join handle so its graph is freed on the control side.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use tw_audio::{AudioError, OutputDevice};
use tw_engine::{Frame, Renderer};

/// What the render thread hands back when it ends.
pub(crate) struct Exit {
    pub renderer: Option<Renderer>,
    pub error: Option<AudioError>,
}

pub(crate) struct Playback {
    stop_signal: Arc<AtomicBool>,
    thread: Option<JoinHandle<Exit>>,
}

impl Playback {
    /// Open `device` on a new render thread and start rendering. Returns
    /// once the device is running, with its sample rate.
    pub fn spawn(
        device: Arc<dyn OutputDevice>,
        buffer_ms: u32,
        build: impl FnOnce(u32) -> Renderer + Send + 'static,
    ) -> Result<(Self, u32), AudioError> {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = stop_signal.clone();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let thread = std::thread::Builder::new()
            .name("tw-render".into())
            .spawn(move || render_thread(device, buffer_ms, build, stop, ready_tx))
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut playback = Self { stop_signal, thread: Some(thread) };
        match ready_rx.recv() {
            Ok(Ok(sample_rate)) => Ok((playback, sample_rate)),
            Ok(Err(e)) => {
                playback.join();
                Err(e)
            }
            Err(_) => {
                playback.join();
                Err(AudioError::DeviceInit("render thread exited during startup".into()))
            }
        }
    }

    /// Signal the thread and wait for it. Idempotent.
    pub fn join(&mut self) -> Option<Exit> {
        self.stop_signal.store(true, Ordering::Release);
        let handle = self.thread.take()?;
        match handle.join() {
            Ok(exit) => Some(exit),
            Err(_) => {
                tracing::error!("render thread panicked");
                None
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.join();
    }
}

fn render_thread(
    device: Arc<dyn OutputDevice>,
    buffer_ms: u32,
    build: impl FnOnce(u32) -> Renderer,
    stop: Arc<AtomicBool>,
    ready: mpsc::SyncSender<Result<u32, AudioError>>,
) -> Exit {
    let mut output = match device.open(buffer_ms) {
        Ok(output) => output,
        Err(e) => {
            let _ = ready.send(Err(e));
            return Exit { renderer: None, error: None };
        }
    };
    let sample_rate = output.sample_rate();
    let mut renderer = build(sample_rate);
    if let Err(e) = output.start() {
        let _ = ready.send(Err(e));
        return Exit { renderer: Some(renderer), error: None };
    }
    let _ = ready.send(Ok(sample_rate));

    let mut block = vec![Frame::silence(); renderer.block_size()];
    let mut error = None;
    while !stop.load(Ordering::Acquire) {
        renderer.render_block(&mut block);
        if let Err(e) = output.write(&block) {
            error = Some(e);
            break;
        }
    }

    if let Err(e) = output.stop() {
        error.get_or_insert(e);
    }
    Exit { renderer: Some(renderer), error }
}
