//! CPAL-based audio output backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tw_engine::Frame;

use crate::traits::{AudioError, AudioOutput, OutputDevice};

/// The host's default output device.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpalDevice;

impl OutputDevice for CpalDevice {
    fn name(&self) -> String {
        cpal::default_host()
            .default_output_device()
            .and_then(|d| d.name().ok())
            .unwrap_or_else(|| "default".to_string())
    }

    fn open(&self, buffer_ms: u32) -> Result<Box<dyn AudioOutput>, AudioError> {
        let mut output = CpalOutput::new(buffer_ms)?;
        output.build_stream()?;
        Ok(Box::new(output))
    }
}

/// CPAL-based audio output.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    producer: HeapProd<Frame>,
    consumer: Option<HeapCons<Frame>>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Open the default device with a queue of roughly `buffer_ms`.
    pub fn new(buffer_ms: u32) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        // The stream callback assumes 2-channel interleaving.
        config.channels = 2;

        let frames = (config.sample_rate.0 as usize * buffer_ms.max(1) as usize / 1000).max(64);
        let (producer, consumer) = HeapRb::<Frame>::new(frames).split();
        tracing::debug!(sample_rate = config.sample_rate.0, frames, "opened cpal output");

        Ok(Self {
            device,
            config,
            stream: None,
            producer,
            consumer: Some(consumer),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Build the device stream. It outputs silence until [`start`](AudioOutput::start).
    pub fn build_stream(&mut self) -> Result<(), AudioError> {
        let Some(mut consumer) = self.consumer.take() else {
            return Ok(());
        };
        let running = self.running.clone();
        let channels = self.config.channels as usize;

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !running.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }
                    for chunk in data.chunks_mut(channels) {
                        let frame = consumer.try_pop().unwrap_or_default();
                        for (i, sample) in chunk.iter_mut().enumerate() {
                            *sample = match i {
                                0 => frame.left,
                                1 => frame.right,
                                _ => 0.0,
                            };
                        }
                    }
                },
                |err| tracing::error!(%err, "audio stream error"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn write(&mut self, frames: &[Frame]) -> Result<(), AudioError> {
        let mut rest = frames;
        while !rest.is_empty() {
            let pushed = self.producer.push_slice(rest);
            rest = &rest[pushed..];
            if !rest.is_empty() {
                if self.stream.is_none() || !self.running.load(Ordering::Relaxed) {
                    return Err(AudioError::Playback("stream is not running".into()));
                }
                std::thread::yield_now();
            }
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}

