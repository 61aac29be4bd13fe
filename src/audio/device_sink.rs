//! Default output device via cpal.
//!
//! The cpal stream is built and owned by a dedicated thread so the sink handle
//! itself can move between threads. Stopping signals that thread and joins it;
//! dropping the stream there releases the device.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, error, info};

use super::http_source::StreamFormat;
use super::resample::{start_resampler, ChannelMapper};
use crate::playback::{AudioSink, PlaybackError};

const DEVICE_START_TIMEOUT: Duration = Duration::from_secs(5);

/// Decoded audio waiting to be attached to an output.
pub struct SinkFeed {
    pub chunks: Receiver<Vec<f32>>,
    pub format: StreamFormat,
}

/// Shared linear gain, stored as `f32` bits.
#[derive(Clone)]
struct Gain(Arc<AtomicU32>);

impl Gain {
    fn new(volume: f32) -> Self {
        Self(Arc::new(AtomicU32::new(volume.to_bits())))
    }

    fn set(&self, volume: f32) {
        self.0.store(volume.to_bits(), Ordering::Relaxed);
    }

    fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

pub struct DeviceSink {
    gain: Gain,
    feed: Option<SinkFeed>,
    shutdown: Option<Sender<()>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl DeviceSink {
    pub fn new(volume: f32) -> Result<Self, PlaybackError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            PlaybackError::TransientIoFailure("no audio output device available".to_string())
        })?;
        debug!(
            "Radio output device: {}",
            device.name().unwrap_or_else(|_| "unknown".to_string())
        );

        Ok(Self {
            gain: Gain::new(volume.clamp(0.0, 1.0)),
            feed: None,
            shutdown: None,
            worker: None,
        })
    }

    pub fn attach(&mut self, feed: SinkFeed) {
        self.feed = Some(feed);
    }
}

impl AudioSink for DeviceSink {
    fn set_volume(&mut self, volume: f32) {
        self.gain.set(volume.clamp(0.0, 1.0));
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        if self.worker.is_some() {
            return Ok(());
        }
        let feed = self.feed.take().ok_or_else(|| {
            PlaybackError::TransientIoFailure("output has no stream attached".to_string())
        })?;

        let (ready_tx, ready_rx) = bounded::<Result<(), String>>(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let gain = self.gain.clone();

        let worker = thread::Builder::new()
            .name("mountradio-output".to_string())
            .spawn(move || {
                let stream = match build_stream(feed, gain) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("{e:#}")));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                // Blocks until stop() signals or drops the sender.
                let _ = shutdown_rx.recv();
                drop(stream);
                debug!("Output stream released");
            })
            .map_err(|e| PlaybackError::TransientIoFailure(format!("output thread: {e}")))?;

        let started = ready_rx
            .recv_timeout(DEVICE_START_TIMEOUT)
            .map_err(|_| "audio device did not start in time".to_string())
            .and_then(|r| r);

        self.shutdown = Some(shutdown_tx);
        self.worker = Some(worker);

        match started {
            Ok(()) => {
                info!("Radio output started");
                Ok(())
            }
            Err(message) => {
                let _ = self.stop();
                Err(PlaybackError::TransientIoFailure(format!(
                    "audio device: {message}"
                )))
            }
        }
    }

    fn stop(&mut self) -> Result<(), PlaybackError> {
        self.feed = None;
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(worker) = self.worker.take() {
            worker.join().map_err(|_| {
                PlaybackError::ResourceReleaseFailure("output thread panicked".to_string())
            })?;
        }
        Ok(())
    }
}

impl Drop for DeviceSink {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
    }
}

fn build_stream(feed: SinkFeed, gain: Gain) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("No output device available")?;
    let supported = device
        .default_output_config()
        .context("Failed to query output config")?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_typed::<f32>(&device, &config, feed, gain)?,
        cpal::SampleFormat::I16 => build_typed::<i16>(&device, &config, feed, gain)?,
        cpal::SampleFormat::I32 => build_typed::<i32>(&device, &config, feed, gain)?,
        cpal::SampleFormat::U16 => build_typed::<u16>(&device, &config, feed, gain)?,
        other => return Err(anyhow!("Unsupported sample format: {other:?}")),
    };

    stream.play().context("Failed to start output stream")?;
    Ok(stream)
}

fn build_typed<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    feed: SinkFeed,
    gain: Gain,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels_out = config.channels as usize;
    let chunks = start_resampler(
        feed.chunks,
        feed.format.channels,
        feed.format.sample_rate,
        config.sample_rate.0,
    )?;
    let mut mapper = ChannelMapper::new(feed.format.channels, channels_out);
    let mut frame = vec![0.0f32; channels_out];

    let err_fn = |err| error!("Radio output stream error: {}", err);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let volume = gain.get();
            for out in data.chunks_mut(channels_out) {
                while !mapper.ready() {
                    match chunks.try_recv() {
                        Ok(chunk) => mapper.push(&chunk),
                        Err(_) => break,
                    }
                }
                if !mapper.next_frame(&mut frame, volume) {
                    frame.iter_mut().for_each(|s| *s = 0.0);
                }
                for (dst, &src) in out.iter_mut().zip(frame.iter()) {
                    *dst = <T as cpal::Sample>::from_sample::<f32>(src);
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_round_trips_bits() {
        let gain = Gain::new(0.5);
        assert_eq!(gain.get(), 0.5);
        gain.set(0.125);
        assert_eq!(gain.get(), 0.125);
    }

    #[test]
    fn test_gain_is_shared_between_clones() {
        let gain = Gain::new(1.0);
        let callback_side = gain.clone();
        gain.set(0.25);
        assert_eq!(callback_side.get(), 0.25);
    }
}
