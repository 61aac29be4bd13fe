//! Sample-rate conversion and channel mapping between the decoder and the
//! output device.
//!
//! Rate conversion runs on its own thread with a rubato sinc resampler, so the
//! device callback only has to map channels and apply gain.

use std::collections::VecDeque;
use std::thread;

use anyhow::Result;
use audioadapter_buffers::direct::InterleavedSlice;
use crossbeam_channel::{bounded, Receiver};
use rubato::{
    calculate_cutoff, Async, FixedAsync, Indexing, Resampler, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};
use tracing::{debug, error};

/// Input frames consumed per resampler pass.
const CHUNK_IN_FRAMES: usize = 1024;
/// Resampled chunks held ahead of the output device.
const RESAMPLED_QUEUE_DEPTH: usize = 16;

/// Convert interleaved chunks from `src_rate` to `dst_rate`. The returned
/// queue closes once `input` closes and the tail has been flushed, or stops
/// early when the returned receiver is dropped. Equal rates pass `input`
/// straight through.
pub fn start_resampler(
    input: Receiver<Vec<f32>>,
    channels: usize,
    src_rate: u32,
    dst_rate: u32,
) -> Result<Receiver<Vec<f32>>> {
    if src_rate == dst_rate || src_rate == 0 || dst_rate == 0 {
        return Ok(input);
    }

    let channels = channels.max(1);
    let f_ratio = dst_rate as f64 / src_rate as f64;

    let sinc_len = 128;
    let window = WindowFunction::BlackmanHarris2;
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: calculate_cutoff(sinc_len, window),
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window,
    };

    let mut resampler = Async::<f32>::new_sinc(
        f_ratio,
        1.1,
        &params,
        CHUNK_IN_FRAMES,
        channels,
        FixedAsync::Input,
    )?;

    let (tx, rx) = bounded(RESAMPLED_QUEUE_DEPTH);
    debug!("Resampling stream {} Hz -> {} Hz", src_rate, dst_rate);

    thread::Builder::new()
        .name("mountradio-resample".to_string())
        .spawn(move || {
            let mut out_interleaved = vec![0.0f32; channels * resampler.output_frames_max()];
            let mut pending: Vec<f32> = Vec::new();
            let chunk_samples = CHUNK_IN_FRAMES * channels;

            let mut indexing = Indexing {
                input_offset: 0,
                output_offset: 0,
                active_channels_mask: None,
                partial_len: None,
            };

            let mut run = |samples: &[f32], partial: Option<usize>, out: &mut Vec<f32>| {
                let frames = samples.len() / channels;
                let input_adapter = match InterleavedSlice::new(samples, channels, frames) {
                    Ok(a) => a,
                    Err(e) => {
                        error!("Resampler input error: {e:#}");
                        return None;
                    }
                };
                let out_capacity_frames = out.len() / channels;
                let mut output_adapter =
                    match InterleavedSlice::new_mut(out.as_mut_slice(), channels, out_capacity_frames)
                    {
                        Ok(a) => a,
                        Err(e) => {
                            error!("Resampler output error: {e:#}");
                            return None;
                        }
                    };

                indexing.partial_len = partial;
                match resampler.process_into_buffer(
                    &input_adapter,
                    &mut output_adapter,
                    Some(&indexing),
                ) {
                    Ok((_, nbr_out)) => Some(out[..nbr_out * channels].to_vec()),
                    Err(e) => {
                        error!("Resampler process error: {e:#}");
                        None
                    }
                }
            };

            'feed: for chunk in input.iter() {
                pending.extend_from_slice(&chunk);
                while pending.len() >= chunk_samples {
                    let Some(produced) = run(&pending[..chunk_samples], None, &mut out_interleaved)
                    else {
                        break 'feed;
                    };
                    pending.drain(..chunk_samples);
                    if !produced.is_empty() && tx.send(produced).is_err() {
                        debug!("Output detached, stopping resampler");
                        return;
                    }
                }
            }

            let tail_frames = pending.len() / channels;
            if tail_frames > 0 {
                // A partial pass still reads a full chunk; zero-pad past the tail.
                pending.resize(chunk_samples, 0.0);
                if let Some(produced) = run(&pending, Some(tail_frames), &mut out_interleaved) {
                    if !produced.is_empty() {
                        let _ = tx.send(produced);
                    }
                }
            }
            debug!("Resampler thread exiting");
        })?;

    Ok(rx)
}

/// Pulls frames out of interleaved chunks and maps them to the device's
/// channel count.
pub struct ChannelMapper {
    src_channels: usize,
    dst_channels: usize,
    buf: VecDeque<f32>,
}

impl ChannelMapper {
    pub fn new(src_channels: usize, dst_channels: usize) -> Self {
        Self {
            src_channels: src_channels.max(1),
            dst_channels: dst_channels.max(1),
            buf: VecDeque::new(),
        }
    }

    pub fn push(&mut self, chunk: &[f32]) {
        self.buf.extend(chunk.iter().copied());
    }

    /// Whether a whole source frame is buffered.
    pub fn ready(&self) -> bool {
        self.buf.len() >= self.src_channels
    }

    /// Write the next frame into `out` (length `dst_channels`), scaled by
    /// `gain`. Returns false, leaving `out` untouched, if more input is needed.
    pub fn next_frame(&mut self, out: &mut [f32], gain: f32) -> bool {
        if !self.ready() {
            return false;
        }

        for (ch, slot) in out.iter_mut().enumerate().take(self.dst_channels) {
            *slot = self.mapped(ch) * gain;
        }
        self.buf.drain(..self.src_channels);
        true
    }

    fn mapped(&self, dst_ch: usize) -> f32 {
        let get = |ch: usize| self.buf.get(ch).copied().unwrap_or(0.0);
        match (self.src_channels, self.dst_channels) {
            (2, 1) => 0.5 * (get(0) + get(1)),
            (1, _) => get(0),
            (src, _) => get(dst_ch.min(src - 1)),
        }
    }
}
