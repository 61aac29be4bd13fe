//! Network radio stream source.
//!
//! Connects with a blocking HTTP GET, probes the container with Symphonia and
//! then decodes on a background thread into interleaved `f32` chunks. The
//! chunks go through a bounded channel, so decoding stalls once the sink stops
//! draining.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, error, info, warn};

use crate::playback::{PlaybackError, StreamSource};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Decoded chunks held ahead of the output device.
const CHUNK_QUEUE_DEPTH: usize = 64;

/// Sample layout of a decoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: usize,
}

pub struct HttpStreamSource {
    format: StreamFormat,
    chunks: Option<Receiver<Vec<f32>>>,
    stop: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl HttpStreamSource {
    /// Connect to `url`, probe the stream and start decoding.
    pub fn open(url: &str) -> Result<Self, PlaybackError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| PlaybackError::TransientIoFailure(format!("http client: {e}")))?;

        let response = client.get(url).send().map_err(classify_request_error)?;

        let status = response.status();
        if status.is_client_error() {
            return Err(PlaybackError::InvalidStreamFormat(format!(
                "server answered {status}"
            )));
        }
        if !status.is_success() {
            return Err(PlaybackError::TransientIoFailure(format!(
                "server answered {status}"
            )));
        }

        let hint = build_hint(
            url,
            response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );

        let mss = MediaSourceStream::new(Box::new(HttpBody::new(response)), Default::default());
        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(classify_decode_error)?;

        let format_reader = probed.format;
        let track = format_reader
            .default_track()
            .ok_or_else(|| PlaybackError::InvalidStreamFormat("no audio track".to_string()))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params.sample_rate.ok_or_else(|| {
            PlaybackError::InvalidStreamFormat("stream has no sample rate".to_string())
        })?;
        let channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(classify_decode_error)?;

        let format = StreamFormat {
            sample_rate,
            channels,
        };
        info!(
            "Stream {} probed: {} Hz, {} channel(s)",
            url, sample_rate, channels
        );

        let (tx, rx) = bounded(CHUNK_QUEUE_DEPTH);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = stop.clone();
        let worker = thread::Builder::new()
            .name("mountradio-decode".to_string())
            .spawn(move || {
                if let Err(e) = decode_loop(format_reader, decoder, track_id, &tx, &stop_for_thread)
                {
                    error!("Stream decoder stopped: {}", e);
                }
                debug!("Decoder thread exiting");
            })
            .map_err(|e| PlaybackError::TransientIoFailure(format!("decoder thread: {e}")))?;

        Ok(Self {
            format,
            chunks: Some(rx),
            stop,
            worker: Some(worker),
        })
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    /// Hand the decoded chunk queue to an output. Only the first call gets it.
    pub fn take_chunks(&mut self) -> Option<Receiver<Vec<f32>>> {
        self.chunks.take()
    }
}

impl StreamSource for HttpStreamSource {
    fn close(&mut self) -> Result<(), PlaybackError> {
        self.stop.store(true, Ordering::Relaxed);
        self.chunks = None;
        // The decoder may be parked in a socket read; it exits on its own once
        // it sees the stop flag or the closed queue.
        if self.worker.take().is_some() {
            debug!("Stream source closed");
        }
        Ok(())
    }
}

impl Drop for HttpStreamSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

fn decode_loop(
    mut format: Box<dyn FormatReader>,
    mut decoder: Box<dyn Decoder>,
    track_id: u32,
    tx: &Sender<Vec<f32>>,
    stop: &AtomicBool,
) -> anyhow::Result<()> {
    while !stop.load(Ordering::Relaxed) {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                info!("Stream ended");
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, *decoded.spec());
        sample_buf.copy_interleaved_ref(decoded);

        if tx.send(sample_buf.samples().to_vec()).is_err() {
            debug!("Output detached, stopping decoder");
            break;
        }
    }

    Ok(())
}

fn classify_request_error(e: reqwest::Error) -> PlaybackError {
    if e.is_builder() {
        PlaybackError::InvalidStreamFormat(e.to_string())
    } else {
        PlaybackError::TransientIoFailure(format!("connection failed: {e}"))
    }
}

fn classify_decode_error(e: SymphoniaError) -> PlaybackError {
    match e {
        SymphoniaError::IoError(io) => {
            PlaybackError::TransientIoFailure(format!("stream read failed: {io}"))
        }
        other => PlaybackError::InvalidStreamFormat(other.to_string()),
    }
}

/// Container hint from the `Content-Type` header and the URL path.
fn build_hint(url: &str, content_type: Option<&str>) -> Hint {
    let mut hint = Hint::new();

    if let Some(mime) = content_type {
        let mime = mime.split(';').next().unwrap_or(mime).trim();
        hint.mime_type(mime);
        if let Some(ext) = extension_for_mime(mime) {
            hint.with_extension(ext);
            return hint;
        }
    }

    if let Some(ext) = url_extension(url) {
        hint.with_extension(&ext);
    }
    hint
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime.to_ascii_lowercase().as_str() {
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/aac" | "audio/aacp" | "audio/x-aac" => Some("aac"),
        "audio/ogg" | "application/ogg" => Some("ogg"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        _ => None,
    }
}

fn url_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 4 {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Forward-only HTTP body as a Symphonia media source.
struct HttpBody {
    inner: Mutex<reqwest::blocking::Response>,
}

impl HttpBody {
    fn new(response: reqwest::blocking::Response) -> Self {
        Self {
            inner: Mutex::new(response),
        }
    }
}

impl Read for HttpBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner
            .get_mut()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "response lock poisoned"))?
            .read(buf)
    }
}

impl Seek for HttpBody {
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "live streams are not seekable",
        ))
    }
}

impl MediaSource for HttpBody {
    fn is_seekable(&self) -> bool {
        false
    }

    fn byte_len(&self) -> Option<u64> {
        None
    }
}
