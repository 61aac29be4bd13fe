//! Capabilities the playback session is built from.
//!
//! A backend opens a decoder for a URL, creates an output sink and wires the
//! two together. The controller never sees these handles directly; they live
//! inside a [`PlaybackSession`](super::PlaybackSession).

use super::error::PlaybackError;

/// Volume-controllable output device.
pub trait AudioSink: Send + 'static {
    /// Linear gain, 0.0 to 1.0.
    fn set_volume(&mut self, volume: f32);

    fn play(&mut self) -> Result<(), PlaybackError>;

    fn stop(&mut self) -> Result<(), PlaybackError>;
}

/// Open decoder for a network stream.
pub trait StreamSource: Send + 'static {
    fn close(&mut self) -> Result<(), PlaybackError>;
}

pub trait AudioBackend: Send + Sync + 'static {
    type Sink: AudioSink;
    type Source: StreamSource;

    /// Connect to `url` and start decoding. Blocks on network I/O.
    fn open_source(&self, url: &str) -> Result<Self::Source, PlaybackError>;

    fn create_sink(&self, volume: f32) -> Result<Self::Sink, PlaybackError>;

    /// Route decoded audio from `source` into `sink`.
    fn connect(
        &self,
        sink: &mut Self::Sink,
        source: &mut Self::Source,
    ) -> Result<(), PlaybackError>;
}
