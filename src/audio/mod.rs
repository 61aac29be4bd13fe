//! Concrete audio backend: HTTP radio streams decoded with Symphonia, played
//! on the default cpal output device.

pub mod device_sink;
pub mod http_source;
pub mod resample;

pub use device_sink::{DeviceSink, SinkFeed};
pub use http_source::{HttpStreamSource, StreamFormat};

use crate::playback::{AudioBackend, PlaybackError};

#[derive(Debug, Default, Clone, Copy)]
pub struct DeviceBackend;

impl AudioBackend for DeviceBackend {
    type Sink = DeviceSink;
    type Source = HttpStreamSource;

    fn open_source(&self, url: &str) -> Result<HttpStreamSource, PlaybackError> {
        HttpStreamSource::open(url)
    }

    fn create_sink(&self, volume: f32) -> Result<DeviceSink, PlaybackError> {
        DeviceSink::new(volume)
    }

    fn connect(
        &self,
        sink: &mut DeviceSink,
        source: &mut HttpStreamSource,
    ) -> Result<(), PlaybackError> {
        let chunks = source.take_chunks().ok_or_else(|| {
            PlaybackError::TransientIoFailure("stream is already connected".to_string())
        })?;
        sink.attach(SinkFeed {
            chunks,
            format: source.format(),
        });
        Ok(())
    }
}
