//! Exclusive owner of one sink + source pair.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::backend::{AudioBackend, AudioSink, StreamSource};
use super::error::PlaybackError;

/// A live, wired sink and source. Either both handles are open or the
/// session has been closed and holds nothing.
pub struct PlaybackSession<B: AudioBackend> {
    sink: Option<B::Sink>,
    source: Option<B::Source>,
    url: String,
    volume: f32,
    opened_at: DateTime<Utc>,
}

impl<B: AudioBackend> PlaybackSession<B> {
    /// Open `url` and start playing it at `volume`.
    ///
    /// On failure every handle created so far is released before the error
    /// is returned.
    pub fn open(backend: &B, url: &str, volume: f32) -> Result<Self, PlaybackError> {
        let volume = volume.clamp(0.0, 1.0);
        debug!("Opening stream source for {}", url);
        let mut source = backend.open_source(url)?;

        let mut sink = match backend.create_sink(volume) {
            Ok(sink) => sink,
            Err(e) => {
                release_source(&mut source);
                return Err(e);
            }
        };

        let wired = backend
            .connect(&mut sink, &mut source)
            .and_then(|_| sink.play());
        if let Err(e) = wired {
            release_sink(&mut sink);
            release_source(&mut source);
            return Err(e);
        }

        info!("Playback session open for {} at volume {:.2}", url, volume);
        Ok(Self {
            sink: Some(sink),
            source: Some(source),
            url: url.to_string(),
            volume,
            opened_at: Utc::now(),
        })
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = self.sink.as_mut() {
            sink.set_volume(self.volume);
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn is_open(&self) -> bool {
        self.sink.is_some() || self.source.is_some()
    }

    /// Stop the sink and close the source. Both are released even if the
    /// first one fails; the first error is returned. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), PlaybackError> {
        let mut first_error = None;

        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.stop() {
                first_error.get_or_insert(e);
            }
        }

        if let Some(mut source) = self.source.take() {
            if let Err(e) = source.close() {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            None => Ok(()),
            Some(PlaybackError::ResourceReleaseFailure(msg)) => {
                Err(PlaybackError::ResourceReleaseFailure(msg))
            }
            Some(other) => Err(PlaybackError::ResourceReleaseFailure(other.to_string())),
        }
    }
}

impl<B: AudioBackend> Drop for PlaybackSession<B> {
    fn drop(&mut self) {
        if self.is_open() {
            debug!("Dropping open playback session, cleaning up");
            if let Err(e) = self.close() {
                warn!("Failed to release playback session: {}", e);
            }
        }
    }
}

fn release_sink<S: AudioSink>(sink: &mut S) {
    if let Err(e) = sink.stop() {
        warn!("Failed to release audio sink after open error: {}", e);
    }
}

fn release_source<S: StreamSource>(source: &mut S) {
    if let Err(e) = source.close() {
        warn!("Failed to release stream source after open error: {}", e);
    }
}
