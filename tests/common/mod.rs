//! Scriptable audio backend for controller tests.

#![allow(dead_code)]

use crossbeam_channel::{Receiver, Sender};
use mountradio::playback::{
    AudioBackend, AudioSink, Notices, PlaybackController, PlaybackError, StreamSource,
};
use mountradio::policy::{MemoryPolicyStore, Policy};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct Counters {
    pub open_attempts: AtomicUsize,
    pub sources_opened: AtomicUsize,
    pub sources_closed: AtomicUsize,
    pub sinks_created: AtomicUsize,
    pub sinks_stopped: AtomicUsize,
    /// Make every sink stop and source close report an error.
    pub fail_release: AtomicBool,
}

#[derive(Default)]
pub struct FakeBackend {
    pub counters: Arc<Counters>,
    /// URL and volume of every successful open.
    pub opened: Mutex<Vec<(String, f32)>>,
    /// Volume most recently applied to any sink.
    pub sink_volume: Arc<Mutex<f32>>,
    next_error: Mutex<Option<PlaybackError>>,
    gate: Mutex<Option<Receiver<()>>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next `open_source` call with `err`.
    pub fn fail_next_open(&self, err: PlaybackError) {
        *self.next_error.lock().unwrap() = Some(err);
    }

    /// Make releasing any sink or source fail. The release is still counted.
    pub fn fail_releases(&self) {
        self.counters.fail_release.store(true, Ordering::SeqCst);
    }

    /// Make every following open block until a value is sent on the returned
    /// sender, one value per open.
    pub fn gate_opens(&self) -> Sender<()> {
        let (tx, rx) = crossbeam_channel::unbounded();
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn open_attempts(&self) -> usize {
        self.counters.open_attempts.load(Ordering::SeqCst)
    }

    pub fn sources_opened(&self) -> usize {
        self.counters.sources_opened.load(Ordering::SeqCst)
    }

    pub fn sources_closed(&self) -> usize {
        self.counters.sources_closed.load(Ordering::SeqCst)
    }

    pub fn sinks_created(&self) -> usize {
        self.counters.sinks_created.load(Ordering::SeqCst)
    }

    pub fn sinks_stopped(&self) -> usize {
        self.counters.sinks_stopped.load(Ordering::SeqCst)
    }

    /// Sessions currently holding a source.
    pub fn live_sources(&self) -> usize {
        self.sources_opened() - self.sources_closed()
    }

    pub fn last_open(&self) -> Option<(String, f32)> {
        self.opened.lock().unwrap().last().cloned()
    }

    pub fn sink_volume(&self) -> f32 {
        *self.sink_volume.lock().unwrap()
    }
}

pub struct FakeSink {
    counters: Arc<Counters>,
    volume: Arc<Mutex<f32>>,
}

pub struct FakeSource {
    counters: Arc<Counters>,
}

impl AudioSink for FakeSink {
    fn set_volume(&mut self, volume: f32) {
        *self.volume.lock().unwrap() = volume;
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PlaybackError> {
        self.counters.sinks_stopped.fetch_add(1, Ordering::SeqCst);
        if self.counters.fail_release.load(Ordering::SeqCst) {
            return Err(PlaybackError::TransientIoFailure("device unplugged".into()));
        }
        Ok(())
    }
}

impl StreamSource for FakeSource {
    fn close(&mut self) -> Result<(), PlaybackError> {
        self.counters.sources_closed.fetch_add(1, Ordering::SeqCst);
        if self.counters.fail_release.load(Ordering::SeqCst) {
            return Err(PlaybackError::ResourceReleaseFailure("socket close failed".into()));
        }
        Ok(())
    }
}

impl AudioBackend for FakeBackend {
    type Sink = FakeSink;
    type Source = FakeSource;

    fn open_source(&self, url: &str) -> Result<FakeSource, PlaybackError> {
        self.counters.open_attempts.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }

        if let Some(err) = self.next_error.lock().unwrap().take() {
            return Err(err);
        }

        self.counters.sources_opened.fetch_add(1, Ordering::SeqCst);
        self.opened.lock().unwrap().push((url.to_string(), 0.0));
        Ok(FakeSource {
            counters: self.counters.clone(),
        })
    }

    fn create_sink(&self, volume: f32) -> Result<FakeSink, PlaybackError> {
        self.counters.sinks_created.fetch_add(1, Ordering::SeqCst);
        *self.sink_volume.lock().unwrap() = volume;
        if let Some(last) = self.opened.lock().unwrap().last_mut() {
            last.1 = volume;
        }
        Ok(FakeSink {
            counters: self.counters.clone(),
            volume: self.sink_volume.clone(),
        })
    }

    fn connect(&self, _sink: &mut FakeSink, _source: &mut FakeSource) -> Result<(), PlaybackError> {
        Ok(())
    }
}

pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub store: Arc<MemoryPolicyStore>,
    pub controller: PlaybackController<FakeBackend>,
}

pub fn harness(policy: Policy) -> Harness {
    let backend = FakeBackend::new();
    let store = Arc::new(MemoryPolicyStore::new(policy));
    let controller = PlaybackController::new(backend.clone(), store.clone(), Notices::default());
    Harness {
        backend,
        store,
        controller,
    }
}

pub fn policy(url: &str) -> Policy {
    Policy {
        stream_url: url.to_string(),
        volume: 0.5,
        auto_start: true,
        auto_stop: true,
    }
}
