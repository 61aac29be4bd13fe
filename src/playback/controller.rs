//! Mount-driven playback state machine.
//!
//! All transitions run under one lock around the session slot. Starting a
//! stream moves the slot to `Opening` under the lock, then the blocking open
//! runs on the blocking pool. The result is installed only if the slot still
//! holds the same opening epoch; anything else means the start was cancelled
//! or superseded and the fresh session is closed instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::AudioBackend;
use super::error::PlaybackError;
use super::notice::Notices;
use super::session::PlaybackSession;
use crate::policy::{Policy, PolicyStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Stopped,
    Playing,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Playing => "playing",
        }
    }
}

/// Which seat on the mount the local user occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Driving,
    Passenger,
}

/// What a controller call did to the session slot.
pub enum Transition {
    /// A background open was dispatched.
    Starting(PendingOpen),
    Stopped,
    Unchanged,
}

impl Transition {
    /// Wait for a dispatched open to be installed or discarded.
    pub async fn settle(self) {
        if let Transition::Starting(pending) = self {
            pending.wait().await;
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Transition::Unchanged)
    }
}

pub struct PendingOpen {
    handle: JoinHandle<()>,
}

impl PendingOpen {
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            warn!("Stream open task ended abnormally: {}", e);
        }
    }
}

/// Snapshot for status displays. May be stale by the time it is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerStatus {
    pub state: PlaybackState,
    pub policy: Policy,
    pub last_error: Option<String>,
    /// When the live session finished connecting.
    pub playing_since: Option<DateTime<Utc>>,
}

enum Slot<B: AudioBackend> {
    Stopped,
    Opening { epoch: u64 },
    Playing(PlaybackSession<B>),
}

struct Inner<B: AudioBackend> {
    slot: Slot<B>,
    next_epoch: u64,
    shut_down: bool,
}

pub struct PlaybackController<B: AudioBackend> {
    inner: Arc<Mutex<Inner<B>>>,
    backend: Arc<B>,
    store: Arc<dyn PolicyStore>,
    notices: Notices,
}

impl<B: AudioBackend> Clone for PlaybackController<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            backend: Arc::clone(&self.backend),
            store: Arc::clone(&self.store),
            notices: self.notices.clone(),
        }
    }
}

impl<B: AudioBackend> PlaybackController<B> {
    pub fn new(backend: Arc<B>, store: Arc<dyn PolicyStore>, notices: Notices) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                slot: Slot::Stopped,
                next_epoch: 0,
                shut_down: false,
            })),
            backend,
            store,
            notices,
        }
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn policy(&self) -> Policy {
        self.store.get()
    }

    pub async fn state(&self) -> PlaybackState {
        Self::state_of(&self.inner.lock().await)
    }

    pub async fn status(&self) -> ControllerStatus {
        let inner = self.inner.lock().await;
        ControllerStatus {
            state: Self::state_of(&inner),
            policy: self.store.get(),
            last_error: self.notices.last_error(),
            playing_since: match &inner.slot {
                Slot::Playing(session) => Some(session.opened_at()),
                _ => None,
            },
        }
    }

    /// React to a mount role edge.
    ///
    /// Driving honours `auto_start`; passengers always join the configured
    /// stream. Leaving either role honours `auto_stop`.
    pub async fn on_role_changed(&self, role: Role, active: bool) -> Transition {
        let mut inner = self.inner.lock().await;
        let policy = self.store.get();

        match (role, active) {
            (Role::Driving, true) if !policy.auto_start => {
                debug!("Mounted as driver, auto-start disabled");
                Transition::Unchanged
            }
            (_, true) => {
                info!("Mounted as {:?}", role);
                self.begin_start(&mut inner, &policy)
            }
            (_, false) if !policy.auto_stop => {
                debug!("Left {:?} role, auto-stop disabled", role);
                Transition::Unchanged
            }
            (_, false) => {
                info!("Left {:?} role", role);
                self.stop_locked(&mut inner)
            }
        }
    }

    /// Flip between stopped and playing regardless of policy.
    pub async fn manual_toggle(&self) -> Transition {
        let mut inner = self.inner.lock().await;

        if matches!(inner.slot, Slot::Stopped) {
            let policy = self.store.get();
            let transition = self.begin_start(&mut inner, &policy);
            if !transition.is_unchanged() {
                self.notices.info("Radio playback started.");
            }
            transition
        } else {
            let transition = self.stop_locked(&mut inner);
            self.notices.info("Radio playback stopped.");
            transition
        }
    }

    /// Parse a percentage from user input and apply it.
    pub async fn set_volume(&self, input: &str) -> Result<f32, PlaybackError> {
        let percent = match input.trim().parse::<f32>() {
            Ok(value) if value.is_finite() => value,
            _ => {
                self.notices
                    .error("Please provide a valid number between 0 and 100.");
                return Err(PlaybackError::InvalidUserInput(format!(
                    "'{}' is not a number between 0 and 100",
                    input.trim()
                )));
            }
        };

        Ok(self.apply_volume_percent(percent).await)
    }

    /// Apply a finite volume percentage, clamped to 0..=100. Returns the
    /// stored linear volume.
    async fn apply_volume_percent(&self, percent: f32) -> f32 {
        let percent = percent.clamp(0.0, 100.0);
        let volume = Policy::clamp_volume(percent / 100.0);

        let mut inner = self.inner.lock().await;
        if let Slot::Playing(session) = &mut inner.slot {
            session.set_volume(volume);
        }

        let mut policy = self.store.get();
        policy.volume = volume;
        self.persist(policy);

        self.notices.info(format!("Radio volume set to {percent}%."));
        volume
    }

    pub async fn set_auto_start(&self, enabled: bool) {
        self.update_policy(|policy| policy.auto_start = enabled)
            .await;
        self.announce_auto_start(enabled);
    }

    pub async fn set_auto_stop(&self, enabled: bool) {
        self.update_policy(|policy| policy.auto_stop = enabled)
            .await;
        self.announce_auto_stop(enabled);
    }

    /// Flip `auto_start` and return the new value.
    pub async fn toggle_auto_start(&self) -> bool {
        let policy = self
            .update_policy(|policy| policy.auto_start = !policy.auto_start)
            .await;
        self.announce_auto_start(policy.auto_start);
        policy.auto_start
    }

    /// Flip `auto_stop` and return the new value.
    pub async fn toggle_auto_stop(&self) -> bool {
        let policy = self
            .update_policy(|policy| policy.auto_stop = !policy.auto_stop)
            .await;
        self.announce_auto_stop(policy.auto_stop);
        policy.auto_stop
    }

    /// Change the stream URL used by the next start. A live session keeps
    /// playing the old stream.
    pub async fn set_stream_url(&self, url: &str) -> Result<(), PlaybackError> {
        let url = url.trim();
        if url.is_empty() {
            self.notices.error("Stream URL cannot be empty.");
            return Err(PlaybackError::InvalidUserInput(
                "stream URL cannot be empty".to_string(),
            ));
        }

        self.update_policy(|policy| policy.stream_url = url.to_string())
            .await;
        self.notices.info(format!("Radio stream URL set to {url}."));
        Ok(())
    }

    /// Stop playback and refuse further starts. Safe to call repeatedly and
    /// from any state.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.shut_down {
            info!("Shutting down playback controller");
            inner.shut_down = true;
        }
        self.stop_locked(&mut inner);
    }

    fn state_of(inner: &MutexGuard<'_, Inner<B>>) -> PlaybackState {
        match inner.slot {
            Slot::Stopped => PlaybackState::Stopped,
            Slot::Opening { .. } | Slot::Playing(_) => PlaybackState::Playing,
        }
    }

    fn begin_start(&self, inner: &mut MutexGuard<'_, Inner<B>>, policy: &Policy) -> Transition {
        if inner.shut_down {
            debug!("Ignoring start request after shutdown");
            return Transition::Unchanged;
        }
        if !matches!(inner.slot, Slot::Stopped) {
            debug!("Already playing, start request ignored");
            return Transition::Unchanged;
        }

        inner.next_epoch += 1;
        let epoch = inner.next_epoch;
        inner.slot = Slot::Opening { epoch };

        let controller = self.clone();
        let url = policy.stream_url.clone();
        let volume = policy.volume;
        let handle = tokio::spawn(async move {
            controller.finish_open(epoch, url, volume).await;
        });

        Transition::Starting(PendingOpen { handle })
    }

    async fn finish_open(&self, epoch: u64, url: String, volume: f32) {
        let backend = Arc::clone(&self.backend);
        let result = tokio::task::spawn_blocking(move || {
            PlaybackSession::open(backend.as_ref(), &url, volume)
        })
        .await
        .unwrap_or_else(|e| {
            Err(PlaybackError::TransientIoFailure(format!(
                "stream open task failed: {e}"
            )))
        });

        let mut inner = self.inner.lock().await;
        let still_wanted = matches!(inner.slot, Slot::Opening { epoch: current } if current == epoch);

        match result {
            Ok(mut session) if still_wanted => {
                // The volume may have changed while the stream was connecting.
                session.set_volume(self.store.get().volume);
                inner.slot = Slot::Playing(session);
            }
            Ok(mut session) => {
                debug!("Discarding stream opened after playback was stopped");
                if let Err(e) = session.close() {
                    self.notices.warn(format!("Error stopping radio: {e}"));
                }
            }
            Err(e) if still_wanted => {
                inner.slot = Slot::Stopped;
                self.notices.error(e.play_failure_message());
            }
            Err(e) => {
                debug!("Superseded stream open failed: {}", e);
            }
        }
    }

    fn stop_locked(&self, inner: &mut MutexGuard<'_, Inner<B>>) -> Transition {
        match std::mem::replace(&mut inner.slot, Slot::Stopped) {
            Slot::Stopped => Transition::Unchanged,
            Slot::Opening { epoch } => {
                debug!("Cancelled pending stream open {}", epoch);
                Transition::Stopped
            }
            Slot::Playing(mut session) => {
                if let Err(e) = session.close() {
                    self.notices.warn(format!("Error stopping radio: {e}"));
                }
                info!("Playback stopped");
                Transition::Stopped
            }
        }
    }

    /// Read-modify-write the stored policy under the transition lock.
    async fn update_policy(&self, change: impl FnOnce(&mut Policy)) -> Policy {
        let _inner = self.inner.lock().await;
        let mut policy = self.store.get();
        change(&mut policy);
        self.persist(policy.clone());
        policy
    }

    fn announce_auto_start(&self, enabled: bool) {
        self.notices.info(format!(
            "Auto-start on mount is now {}.",
            enabled_str(enabled)
        ));
    }

    fn announce_auto_stop(&self, enabled: bool) {
        self.notices.info(format!(
            "Auto-stop on dismount is now {}.",
            enabled_str(enabled)
        ));
    }

    fn persist(&self, policy: Policy) {
        if let Err(e) = self.store.set(policy) {
            self.notices
                .warn(format!("Failed to save radio settings: {e:#}"));
        }
    }
}

fn enabled_str(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}
