//! Playback policy and the stores that hold it.
//!
//! The controller only sees the [`PolicyStore`] trait. The service uses
//! [`ConfigPolicyStore`], which keeps the policy in the TOML config file.

use crate::config::{Config, RadioConfig};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Stream URL, volume and the two automation switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub stream_url: String,
    /// Linear gain, 0.0 to 1.0.
    pub volume: f32,
    pub auto_start: bool,
    pub auto_stop: bool,
}

impl Policy {
    pub fn clamp_volume(volume: f32) -> f32 {
        volume.clamp(0.0, 1.0)
    }

    /// Volume as a whole percentage for display.
    pub fn volume_percent(&self) -> u32 {
        (self.volume * 100.0).round() as u32
    }
}

impl Default for Policy {
    fn default() -> Self {
        RadioConfig::default().into()
    }
}

impl From<RadioConfig> for Policy {
    fn from(radio: RadioConfig) -> Self {
        Self {
            stream_url: radio.stream_url,
            volume: Self::clamp_volume(radio.volume),
            auto_start: radio.auto_start_on_mount,
            auto_stop: radio.auto_stop_on_dismount,
        }
    }
}

impl From<Policy> for RadioConfig {
    fn from(policy: Policy) -> Self {
        Self {
            stream_url: policy.stream_url,
            volume: Policy::clamp_volume(policy.volume),
            auto_start_on_mount: policy.auto_start,
            auto_stop_on_dismount: policy.auto_stop,
        }
    }
}

/// Read/write access to the persisted policy.
pub trait PolicyStore: Send + Sync {
    fn get(&self) -> Policy;

    /// Replace the stored policy and persist it.
    fn set(&self, policy: Policy) -> Result<()>;
}

/// Policy kept in the `[radio]` section of the config file.
pub struct ConfigPolicyStore {
    config: Mutex<Config>,
    path: PathBuf,
}

impl ConfigPolicyStore {
    pub fn new(config: Config, path: PathBuf) -> Self {
        Self {
            config: Mutex::new(config),
            path,
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn config(&self) -> MutexGuard<'_, Config> {
        self.config.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PolicyStore for ConfigPolicyStore {
    fn get(&self) -> Policy {
        self.config().radio.clone().into()
    }

    fn set(&self, policy: Policy) -> Result<()> {
        let mut config = self.config();
        config.radio = policy.into();
        config.save_to(&self.path)
    }
}

/// In-memory store. Counts writes so callers can check persistence requests.
#[derive(Default)]
pub struct MemoryPolicyStore {
    policy: Mutex<Policy>,
    writes: Mutex<usize>,
}

impl MemoryPolicyStore {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy: Mutex::new(policy),
            writes: Mutex::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PolicyStore for MemoryPolicyStore {
    fn get(&self) -> Policy {
        self.policy.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set(&self, policy: Policy) -> Result<()> {
        *self.policy.lock().unwrap_or_else(|e| e.into_inner()) = policy;
        *self.writes.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}
