//! User-facing notices (confirmations, warnings, errors).

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Broadcast handle for notices. Every notice is also logged.
#[derive(Clone)]
pub struct Notices {
    tx: broadcast::Sender<Notice>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl Default for Notices {
    fn default() -> Self {
        Self::new(32)
    }
}

impl Notices {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.send(NoticeLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.send(NoticeLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(message.clone());
        self.send(NoticeLevel::Error, message);
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn send(&self, level: NoticeLevel, message: String) {
        // No subscribers is fine; the log line above is enough.
        let _ = self.tx.send(Notice { level, message });
    }
}
