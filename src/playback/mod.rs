//! Mount-driven radio playback.
//!
//! The [`PlaybackController`] owns at most one [`PlaybackSession`] and decides
//! when to open or close it based on role edges, manual commands and the
//! stored [`Policy`](crate::policy::Policy).

pub mod backend;
pub mod controller;
pub mod error;
pub mod notice;
pub mod session;

pub use backend::{AudioBackend, AudioSink, StreamSource};
pub use controller::{
    ControllerStatus, PendingOpen, PlaybackController, PlaybackState, Role, Transition,
};
pub use error::PlaybackError;
pub use notice::{Notice, NoticeLevel, Notices};
pub use session::PlaybackSession;
