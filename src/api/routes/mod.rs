//! API route modules.

pub mod condition;
pub mod playback;
pub mod settings;
