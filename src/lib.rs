pub mod api;
pub mod app;
pub mod audio;
pub mod cli;
pub mod config;
pub mod global;
pub mod monitor;
pub mod playback;
pub mod policy;
