use thiserror::Error;

/// Every failure the playback subsystem can report. None of these are fatal:
/// the worst outcome is that audio stops and the message is shown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// The URL does not resolve to a stream we can decode.
    #[error("invalid stream URL: {0}")]
    InvalidStreamFormat(String),

    /// Network or device failure. The user may retry.
    #[error("{0}")]
    TransientIoFailure(String),

    /// Rejected before any state was touched.
    #[error("invalid input: {0}")]
    InvalidUserInput(String),

    /// Raised while tearing down a sink or source.
    #[error("failed to release audio resources: {0}")]
    ResourceReleaseFailure(String),
}

impl PlaybackError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidStreamFormat(_) => "invalid_stream_format",
            Self::TransientIoFailure(_) => "transient_io_failure",
            Self::InvalidUserInput(_) => "invalid_user_input",
            Self::ResourceReleaseFailure(_) => "resource_release_failure",
        }
    }

    /// Message shown to the user when a start attempt fails.
    pub fn play_failure_message(&self) -> String {
        match self {
            Self::InvalidStreamFormat(_) => "Error playing radio: The URL appears to be invalid. \
                 Please check the radio link in the configuration."
                .to_string(),
            other => format!("Error playing radio: {other}"),
        }
    }
}
