//! Error types for the intake console

use thiserror::Error;

/// Result type alias for intake operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the intake console
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Session orchestration error (wrong phase, empty input, missing session)
    #[error("session error: {0}")]
    Session(String),

    /// A submission was attempted while another request is still in flight
    #[error("a request is already in flight")]
    Busy,

    /// Session service error (unexpected status or payload)
    #[error("service error: {0}")]
    Service(String),

    /// Microphone capture error
    #[error("audio error: {0}")]
    Audio(String),

    /// Camera capture error
    #[error("camera error: {0}")]
    Camera(String),

    /// Speech playback error
    #[error("playback error: {0}")]
    Playback(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing error
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),
}
