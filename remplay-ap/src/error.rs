//! Error types for remplay-ap
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for remplay-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Control socket could not be bound
    #[error("Failed to bind control socket {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Track could not be opened by the backend
    #[error("Cannot open {}: {reason}", path.display())]
    TrackOpen { path: PathBuf, reason: String },

    /// Playback errors on an open track
    #[error("Playback error: {0}")]
    Playback(String),

    /// Neither the main list nor the temp list has anything to select
    #[error("Playlist is empty")]
    EmptyPlaylist,

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using remplay-ap Error
pub type Result<T> = std::result::Result<T, Error>;
