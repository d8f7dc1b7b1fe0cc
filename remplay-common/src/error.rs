//! Common error types for remplay

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Common result type for remplay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the daemon and the control client
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Invalid configuration file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Frame violates the wire protocol (oversized or undecodable length)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Control server unreachable
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing a frame to the control server failed
    #[error("Failed to send to {peer}: {source}")]
    Send {
        peer: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Operation on a client whose socket was already closed
    #[error("Not connected")]
    NotConnected,
}
