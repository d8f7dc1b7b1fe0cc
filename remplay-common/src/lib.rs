//! # remplay Common Library
//!
//! Shared code for the remplay daemon and control client:
//! - Control channel wire protocol (frame codec, reserved commands)
//! - Control channel client
//! - Configuration loading
//! - Error types

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;

pub use client::CommandClient;
pub use config::PlayerConfig;
pub use error::{Error, Result};
