//! # remplay Audio Player Library (remplay-ap)
//!
//! Headless player daemon controlled over a TCP command channel.
//!
//! **Architecture:** connection handlers decode frames into a shared
//! [`control::CommandQueue`]; a single [`playback::PlaybackSession`] drains
//! it once per tick and drives an [`audio::AudioBackend`]
//! (symphonia + rubato + cpal, or the silent null backend).

pub mod audio;
pub mod control;
pub mod error;
pub mod library;
pub mod playback;

pub use error::{Error, Result};
