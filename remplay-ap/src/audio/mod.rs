//! Audio subsystem
//!
//! - `backend`: traits the playback session drives
//! - `cpal_backend`: symphonia decode + rubato resample + cpal output
//! - `null_backend`: silent wall-clock backend

pub mod backend;
pub mod cpal_backend;
pub mod decoder;
pub mod null_backend;
pub mod output;
pub mod resampler;
pub mod types;

use std::time::Duration;

use remplay_common::config::{BackendKind, PlayerConfig};
use tracing::info;

pub use backend::{AudioBackend, Track};
pub use cpal_backend::CpalBackend;
pub use null_backend::NullBackend;
pub use output::AudioOutput;
pub use types::AudioFrame;

use crate::error::Result;

/// Build the backend selected in `config`.
pub fn create_backend(config: &PlayerConfig) -> Result<Box<dyn AudioBackend>> {
    let backend: Box<dyn AudioBackend> = match config.backend {
        BackendKind::Cpal => Box::new(CpalBackend::new(config.device_name.as_deref())?),
        BackendKind::Null => Box::new(NullBackend::new(Duration::from_secs(
            config.null_track_secs,
        ))),
    };
    info!("Audio backend: {}", backend.name());
    Ok(backend)
}

/// Names of the available output devices
pub fn list_output_devices() -> Result<Vec<String>> {
    AudioOutput::list_devices()
}
