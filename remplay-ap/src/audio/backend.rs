//! Audio backend abstraction
//!
//! The playback session only sees these two traits. A backend opens files
//! into tracks; a track is one playable file with its own transport
//! controls. Only one track is played at a time.

use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// Source of playable tracks
pub trait AudioBackend {
    /// Short identifier for logs
    fn name(&self) -> &'static str;

    /// Open a file for playback.
    ///
    /// # Errors
    /// Missing, unreadable or undecodable files.
    fn open(&mut self, path: &Path) -> Result<Box<dyn Track>>;

    /// Per-tick housekeeping, called once per control loop iteration.
    fn update(&mut self) {}
}

/// One opened file
pub trait Track {
    fn path(&self) -> &Path;

    /// Start playing from the beginning.
    fn play(&mut self) -> Result<()>;

    /// Stop playing. A stopped track reports `is_playing() == false`.
    fn stop(&mut self);

    fn set_paused(&mut self, paused: bool);

    /// Volume in `[0, 1]`
    fn set_volume(&mut self, volume: f32);

    /// Playback rate multiplier, 1.0 = normal
    fn set_speed(&mut self, speed: f32);

    /// True from `play` until the end is reached or `stop` is called.
    /// A paused track is still playing.
    fn is_playing(&self) -> bool;

    /// Current position from the start of the file
    fn position(&self) -> Duration;

    /// Total length, if known
    fn duration(&self) -> Option<Duration>;

    /// Jump to an absolute position. Positions past the end finish the track.
    fn seek(&mut self, position: Duration) -> Result<()>;

    /// Release resources. Safe to call more than once.
    fn destroy(&mut self);
}
