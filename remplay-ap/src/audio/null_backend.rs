//! Silent backend
//!
//! Produces no sound. Each track "plays" for a fixed nominal length measured
//! on the wall clock and scaled by the current speed. Used on machines
//! without an audio device and for exercising the control loop.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

use super::backend::{AudioBackend, Track};
use crate::error::{Error, Result};

/// Backend whose tracks only track time
#[derive(Debug, Clone)]
pub struct NullBackend {
    track_length: Duration,
}

impl NullBackend {
    /// Every opened track lasts `track_length` at speed 1.0.
    pub fn new(track_length: Duration) -> Self {
        Self { track_length }
    }
}

impl AudioBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn open(&mut self, path: &Path) -> Result<Box<dyn Track>> {
        if !path.is_file() {
            return Err(Error::TrackOpen {
                path: path.to_path_buf(),
                reason: "file not found".to_string(),
            });
        }
        debug!("Opened {} (null)", path.display());
        Ok(Box::new(NullTrack::new(path.to_path_buf(), self.track_length)))
    }
}

/// Track that advances a virtual clock
#[derive(Debug)]
pub struct NullTrack {
    path: PathBuf,
    length: Duration,
    /// Position accumulated up to `running_since`
    elapsed: Duration,
    /// Set while the clock is advancing
    running_since: Option<Instant>,
    speed: f32,
    paused: bool,
    active: bool,
}

impl NullTrack {
    pub fn new(path: PathBuf, length: Duration) -> Self {
        Self {
            path,
            length,
            elapsed: Duration::ZERO,
            running_since: None,
            speed: 1.0,
            paused: false,
            active: false,
        }
    }

    fn current_position(&self) -> Duration {
        let running = self
            .running_since
            .map(|since| since.elapsed().mul_f32(self.speed))
            .unwrap_or(Duration::ZERO);
        (self.elapsed + running).min(self.length)
    }

    /// Fold the running segment into `elapsed` before a rate or state change.
    fn checkpoint(&mut self) {
        self.elapsed = self.current_position();
        self.running_since = if self.active && !self.paused {
            Some(Instant::now())
        } else {
            None
        };
    }
}

impl Track for NullTrack {
    fn path(&self) -> &Path {
        &self.path
    }

    fn play(&mut self) -> Result<()> {
        self.elapsed = Duration::ZERO;
        self.active = true;
        self.running_since = (!self.paused).then(Instant::now);
        Ok(())
    }

    fn stop(&mut self) {
        self.checkpoint();
        self.active = false;
        self.running_since = None;
    }

    fn set_paused(&mut self, paused: bool) {
        self.checkpoint();
        self.paused = paused;
        self.checkpoint();
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn set_speed(&mut self, speed: f32) {
        self.checkpoint();
        self.speed = speed;
    }

    fn is_playing(&self) -> bool {
        self.active && self.current_position() < self.length
    }

    fn position(&self) -> Duration {
        self.current_position()
    }

    fn duration(&self) -> Option<Duration> {
        Some(self.length)
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        self.elapsed = position.min(self.length);
        self.running_since = (self.active && !self.paused).then(Instant::now);
        Ok(())
    }

    fn destroy(&mut self) {
        self.active = false;
        self.running_since = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_open_missing_file_fails() {
        let mut backend = NullBackend::new(Duration::from_secs(1));
        let result = backend.open(Path::new("/no/such/track.mp3"));
        assert!(matches!(result, Err(Error::TrackOpen { .. })));
    }

    #[test]
    fn test_track_finishes_after_length() {
        let file = NamedTempFile::new().unwrap();
        let mut backend = NullBackend::new(Duration::from_millis(30));
        let mut track = backend.open(file.path()).unwrap();

        assert!(!track.is_playing());
        track.play().unwrap();
        assert!(track.is_playing());

        std::thread::sleep(Duration::from_millis(60));
        assert!(!track.is_playing());
        assert_eq!(track.position(), Duration::from_millis(30));
    }

    #[test]
    fn test_paused_track_is_playing_and_frozen() {
        let mut track = NullTrack::new(PathBuf::from("a.mp3"), Duration::from_secs(60));
        track.play().unwrap();
        track.set_paused(true);
        let frozen = track.position();
        std::thread::sleep(Duration::from_millis(20));
        assert!(track.is_playing());
        assert_eq!(track.position(), frozen);
    }

    #[test]
    fn test_zero_speed_does_not_advance() {
        let mut track = NullTrack::new(PathBuf::from("a.mp3"), Duration::from_secs(60));
        track.set_speed(0.0);
        track.play().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(track.position(), Duration::ZERO);
    }

    #[test]
    fn test_stop_and_seek() {
        let mut track = NullTrack::new(PathBuf::from("a.mp3"), Duration::from_secs(10));
        track.play().unwrap();
        track.seek(Duration::from_secs(4)).unwrap();
        assert!(track.position() >= Duration::from_secs(4));

        track.seek(Duration::from_secs(99)).unwrap();
        assert!(!track.is_playing());

        track.play().unwrap();
        track.stop();
        assert!(!track.is_playing());
        track.destroy();
        track.destroy();
    }
}
