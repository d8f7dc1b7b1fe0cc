//! Recording audio backend
//!
//! Logs every call the playback session makes so tests can assert on the
//! exact sequence of backend operations. Tracks play until stopped unless
//! configured to finish after a number of ticks.

use std::cell::Cell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use remplay_ap::audio::{AudioBackend, Track};
use remplay_ap::{Error, Result};

/// One backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Opened(PathBuf),
    OpenFailed(PathBuf),
    Played(PathBuf),
    Stopped(PathBuf),
    Paused(PathBuf, bool),
    Volume(PathBuf, f32),
    Speed(PathBuf, f32),
    Seeked(PathBuf, Duration),
    Destroyed(PathBuf),
}

/// Shared, cloneable event log
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn contains(&self, event: &Event) -> bool {
        self.events.lock().unwrap().contains(event)
    }

    /// Paths in the order `play` was called
    pub fn played(&self) -> Vec<PathBuf> {
        self.snapshot()
            .into_iter()
            .filter_map(|e| match e {
                Event::Played(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    /// Number of times `path` was played
    pub fn play_count(&self, path: &Path) -> usize {
        self.played().iter().filter(|p| p.as_path() == path).count()
    }

    /// Last volume applied to `path`
    pub fn last_volume(&self, path: &Path) -> Option<f32> {
        self.snapshot().into_iter().rev().find_map(|e| match e {
            Event::Volume(p, v) if p == path => Some(v),
            _ => None,
        })
    }
}

/// Backend that records instead of playing
pub struct RecordingBackend {
    log: EventLog,
    unopenable: HashSet<PathBuf>,
    ticks_per_track: Option<u32>,
}

impl RecordingBackend {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            unopenable: HashSet::new(),
            ticks_per_track: None,
        }
    }

    /// Make `open` fail for `path`
    pub fn fail_on(mut self, path: impl Into<PathBuf>) -> Self {
        self.unopenable.insert(path.into());
        self
    }

    /// Tracks report finished after `ticks` `is_playing` checks
    pub fn finish_after_ticks(mut self, ticks: u32) -> Self {
        self.ticks_per_track = Some(ticks);
        self
    }
}

impl AudioBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn open(&mut self, path: &Path) -> Result<Box<dyn Track>> {
        if self.unopenable.contains(path) {
            self.log.push(Event::OpenFailed(path.to_path_buf()));
            return Err(Error::TrackOpen {
                path: path.to_path_buf(),
                reason: "rejected by test backend".to_string(),
            });
        }
        self.log.push(Event::Opened(path.to_path_buf()));
        Ok(Box::new(RecordingTrack {
            path: path.to_path_buf(),
            log: self.log.clone(),
            playing: false,
            remaining_ticks: Cell::new(self.ticks_per_track),
            position: Duration::ZERO,
        }))
    }
}

struct RecordingTrack {
    path: PathBuf,
    log: EventLog,
    playing: bool,
    remaining_ticks: Cell<Option<u32>>,
    position: Duration,
}

impl Track for RecordingTrack {
    fn path(&self) -> &Path {
        &self.path
    }

    fn play(&mut self) -> Result<()> {
        self.playing = true;
        self.log.push(Event::Played(self.path.clone()));
        Ok(())
    }

    fn stop(&mut self) {
        self.playing = false;
        self.log.push(Event::Stopped(self.path.clone()));
    }

    fn set_paused(&mut self, paused: bool) {
        self.log.push(Event::Paused(self.path.clone(), paused));
    }

    fn set_volume(&mut self, volume: f32) {
        self.log.push(Event::Volume(self.path.clone(), volume));
    }

    fn set_speed(&mut self, speed: f32) {
        self.log.push(Event::Speed(self.path.clone(), speed));
    }

    fn is_playing(&self) -> bool {
        if !self.playing {
            return false;
        }
        match self.remaining_ticks.get() {
            Some(0) => false,
            Some(n) => {
                self.remaining_ticks.set(Some(n - 1));
                true
            }
            None => true,
        }
    }

    fn position(&self) -> Duration {
        self.position
    }

    fn duration(&self) -> Option<Duration> {
        None
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        self.position = position;
        self.log.push(Event::Seeked(self.path.clone(), position));
        Ok(())
    }

    fn destroy(&mut self) {
        self.playing = false;
        self.log.push(Event::Destroyed(self.path.clone()));
    }
}
