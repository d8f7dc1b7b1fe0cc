//! Playback session loop
//!
//! The session owns the backend, the playlist and all playback settings.
//! It selects a track, plays it, and while it plays pulls command batches
//! from its [`CommandSource`] once per tick. Nothing else mutates session
//! state, so no locking is needed here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use remplay_common::config::{PlayerConfig, MAX_SPEED, MAX_VOLUME};
use remplay_common::protocol::split_batch;
use tracing::{debug, info, warn};

use super::commands::{Command, CommandParser};
use super::playlist::PlaylistSelector;
use crate::audio::{AudioBackend, Track};
use crate::control::CommandSource;
use crate::error::{Error, Result};

/// Settings carried from track to track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionState {
    /// 0.0-1.0
    pub volume: f32,
    /// 0.0-1000.0
    pub speed: f32,
    pub paused: bool,
    /// Cleared by `exit`/`quit`
    pub running: bool,
}

impl SessionState {
    /// Running, unpaused state with clamped initial volume and speed
    pub fn new(volume: f32, speed: f32) -> Self {
        Self {
            volume: volume.clamp(0.0, MAX_VOLUME),
            speed: speed.clamp(0.0, MAX_SPEED),
            paused: false,
            running: true,
        }
    }
}

/// Single-owner playback session
pub struct PlaybackSession<S: CommandSource> {
    backend: Box<dyn AudioBackend>,
    source: S,
    selector: PlaylistSelector,
    parser: CommandParser,
    state: SessionState,
    current: Option<Box<dyn Track>>,
    /// Set by commands that end the current track early
    stop_requested: bool,
    tick_interval: Duration,
}

impl<S: CommandSource> PlaybackSession<S> {
    pub fn new(
        backend: Box<dyn AudioBackend>,
        source: S,
        selector: PlaylistSelector,
        parser: CommandParser,
        state: SessionState,
        tick_interval: Duration,
    ) -> Self {
        Self {
            backend,
            source,
            selector,
            parser,
            state,
            current: None,
            stop_requested: false,
            tick_interval,
        }
    }

    /// Build a session from configuration and a scanned main list.
    pub fn from_config(
        config: &PlayerConfig,
        backend: Box<dyn AudioBackend>,
        source: S,
        main_list: Vec<PathBuf>,
    ) -> Self {
        Self::new(
            backend,
            source,
            PlaylistSelector::new(main_list, config.main_mode, config.temp_mode),
            CommandParser::new(config.formats.clone()),
            SessionState::new(config.volume, config.speed),
            Duration::from_millis(config.tick_interval_ms),
        )
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn selector(&self) -> &PlaylistSelector {
        &self.selector
    }

    /// Path of the track currently loaded, if any
    pub fn current_track_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|track| track.path())
    }

    /// Run until `exit`/`quit` is received.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyPlaylist`] when there is nothing left to select.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "Playback session started ({} main tracks, backend {})",
            self.selector.main_list().len(),
            self.backend.name()
        );

        let result = self.run_tracks().await;
        self.release_current();

        match &result {
            Ok(()) => info!("Playback session finished"),
            Err(e) => warn!("Playback session aborted: {}", e),
        }
        result
    }

    async fn run_tracks(&mut self) -> Result<()> {
        while self.state.running {
            let Some(path) = self.selector.next_track() else {
                return Err(Error::EmptyPlaylist);
            };

            let track = match self.backend.open(&path) {
                Ok(track) => track,
                Err(e) => {
                    warn!("Skipping track: {}", e);
                    // Keep commands flowing while unplayable entries are skipped
                    self.pump_commands();
                    tokio::task::yield_now().await;
                    continue;
                }
            };

            if self.start_track(track) {
                self.play_current().await;
            }
        }
        Ok(())
    }

    /// Replace the current track with `track` and start it.
    fn start_track(&mut self, mut track: Box<dyn Track>) -> bool {
        self.release_current();

        track.set_volume(self.state.volume);
        track.set_speed(self.state.speed);
        if let Err(e) = track.play() {
            warn!("Failed to start {}: {}", track.path().display(), e);
            track.destroy();
            return false;
        }
        if self.state.paused {
            track.set_paused(true);
        }

        info!("Now playing: {}", track.path().display());
        self.current = Some(track);
        true
    }

    /// Tick until the current track ends, is stopped, or the session exits.
    async fn play_current(&mut self) {
        self.stop_requested = false;
        loop {
            self.backend.update();
            self.pump_commands();

            let finished = self.current.as_ref().map_or(true, |t| !t.is_playing());
            if !self.state.running || self.stop_requested || finished {
                break;
            }
            tokio::time::sleep(self.tick_interval).await;
        }
    }

    fn pump_commands(&mut self) {
        self.source.update();
        for batch in self.source.drain() {
            debug!("Dispatching batch #{}: {}", batch.seq, batch.payload);
            self.dispatch_batch(&batch.payload);
        }
    }

    /// Apply every command of one batch in order.
    ///
    /// File paths in the batch are collected and, once the batch is done,
    /// replace the temp list and stop the current track.
    pub fn dispatch_batch(&mut self, batch: &str) {
        let mut enqueued = Vec::new();

        for raw in split_batch(batch) {
            match self.parser.parse(raw) {
                Ok(command) => self.apply(command, &mut enqueued),
                Err(e) => warn!("Ignoring command: {}", e),
            }
        }

        if !enqueued.is_empty() {
            info!("Temp list replaced with {} tracks", enqueued.len());
            self.selector.replace_temp(enqueued);
            self.stop_current();
        }
    }

    /// Apply one command. Paths are only collected into `enqueued`.
    fn apply(&mut self, command: Command, enqueued: &mut Vec<PathBuf>) {
        match command {
            Command::Enqueue(path) => enqueued.push(path),
            Command::Next => {
                info!("Skipping to next track");
                self.stop_current();
            }
            Command::Pause => self.set_paused(true),
            Command::Resume => self.set_paused(false),
            Command::TogglePause => self.set_paused(!self.state.paused),
            Command::Volume(adjustment) => {
                self.state.volume = adjustment.apply(self.state.volume, MAX_VOLUME);
                if let Some(track) = self.current.as_mut() {
                    track.set_volume(self.state.volume);
                }
                info!("Volume: {:.2}", self.state.volume);
            }
            Command::Speed(adjustment) => {
                self.state.speed = adjustment.apply(self.state.speed, MAX_SPEED);
                if let Some(track) = self.current.as_mut() {
                    track.set_speed(self.state.speed);
                }
                info!("Speed: {:.2}", self.state.speed);
            }
            Command::ClearTemp => {
                info!("Temp list cleared");
                self.selector.clear_temp();
                self.stop_current();
            }
            Command::Rewind => self.seek_current(Duration::ZERO),
            Command::Seek(position) => self.seek_current(position),
            Command::Status => self.log_status(),
            Command::Disconnect => debug!("Ignoring disconnect (connection-level command)"),
            Command::Exit => {
                info!("Exit requested");
                self.state.running = false;
            }
        }
    }

    fn set_paused(&mut self, paused: bool) {
        self.state.paused = paused;
        if let Some(track) = self.current.as_mut() {
            track.set_paused(paused);
        }
        info!("{}", if paused { "Paused" } else { "Resumed" });
    }

    fn seek_current(&mut self, position: Duration) {
        let Some(track) = self.current.as_mut() else {
            debug!("Seek ignored: no track loaded");
            return;
        };
        if let Err(e) = track.seek(position) {
            warn!("Seek failed on {}: {}", track.path().display(), e);
        }
    }

    fn stop_current(&mut self) {
        if let Some(track) = self.current.as_mut() {
            track.stop();
        }
        self.stop_requested = true;
    }

    fn release_current(&mut self) {
        if let Some(mut track) = self.current.take() {
            track.stop();
            track.destroy();
        }
    }

    fn log_status(&self) {
        match &self.current {
            Some(track) => {
                let duration = track
                    .duration()
                    .map(|d| format!("{:.1}s", d.as_secs_f64()))
                    .unwrap_or_else(|| "?".to_string());
                info!(
                    "Status: {} [{:.1}s / {}] volume={:.2} speed={:.2} paused={} temp={}",
                    track.path().display(),
                    track.position().as_secs_f64(),
                    duration,
                    self.state.volume,
                    self.state.speed,
                    self.state.paused,
                    self.selector.temp_list().len()
                );
            }
            None => info!(
                "Status: idle volume={:.2} speed={:.2} paused={} temp={}",
                self.state.volume,
                self.state.speed,
                self.state.paused,
                self.selector.temp_list().len()
            ),
        }
    }
}
