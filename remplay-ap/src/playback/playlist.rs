//! Playlist selection
//!
//! Two lists feed the player: the main list built at startup and a temp
//! list injected at runtime. The temp list always wins; when it runs dry,
//! selection falls back to the main list, continuing from where it left off.

use std::collections::VecDeque;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use remplay_common::config::{MainMode, TempMode};
use tracing::{debug, info};

/// Picks the next track from the temp and main lists
#[derive(Debug)]
pub struct PlaylistSelector {
    main_list: Vec<PathBuf>,
    temp_list: VecDeque<PathBuf>,
    main_mode: MainMode,
    temp_mode: TempMode,
    /// Index of the last main-list track handed out (default mode)
    cursor: Option<usize>,
    /// Set when the temp list has just been exhausted
    returning_to_main: bool,
    rng: StdRng,
}

impl PlaylistSelector {
    /// Create a selector seeded from OS entropy
    pub fn new(main_list: Vec<PathBuf>, main_mode: MainMode, temp_mode: TempMode) -> Self {
        Self::with_rng(main_list, main_mode, temp_mode, StdRng::from_entropy())
    }

    /// Create a selector with an explicit RNG (deterministic tests)
    pub fn with_rng(
        main_list: Vec<PathBuf>,
        main_mode: MainMode,
        temp_mode: TempMode,
        rng: StdRng,
    ) -> Self {
        Self {
            main_list,
            temp_list: VecDeque::new(),
            main_mode,
            temp_mode,
            cursor: None,
            returning_to_main: false,
            rng,
        }
    }

    /// Select the next track to play.
    ///
    /// Returns `None` only when both lists are empty.
    pub fn next_track(&mut self) -> Option<PathBuf> {
        if let Some(path) = self.temp_list.pop_front() {
            if self.temp_list.is_empty() {
                self.returning_to_main = true;
            }
            return Some(path);
        }

        if self.main_list.is_empty() {
            return None;
        }

        if std::mem::take(&mut self.returning_to_main) {
            info!("Temp list exhausted, returning to main list");
        }

        match self.main_mode {
            MainMode::Default => {
                let index = match self.cursor {
                    Some(last) => (last + 1) % self.main_list.len(),
                    None => 0,
                };
                self.cursor = Some(index);
                Some(self.main_list[index].clone())
            }
            MainMode::FullRandom => self.main_list.choose(&mut self.rng).cloned(),
        }
    }

    /// Replace the temp list wholesale, shuffling in random-pick mode.
    pub fn replace_temp(&mut self, mut paths: Vec<PathBuf>) {
        if self.temp_mode == TempMode::RandomPick {
            paths.shuffle(&mut self.rng);
        }
        debug!("Temp list replaced ({} tracks)", paths.len());
        self.returning_to_main = false;
        self.temp_list = paths.into();
    }

    /// Empty the temp list.
    pub fn clear_temp(&mut self) {
        if !self.temp_list.is_empty() {
            self.temp_list.clear();
            self.returning_to_main = true;
        }
    }

    pub fn main_list(&self) -> &[PathBuf] {
        &self.main_list
    }

    pub fn temp_list(&self) -> &VecDeque<PathBuf> {
        &self.temp_list
    }

    /// Index of the last main-list track selected in default mode
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }
}
