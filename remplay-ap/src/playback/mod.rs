//! Playback: command parsing, playlist selection and the session loop

pub mod commands;
pub mod playlist;
pub mod session;

pub use commands::{Adjustment, Command, CommandError, CommandParser};
pub use playlist::PlaylistSelector;
pub use session::{PlaybackSession, SessionState};
