//! Command parsing
//!
//! Turns one trimmed command string (a single element of a batch) into a
//! typed [`Command`]. Keywords are matched exactly; anything else is treated
//! as a candidate file path for the temp list.

use std::path::{Path, PathBuf};
use std::time::Duration;

use remplay_common::config::has_allowed_extension;
use remplay_common::protocol::{DISCONNECT, EXIT_WORDS};
use thiserror::Error;

/// Volume or speed change.
///
/// A leading `+` or `-` makes the value relative to the current setting;
/// an unsigned value sets it outright.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjustment {
    /// Set to this value
    Absolute(f32),
    /// Add this (signed) delta
    Relative(f32),
}

impl Adjustment {
    /// Resolve against `current` and clamp into `[0, max]`.
    pub fn apply(self, current: f32, max: f32) -> f32 {
        let target = match self {
            Adjustment::Absolute(value) => value,
            Adjustment::Relative(delta) => current + delta,
        };
        target.clamp(0.0, max)
    }
}

/// A parsed control command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Existing file with an allowed extension, destined for the temp list
    Enqueue(PathBuf),
    /// Stop the current track; the next selection follows
    Next,
    Pause,
    Resume,
    TogglePause,
    Volume(Adjustment),
    Speed(Adjustment),
    /// Empty the temp list and stop the current track
    ClearTemp,
    /// Restart the current track
    Rewind,
    /// Jump to an absolute position in the current track
    Seek(Duration),
    /// Log the current session state
    Status,
    /// Connection-level command; no playback effect
    Disconnect,
    /// Terminate the session
    Exit,
}

/// Why a command string was rejected
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("unsupported format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("'{command}' requires an argument")]
    MissingArgument { command: &'static str },

    #[error("invalid argument '{argument}' for '{command}'")]
    InvalidNumber {
        command: &'static str,
        argument: String,
    },
}

/// Parses single commands against the allowed format list
#[derive(Debug, Clone)]
pub struct CommandParser {
    formats: Vec<String>,
}

impl CommandParser {
    /// `formats` are lowercase extensions without the leading dot.
    pub fn new(formats: Vec<String>) -> Self {
        Self { formats }
    }

    /// Parse one command.
    pub fn parse(&self, raw: &str) -> Result<Command, CommandError> {
        let raw = raw.trim();
        let (word, argument) = match raw.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (raw, ""),
        };

        match word {
            "next" if argument.is_empty() => Ok(Command::Next),
            "pause" if argument.is_empty() => Ok(Command::Pause),
            "resume" if argument.is_empty() => Ok(Command::Resume),
            "toggle_pause" if argument.is_empty() => Ok(Command::TogglePause),
            "clear_temp" if argument.is_empty() => Ok(Command::ClearTemp),
            "rewind" if argument.is_empty() => Ok(Command::Rewind),
            "status" if argument.is_empty() => Ok(Command::Status),
            w if w == DISCONNECT && argument.is_empty() => Ok(Command::Disconnect),
            w if EXIT_WORDS.contains(&w) && argument.is_empty() => Ok(Command::Exit),
            "volume" => parse_adjustment("volume", argument)
                .map(Command::Volume)
                .or_else(|e| self.parse_path_or(raw, e)),
            "speed" => parse_adjustment("speed", argument)
                .map(Command::Speed)
                .or_else(|e| self.parse_path_or(raw, e)),
            "seek" => parse_seek(argument)
                .map(Command::Seek)
                .or_else(|e| self.parse_path_or(raw, e)),
            _ => self.parse_path(raw),
        }
    }

    /// A file named like a numeric command still enqueues; otherwise keep `err`.
    fn parse_path_or(&self, raw: &str, err: CommandError) -> Result<Command, CommandError> {
        if Path::new(raw).is_file() {
            self.parse_path(raw)
        } else {
            Err(err)
        }
    }

    fn parse_path(&self, raw: &str) -> Result<Command, CommandError> {
        let path = Path::new(raw);
        if !path.is_file() {
            return Err(CommandError::Unknown(raw.to_string()));
        }
        if !has_allowed_extension(path, &self.formats) {
            return Err(CommandError::UnsupportedFormat(path.to_path_buf()));
        }
        Ok(Command::Enqueue(path.to_path_buf()))
    }
}

fn parse_number(command: &'static str, argument: &str) -> Result<f32, CommandError> {
    let invalid = || CommandError::InvalidNumber {
        command,
        argument: argument.to_string(),
    };

    if argument.is_empty() {
        return Err(CommandError::MissingArgument { command });
    }
    if argument.contains(char::is_whitespace) {
        return Err(invalid());
    }

    let value: f32 = argument.parse().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }
    Ok(value)
}

fn parse_adjustment(command: &'static str, argument: &str) -> Result<Adjustment, CommandError> {
    let value = parse_number(command, argument)?;
    if argument.starts_with(['+', '-']) {
        Ok(Adjustment::Relative(value))
    } else {
        Ok(Adjustment::Absolute(value))
    }
}

fn parse_seek(argument: &str) -> Result<Duration, CommandError> {
    let invalid = || CommandError::InvalidNumber {
        command: "seek",
        argument: argument.to_string(),
    };

    let seconds = parse_number("seek", argument)?;
    if seconds < 0.0 {
        return Err(invalid());
    }
    Duration::try_from_secs_f64(f64::from(seconds)).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parser() -> CommandParser {
        CommandParser::new(vec!["mp3".to_string(), "flac".to_string()])
    }

    #[test]
    fn test_keywords() {
        let p = parser();
        assert_eq!(p.parse("next").unwrap(), Command::Next);
        assert_eq!(p.parse(" pause ").unwrap(), Command::Pause);
        assert_eq!(p.parse("resume").unwrap(), Command::Resume);
        assert_eq!(p.parse("toggle_pause").unwrap(), Command::TogglePause);
        assert_eq!(p.parse("clear_temp").unwrap(), Command::ClearTemp);
        assert_eq!(p.parse("rewind").unwrap(), Command::Rewind);
        assert_eq!(p.parse("status").unwrap(), Command::Status);
        assert_eq!(p.parse("disconnect").unwrap(), Command::Disconnect);
        assert_eq!(p.parse("exit").unwrap(), Command::Exit);
        assert_eq!(p.parse("quit").unwrap(), Command::Exit);
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        assert_eq!(
            parser().parse("NEXT"),
            Err(CommandError::Unknown("NEXT".to_string()))
        );
    }

    #[test]
    fn test_keyword_with_trailing_argument_is_unknown() {
        assert!(matches!(parser().parse("next please"), Err(CommandError::Unknown(_))));
    }

    #[test]
    fn test_signed_values_are_relative() {
        let p = parser();
        assert_eq!(
            p.parse("volume -0.3").unwrap(),
            Command::Volume(Adjustment::Relative(-0.3))
        );
        assert_eq!(
            p.parse("speed +0.5").unwrap(),
            Command::Speed(Adjustment::Relative(0.5))
        );
    }

    #[test]
    fn test_unsigned_values_are_absolute() {
        let p = parser();
        assert_eq!(
            p.parse("volume 0.8").unwrap(),
            Command::Volume(Adjustment::Absolute(0.8))
        );
        assert_eq!(
            p.parse("speed   2").unwrap(),
            Command::Speed(Adjustment::Absolute(2.0))
        );
    }

    #[test]
    fn test_bad_numeric_arguments() {
        let p = parser();
        assert_eq!(
            p.parse("volume"),
            Err(CommandError::MissingArgument { command: "volume" })
        );
        assert!(matches!(
            p.parse("volume loud"),
            Err(CommandError::InvalidNumber { command: "volume", .. })
        ));
        assert!(matches!(
            p.parse("speed 1 2"),
            Err(CommandError::InvalidNumber { command: "speed", .. })
        ));
        assert!(matches!(
            p.parse("volume NaN"),
            Err(CommandError::InvalidNumber { .. })
        ));
        assert!(matches!(
            p.parse("seek -5"),
            Err(CommandError::InvalidNumber { command: "seek", .. })
        ));
    }

    #[test]
    fn test_seek_beyond_duration_range_is_rejected() {
        let p = parser();
        assert!(matches!(
            p.parse("seek 1e30"),
            Err(CommandError::InvalidNumber { command: "seek", .. })
        ));
        assert!(matches!(
            p.parse("seek 3.4e38"),
            Err(CommandError::InvalidNumber { command: "seek", .. })
        ));
    }

    #[test]
    fn test_seek_position() {
        assert_eq!(
            parser().parse("seek 12.5").unwrap(),
            Command::Seek(Duration::from_millis(12_500))
        );
    }

    #[test]
    fn test_existing_file_with_allowed_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("song.MP3");
        std::fs::write(&path, b"").unwrap();

        let raw = path.to_str().unwrap();
        assert_eq!(parser().parse(raw).unwrap(), Command::Enqueue(path.clone()));
    }

    #[test]
    fn test_path_with_spaces_and_keyword_prefix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("next track.flac");
        std::fs::write(&path, b"").unwrap();

        let raw = path.to_str().unwrap();
        assert_eq!(parser().parse(raw).unwrap(), Command::Enqueue(path.clone()));
    }

    #[test]
    fn test_relative_path_starting_with_numeric_keyword() {
        // Relative to the working directory so the raw string starts with "volume "
        let dir = tempfile::Builder::new()
            .prefix("volume ")
            .tempdir_in(".")
            .unwrap();
        let relative = PathBuf::from(dir.path().file_name().unwrap()).join("2.mp3");
        std::fs::write(&relative, b"").unwrap();

        let raw = relative.to_str().unwrap();
        assert_eq!(parser().parse(raw).unwrap(), Command::Enqueue(relative.clone()));

        // Without a matching file the numeric error stands
        assert!(matches!(
            parser().parse("volume 2.mp3"),
            Err(CommandError::InvalidNumber { command: "volume", .. })
        ));
    }

    #[test]
    fn test_existing_file_with_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cover.jpg");
        std::fs::write(&path, b"").unwrap();

        assert_eq!(
            parser().parse(path.to_str().unwrap()),
            Err(CommandError::UnsupportedFormat(path.clone()))
        );
    }

    #[test]
    fn test_missing_file_is_unknown() {
        assert!(matches!(
            parser().parse("/no/such/file.mp3"),
            Err(CommandError::Unknown(_))
        ));
    }

    #[test]
    fn test_adjustment_apply_clamps() {
        assert_eq!(Adjustment::Relative(-0.3).apply(0.2, 1.0), 0.0);
        assert_eq!(Adjustment::Relative(0.7).apply(0.5, 1.0), 1.0);
        assert_eq!(Adjustment::Absolute(5000.0).apply(1.0, 1000.0), 1000.0);
        assert_eq!(Adjustment::Absolute(0.25).apply(0.9, 1.0), 0.25);
    }
}
