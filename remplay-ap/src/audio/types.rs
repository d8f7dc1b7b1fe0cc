//! Core audio data types

use std::sync::Arc;
use std::time::Duration;

/// Single stereo audio frame (left and right samples).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioFrame {
    pub left: f32,
    pub right: f32,
}

impl AudioFrame {
    /// Silent frame
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_stereo(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// Scale both channels by `volume`
    pub fn apply_volume(&mut self, volume: f32) {
        self.left *= volume;
        self.right *= volume;
    }
}

/// Decoded, resampled track held in memory.
///
/// Samples are interleaved stereo at the output device rate.
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl PcmBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of stereo frames
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Frame at a fractional position, linearly interpolated.
    ///
    /// Returns `None` past the last frame.
    pub fn frame_at(&self, position: f64) -> Option<AudioFrame> {
        if position < 0.0 {
            return None;
        }
        let index = position.floor() as usize;
        let frames = self.frames();
        if index >= frames {
            return None;
        }

        let frac = (position - index as f64) as f32;
        let a = self.frame(index);
        if frac == 0.0 || index + 1 >= frames {
            return Some(a);
        }
        let b = self.frame(index + 1);
        Some(AudioFrame {
            left: a.left + (b.left - a.left) * frac,
            right: a.right + (b.right - a.right) * frac,
        })
    }

    fn frame(&self, index: usize) -> AudioFrame {
        AudioFrame {
            left: self.samples[index * 2],
            right: self.samples[index * 2 + 1],
        }
    }
}
