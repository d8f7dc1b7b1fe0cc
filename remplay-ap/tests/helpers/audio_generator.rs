//! WAV fixture generation
//!
//! Writes small deterministic 16-bit PCM files with hound so decoder and
//! backend tests have real audio to open.

use std::f32::consts::PI;
use std::path::Path;

use hound::{WavSpec, WavWriter};

/// Write a sine wave with the same signal on every channel.
pub fn generate_sine_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    duration_ms: u64,
    frequency_hz: f32,
    amplitude: f32,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;

    let total_frames = calculate_frame_count(sample_rate, duration_ms);
    let peak = amplitude * i16::MAX as f32;

    for frame_idx in 0..total_frames {
        let t = frame_idx as f32 / sample_rate as f32;
        let sample = ((2.0 * PI * frequency_hz * t).sin() * peak) as i16;
        for _ in 0..channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()
}

/// Write stereo silence.
pub fn generate_silent_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    duration_ms: u64,
) -> Result<(), hound::Error> {
    generate_sine_wav(path, sample_rate, 2, duration_ms, 0.0, 0.0)
}

/// Frames in `duration_ms` at `sample_rate`
pub fn calculate_frame_count(sample_rate: u32, duration_ms: u64) -> u64 {
    sample_rate as u64 * duration_ms / 1000
}
