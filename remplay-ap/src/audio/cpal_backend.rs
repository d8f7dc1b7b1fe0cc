//! symphonia + cpal backend
//!
//! Tracks are decoded fully into memory at open time and resampled to the
//! device rate. One output stream renders whichever track currently holds
//! the active slot, applying that track's volume, speed and pause state.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::backend::{AudioBackend, Track};
use super::decoder;
use super::output::AudioOutput;
use super::resampler::Resampler;
use super::types::{AudioFrame, PcmBuffer};
use crate::error::{Error, Result};

/// Playback state of one track, shared with the audio callback
#[derive(Debug)]
struct Voice {
    buffer: PcmBuffer,
    /// Fractional frame position
    position: f64,
    speed: f32,
    volume: f32,
    paused: bool,
    active: bool,
    finished: bool,
}

impl Voice {
    fn new(buffer: PcmBuffer) -> Self {
        Self {
            buffer,
            position: 0.0,
            speed: 1.0,
            volume: 1.0,
            paused: false,
            active: false,
            finished: false,
        }
    }

    fn next_frame(&mut self) -> AudioFrame {
        if !self.active || self.paused || self.finished {
            return AudioFrame::zero();
        }

        match self.buffer.frame_at(self.position) {
            Some(mut frame) => {
                frame.apply_volume(self.volume);
                self.position += f64::from(self.speed);
                frame
            }
            None => {
                self.finished = true;
                AudioFrame::zero()
            }
        }
    }
}

type SharedVoice = Arc<Mutex<Voice>>;
type ActiveSlot = Arc<Mutex<Option<SharedVoice>>>;

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn render(slot: &ActiveSlot) -> AudioFrame {
    let Ok(active) = slot.try_lock() else {
        return AudioFrame::zero();
    };
    match active.as_ref() {
        Some(voice) => match voice.try_lock() {
            Ok(mut voice) => voice.next_frame(),
            Err(_) => AudioFrame::zero(),
        },
        None => AudioFrame::zero(),
    }
}

/// Audio backend playing through a cpal output stream
pub struct CpalBackend {
    output: AudioOutput,
    slot: ActiveSlot,
}

impl CpalBackend {
    /// Open the output device and start the (initially silent) stream.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let mut output = AudioOutput::new(device_name)?;
        let slot: ActiveSlot = Arc::new(Mutex::new(None));

        let callback_slot = Arc::clone(&slot);
        output.start(move || render(&callback_slot))?;

        Ok(Self { output, slot })
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn open(&mut self, path: &Path) -> Result<Box<dyn Track>> {
        let track_open = |reason: String| Error::TrackOpen {
            path: path.to_path_buf(),
            reason,
        };

        let decoded = decoder::decode_file(path).map_err(|e| track_open(e.to_string()))?;
        let device_rate = self.output.sample_rate();
        let samples = Resampler::resample(&decoded.samples, decoded.sample_rate, device_rate, 2)
            .map_err(|e| track_open(e.to_string()))?;

        let buffer = PcmBuffer::new(samples, device_rate);
        debug!(
            "Opened {} ({:.1}s)",
            path.display(),
            buffer.duration().as_secs_f64()
        );

        Ok(Box::new(CpalTrack {
            path: path.to_path_buf(),
            voice: Arc::new(Mutex::new(Voice::new(buffer))),
            slot: Arc::clone(&self.slot),
            sample_rate: device_rate,
            destroyed: false,
        }))
    }

    fn update(&mut self) {
        if self.output.take_error() {
            warn!("Audio stream reported an error");
        }
    }
}

struct CpalTrack {
    path: PathBuf,
    voice: SharedVoice,
    slot: ActiveSlot,
    sample_rate: u32,
    destroyed: bool,
}

impl CpalTrack {
    fn release_slot(&self) {
        let mut active = lock(&self.slot);
        if active.as_ref().is_some_and(|v| Arc::ptr_eq(v, &self.voice)) {
            *active = None;
        }
    }
}

impl Track for CpalTrack {
    fn path(&self) -> &Path {
        &self.path
    }

    fn play(&mut self) -> Result<()> {
        if self.destroyed {
            return Err(Error::Playback(format!(
                "{} was already released",
                self.path.display()
            )));
        }
        {
            let mut voice = lock(&self.voice);
            voice.position = 0.0;
            voice.finished = false;
            voice.active = true;
        }
        *lock(&self.slot) = Some(Arc::clone(&self.voice));
        Ok(())
    }

    fn stop(&mut self) {
        lock(&self.voice).active = false;
        self.release_slot();
    }

    fn set_paused(&mut self, paused: bool) {
        lock(&self.voice).paused = paused;
    }

    fn set_volume(&mut self, volume: f32) {
        lock(&self.voice).volume = volume;
    }

    fn set_speed(&mut self, speed: f32) {
        lock(&self.voice).speed = speed;
    }

    fn is_playing(&self) -> bool {
        let voice = lock(&self.voice);
        voice.active && !voice.finished
    }

    fn position(&self) -> Duration {
        let position = lock(&self.voice).position;
        Duration::from_secs_f64(position / f64::from(self.sample_rate))
    }

    fn duration(&self) -> Option<Duration> {
        Some(lock(&self.voice).buffer.duration())
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        let mut voice = lock(&self.voice);
        let frames = voice.buffer.frames() as f64;
        voice.position = (position.as_secs_f64() * f64::from(self.sample_rate)).min(frames);
        voice.finished = false;
        Ok(())
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.stop();
        self.destroyed = true;
        info!("Released {}", self.path.display());
    }
}

impl Drop for CpalTrack {
    fn drop(&mut self) {
        self.destroy();
    }
}
