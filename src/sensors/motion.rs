//! Frame-difference motion detector.
//!
//! Compares each grayscale frame with the previous one and counts pixels
//! whose brightness moved by more than `pixel_delta`.  Motion is reported
//! when more than `changed_pixels` pixels changed.  The first frame only
//! primes the reference.

use crate::config::MotionConfig;
use crate::error::SensorError;

pub struct FrameDiffDetector {
    cfg: MotionConfig,
    previous: Vec<u8>,
    primed: bool,
    last_changed: usize,
}

impl FrameDiffDetector {
    pub fn new(cfg: MotionConfig) -> Self {
        Self {
            cfg,
            previous: vec![0; cfg.width * cfg.height],
            primed: false,
            last_changed: 0,
        }
    }

    /// Feed the next frame; `Ok(true)` when motion was detected.
    pub fn update(&mut self, frame: &[u8]) -> Result<bool, SensorError> {
        if frame.len() != self.previous.len() {
            return Err(SensorError::FrameUnavailable);
        }
        if !self.primed {
            self.previous.copy_from_slice(frame);
            self.primed = true;
            self.last_changed = 0;
            return Ok(false);
        }

        let delta = self.cfg.pixel_delta;
        self.last_changed = frame
            .iter()
            .zip(&self.previous)
            .filter(|(a, b)| a.abs_diff(**b) > delta)
            .count();
        self.previous.copy_from_slice(frame);

        let moved = self.last_changed > self.cfg.changed_pixels;
        if moved {
            log::debug!("MOTION | {} pixels changed", self.last_changed);
        }
        Ok(moved)
    }

    /// Changed-pixel count of the last comparison.
    pub fn last_changed(&self) -> usize {
        self.last_changed
    }

    pub fn reset(&mut self) {
        self.primed = false;
    }
}
