//! HX711 load-cell amplifier and weight smoothing.
//!
//! The HX711 clocks out a 24-bit two's-complement conversion on DT while
//! the MCU pulses SCK.  A 25th pulse selects channel A at gain 128 for the
//! next conversion.  The driver is generic over `embedded-hal` 1.0 pins
//! and delay so it runs against `esp-idf-hal` on the device and plain
//! mocks in tests.

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::ports::WeightPort;
use crate::config::LoadCellConfig;
use crate::error::SensorError;

/// DT stays high while a conversion is in progress (~100 ms at 10 SPS).
const READY_TIMEOUT_MS: u32 = 200;

pub struct Hx711<SCK, DT, D> {
    sck: SCK,
    dt: DT,
    delay: D,
    offset: i32,
    scale: f32,
    samples_per_read: u8,
}

impl<SCK: OutputPin, DT: InputPin, D: DelayNs> Hx711<SCK, DT, D> {
    pub fn new(sck: SCK, dt: DT, delay: D, cfg: &LoadCellConfig) -> Self {
        Self {
            sck,
            dt,
            delay,
            offset: 0,
            scale: cfg.scale,
            samples_per_read: cfg.samples_per_read.max(1),
        }
    }

    /// Record the empty-bowl offset.
    pub fn tare(&mut self, samples: u8) -> Result<i32, SensorError> {
        self.offset = self.read_average(samples.max(1))?;
        log::info!("SCALE | tare offset={}", self.offset);
        Ok(self.offset)
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Averaged, tared and scaled reading in grams.
    pub fn read_grams(&mut self) -> Result<f32, SensorError> {
        let raw = self.read_average(self.samples_per_read)?;
        Ok(counts_to_grams(raw, self.offset, self.scale))
    }

    fn read_average(&mut self, samples: u8) -> Result<i32, SensorError> {
        let mut sum: i64 = 0;
        for _ in 0..samples {
            sum += i64::from(self.read_raw()?);
        }
        Ok((sum / i64::from(samples)) as i32)
    }

    /// One conversion, sign-extended.
    pub fn read_raw(&mut self) -> Result<i32, SensorError> {
        self.wait_ready()?;
        let mut value: u32 = 0;
        for _ in 0..24 {
            self.pulse()?;
            let bit = self.dt.is_high().map_err(|_| SensorError::GpioFailed)?;
            value = (value << 1) | u32::from(bit);
        }
        // Gain 128, channel A.
        self.pulse()?;
        Ok(sign_extend_24(value))
    }

    fn wait_ready(&mut self) -> Result<(), SensorError> {
        for _ in 0..READY_TIMEOUT_MS {
            if self.dt.is_low().map_err(|_| SensorError::GpioFailed)? {
                return Ok(());
            }
            self.delay.delay_ms(1);
        }
        Err(SensorError::NotReady)
    }

    fn pulse(&mut self) -> Result<(), SensorError> {
        self.sck.set_high().map_err(|_| SensorError::GpioFailed)?;
        self.delay.delay_us(1);
        self.sck.set_low().map_err(|_| SensorError::GpioFailed)?;
        self.delay.delay_us(1);
        Ok(())
    }
}

impl<SCK: OutputPin, DT: InputPin, D: DelayNs> WeightPort for Hx711<SCK, DT, D> {
    fn weight_g(&mut self) -> Result<f32, SensorError> {
        self.read_grams()
    }
}

pub fn sign_extend_24(raw: u32) -> i32 {
    ((raw << 8) as i32) >> 8
}

pub fn counts_to_grams(raw: i32, offset: i32, scale: f32) -> f32 {
    (raw.wrapping_sub(offset)) as f32 / scale
}

// ───────────────────────────────────────────────────────────────
// Moving average
// ───────────────────────────────────────────────────────────────

/// Mean of the last `window` readings.
pub struct WeightFilter {
    window: usize,
    samples: VecDeque<f32>,
}

impl WeightFilter {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
        }
    }

    /// Add a reading and return the current average.
    pub fn push(&mut self, grams: f32) -> f32 {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(grams);
        self.average()
    }

    pub fn average(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f32>() / self.samples.len() as f32
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
