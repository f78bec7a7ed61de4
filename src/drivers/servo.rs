//! Feeder-gate servo driver.
//!
//! Maps an angle (0 – 180°) to a pulse width between
//! [`SERVO_MIN_PULSE_US`] and [`SERVO_MAX_PULSE_US`] inside the 20 ms
//! frame, then to a 14-bit LEDC duty.
//!
//! On host builds the LEDC write is a no-op; the last angle is still
//! tracked so the simulation can report it.

use core::sync::atomic::{AtomicU8, Ordering};

use log::debug;

use crate::drivers::hw_init;
use crate::error::ActuatorError;
use crate::pins::{SERVO_DUTY_BITS, SERVO_MAX_PULSE_US, SERVO_MIN_PULSE_US, SERVO_PWM_FREQ_HZ};

static SIM_SERVO_ANGLE: AtomicU8 = AtomicU8::new(0);

/// Last angle commanded in simulation.
#[cfg(not(target_os = "espidf"))]
pub fn sim_servo_angle() -> u8 {
    SIM_SERVO_ANGLE.load(Ordering::Relaxed)
}

pub const MAX_ANGLE: u8 = 180;

/// Pulse width for `angle`, clamped to the servo's range.
pub fn angle_to_pulse_us(angle: u8) -> u32 {
    let angle = u32::from(angle.min(MAX_ANGLE));
    SERVO_MIN_PULSE_US + (SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US) * angle / u32::from(MAX_ANGLE)
}

/// LEDC duty for a pulse width at the servo frame rate.
pub fn pulse_to_duty(pulse_us: u32) -> u32 {
    let period_us = 1_000_000 / SERVO_PWM_FREQ_HZ;
    let full = (1u32 << SERVO_DUTY_BITS) - 1;
    ((u64::from(pulse_us) * u64::from(full)) / u64::from(period_us)) as u32
}

pub fn angle_to_duty(angle: u8) -> u32 {
    pulse_to_duty(angle_to_pulse_us(angle))
}

pub struct ServoDriver {
    channel: u32,
    angle: Option<u8>,
}

impl ServoDriver {
    pub fn new(channel: u32) -> Self {
        Self { channel, angle: None }
    }

    pub fn set_angle(&mut self, angle: u8) -> Result<(), ActuatorError> {
        let angle = angle.min(MAX_ANGLE);
        let duty = angle_to_duty(angle);
        hw_init::ledc_set(self.channel, duty).map_err(|_| ActuatorError::PwmWriteFailed)?;
        SIM_SERVO_ANGLE.store(angle, Ordering::Relaxed);
        debug!("servo: {}° (duty={})", angle, duty);
        self.angle = Some(angle);
        Ok(())
    }

    /// `None` until the first successful write.
    pub fn angle(&self) -> Option<u8> {
        self.angle
    }
}
