//! Sensor subsystem.
//!
//! Gateway side: the MQ-135 air-quality and LDR light channels read
//! through ADC1 ([`AnalogSensors`]).  Sensor-node side: the HC-SR04 range
//! finder, the HX711 load cell and the camera frame-difference detector.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads ADC1 CH6/CH7 via the oneshot API (initialised by hw_init).
//! On host/test: reads from static atomics for injection.

pub mod load_cell;
pub mod motion;
pub mod ultrasonic;

use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use crate::error::SensorError;

static SIM_AIR_ADC: AtomicU16 = AtomicU16::new(0);
static SIM_LIGHT_ADC: AtomicU16 = AtomicU16::new(2048);
static SIM_ADC_FAULT: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_air_adc(raw: u16) {
    SIM_AIR_ADC.store(raw, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_light_adc(raw: u16) {
    SIM_LIGHT_ADC.store(raw, Ordering::Relaxed);
}

/// Make every simulated ADC read fail until cleared.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_adc_fault(fault: bool) {
    SIM_ADC_FAULT.store(fault, Ordering::Relaxed);
}

/// The gateway's two analog inputs.  Values are raw 12-bit counts.
pub struct AnalogSensors {
    _private: (),
}

impl Default for AnalogSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalogSensors {
    pub fn new() -> Self {
        Self { _private: () }
    }

    pub fn read_air(&mut self) -> Result<u16, SensorError> {
        Self::read_channel(crate::drivers::hw_init::ADC1_CH_AIR, &SIM_AIR_ADC)
    }

    pub fn read_light(&mut self) -> Result<u16, SensorError> {
        Self::read_channel(crate::drivers::hw_init::ADC1_CH_LIGHT, &SIM_LIGHT_ADC)
    }

    #[cfg(target_os = "espidf")]
    fn read_channel(channel: u32, _sim: &AtomicU16) -> Result<u16, SensorError> {
        crate::drivers::hw_init::adc1_read(channel)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_channel(_channel: u32, sim: &AtomicU16) -> Result<u16, SensorError> {
        if SIM_ADC_FAULT.load(Ordering::Relaxed) {
            return Err(SensorError::AdcReadFailed);
        }
        Ok(sim.load(Ordering::Relaxed).min(4095))
    }
}
