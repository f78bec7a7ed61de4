//! Hardware adapters: each board's peripherals behind its port traits.
//!
//! [`GatewayHardware`] owns the analog sensors and the gate servo, exposing
//! them through [`AnalogPort`] and [`ServoPort`].  [`NodeHardware`] pairs
//! the sensor node's range finder with its load cell.  On non-espidf
//! targets the gateway drivers run their simulation stubs.

use crate::app::ports::{AnalogPort, RangePort, ServoPort, WeightPort};
use crate::drivers::servo::ServoDriver;
use crate::error::{ActuatorError, SensorError};
use crate::sensors::AnalogSensors;

pub struct GatewayHardware {
    sensors: AnalogSensors,
    servo: ServoDriver,
}

impl GatewayHardware {
    pub fn new(sensors: AnalogSensors, servo: ServoDriver) -> Self {
        Self { sensors, servo }
    }

    /// Last angle written to the gate, if any.
    pub fn gate_angle(&self) -> Option<u8> {
        self.servo.angle()
    }
}

impl AnalogPort for GatewayHardware {
    fn read_air_quality(&mut self) -> Result<u16, SensorError> {
        self.sensors.read_air()
    }

    fn read_light(&mut self) -> Result<u16, SensorError> {
        self.sensors.read_light()
    }
}

impl ServoPort for GatewayHardware {
    fn write_angle(&mut self, angle: u8) -> Result<(), ActuatorError> {
        self.servo.set_angle(angle)
    }
}

/// Sensor-node peripherals: one range finder, one load cell.
pub struct NodeHardware<R, W> {
    pub range: R,
    pub scale: W,
}

impl<R, W> NodeHardware<R, W> {
    pub fn new(range: R, scale: W) -> Self {
        Self { range, scale }
    }
}

impl<R: RangePort, W> RangePort for NodeHardware<R, W> {
    fn distance_cm(&mut self) -> Result<f32, SensorError> {
        self.range.distance_cm()
    }
}

impl<R, W: WeightPort> WeightPort for NodeHardware<R, W> {
    fn weight_g(&mut self) -> Result<f32, SensorError> {
        self.scale.weight_g()
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::drivers::hw_init::LEDC_CH_SERVO;

    #[test]
    fn servo_writes_are_tracked() {
        let mut hw = GatewayHardware::new(AnalogSensors::new(), ServoDriver::new(LEDC_CH_SERVO));
        assert_eq!(hw.gate_angle(), None);
        hw.write_angle(90).unwrap();
        assert_eq!(hw.gate_angle(), Some(90));
    }
}
