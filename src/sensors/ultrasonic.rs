//! HC-SR04 ultrasonic range finder.
//!
//! A 10 µs trigger pulse starts a ping; the echo line then stays high for
//! the round-trip time of the sound.  Both the wait for the rising edge
//! and the pulse itself are bounded by `timeout_us`.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::ports::RangePort;
use crate::error::SensorError;

/// Speed of sound, cm per µs.
const SOUND_CM_PER_US: f32 = 0.0343;

/// Round-trip echo time → one-way distance.
pub fn echo_to_cm(echo_us: u32) -> f32 {
    echo_us as f32 * SOUND_CM_PER_US / 2.0
}

pub struct HcSr04<TRIG, ECHO, D> {
    trig: TRIG,
    echo: ECHO,
    delay: D,
    /// Monotonic microsecond clock.
    clock: fn() -> u64,
    timeout_us: u32,
}

impl<TRIG: OutputPin, ECHO: InputPin, D: DelayNs> HcSr04<TRIG, ECHO, D> {
    pub fn new(trig: TRIG, echo: ECHO, delay: D, clock: fn() -> u64, timeout_us: u32) -> Self {
        Self {
            trig,
            echo,
            delay,
            clock,
            timeout_us,
        }
    }

    /// Fire one ping and time the echo pulse.
    pub fn echo_us(&mut self) -> Result<u32, SensorError> {
        self.trig.set_low().map_err(|_| SensorError::GpioFailed)?;
        self.delay.delay_us(2);
        self.trig.set_high().map_err(|_| SensorError::GpioFailed)?;
        self.delay.delay_us(10);
        self.trig.set_low().map_err(|_| SensorError::GpioFailed)?;

        let timeout = u64::from(self.timeout_us);

        let wait_start = (self.clock)();
        while !self.echo.is_high().map_err(|_| SensorError::GpioFailed)? {
            if (self.clock)().saturating_sub(wait_start) >= timeout {
                return Err(SensorError::EchoTimeout);
            }
        }

        let rise = (self.clock)();
        while self.echo.is_high().map_err(|_| SensorError::GpioFailed)? {
            if (self.clock)().saturating_sub(rise) >= timeout {
                return Err(SensorError::EchoTimeout);
            }
        }
        Ok((self.clock)().saturating_sub(rise) as u32)
    }
}

impl<TRIG: OutputPin, ECHO: InputPin, D: DelayNs> RangePort for HcSr04<TRIG, ECHO, D> {
    fn distance_cm(&mut self) -> Result<f32, SensorError> {
        self.echo_us().map(echo_to_cm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use core::sync::atomic::{AtomicU64, Ordering};
    use embedded_hal::digital::ErrorType;

    struct Trig;
    impl ErrorType for Trig {
        type Error = Infallible;
    }
    impl OutputPin for Trig {
        fn set_low(&mut self) -> Result<(), Infallible> {
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            Ok(())
        }
    }

    /// Echo line driven from the shared fake clock: high during
    /// `[rise, fall)`.
    struct Echo {
        rise: u64,
        fall: u64,
        clock: &'static AtomicU64,
    }
    impl ErrorType for Echo {
        type Error = Infallible;
    }
    impl InputPin for Echo {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            let t = self.clock.load(Ordering::Relaxed);
            Ok(t >= self.rise && t < self.fall)
        }
        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|h| !h)
        }
    }

    struct NoDelay;
    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    // Each test owns its clock so they can run in parallel.
    static CLOCK_A: AtomicU64 = AtomicU64::new(0);
    static CLOCK_B: AtomicU64 = AtomicU64::new(0);

    fn tick_a() -> u64 {
        CLOCK_A.fetch_add(1, Ordering::Relaxed) + 1
    }
    fn tick_b() -> u64 {
        CLOCK_B.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[test]
    fn conversion_constant() {
        assert!((echo_to_cm(1000) - 17.15).abs() < 1e-3);
        assert_eq!(echo_to_cm(0), 0.0);
    }

    #[test]
    fn measures_pulse_width() {
        let echo = Echo { rise: 100, fall: 683, clock: &CLOCK_A };
        let mut s = HcSr04::new(Trig, echo, NoDelay, tick_a, 30_000);
        let us = s.echo_us().unwrap();
        assert!((582..=585).contains(&us), "width {}", us);

        // Line stays low from now on.
        assert_eq!(s.distance_cm(), Err(SensorError::EchoTimeout));
    }

    #[test]
    fn missing_echo_times_out() {
        let echo = Echo { rise: u64::MAX, fall: u64::MAX, clock: &CLOCK_B };
        let mut s = HcSr04::new(Trig, echo, NoDelay, tick_b, 30_000);
        assert_eq!(s.echo_us(), Err(SensorError::EchoTimeout));
    }
}
