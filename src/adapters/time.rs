//! Monotonic time since boot.
//!
//! - **`target_os = "espidf"`**: `esp_timer_get_time()`, the ESP-IDF
//!   high-resolution timer (µs, monotonic).
//! - **other targets**: `std::time::Instant` anchored at first use.

/// Microseconds since boot.  Plain `fn` so drivers can take it as a clock.
#[cfg(target_os = "espidf")]
pub fn now_us() -> u64 {
    // SAFETY: read-only query of the system timer.
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
}

#[cfg(not(target_os = "espidf"))]
pub fn now_us() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_micros() as u64
}

/// Loop clock handed to the services.
#[derive(Debug, Default, Clone, Copy)]
pub struct Uptime;

impl Uptime {
    pub fn new() -> Self {
        Self
    }

    pub fn uptime_ms(&self) -> u64 {
        now_us() / 1_000
    }

    pub fn uptime_us(&self) -> u64 {
        now_us()
    }
}
