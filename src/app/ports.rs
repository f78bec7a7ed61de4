//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ GatewayService / SensorNodeService (domain)
//! ```
//!
//! Driven adapters (ADC, servo, broker, HTTP, node sensors, event sinks)
//! implement these traits.  The services consume them via generics, so the
//! domain core never touches hardware or sockets directly.
//!
//! All port errors are typed; callers decide per variant whether a failure
//! keeps the previous value, clamps to zero or is just logged.

use crate::connectivity::LinkState;
use crate::error::{ActuatorError, CommsError, SensorError};

// ───────────────────────────────────────────────────────────────
// Gateway: local sensors (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw ADC channels wired to the gateway.
pub trait AnalogPort {
    /// MQ-135 air-quality counts (0 – 4095).
    fn read_air_quality(&mut self) -> Result<u16, SensorError>;

    /// LDR light counts (0 – 4095).
    fn read_light(&mut self) -> Result<u16, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Gateway: feeder gate (domain → hardware)
// ───────────────────────────────────────────────────────────────

pub trait ServoPort {
    /// Move the gate servo to `degrees` (0 – 180).
    fn write_angle(&mut self, degrees: u8) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Broker (domain ↔ pub/sub relay)
// ───────────────────────────────────────────────────────────────

/// Publish/subscribe session with the message broker.
///
/// `poll` hands every message received since the last call to `handler`,
/// synchronously, on the loop thread.
pub trait BrokerPort {
    /// Drive (re)connection; cheap when already connected.
    fn maintain(&mut self, now_ms: u64) -> LinkState;

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError>;

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError>;

    fn poll(&mut self, handler: &mut dyn FnMut(&str, &[u8]));
}

// ───────────────────────────────────────────────────────────────
// Cloud sinks (domain → HTTP)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget JSON posts.  The returned status code is only logged.
pub trait CloudPort {
    /// POST a log row to the REST database.
    fn post_log(&mut self, json: &str) -> Result<u16, CommsError>;

    /// POST a message to the chat webhook.
    fn post_chat(&mut self, json: &str) -> Result<u16, CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Sensor node (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Ultrasonic range finder.
pub trait RangePort {
    fn distance_cm(&mut self) -> Result<f32, SensorError>;
}

/// Load cell behind an HX711, already tared and scaled.
pub trait WeightPort {
    fn weight_g(&mut self) -> Result<f32, SensorError>;
}

/// Grayscale camera.
pub trait FramePort {
    /// Fill `buf` (width × height bytes) with the next frame.
    fn capture(&mut self, buf: &mut [u8]) -> Result<(), SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
