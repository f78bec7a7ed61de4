//! Outbound application events.
//!
//! The services emit these through the [`EventSink`](super::ports::EventSink)
//! port.  Adapters on the other side decide what to do with them.

use crate::connectivity::LinkState;
use crate::error::{CommsError, SensorError};
use crate::rules::{AlertCategory, AlertKind};
use crate::telemetry::SensorSnapshot;

/// Which outbound channel a delivery failure concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Broker,
    CloudLog,
    Chat,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A service has started; carries the node role.
    Started(&'static str),

    /// Snapshot the gateway just evaluated.
    Telemetry(SensorSnapshot),

    /// Readings the sensor node just published.
    NodeTelemetry { distance_cm: f32, weight_g: f32, motion: Option<bool> },

    /// Gate opened for a feed.
    FeedDispensed { angle: u8, weight_g: f32 },

    GateClosed,

    /// Weight rose above the full threshold; the fed latch is clear.
    LatchReset { weight_g: f32 },

    AlertRaised(AlertKind),

    AlertThrottled(AlertCategory),

    /// A sensor read failed; the value was substituted.
    SensorFault(SensorError),

    /// The gate servo rejected a command.
    ActuatorFault,

    DeliveryFailed { channel: Channel, error: CommsError },

    ConnectivityChanged(LinkState),
}
