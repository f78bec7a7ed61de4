//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(role) => info!("START | role={}", role),
            AppEvent::Telemetry(s) => {
                debug!(
                    "TELEM | dist={:.1}cm weight={:.1}g air={} light={} motion={} cup={:?}",
                    s.distance_cm, s.weight_g, s.air_quality, s.light, s.motion as u8, s.cup,
                );
            }
            AppEvent::NodeTelemetry { distance_cm, weight_g, motion } => {
                info!(
                    "TELEM | dist={:.1}cm weight={:.1}g motion={}",
                    distance_cm,
                    weight_g,
                    match motion {
                        Some(true) => "1",
                        Some(false) => "0",
                        None => "-",
                    },
                );
            }
            AppEvent::FeedDispensed { angle, weight_g } => {
                info!("FEED | gate open {}° at {:.1}g", angle, weight_g);
            }
            AppEvent::GateClosed => info!("FEED | gate closed"),
            AppEvent::LatchReset { weight_g } => info!("FEED | bowl refilled ({:.1}g), latch cleared", weight_g),
            AppEvent::AlertRaised(kind) => info!("ALERT | {:?}", kind.category()),
            AppEvent::AlertThrottled(category) => debug!("ALERT | {:?} throttled", category),
            AppEvent::SensorFault(e) => warn!("FAULT | sensor: {}", e),
            AppEvent::ActuatorFault => warn!("FAULT | gate servo"),
            AppEvent::DeliveryFailed { channel, error } => warn!("LINK | {:?} delivery failed: {}", channel, error),
            AppEvent::ConnectivityChanged(state) => info!("LINK | broker {:?}", state),
        }
    }
}
