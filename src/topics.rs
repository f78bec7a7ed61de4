//! Broker topic layout.
//!
//! Topic strings map onto the closed [`TopicKind`] set through a
//! [`TopicMap`].  Anything that does not map is reported as `None` rather
//! than silently matching the wrong reading.

use serde::{Deserialize, Serialize};

/// Every topic the nodes exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKind {
    /// Sensor node → gateway: distance in cm.
    Ultrasonic,
    /// Sensor node → gateway: bowl weight in g.
    Weight,
    /// Sensor node → gateway: `1` when the frame detector saw motion.
    Motion,
    /// Gateway → broker: raw MQ-135 counts.
    AirQuality,
    /// Gateway → broker: raw LDR counts.
    Light,
    /// Gateway → broker: fed latch, `1` or `0`.
    Fed,
    /// Vision server → gateway: `normal`, `tipped` or `not_found`.
    CupStatus,
}

impl TopicKind {
    pub const ALL: [TopicKind; 7] = [
        TopicKind::Ultrasonic,
        TopicKind::Weight,
        TopicKind::Motion,
        TopicKind::AirQuality,
        TopicKind::Light,
        TopicKind::Fed,
        TopicKind::CupStatus,
    ];

    /// Topics the gateway subscribes to.
    pub const GATEWAY_INBOUND: [TopicKind; 4] = [
        TopicKind::Ultrasonic,
        TopicKind::Weight,
        TopicKind::Motion,
        TopicKind::CupStatus,
    ];
}

/// Topic naming scheme.  Older firmware used the flat alias namespace;
/// later builds scope topics by node role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopicNamespace {
    Alias,
    SensorNode,
}

/// Bidirectional kind ↔ path mapping for one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicMap {
    namespace: TopicNamespace,
}

impl TopicMap {
    pub const fn new(namespace: TopicNamespace) -> Self {
        Self { namespace }
    }

    pub fn namespace(&self) -> TopicNamespace {
        self.namespace
    }

    pub fn path(&self, kind: TopicKind) -> &'static str {
        match (self.namespace, kind) {
            (_, TopicKind::CupStatus) => "@msg/status",

            (TopicNamespace::Alias, TopicKind::Ultrasonic) => "@msg/alias/ultrasonic",
            (TopicNamespace::Alias, TopicKind::Weight) => "@msg/alias/weight",
            (TopicNamespace::Alias, TopicKind::Motion) => "@msg/alias/motion",
            (TopicNamespace::Alias, TopicKind::AirQuality) => "@msg/alias/air",
            (TopicNamespace::Alias, TopicKind::Light) => "@msg/alias/light",
            (TopicNamespace::Alias, TopicKind::Fed) => "@msg/alias/fed",

            (TopicNamespace::SensorNode, TopicKind::Ultrasonic) => "@msg/sensor_node/ultrasonic",
            (TopicNamespace::SensorNode, TopicKind::Weight) => "@msg/sensor_node/weight",
            (TopicNamespace::SensorNode, TopicKind::Motion) => "@msg/sensor_node/motion",
            (TopicNamespace::SensorNode, TopicKind::AirQuality) => "@msg/gateway/air",
            (TopicNamespace::SensorNode, TopicKind::Light) => "@msg/gateway/light",
            (TopicNamespace::SensorNode, TopicKind::Fed) => "@msg/gateway/fed",
        }
    }

    /// Resolve an incoming topic string.  Exact match only.
    pub fn parse(&self, topic: &str) -> Option<TopicKind> {
        TopicKind::ALL.into_iter().find(|&k| self.path(k) == topic)
    }
}
