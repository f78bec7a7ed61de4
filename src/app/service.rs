//! Gateway service — the hexagonal core of the gateway node.
//!
//! [`GatewayService`] owns the latest readings and the controller state.
//! Each [`tick`](GatewayService::tick) runs one loop iteration:
//! broker upkeep → local ADC reads → [`rules::decide`] → actuation and
//! delivery.  All I/O flows through port traits injected at call sites.
//!
//! ```text
//!  BrokerPort ──▶ ┌────────────────────────┐ ──▶ CloudPort
//!  AnalogPort ──▶ │     GatewayService     │ ──▶ EventSink
//!   ServoPort ◀── │  latest · rules · gate │
//!                 └────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::connectivity::LinkState;
use crate::error::CommsError;
use crate::rules::{self, ControllerState, Decision, RuleEvent};
use crate::telemetry::{ChatMessage, CupStatus, SensorSnapshot, parse_flag, parse_reading};
use crate::topics::{TopicKind, TopicMap};

use super::events::{AppEvent, Channel};
use super::ports::{AnalogPort, BrokerPort, CloudPort, EventSink, ServoPort};

/// The gateway's application service.
pub struct GatewayService {
    config: GatewayConfig,
    topics: TopicMap,
    /// Most recent value of every reading; last write wins.
    latest: SensorSnapshot,
    state: ControllerState,
    broker: LinkState,
}

impl GatewayService {
    /// Construct from configuration.  The stillness clock starts at `boot_ms`.
    pub fn new(config: GatewayConfig, boot_ms: u64) -> Self {
        let topics = TopicMap::new(config.namespace);
        Self {
            config,
            topics,
            latest: SensorSnapshot::default(),
            state: ControllerState::new(boot_ms),
            broker: LinkState::Down,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive the gate to its closed position and announce the start.
    pub fn start(&mut self, servo: &mut impl ServoPort, sink: &mut impl EventSink) {
        if let Err(e) = servo.write_angle(self.config.rules.closed_angle) {
            warn!("FEED | could not close gate at boot: {}", e);
            sink.emit(&AppEvent::ActuatorFault);
        }
        sink.emit(&AppEvent::Started("gateway"));
        info!("GatewayService started ({:?} topics)", self.topics.namespace());
    }

    // ── Inbound messages ──────────────────────────────────────

    /// Apply one broker message to the latest readings.
    ///
    /// Returns the kind that was updated, or `None` when the topic is
    /// unknown or not consumed by the gateway.
    pub fn handle_message(&mut self, topic: &str, payload: &[u8]) -> Option<TopicKind> {
        let Some(kind) = self.topics.parse(topic) else {
            debug!("MSG | ignoring unknown topic {:?}", topic);
            return None;
        };
        match kind {
            TopicKind::Ultrasonic => {
                self.latest.distance_cm = parse_reading(payload);
                self.latest.distance_seen = true;
            }
            TopicKind::Weight => {
                self.latest.weight_g = parse_reading(payload);
                self.latest.weight_seen = true;
            }
            TopicKind::Motion => self.latest.motion = parse_flag(payload),
            TopicKind::CupStatus => self.latest.cup = CupStatus::parse(payload),
            TopicKind::AirQuality | TopicKind::Light | TopicKind::Fed => {
                debug!("MSG | ignoring own {:?} topic", kind);
                return None;
            }
        }
        Some(kind)
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one loop iteration at `now_ms`.
    ///
    /// `hw` satisfies both [`AnalogPort`] and [`ServoPort`], mirroring the
    /// single peripheral owner on the board.
    pub fn tick(
        &mut self,
        hw: &mut (impl AnalogPort + ServoPort),
        broker: &mut impl BrokerPort,
        cloud: &mut impl CloudPort,
        sink: &mut impl EventSink,
        now_ms: u64,
    ) {
        // 1. Broker upkeep and inbound dispatch
        self.maintain_broker(broker, sink, now_ms);
        if self.broker.is_up() {
            broker.poll(&mut |topic, payload| {
                self.handle_message(topic, payload);
            });
        }

        // 2. Local readings; a failed read keeps the previous value
        match hw.read_air_quality() {
            Ok(v) => self.latest.air_quality = v,
            Err(e) => {
                warn!("TELEM | air read failed: {}", e);
                sink.emit(&AppEvent::SensorFault(e));
            }
        }
        match hw.read_light() {
            Ok(v) => self.latest.light = v,
            Err(e) => {
                warn!("TELEM | light read failed: {}", e);
                sink.emit(&AppEvent::SensorFault(e));
            }
        }

        // 3. Decide
        let snapshot = self.latest.clamped();
        sink.emit(&AppEvent::Telemetry(snapshot));
        let decision = rules::decide(&self.config, &self.state, &snapshot, now_ms);

        // 4. Execute
        self.apply(&decision, hw, broker, cloud, sink);
        self.state = decision.next;
    }

    fn maintain_broker(&mut self, broker: &mut impl BrokerPort, sink: &mut impl EventSink, now_ms: u64) {
        let link = broker.maintain(now_ms);
        if link == self.broker {
            return;
        }
        if link.is_up() {
            for kind in TopicKind::GATEWAY_INBOUND {
                let topic = self.topics.path(kind);
                if let Err(e) = broker.subscribe(topic) {
                    warn!("LINK | subscribe {} failed: {}", topic, e);
                    sink.emit(&AppEvent::DeliveryFailed { channel: Channel::Broker, error: e });
                }
            }
            info!("LINK | broker up, subscribed to {} topics", TopicKind::GATEWAY_INBOUND.len());
        }
        self.broker = link;
        sink.emit(&AppEvent::ConnectivityChanged(link));
    }

    fn apply(
        &self,
        decision: &Decision,
        servo: &mut impl ServoPort,
        broker: &mut impl BrokerPort,
        cloud: &mut impl CloudPort,
        sink: &mut impl EventSink,
    ) {
        if let Some(angle) = decision.servo_angle {
            info!("FEED | gate -> {}°", angle);
            if let Err(e) = servo.write_angle(angle) {
                warn!("FEED | servo write failed: {}", e);
                sink.emit(&AppEvent::ActuatorFault);
            }
        }

        for event in &decision.events {
            sink.emit(&match *event {
                RuleEvent::FeedStarted { angle, weight_g } => AppEvent::FeedDispensed { angle, weight_g },
                RuleEvent::GateClosed => AppEvent::GateClosed,
                RuleEvent::LatchReset { weight_g } => AppEvent::LatchReset { weight_g },
                RuleEvent::AlertThrottled(category) => AppEvent::AlertThrottled(category),
            });
        }

        if self.broker.is_up() {
            for p in &decision.publishes {
                let topic = self.topics.path(p.kind);
                if let Err(e) = broker.publish(topic, &p.payload) {
                    warn!("PUB | {} failed: {}", topic, e);
                    sink.emit(&AppEvent::DeliveryFailed { channel: Channel::Broker, error: e });
                }
            }
        } else {
            debug!("PUB | broker down, skipping {} publishes", decision.publishes.len());
        }

        for alert in &decision.alerts {
            let text = alert.message();
            info!("ALERT | {}", text);
            sink.emit(&AppEvent::AlertRaised(*alert));
            match ChatMessage::new(&text).to_json() {
                Ok(body) => report(Channel::Chat, cloud.post_chat(&body), sink),
                Err(e) => warn!("ALERT | encode failed: {}", e),
            }
        }

        if let Some(record) = &decision.log {
            match record.to_json() {
                Ok(body) => report(Channel::CloudLog, cloud.post_log(&body), sink),
                Err(e) => warn!("TELEM | log encode failed: {}", e),
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn latest(&self) -> &SensorSnapshot {
        &self.latest
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn broker_state(&self) -> LinkState {
        self.broker
    }
}

/// Log a fire-and-forget HTTP outcome; never retried.
fn report(channel: Channel, result: Result<u16, CommsError>, sink: &mut impl EventSink) {
    match result {
        Ok(code) if (200..300).contains(&code) => info!("HTTP | {:?} -> {}", channel, code),
        Ok(code) => warn!("HTTP | {:?} -> {}", channel, code),
        Err(CommsError::EndpointDisabled) => debug!("HTTP | {:?} disabled", channel),
        Err(e) => {
            warn!("HTTP | {:?} failed: {}", channel, e);
            sink.emit(&AppEvent::DeliveryFailed { channel, error: e });
        }
    }
}
