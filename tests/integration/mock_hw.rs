//! Mock adapters for integration tests.
//!
//! Record every outbound call so tests can assert on the full history
//! without touching real ADC/LEDC registers or sockets.

use std::collections::VecDeque;

use petfeeder::app::events::AppEvent;
use petfeeder::app::ports::{AnalogPort, BrokerPort, CloudPort, EventSink, RangePort, ServoPort, WeightPort};
use petfeeder::connectivity::LinkState;
use petfeeder::error::{ActuatorError, CommsError, SensorError};

// ── Gateway hardware ──────────────────────────────────────────

pub struct MockGateway {
    pub air: Result<u16, SensorError>,
    pub light: Result<u16, SensorError>,
    pub angles: Vec<u8>,
    pub servo_broken: bool,
}

#[allow(dead_code)]
impl MockGateway {
    /// Calm room: clean air, normal light.
    pub fn new() -> Self {
        Self {
            air: Ok(1200),
            light: Ok(2000),
            angles: Vec::new(),
            servo_broken: false,
        }
    }

    pub fn gate(&self) -> Option<u8> {
        self.angles.last().copied()
    }
}

impl AnalogPort for MockGateway {
    fn read_air_quality(&mut self) -> Result<u16, SensorError> {
        self.air
    }

    fn read_light(&mut self) -> Result<u16, SensorError> {
        self.light
    }
}

impl ServoPort for MockGateway {
    fn write_angle(&mut self, degrees: u8) -> Result<(), ActuatorError> {
        if self.servo_broken {
            return Err(ActuatorError::PwmWriteFailed);
        }
        self.angles.push(degrees);
        Ok(())
    }
}

// ── Sensor-node hardware ──────────────────────────────────────

pub struct MockNode {
    pub distances: VecDeque<Result<f32, SensorError>>,
    pub weights: VecDeque<Result<f32, SensorError>>,
}

#[allow(dead_code)]
impl MockNode {
    pub fn new() -> Self {
        Self {
            distances: VecDeque::new(),
            weights: VecDeque::new(),
        }
    }

    pub fn queue(&mut self, distance: Result<f32, SensorError>, weight: Result<f32, SensorError>) {
        self.distances.push_back(distance);
        self.weights.push_back(weight);
    }
}

impl RangePort for MockNode {
    fn distance_cm(&mut self) -> Result<f32, SensorError> {
        self.distances.pop_front().unwrap_or(Err(SensorError::EchoTimeout))
    }
}

impl WeightPort for MockNode {
    fn weight_g(&mut self) -> Result<f32, SensorError> {
        self.weights.pop_front().unwrap_or(Err(SensorError::NotReady))
    }
}

// ── Broker ────────────────────────────────────────────────────

pub struct MockBroker {
    pub up: bool,
    pub inbound: VecDeque<(String, Vec<u8>)>,
    pub published: Vec<(String, String)>,
    pub subscriptions: Vec<String>,
}

#[allow(dead_code)]
impl MockBroker {
    pub fn new() -> Self {
        Self {
            up: true,
            inbound: VecDeque::new(),
            published: Vec::new(),
            subscriptions: Vec::new(),
        }
    }

    pub fn deliver(&mut self, topic: &str, payload: &str) {
        self.inbound.push_back((topic.to_owned(), payload.as_bytes().to_vec()));
    }

    /// Payloads published on `topic`, oldest first.
    pub fn on(&self, topic: &str) -> Vec<&str> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.as_str())
            .collect()
    }
}

impl BrokerPort for MockBroker {
    fn maintain(&mut self, _now_ms: u64) -> LinkState {
        if self.up { LinkState::Up } else { LinkState::Down }
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        self.subscriptions.push(topic.to_owned());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError> {
        if !self.up {
            return Err(CommsError::BrokerUnavailable);
        }
        self.published.push((topic.to_owned(), payload.to_owned()));
        Ok(())
    }

    fn poll(&mut self, handler: &mut dyn FnMut(&str, &[u8])) {
        while let Some((t, p)) = self.inbound.pop_front() {
            handler(&t, &p);
        }
    }
}

// ── Cloud ─────────────────────────────────────────────────────

pub struct MockCloud {
    pub logs: Vec<String>,
    pub chats: Vec<String>,
    pub result: Result<u16, CommsError>,
}

#[allow(dead_code)]
impl MockCloud {
    pub fn new() -> Self {
        Self {
            logs: Vec::new(),
            chats: Vec::new(),
            result: Ok(200),
        }
    }

    pub fn chat_contents(&self) -> Vec<String> {
        self.chats
            .iter()
            .filter_map(|j| serde_json::from_str::<serde_json::Value>(j).ok())
            .filter_map(|v| v["content"].as_str().map(str::to_owned))
            .collect()
    }
}

impl CloudPort for MockCloud {
    fn post_log(&mut self, json: &str) -> Result<u16, CommsError> {
        self.logs.push(json.to_owned());
        self.result
    }

    fn post_chat(&mut self, json: &str) -> Result<u16, CommsError> {
        self.chats.push(json.to_owned());
        self.result
    }
}

// ── Event sink ────────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
