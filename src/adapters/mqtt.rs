//! MQTT broker adapter.
//!
//! Implements [`BrokerPort`].  Connection attempts are paced by a
//! [`Reconnector`] so a dead broker never stalls the loop; a dropped
//! session is torn down and re-established under the same backoff.
//!
//! On ESP-IDF the client's event callback runs on the MQTT task.  It only
//! flips the connected flag and forwards `(topic, payload)` into a channel
//! that [`BrokerPort::poll`] drains on the loop thread.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`.
//! - **all other targets**: in-memory broker for host-side tests.

use log::{debug, info, warn};

use crate::app::ports::BrokerPort;
use crate::config::Secrets;
use crate::connectivity::{LinkState, Reconnector, RetryPolicy};
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use std::sync::Arc;
#[cfg(target_os = "espidf")]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(target_os = "espidf")]
use std::sync::mpsc::{Receiver, Sender, channel};
#[cfg(target_os = "espidf")]
use std::time::Duration;

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};

#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;

/// How long a connect attempt waits for the broker's CONNACK.
#[cfg(target_os = "espidf")]
const CONNECT_WAIT: Duration = Duration::from_secs(5);

/// Broker endpoint and identity.
#[derive(Debug, Clone, Copy)]
pub struct BrokerSettings {
    pub url: &'static str,
    pub client_id: &'static str,
    pub username: &'static str,
    pub password: &'static str,
}

impl BrokerSettings {
    pub fn from_secrets(s: &Secrets) -> Self {
        Self {
            url: s.mqtt_url,
            client_id: s.mqtt_client_id,
            username: s.mqtt_username,
            password: s.mqtt_password,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Session (one live client)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
struct Inbound {
    topic: String,
    data: Vec<u8>,
}

#[cfg(target_os = "espidf")]
struct Session {
    settings: BrokerSettings,
    client: Option<EspMqttClient<'static>>,
    connected: Arc<AtomicBool>,
    rx: Option<Receiver<Inbound>>,
}

#[cfg(target_os = "espidf")]
impl Session {
    fn new(settings: BrokerSettings) -> Self {
        Self {
            settings,
            client: None,
            connected: Arc::new(AtomicBool::new(false)),
            rx: None,
        }
    }

    fn open(&mut self) -> Result<(), CommsError> {
        self.close();

        let (tx, rx): (Sender<Inbound>, Receiver<Inbound>) = channel();
        let (ack_tx, ack_rx) = channel::<()>();
        let connected = Arc::new(AtomicBool::new(false));
        let flag = connected.clone();

        let conf = MqttClientConfiguration {
            client_id: Some(self.settings.client_id),
            username: non_empty(self.settings.username),
            password: non_empty(self.settings.password),
            ..Default::default()
        };

        let client = EspMqttClient::new_cb(self.settings.url, &conf, move |event| {
            match event.payload() {
                EventPayload::Connected(_) => {
                    flag.store(true, Ordering::Release);
                    let _ = ack_tx.send(());
                }
                EventPayload::Disconnected => flag.store(false, Ordering::Release),
                EventPayload::Received { topic: Some(topic), data, .. } => {
                    let _ = tx.send(Inbound { topic: topic.to_owned(), data: data.to_vec() });
                }
                _ => {}
            }
        })
        .map_err(|e| {
            warn!("MQTT | client create failed: {}", e);
            CommsError::BrokerUnavailable
        })?;

        if ack_rx.recv_timeout(CONNECT_WAIT).is_err() {
            return Err(CommsError::BrokerConnectFailed);
        }

        self.client = Some(client);
        self.connected = connected;
        self.rx = Some(rx);
        Ok(())
    }

    fn close(&mut self) {
        self.client = None;
        self.rx = None;
        self.connected.store(false, Ordering::Release);
    }

    fn is_connected(&self) -> bool {
        self.client.is_some() && self.connected.load(Ordering::Acquire)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        let client = self.client.as_mut().ok_or(CommsError::BrokerUnavailable)?;
        client
            .subscribe(topic, QoS::AtMostOnce)
            .map(|_| ())
            .map_err(|_| CommsError::SubscribeFailed)
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError> {
        let client = self.client.as_mut().ok_or(CommsError::BrokerUnavailable)?;
        client
            .publish(topic, QoS::AtMostOnce, false, payload.as_bytes())
            .map(|_| ())
            .map_err(|_| CommsError::PublishFailed)
    }

    fn drain(&mut self, handler: &mut dyn FnMut(&str, &[u8])) {
        if let Some(rx) = &self.rx {
            while let Ok(msg) = rx.try_recv() {
                handler(&msg.topic, &msg.data);
            }
        }
    }
}

#[cfg(target_os = "espidf")]
fn non_empty(s: &'static str) -> Option<&'static str> {
    if s.is_empty() { None } else { Some(s) }
}

/// In-memory stand-in for a broker connection.
#[cfg(not(target_os = "espidf"))]
struct Session {
    settings: BrokerSettings,
    online: bool,
    connected: bool,
    inbound: VecDeque<(String, Vec<u8>)>,
    published: Vec<(String, String)>,
    subscriptions: Vec<String>,
}

#[cfg(not(target_os = "espidf"))]
impl Session {
    fn new(settings: BrokerSettings) -> Self {
        Self {
            settings,
            online: true,
            connected: false,
            inbound: VecDeque::new(),
            published: Vec::new(),
            subscriptions: Vec::new(),
        }
    }

    fn open(&mut self) -> Result<(), CommsError> {
        if !self.online {
            return Err(CommsError::BrokerConnectFailed);
        }
        self.subscriptions.clear();
        self.connected = true;
        debug!("MQTT(sim): {} connected to {}", self.settings.client_id, self.settings.url);
        Ok(())
    }

    fn close(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected && self.online
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        if !self.is_connected() {
            return Err(CommsError::BrokerUnavailable);
        }
        self.subscriptions.push(topic.to_owned());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError> {
        if !self.is_connected() {
            return Err(CommsError::BrokerUnavailable);
        }
        self.published.push((topic.to_owned(), payload.to_owned()));
        Ok(())
    }

    fn drain(&mut self, handler: &mut dyn FnMut(&str, &[u8])) {
        while let Some((topic, data)) = self.inbound.pop_front() {
            if self.subscriptions.iter().any(|t| *t == topic) {
                handler(&topic, &data);
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

pub struct MqttAdapter {
    link: Reconnector,
    session: Session,
}

impl MqttAdapter {
    pub fn new(settings: BrokerSettings, policy: RetryPolicy) -> Self {
        Self {
            link: Reconnector::new(policy),
            session: Session::new(settings),
        }
    }

    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    /// Forget a give-up verdict, e.g. after Wi-Fi came back.
    pub fn reset(&mut self) {
        self.session.close();
        self.link.reset();
    }

    /// Queue a message as if another client had published it.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_inject(&mut self, topic: &str, payload: &[u8]) {
        self.session.inbound.push_back((topic.to_owned(), payload.to_vec()));
    }

    /// Take the broker up or down.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_online(&mut self, online: bool) {
        self.session.online = online;
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_published(&self) -> &[(String, String)] {
        &self.session.published
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_subscriptions(&self) -> &[String] {
        &self.session.subscriptions
    }
}

impl BrokerPort for MqttAdapter {
    fn maintain(&mut self, now_ms: u64) -> LinkState {
        if self.link.state().is_up() && !self.session.is_connected() {
            self.session.close();
            self.link.mark_lost();
        }
        let before = self.link.state();
        let state = self.link.poll(now_ms, || self.session.open());
        if state != before && state.is_up() {
            info!("MQTT | connected as {}", self.session.settings.client_id);
        }
        state
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        self.session.subscribe(topic)
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError> {
        self.session.publish(topic, payload)
    }

    fn poll(&mut self, handler: &mut dyn FnMut(&str, &[u8])) {
        self.session.drain(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> BrokerSettings {
        BrokerSettings {
            url: "mqtt://localhost:1883",
            client_id: "gw-test",
            username: "",
            password: "",
        }
    }

    #[test]
    fn connects_and_round_trips_subscribed_topics() {
        let mut m = MqttAdapter::new(settings(), RetryPolicy::default());
        assert!(m.maintain(0).is_up());
        m.subscribe("@msg/alias/weight").unwrap();
        m.sim_inject("@msg/alias/weight", b"12.00");
        m.sim_inject("@msg/other", b"x");

        let mut seen = Vec::new();
        m.poll(&mut |t, p| seen.push((t.to_owned(), p.to_vec())));
        assert_eq!(seen, vec![("@msg/alias/weight".to_owned(), b"12.00".to_vec())]);
    }

    #[test]
    fn offline_broker_backs_off() {
        let mut m = MqttAdapter::new(settings(), RetryPolicy::default());
        m.sim_set_online(false);
        assert_eq!(m.maintain(0), LinkState::Waiting { attempt: 1, retry_at_ms: 2_000 });
        assert_eq!(m.publish("t", "1"), Err(CommsError::BrokerUnavailable));

        m.sim_set_online(true);
        assert!(!m.maintain(1_000).is_up(), "still inside backoff");
        assert!(m.maintain(2_000).is_up());
    }

    #[test]
    fn dropped_session_reconnects_and_clears_subscriptions() {
        let mut m = MqttAdapter::new(settings(), RetryPolicy::default());
        m.maintain(0);
        m.subscribe("a").unwrap();
        m.sim_set_online(false);
        assert!(!m.maintain(10).is_up());
        m.sim_set_online(true);
        assert!(m.maintain(2_010).is_up());
        assert!(m.sim_subscriptions().is_empty());
    }

    #[test]
    fn reset_skips_remaining_backoff() {
        let mut m = MqttAdapter::new(settings(), RetryPolicy::default());
        m.sim_set_online(false);
        m.maintain(0);
        m.maintain(2_000);
        assert_eq!(m.link_state(), LinkState::Waiting { attempt: 2, retry_at_ms: 6_000 });

        m.sim_set_online(true);
        m.reset();
        assert_eq!(m.link_state(), LinkState::Down);
        assert!(m.maintain(2_100).is_up());
    }
}
