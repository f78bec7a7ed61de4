//! GatewayService end-to-end scenarios against mock adapters.

use petfeeder::app::events::{AppEvent, Channel};
use petfeeder::app::service::GatewayService;
use petfeeder::config::{FeedMode, GatewayConfig};
use petfeeder::connectivity::LinkState;
use petfeeder::error::{CommsError, SensorError};
use petfeeder::rules::{AlertCategory, GateState};

use super::mock_hw::{MockBroker, MockCloud, MockGateway, RecordingSink};

struct Rig {
    svc: GatewayService,
    hw: MockGateway,
    broker: MockBroker,
    cloud: MockCloud,
    sink: RecordingSink,
}

impl Rig {
    fn new(config: GatewayConfig) -> Self {
        let mut rig = Self {
            svc: GatewayService::new(config, 0),
            hw: MockGateway::new(),
            broker: MockBroker::new(),
            cloud: MockCloud::new(),
            sink: RecordingSink::new(),
        };
        rig.svc.start(&mut rig.hw, &mut rig.sink);
        rig
    }

    fn tick(&mut self, now_ms: u64) {
        self.svc
            .tick(&mut self.hw, &mut self.broker, &mut self.cloud, &mut self.sink, now_ms);
    }
}

#[test]
fn start_closes_gate_and_subscribes_on_first_tick() {
    let mut rig = Rig::new(GatewayConfig::default());
    assert_eq!(rig.hw.gate(), Some(0));
    assert!(rig.sink.events.contains(&AppEvent::Started("gateway")));

    rig.tick(1_000);
    assert_eq!(
        rig.broker.subscriptions,
        vec!["@msg/alias/ultrasonic", "@msg/alias/weight", "@msg/alias/motion", "@msg/status"]
    );
    assert!(rig.sink.events.contains(&AppEvent::ConnectivityChanged(LinkState::Up)));

    rig.tick(2_000);
    assert_eq!(rig.broker.subscriptions.len(), 4, "no re-subscribe while up");
}

#[test]
fn full_feed_cycle() {
    let mut rig = Rig::new(GatewayConfig::default());

    // Empty bowl, pet nearby
    rig.broker.deliver("@msg/alias/weight", "20.0");
    rig.broker.deliver("@msg/alias/ultrasonic", "5.0");
    rig.tick(1_000);
    assert_eq!(rig.hw.gate(), Some(90));
    assert!(rig.svc.state().fed);
    assert_eq!(rig.broker.on("@msg/alias/fed"), vec!["1"]);
    assert!(rig.cloud.chat_contents().iter().any(|c| c.contains("เติมอาหาร")));
    assert!(rig.sink.events.contains(&AppEvent::FeedDispensed { angle: 90, weight_g: 20.0 }));

    // Still empty: latch holds, gate not re-commanded
    rig.tick(2_000);
    assert_eq!(rig.hw.angles, vec![0, 90]);

    // Refilled
    rig.broker.deliver("@msg/alias/weight", "130");
    rig.tick(3_000);
    assert_eq!(rig.hw.gate(), Some(0));
    assert!(!rig.svc.state().fed);
    assert_eq!(rig.svc.state().gate, GateState::Closed);
    assert_eq!(rig.broker.on("@msg/alias/fed"), vec!["1", "1", "0"]);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::GateClosed), 1);
}

#[test]
fn no_feed_before_node_reports() {
    let mut rig = Rig::new(GatewayConfig::default());
    rig.hw.light = Ok(100);
    rig.tick(1_000);
    rig.tick(2_000);
    assert_eq!(rig.hw.angles, vec![0]);
    assert!(!rig.svc.state().fed);
    assert_eq!(rig.broker.on("@msg/alias/fed"), vec!["0", "0"]);
    assert!(!rig.cloud.chat_contents().iter().any(|c| c.contains("เติมอาหาร")));

    // Weight alone is not enough.
    rig.broker.deliver("@msg/alias/weight", "10");
    rig.tick(3_000);
    assert_eq!(rig.hw.angles, vec![0]);

    // A missed echo arrives as zero and does not count as near.
    rig.broker.deliver("@msg/alias/ultrasonic", "0.00");
    rig.tick(4_000);
    assert_eq!(rig.hw.angles, vec![0]);

    rig.broker.deliver("@msg/alias/ultrasonic", "6.5");
    rig.tick(5_000);
    assert_eq!(rig.hw.gate(), Some(90));
    assert!(rig.svc.state().fed);
}

#[test]
fn pet_far_away_means_no_feed() {
    let mut rig = Rig::new(GatewayConfig::default());
    rig.broker.deliver("@msg/alias/weight", "10");
    rig.broker.deliver("@msg/alias/ultrasonic", "40");
    rig.tick(1_000);
    assert_eq!(rig.hw.angles, vec![0]);
    assert!(!rig.svc.state().fed);
}

#[test]
fn timed_pulse_closes_after_open_window() {
    let mut cfg = GatewayConfig::default();
    cfg.rules.feed_mode = FeedMode::TimedPulse { open_ms: 2_000 };
    let mut rig = Rig::new(cfg);

    rig.broker.deliver("@msg/alias/weight", "10");
    rig.broker.deliver("@msg/alias/ultrasonic", "3");
    rig.tick(1_000);
    rig.tick(2_000);
    assert_eq!(rig.hw.gate(), Some(90));
    rig.tick(3_000);
    assert_eq!(rig.hw.gate(), Some(0));
    assert!(rig.svc.state().fed, "latch stays until the bowl is full");
}

#[test]
fn bad_air_alert_is_throttled_per_category() {
    let mut rig = Rig::new(GatewayConfig::default());
    rig.hw.air = Ok(3600);

    rig.tick(1_000);
    rig.tick(2_000);
    rig.tick(61_000);

    let air_chats = rig.cloud.chat_contents().iter().filter(|c| c.contains("3600")).count();
    assert_eq!(air_chats, 2);
    assert_eq!(
        rig.sink.count(|e| *e == AppEvent::AlertThrottled(AlertCategory::AirBad)),
        1
    );
}

#[test]
fn adc_failure_keeps_previous_reading() {
    let mut rig = Rig::new(GatewayConfig::default());
    rig.hw.air = Ok(1500);
    rig.tick(1_000);
    rig.hw.air = Err(SensorError::AdcReadFailed);
    rig.tick(2_000);

    assert_eq!(rig.svc.latest().air_quality, 1500);
    assert_eq!(rig.broker.on("@msg/alias/air"), vec!["1500", "1500"]);
    assert!(rig.sink.events.contains(&AppEvent::SensorFault(SensorError::AdcReadFailed)));
}

#[test]
fn broker_down_skips_publishes_but_still_logs() {
    let mut rig = Rig::new(GatewayConfig::default());
    rig.broker.up = false;
    rig.tick(1_000);

    assert!(rig.broker.published.is_empty());
    assert!(rig.broker.subscriptions.is_empty());
    assert_eq!(rig.cloud.logs.len(), 1);

    let row: serde_json::Value = serde_json::from_str(&rig.cloud.logs[0]).unwrap();
    assert_eq!(row["air"], 1200);
    assert_eq!(row["fed"], false);
    assert_eq!(row["timestamp"], 1_000);
}

#[test]
fn log_posts_follow_interval() {
    let cfg = GatewayConfig { log_interval_ms: 5_000, ..GatewayConfig::default() };
    let mut rig = Rig::new(cfg);
    for t in 1..=10 {
        rig.tick(t * 1_000);
    }
    // 1 s, 6 s
    assert_eq!(rig.cloud.logs.len(), 2);
}

#[test]
fn http_failures_are_reported_not_retried() {
    let mut rig = Rig::new(GatewayConfig::default());
    rig.hw.light = Ok(100);
    rig.cloud.result = Err(CommsError::LinkDown);
    rig.tick(1_000);

    assert_eq!(rig.cloud.chats.len(), 1);
    assert_eq!(rig.cloud.logs.len(), 1);
    assert!(rig.sink.events.contains(&AppEvent::DeliveryFailed {
        channel: Channel::Chat,
        error: CommsError::LinkDown
    }));

    rig.cloud.result = Err(CommsError::EndpointDisabled);
    rig.tick(2_000);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::DeliveryFailed { error: CommsError::EndpointDisabled, .. })),
        0
    );
}

#[test]
fn stillness_alert_fires_once_per_still_period() {
    let mut rig = Rig::new(GatewayConfig::default());
    rig.tick(1_000);
    rig.tick(30 * 60_000);
    rig.tick(40 * 60_000);
    let still = |c: &String| c.contains("ไม่เคลื่อนไหว");
    assert_eq!(rig.cloud.chat_contents().iter().filter(|c| still(c)).count(), 1);

    // Movement re-arms it
    rig.broker.deliver("@msg/alias/motion", "1");
    rig.tick(41 * 60_000);
    rig.broker.deliver("@msg/alias/motion", "0");
    rig.tick(72 * 60_000);
    assert_eq!(rig.cloud.chat_contents().iter().filter(|c| still(c)).count(), 2);
}

#[test]
fn tipped_bowl_raises_urgent_alert() {
    let mut rig = Rig::new(GatewayConfig::default());
    rig.broker.deliver("@msg/status", "tipped");
    rig.tick(1_000);
    assert!(rig.cloud.chat_contents().iter().any(|c| c.contains("Tipped")));
}

#[test]
fn servo_fault_is_surfaced() {
    let mut rig = Rig::new(GatewayConfig::default());
    rig.hw.servo_broken = true;
    rig.broker.deliver("@msg/alias/weight", "5");
    rig.broker.deliver("@msg/alias/ultrasonic", "5");
    rig.tick(1_000);
    assert!(rig.sink.events.contains(&AppEvent::ActuatorFault));
}
