//! SensorNodeService publishing rounds against mock adapters.

use petfeeder::app::events::AppEvent;
use petfeeder::app::node::SensorNodeService;
use petfeeder::config::NodeConfig;
use petfeeder::error::SensorError;
use petfeeder::topics::TopicNamespace;

use super::mock_hw::{MockBroker, MockNode, RecordingSink};

#[test]
fn scoped_namespace_topics() {
    let cfg = NodeConfig { namespace: TopicNamespace::SensorNode, ..NodeConfig::default() };
    let mut node = SensorNodeService::new(&cfg);
    let mut hw = MockNode::new();
    let mut broker = MockBroker::new();
    let mut sink = RecordingSink::new();
    node.start(&mut sink);

    hw.queue(Ok(12.345), Ok(80.0));
    node.tick(&mut hw, None, &mut broker, &mut sink, 0);

    assert_eq!(broker.on("@msg/sensor_node/ultrasonic"), vec!["12.35"]);
    assert_eq!(broker.on("@msg/sensor_node/weight"), vec!["80.00"]);
    assert!(broker.on("@msg/sensor_node/motion").is_empty());
}

#[test]
fn negative_weight_clamped_before_publish() {
    let mut node = SensorNodeService::new(&NodeConfig::default());
    let mut hw = MockNode::new();
    let mut broker = MockBroker::new();
    let mut sink = RecordingSink::new();

    hw.queue(Ok(-3.0), Ok(-40.0));
    let r = node.tick(&mut hw, None, &mut broker, &mut sink, 0);
    assert_eq!((r.distance_cm, r.weight_g), (0.0, 0.0));
    assert_eq!(broker.on("@msg/alias/weight"), vec!["0.00"]);
}

#[test]
fn broker_outage_keeps_sampling() {
    let mut node = SensorNodeService::new(&NodeConfig::default());
    let mut hw = MockNode::new();
    let mut broker = MockBroker::new();
    let mut sink = RecordingSink::new();
    broker.up = false;

    hw.queue(Ok(20.0), Ok(60.0));
    hw.queue(Ok(20.0), Err(SensorError::NotReady));
    node.tick(&mut hw, None, &mut broker, &mut sink, 0);
    node.tick(&mut hw, None, &mut broker, &mut sink, 1_500);
    assert!(!node.broker_state().is_up());
    assert!(broker.published.is_empty());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::NodeTelemetry { .. })), 2);

    broker.up = true;
    hw.queue(Ok(20.0), Ok(80.0));
    node.tick(&mut hw, None, &mut broker, &mut sink, 3_000);
    assert!(node.broker_state().is_up());
    // 60 and 80 averaged; the failed conversion is not in the window
    assert_eq!(broker.on("@msg/alias/weight"), vec!["70.00"]);
}
