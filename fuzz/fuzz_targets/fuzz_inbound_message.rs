//! Fuzz target: `GatewayService::handle_message` followed by `rules::decide`
//!
//! Splits the input into a topic and a payload, applies it to the latest
//! readings and evaluates the rules.  Asserts that nothing panics and that
//! every reading the rules see is finite and non-negative.
//!
//! cargo fuzz run fuzz_inbound_message

#![no_main]

use libfuzzer_sys::fuzz_target;
use petfeeder::app::service::GatewayService;
use petfeeder::config::GatewayConfig;
use petfeeder::rules::decide;

const TOPICS: [&str; 6] = [
    "@msg/alias/ultrasonic",
    "@msg/alias/weight",
    "@msg/alias/motion",
    "@msg/status",
    "@msg/alias/fed",
    "@msg/sensor_node/weight",
];

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let cfg = GatewayConfig::default();
    let mut svc = GatewayService::new(cfg.clone(), 0);

    // Known topics most of the time, raw bytes as a topic otherwise.
    let (topic, payload) = if selector < 200 {
        (TOPICS[usize::from(selector) % TOPICS.len()].to_owned(), rest)
    } else {
        let split = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        (String::from_utf8_lossy(&rest[..split]).into_owned(), rest.get(split + 1..).unwrap_or(&[]))
    };
    let _ = svc.handle_message(&topic, payload);

    let latest = svc.latest();
    assert!(latest.distance_cm.is_finite() && latest.distance_cm >= 0.0);
    assert!(latest.weight_g.is_finite() && latest.weight_g >= 0.0);

    let d = decide(&cfg, svc.state(), latest, 1_000);
    if let Some(log) = d.log {
        assert!(log.to_json().is_ok());
    }
});
