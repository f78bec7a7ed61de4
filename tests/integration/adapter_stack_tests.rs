//! The gateway service wired to the real adapters running their host
//! simulations: sim ADC, sim servo, in-memory broker and HTTP recorder.

use petfeeder::adapters::hardware::GatewayHardware;
use petfeeder::adapters::http::HttpCloudAdapter;
use petfeeder::adapters::log_sink::LogEventSink;
use petfeeder::adapters::mqtt::{BrokerSettings, MqttAdapter};
use petfeeder::adapters::wifi;
use petfeeder::app::ports::CloudPort;
use petfeeder::app::service::GatewayService;
use petfeeder::config::GatewayConfig;
use petfeeder::connectivity::RetryPolicy;
use petfeeder::error::CommsError;
use petfeeder::drivers::hw_init::LEDC_CH_SERVO;
use petfeeder::drivers::servo::{ServoDriver, sim_servo_angle};
use petfeeder::sensors::{AnalogSensors, sim_set_adc_fault, sim_set_air_adc, sim_set_light_adc};

#[test]
fn gateway_over_simulated_adapters() {
    sim_set_adc_fault(false);
    sim_set_air_adc(3200);
    sim_set_light_adc(2000);
    wifi::sim_set_associated(true);

    let mut hw = GatewayHardware::new(AnalogSensors::new(), ServoDriver::new(LEDC_CH_SERVO));
    let mut broker = MqttAdapter::new(
        BrokerSettings {
            url: "mqtt://broker.local:1883",
            client_id: "gateway",
            username: "",
            password: "",
        },
        RetryPolicy::default(),
    );
    let mut cloud = HttpCloudAdapter::new("https://db.example.com", "https://chat.example.com/hook");
    let mut sink = LogEventSink::new();

    let mut svc = GatewayService::new(GatewayConfig::default(), 0);
    svc.start(&mut hw, &mut sink);

    // First tick connects and subscribes; messages queued afterwards are
    // delivered on the next poll.
    svc.tick(&mut hw, &mut broker, &mut cloud, &mut sink, 1_000);
    assert!(svc.broker_state().is_up());
    assert_eq!(broker.sim_subscriptions().len(), 4);

    broker.sim_inject("@msg/alias/weight", b"12.5");
    broker.sim_inject("@msg/alias/ultrasonic", b"4");
    svc.tick(&mut hw, &mut broker, &mut cloud, &mut sink, 2_000);

    assert_eq!(hw.gate_angle(), Some(90));
    assert_eq!(sim_servo_angle(), 90);
    assert!(broker.sim_published().iter().any(|(t, p)| t == "@msg/alias/fed" && p == "1"));
    assert!(broker.sim_published().iter().any(|(t, p)| t == "@msg/alias/air" && p == "3200"));

    let posts = cloud.sim_posts();
    assert!(posts.iter().any(|(u, _)| u == "https://db.example.com/hamster_log.json"));
    // Mild odour (3200) and the feed notice
    assert_eq!(posts.iter().filter(|(u, _)| u == "https://chat.example.com/hook").count(), 2);

    // Nothing leaves while Wi-Fi is down
    wifi::sim_set_associated(false);
    let before = cloud.sim_posts().len();
    assert_eq!(cloud.post_log("{}"), Err(CommsError::LinkDown));
    assert_eq!(cloud.sim_posts().len(), before);

    cloud.sim_set_status(503);
    wifi::sim_set_associated(true);
    assert_eq!(cloud.post_chat("{}"), Ok(503));
}
