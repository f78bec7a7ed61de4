//! PetFeeder Gateway — Main Entry Point
//!
//! Hexagonal architecture with a fixed-period polling loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  GatewayHardware   MqttAdapter   HttpCloudAdapter  LogEventSink│
//! │  (Analog+Servo)    (Broker)      (REST log, chat)  (EventSink) │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │             GatewayService (pure logic)                │    │
//! │  │  latest readings · rules::decide · controller state    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  WifiAdapter (boot bring-up, loop re-association) · Watchdog   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{error, info, warn};

use petfeeder::adapters::hardware::GatewayHardware;
use petfeeder::adapters::http::HttpCloudAdapter;
use petfeeder::adapters::log_sink::LogEventSink;
use petfeeder::adapters::mqtt::{BrokerSettings, MqttAdapter};
use petfeeder::adapters::time::Uptime;
use petfeeder::adapters::wifi::WifiAdapter;
use petfeeder::app::service::GatewayService;
use petfeeder::config::{GatewayConfig, Secrets};
use petfeeder::drivers::hw_init::{self, LEDC_CH_SERVO};
use petfeeder::drivers::servo::ServoDriver;
use petfeeder::drivers::watchdog::Watchdog;
use petfeeder::sensors::AnalogSensors;

const SECRETS: Secrets = Secrets::from_build_env();

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PetFeeder gateway v{}            ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = GatewayConfig::default();
    config.validate()?;
    SECRETS.validate()?;

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        error!("HAL init failed: {}", e);
        return Err(e.into());
    }
    let clock = Uptime::new();

    // ── 3. Wi-Fi (bounded, then carry on off-line) ────────────
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let esp_wifi = BlockingWifi::wrap(EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?, sys_loop)?;

    let mut wifi = WifiAdapter::new(esp_wifi, config.link_retry, config.wifi_reconnect);
    wifi.set_credentials(SECRETS.wifi_ssid, SECRETS.wifi_pass)?;
    if let Err(e) = wifi.connect() {
        warn!("LINK | Wi-Fi unavailable ({}), running off-line", e);
    }

    // Subscribed only after the blocking bring-up.
    let watchdog = Watchdog::default();

    // ── 4. Adapters and service ───────────────────────────────
    let mut hw = GatewayHardware::new(AnalogSensors::new(), ServoDriver::new(LEDC_CH_SERVO));
    let mut broker = MqttAdapter::new(BrokerSettings::from_secrets(&SECRETS), config.broker_retry);
    let mut cloud = HttpCloudAdapter::from_secrets(&SECRETS);
    let mut sink = LogEventSink::new();

    let interval = Duration::from_millis(u64::from(config.loop_interval_ms));
    let mut app = GatewayService::new(config, clock.uptime_ms());
    app.start(&mut hw, &mut sink);

    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    let mut was_associated = wifi.is_connected();
    loop {
        let associated = wifi.poll(clock.uptime_ms()).is_up();
        if associated && !was_associated {
            info!("LINK | Wi-Fi back, retrying broker");
            broker.reset();
        }
        was_associated = associated;

        app.tick(&mut hw, &mut broker, &mut cloud, &mut sink, clock.uptime_ms());
        watchdog.feed();
        std::thread::sleep(interval);
    }
}
