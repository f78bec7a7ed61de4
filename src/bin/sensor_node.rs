//! PetFeeder Sensor Node — Main Entry Point
//!
//! Samples the bowl's distance and weight (and, with the `camera` feature,
//! frame-difference motion) and publishes them for the gateway on a fixed
//! period.  The node runs no rules of its own.
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::Ets;
use esp_idf_svc::hal::gpio::PinDriver;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{info, warn};

use petfeeder::adapters::hardware::NodeHardware;
use petfeeder::adapters::log_sink::LogEventSink;
use petfeeder::adapters::mqtt::{BrokerSettings, MqttAdapter};
use petfeeder::adapters::time::{Uptime, now_us};
use petfeeder::adapters::wifi::WifiAdapter;
use petfeeder::app::node::SensorNodeService;
#[cfg(feature = "camera")]
use petfeeder::app::ports::FramePort;
use petfeeder::config::{NodeConfig, Secrets};
use petfeeder::drivers::watchdog::Watchdog;
use petfeeder::sensors::load_cell::Hx711;
use petfeeder::sensors::ultrasonic::HcSr04;

const SECRETS: Secrets = Secrets::from_build_env();

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("PetFeeder sensor node v{}", env!("CARGO_PKG_VERSION"));

    let config = NodeConfig::default();
    config.validate()?;
    SECRETS.validate()?;
    let clock = Uptime::new();

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    // ── Sensors ───────────────────────────────────────────────
    // Wiring per `petfeeder::pins`: TRIG 12, ECHO 14, SCK 2, DT 15.
    let range = HcSr04::new(
        PinDriver::output(pins.gpio12)?,
        PinDriver::input(pins.gpio14)?,
        Ets,
        now_us,
        config.echo_timeout_us,
    );
    let mut scale = Hx711::new(PinDriver::output(pins.gpio2)?, PinDriver::input(pins.gpio15)?, Ets, &config.load_cell);
    match scale.tare(config.load_cell.tare_samples) {
        Ok(offset) => info!("SCALE | tared at {}", offset),
        Err(e) => warn!("SCALE | tare failed ({}), readings will be offset", e),
    }
    let mut hw = NodeHardware::new(range, scale);

    #[cfg(feature = "camera")]
    let mut camera = match petfeeder::adapters::camera::Camera::init() {
        Ok(c) => Some(c),
        Err(e) => {
            warn!("MOTION | camera unavailable ({}), motion disabled", e);
            None
        }
    };

    // ── Wi-Fi ─────────────────────────────────────────────────
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let esp_wifi = BlockingWifi::wrap(EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?, sys_loop)?;
    let mut wifi = WifiAdapter::new(esp_wifi, config.link_retry, config.wifi_reconnect);
    wifi.set_credentials(SECRETS.wifi_ssid, SECRETS.wifi_pass)?;
    if let Err(e) = wifi.connect() {
        warn!("LINK | Wi-Fi unavailable ({}), running off-line", e);
    }

    let watchdog = Watchdog::default();
    let mut broker = MqttAdapter::new(BrokerSettings::from_secrets(&SECRETS), config.broker_retry);
    let mut sink = LogEventSink::new();
    let interval = Duration::from_millis(u64::from(config.publish_interval_ms));

    let mut node = SensorNodeService::new(&config);
    node.start(&mut sink);

    let mut was_associated = wifi.is_connected();
    loop {
        let associated = wifi.poll(clock.uptime_ms()).is_up();
        if associated && !was_associated {
            info!("LINK | Wi-Fi back, retrying broker");
            broker.reset();
        }
        was_associated = associated;

        #[cfg(feature = "camera")]
        let cam = camera.as_mut().map(|c| c as &mut dyn FramePort);
        #[cfg(not(feature = "camera"))]
        let cam = None;
        node.tick(&mut hw, cam, &mut broker, &mut sink, clock.uptime_ms());
        watchdog.feed();
        std::thread::sleep(interval);
    }
}

