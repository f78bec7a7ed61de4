//! System configuration parameters
//!
//! All tunable parameters for the gateway and sensor-node firmware.
//! Values are compile-time defaults; credentials and endpoints come from
//! the build environment through [`Secrets::from_build_env`].

use serde::{Deserialize, Serialize};

use crate::connectivity::RetryPolicy;
use crate::error::ConfigError;
use crate::topics::TopicNamespace;

/// How the feeder gate is driven once the feed rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedMode {
    /// Open at `open_angle` and hold until the bowl is full again.
    HoldUntilFull,
    /// Open at `open_angle` for `open_ms`, then close.
    TimedPulse { open_ms: u32 },
    /// Open proportionally to how empty the bowl is, hold until full.
    Proportional,
}

/// Whether alert categories throttle independently or share one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CooldownScope {
    PerCategory,
    Shared,
}

/// Threshold table evaluated once per gateway loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    // --- Air quality (raw ADC counts) ---
    /// Lower bound of the "mild odor" band (inclusive)
    pub air_mild_odor: u16,
    /// Readings above this raise the "bad air" alert
    pub air_bad: u16,

    // --- Light (raw ADC counts) ---
    /// Readings below this raise the "too dark" alert
    pub light_too_dark: u16,
    /// Readings above this raise the "too bright" alert
    pub light_too_bright: u16,

    // --- Activity ---
    /// Raise the stillness alert after this long without motion (ms)
    pub stillness_timeout_ms: u64,
    /// Alert on every motion report (subject to cooldown)
    pub alert_on_motion: bool,

    // --- Feeding ---
    /// Bowl weight below which feeding is allowed (g)
    pub feed_empty_g: f32,
    /// Bowl weight above which the fed latch resets (g)
    pub feed_full_g: f32,
    /// Pet must be closer than this for feeding to start (cm)
    pub near_distance_cm: f32,
    /// Servo angle with the gate closed (degrees)
    pub closed_angle: u8,
    /// Servo angle with the gate fully open (degrees)
    pub open_angle: u8,
    pub feed_mode: FeedMode,

    // --- Alerts ---
    /// Minimum time between two alerts of the same category (ms)
    pub cooldown_ms: u64,
    pub cooldown_scope: CooldownScope,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            air_mild_odor: 3000,
            air_bad: 3500,

            light_too_dark: 500,
            light_too_bright: 3800,

            stillness_timeout_ms: 30 * 60_000,
            alert_on_motion: true,

            feed_empty_g: 50.0,
            feed_full_g: 120.0,
            near_distance_cm: 15.0,
            closed_angle: 0,
            open_angle: 90,
            feed_mode: FeedMode::HoldUntilFull,

            cooldown_ms: 60_000,
            cooldown_scope: CooldownScope::PerCategory,
        }
    }
}

impl RuleConfig {
    /// Reject inconsistent threshold tables.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.air_bad <= self.air_mild_odor {
            return Err(ConfigError::ValidationFailed("air_bad must exceed air_mild_odor"));
        }
        if self.light_too_bright <= self.light_too_dark {
            return Err(ConfigError::ValidationFailed(
                "light_too_bright must exceed light_too_dark",
            ));
        }
        if !(self.feed_empty_g >= 0.0 && self.feed_full_g > self.feed_empty_g) {
            return Err(ConfigError::ValidationFailed("feed_full_g must exceed feed_empty_g"));
        }
        if !(self.near_distance_cm > 0.0) {
            return Err(ConfigError::ValidationFailed("near_distance_cm must be positive"));
        }
        if self.open_angle > 180 || self.closed_angle > 180 {
            return Err(ConfigError::ValidationFailed("servo angles must be 0-180"));
        }
        if self.open_angle == self.closed_angle {
            return Err(ConfigError::ValidationFailed("open_angle equals closed_angle"));
        }
        if let FeedMode::TimedPulse { open_ms: 0 } = self.feed_mode {
            return Err(ConfigError::ValidationFailed("TimedPulse open_ms must be > 0"));
        }
        if self.cooldown_ms == 0 {
            return Err(ConfigError::ValidationFailed("cooldown_ms must be > 0"));
        }
        Ok(())
    }
}

/// Gateway node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub rules: RuleConfig,
    /// Topic layout shared with the sensor nodes
    pub namespace: TopicNamespace,
    /// Fixed delay between loop iterations (ms)
    pub loop_interval_ms: u32,
    /// Minimum time between cloud log posts (ms)
    pub log_interval_ms: u32,
    /// Publish the local air/light readings every loop
    pub publish_local_readings: bool,
    /// Wi-Fi association at boot
    pub link_retry: RetryPolicy,
    /// Wi-Fi re-association from the loop, after boot
    pub wifi_reconnect: RetryPolicy,
    /// Broker (re)connection
    pub broker_retry: RetryPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            rules: RuleConfig::default(),
            namespace: TopicNamespace::Alias,
            loop_interval_ms: 1000, // 1 Hz
            log_interval_ms: 1000,  // every loop
            publish_local_readings: true,
            link_retry: RetryPolicy::fixed(40, 300),
            wifi_reconnect: RetryPolicy::default(),
            broker_retry: RetryPolicy::default(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rules.validate()?;
        if self.loop_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("loop_interval_ms must be > 0"));
        }
        self.link_retry.validate()?;
        validate_unbounded(&self.wifi_reconnect)?;
        self.broker_retry.validate()
    }
}

/// HX711 load-cell calibration and smoothing
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoadCellConfig {
    /// Raw counts per gram
    pub scale: f32,
    /// Conversions averaged per reading
    pub samples_per_read: u8,
    /// Moving-average window over published readings
    pub window: usize,
    /// Conversions averaged when taring at boot
    pub tare_samples: u8,
}

impl Default for LoadCellConfig {
    fn default() -> Self {
        Self {
            scale: 420.0,
            samples_per_read: 5,
            window: 5,
            tare_samples: 15,
        }
    }
}

/// Frame-difference motion detector parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MotionConfig {
    pub width: usize,
    pub height: usize,
    /// Per-pixel grayscale delta that counts as "changed"
    pub pixel_delta: u8,
    /// Changed pixels required to report motion
    pub changed_pixels: usize,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            width: 160,
            height: 120,
            pixel_delta: 25,
            changed_pixels: 1200,
        }
    }
}

/// Sensor node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub namespace: TopicNamespace,
    /// Fixed delay between publish rounds (ms)
    pub publish_interval_ms: u32,
    /// Maximum wait for the ultrasonic echo edge (µs)
    pub echo_timeout_us: u32,
    pub load_cell: LoadCellConfig,
    pub motion: MotionConfig,
    pub link_retry: RetryPolicy,
    pub wifi_reconnect: RetryPolicy,
    pub broker_retry: RetryPolicy,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            namespace: TopicNamespace::Alias,
            publish_interval_ms: 1500,
            echo_timeout_us: 30_000,
            load_cell: LoadCellConfig::default(),
            motion: MotionConfig::default(),
            link_retry: RetryPolicy::fixed(50, 300),
            wifi_reconnect: RetryPolicy::default(),
            broker_retry: RetryPolicy::default(),
        }
    }
}

impl NodeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.publish_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("publish_interval_ms must be > 0"));
        }
        if self.echo_timeout_us == 0 {
            return Err(ConfigError::ValidationFailed("echo_timeout_us must be > 0"));
        }
        if !(self.load_cell.scale.is_finite() && self.load_cell.scale != 0.0) {
            return Err(ConfigError::ValidationFailed("load_cell.scale must be non-zero"));
        }
        if self.load_cell.samples_per_read == 0 || self.load_cell.window == 0 {
            return Err(ConfigError::ValidationFailed("load_cell sample counts must be > 0"));
        }
        if self.motion.width == 0 || self.motion.height == 0 {
            return Err(ConfigError::ValidationFailed("motion frame size must be non-zero"));
        }
        self.link_retry.validate()?;
        validate_unbounded(&self.wifi_reconnect)?;
        self.broker_retry.validate()
    }
}

/// A loop-driven reconnect must never stop trying.
fn validate_unbounded(policy: &RetryPolicy) -> Result<(), ConfigError> {
    if policy.max_attempts.is_some() {
        return Err(ConfigError::ValidationFailed("wifi_reconnect must retry forever"));
    }
    policy.validate()
}

// ---------------------------------------------------------------------------
// Build-time secrets
// ---------------------------------------------------------------------------

/// Credentials and endpoints baked in at compile time.
#[derive(Debug, Clone, Copy)]
pub struct Secrets {
    pub wifi_ssid: &'static str,
    pub wifi_pass: &'static str,
    /// e.g. `mqtt://broker.netpie.io:1883`
    pub mqtt_url: &'static str,
    pub mqtt_client_id: &'static str,
    pub mqtt_username: &'static str,
    pub mqtt_password: &'static str,
    /// Base URL of the REST database (`/hamster_log.json` is appended)
    pub log_url: &'static str,
    pub webhook_url: &'static str,
}

impl Secrets {
    pub const fn from_build_env() -> Self {
        Self {
            wifi_ssid: or_empty(option_env!("PETFEEDER_WIFI_SSID")),
            wifi_pass: or_empty(option_env!("PETFEEDER_WIFI_PASS")),
            mqtt_url: or_empty(option_env!("PETFEEDER_MQTT_URL")),
            mqtt_client_id: or_empty(option_env!("PETFEEDER_MQTT_CLIENT_ID")),
            mqtt_username: or_empty(option_env!("PETFEEDER_MQTT_USERNAME")),
            mqtt_password: or_empty(option_env!("PETFEEDER_MQTT_PASSWORD")),
            log_url: or_empty(option_env!("PETFEEDER_LOG_URL")),
            webhook_url: or_empty(option_env!("PETFEEDER_WEBHOOK_URL")),
        }
    }

    /// Check the values every node needs. The HTTP endpoints are optional:
    /// an empty URL disables that sink.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wifi_ssid.is_empty() {
            return Err(ConfigError::MissingSecret("PETFEEDER_WIFI_SSID"));
        }
        if self.mqtt_url.is_empty() {
            return Err(ConfigError::MissingSecret("PETFEEDER_MQTT_URL"));
        }
        if self.mqtt_client_id.is_empty() {
            return Err(ConfigError::MissingSecret("PETFEEDER_MQTT_CLIENT_ID"));
        }
        Ok(())
    }
}

const fn or_empty(v: Option<&'static str>) -> &'static str {
    match v {
        Some(s) => s,
        None => "",
    }
}
