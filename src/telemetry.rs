//! Readings, payload codecs and outbound record shapes.
//!
//! Inbound broker payloads are plain text.  Anything that does not parse
//! as a finite, non-negative number is clamped to zero here, before it can
//! reach a threshold comparison or be re-published.

use core::fmt::Write as _;

use serde::Serialize;

/// Display name used on every chat-webhook post.
pub const WEBHOOK_USERNAME: &str = "Hamster Alert Bot";

/// Path appended to the REST logging base URL.
pub const LOG_PATH: &str = "/hamster_log.json";

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Bowl state reported by the vision server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CupStatus {
    #[default]
    Unknown,
    Normal,
    Tipped,
    NotFound,
}

impl CupStatus {
    pub fn parse(payload: &[u8]) -> Self {
        match core::str::from_utf8(payload).map(str::trim) {
            Ok("normal") => Self::Normal,
            Ok("tipped") => Self::Tipped,
            Ok("not_found") => Self::NotFound,
            _ => Self::Unknown,
        }
    }
}

/// A point-in-time view of every reading the gateway acts on.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSnapshot {
    /// Latest ultrasonic distance (cm).
    pub distance_cm: f32,
    /// Latest bowl weight (g).
    pub weight_g: f32,
    /// MQ-135 raw ADC counts (0 – 4095).
    pub air_quality: u16,
    /// LDR raw ADC counts (0 – 4095).
    pub light: u16,
    pub motion: bool,
    pub cup: CupStatus,
    /// A distance has arrived from the sensor node since boot.
    pub distance_seen: bool,
    /// A weight has arrived from the sensor node since boot.
    pub weight_seen: bool,
}

impl SensorSnapshot {
    /// A received, non-zero distance closer than `near_cm`.
    ///
    /// Zero is what the node publishes when no echo came back, so it never
    /// counts as near.
    pub fn pet_near(&self, near_cm: f32) -> bool {
        self.distance_seen && self.distance_cm > 0.0 && self.distance_cm < near_cm
    }

    /// Re-apply the zero clamp to the float fields.
    pub fn clamped(self) -> Self {
        Self {
            distance_cm: clamp_reading(self.distance_cm),
            weight_g: clamp_reading(self.weight_g),
            ..self
        }
    }
}

// ---------------------------------------------------------------------------
// Payload codecs
// ---------------------------------------------------------------------------

/// Negative, NaN and infinite readings become `0.0`.
pub fn clamp_reading(v: f32) -> f32 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}

/// Parse a textual numeric payload; malformed text reads as `0.0`.
pub fn parse_reading(payload: &[u8]) -> f32 {
    core::str::from_utf8(payload)
        .ok()
        .and_then(|s| s.trim().parse::<f32>().ok())
        .map_or(0.0, clamp_reading)
}

/// Motion payloads are integers; only `1` means motion.
pub fn parse_flag(payload: &[u8]) -> bool {
    core::str::from_utf8(payload)
        .ok()
        .and_then(|s| s.trim().parse::<i32>().ok())
        == Some(1)
}

/// Outbound numeric payload, two decimals.
pub fn format_reading(v: f32) -> heapless::String<48> {
    let mut s = heapless::String::new();
    // 48 bytes hold f32::MAX with two decimals.
    let _ = write!(s, "{:.2}", clamp_reading(v));
    s
}

pub fn format_count(v: u16) -> heapless::String<48> {
    let mut s = heapless::String::new();
    let _ = write!(s, "{}", v);
    s
}

pub fn format_flag(on: bool) -> &'static str {
    if on { "1" } else { "0" }
}

// ---------------------------------------------------------------------------
// HTTP bodies
// ---------------------------------------------------------------------------

/// Cloud log row, one per post.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogRecord {
    pub ultrasonic: f32,
    pub weight: f32,
    pub air: u16,
    pub light: u16,
    pub motion: u8,
    pub fed: bool,
    /// Milliseconds since boot.
    pub timestamp: u64,
}

impl LogRecord {
    pub fn from_snapshot(snap: &SensorSnapshot, fed: bool, uptime_ms: u64) -> Self {
        let snap = snap.clamped();
        Self {
            ultrasonic: snap.distance_cm,
            weight: snap.weight_g,
            air: snap.air_quality,
            light: snap.light,
            motion: u8::from(snap.motion),
            fed,
            timestamp: uptime_ms,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Chat-webhook body.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChatMessage<'a> {
    pub username: &'a str,
    pub content: &'a str,
}

impl<'a> ChatMessage<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            username: WEBHOOK_USERNAME,
            content,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
