//! Threshold rules — the gateway's only decision logic.
//!
//! [`decide`] is a pure function: it takes the configuration, the previous
//! [`ControllerState`] and an immutable [`SensorSnapshot`] and returns a
//! [`Decision`] describing what the loop should do (servo angle, publishes,
//! alerts, cloud log) together with the next state.  No I/O happens here.
//!
//! ```text
//!  SensorSnapshot ─┐
//!  ControllerState ┼──▶ decide() ──▶ Decision { next, servo_angle,
//!  GatewayConfig ──┘                            publishes, alerts, log }
//! ```

use crate::config::{CooldownScope, FeedMode, GatewayConfig, RuleConfig};
use crate::telemetry::{LogRecord, SensorSnapshot, format_count, format_flag};
use crate::topics::TopicKind;

// ───────────────────────────────────────────────────────────────
// Alerts
// ───────────────────────────────────────────────────────────────

/// Throttling key for alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertCategory {
    AirBad = 0,
    AirMildOdor = 1,
    TooDark = 2,
    TooBright = 3,
    Motion = 4,
    Stillness = 5,
    BowlTipped = 6,
    Fed = 7,
}

impl AlertCategory {
    pub const COUNT: usize = 8;
}

/// An alert with the reading that caused it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertKind {
    AirBad { air: u16 },
    AirMildOdor { air: u16 },
    TooDark { light: u16 },
    TooBright { light: u16 },
    Motion,
    Stillness { minutes: u64 },
    BowlTipped,
    Fed { weight_g: f32 },
}

impl AlertKind {
    pub fn category(&self) -> AlertCategory {
        match self {
            Self::AirBad { .. } => AlertCategory::AirBad,
            Self::AirMildOdor { .. } => AlertCategory::AirMildOdor,
            Self::TooDark { .. } => AlertCategory::TooDark,
            Self::TooBright { .. } => AlertCategory::TooBright,
            Self::Motion => AlertCategory::Motion,
            Self::Stillness { .. } => AlertCategory::Stillness,
            Self::BowlTipped => AlertCategory::BowlTipped,
            Self::Fed { .. } => AlertCategory::Fed,
        }
    }

    /// Chat text for this alert.
    pub fn message(&self) -> String {
        match self {
            Self::AirBad { air } => format!("ค่าอากาศแฮมสเตอร์สูงผิดปกติ! (ค่าอากาศ {})", air),
            Self::AirMildOdor { air } => {
                format!("เริ่มมีกลิ่นไม่พึงประสงค์ในบ้านแฮมสเตอร์ (ค่าอากาศ {})", air)
            }
            Self::TooDark { light } => {
                format!("ความสว่างบ้านแฮมสเตอร์ต่ำเกินไป! (ค่าแสง {})", light)
            }
            Self::TooBright { light } => {
                format!("บ้านแฮมสเตอร์สว่างเกินไป! (ค่าแสง {})", light)
            }
            Self::Motion => "พบการเคลื่อนไหวของหนูแฮมสเตอร์!".to_string(),
            Self::Stillness { minutes } => {
                format!("หนูแฮมสเตอร์ไม่เคลื่อนไหวมา {} นาทีแล้ว", minutes)
            }
            Self::BowlTipped => "🚨 **แจ้งเตือนด่วน!** AI ตรวจพบ **ชามข้าวหก (Tipped)** ⚠️".to_string(),
            Self::Fed { weight_g } => {
                format!("เติมอาหารให้หนูแฮมสเตอร์แล้ว! (น้ำหนักก่อนเติม {:.1} กรัม)", weight_g)
            }
        }
    }
}

/// Last-fired timestamps per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cooldowns {
    last_fired_ms: [Option<u64>; AlertCategory::COUNT],
}

impl Cooldowns {
    fn slot(scope: CooldownScope, category: AlertCategory) -> usize {
        match scope {
            CooldownScope::PerCategory => category as usize,
            CooldownScope::Shared => 0,
        }
    }

    /// A category that never fired is always ready.
    pub fn ready(&self, rules: &RuleConfig, category: AlertCategory, now_ms: u64) -> bool {
        match self.last_fired_ms[Self::slot(rules.cooldown_scope, category)] {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= rules.cooldown_ms,
        }
    }

    pub fn record(&mut self, rules: &RuleConfig, category: AlertCategory, now_ms: u64) {
        self.last_fired_ms[Self::slot(rules.cooldown_scope, category)] = Some(now_ms);
    }
}

// ───────────────────────────────────────────────────────────────
// State
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Closed,
    Open { angle: u8, since_ms: u64 },
}

/// Everything the rules remember between iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerState {
    /// Feed latch.
    pub fed: bool,
    pub gate: GateState,
    pub last_motion_ms: u64,
    /// Stillness alert already raised for the current still period.
    pub still_alerted: bool,
    pub cooldowns: Cooldowns,
    pub last_log_ms: Option<u64>,
}

impl ControllerState {
    /// Fresh state at boot; the stillness clock starts now.
    pub fn new(boot_ms: u64) -> Self {
        Self {
            fed: false,
            gate: GateState::Closed,
            last_motion_ms: boot_ms,
            still_alerted: false,
            cooldowns: Cooldowns::default(),
            last_log_ms: None,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Decision
// ───────────────────────────────────────────────────────────────

/// A broker publish the loop should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    pub kind: TopicKind,
    pub payload: heapless::String<48>,
}

/// State transitions worth reporting through the event sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleEvent {
    FeedStarted { angle: u8, weight_g: f32 },
    GateClosed,
    LatchReset { weight_g: f32 },
    AlertThrottled(AlertCategory),
}

/// Output of one rules evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub next: ControllerState,
    /// New servo angle, only when it changes.
    pub servo_angle: Option<u8>,
    pub publishes: heapless::Vec<Publish, 4>,
    pub alerts: heapless::Vec<AlertKind, 8>,
    pub log: Option<LogRecord>,
    pub events: heapless::Vec<RuleEvent, 12>,
}

impl Decision {
    fn new(next: ControllerState) -> Self {
        Self {
            next,
            servo_angle: None,
            publishes: heapless::Vec::new(),
            alerts: heapless::Vec::new(),
            log: None,
            events: heapless::Vec::new(),
        }
    }

    fn raise(&mut self, rules: &RuleConfig, alert: AlertKind, now_ms: u64) {
        let category = alert.category();
        if self.next.cooldowns.ready(rules, category, now_ms) {
            self.next.cooldowns.record(rules, category, now_ms);
            if self.alerts.push(alert).is_err() {
                log::warn!("ALERT | queue full, dropping {:?}", category);
            }
        } else {
            let _ = self.events.push(RuleEvent::AlertThrottled(category));
        }
    }

    fn publish(&mut self, kind: TopicKind, payload: &str) {
        let mut p = heapless::String::new();
        if p.push_str(payload).is_ok() && self.publishes.push(Publish { kind, payload: p }).is_err() {
            log::warn!("PUB | queue full, dropping {:?}", kind);
        }
    }

    fn move_gate(&mut self, gate: GateState, angle: u8) {
        if self.next.gate != gate {
            self.next.gate = gate;
            self.servo_angle = Some(angle);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Rules
// ───────────────────────────────────────────────────────────────

/// Evaluate every threshold check against `snap` at time `now_ms`.
pub fn decide(
    cfg: &GatewayConfig,
    state: &ControllerState,
    snap: &SensorSnapshot,
    now_ms: u64,
) -> Decision {
    let rules = &cfg.rules;
    let snap = snap.clamped();
    let mut d = Decision::new(*state);

    // 1–2. Air quality bands
    if snap.air_quality > rules.air_bad {
        d.raise(rules, AlertKind::AirBad { air: snap.air_quality }, now_ms);
    } else if snap.air_quality >= rules.air_mild_odor {
        d.raise(rules, AlertKind::AirMildOdor { air: snap.air_quality }, now_ms);
    }

    // 3–4. Light bands
    if snap.light < rules.light_too_dark {
        d.raise(rules, AlertKind::TooDark { light: snap.light }, now_ms);
    } else if snap.light > rules.light_too_bright {
        d.raise(rules, AlertKind::TooBright { light: snap.light }, now_ms);
    }

    // 5–6. Motion and stillness
    if snap.motion {
        d.next.last_motion_ms = now_ms;
        d.next.still_alerted = false;
        if rules.alert_on_motion {
            d.raise(rules, AlertKind::Motion, now_ms);
        }
    } else {
        let still_ms = now_ms.saturating_sub(d.next.last_motion_ms);
        if still_ms >= rules.stillness_timeout_ms && !d.next.still_alerted {
            let before = d.alerts.len();
            d.raise(rules, AlertKind::Stillness { minutes: still_ms / 60_000 }, now_ms);
            d.next.still_alerted = d.alerts.len() > before;
        }
    }

    // 7. Bowl tipped (vision server)
    if snap.cup == crate::telemetry::CupStatus::Tipped {
        d.raise(rules, AlertKind::BowlTipped, now_ms);
    }

    // 8–10. Feeding
    apply_feed_rules(rules, &snap, now_ms, &mut d);

    // Outbound publishes
    if cfg.publish_local_readings {
        d.publish(TopicKind::AirQuality, &format_count(snap.air_quality));
        d.publish(TopicKind::Light, &format_count(snap.light));
    }
    d.publish(TopicKind::Fed, format_flag(d.next.fed));

    // Cloud log
    let log_due = d
        .next
        .last_log_ms
        .is_none_or(|last| now_ms.saturating_sub(last) >= u64::from(cfg.log_interval_ms));
    if log_due {
        d.log = Some(LogRecord::from_snapshot(&snap, d.next.fed, now_ms));
        d.next.last_log_ms = Some(now_ms);
    }

    d
}

fn apply_feed_rules(rules: &RuleConfig, snap: &SensorSnapshot, now_ms: u64, d: &mut Decision) {
    let weight = snap.weight_g;

    let hungry = snap.weight_seen && weight < rules.feed_empty_g;
    if !d.next.fed && hungry && snap.pet_near(rules.near_distance_cm) {
        let angle = match rules.feed_mode {
            FeedMode::Proportional => proportional_angle(rules, weight),
            FeedMode::HoldUntilFull | FeedMode::TimedPulse { .. } => rules.open_angle,
        };
        d.next.fed = true;
        d.move_gate(GateState::Open { angle, since_ms: now_ms }, angle);
        let _ = d.events.push(RuleEvent::FeedStarted { angle, weight_g: weight });
        d.raise(rules, AlertKind::Fed { weight_g: weight }, now_ms);
        return;
    }

    if d.next.fed && weight > rules.feed_full_g {
        d.next.fed = false;
        let _ = d.events.push(RuleEvent::LatchReset { weight_g: weight });
        if d.next.gate != GateState::Closed {
            d.move_gate(GateState::Closed, rules.closed_angle);
            let _ = d.events.push(RuleEvent::GateClosed);
        }
        return;
    }

    if let (FeedMode::TimedPulse { open_ms }, GateState::Open { since_ms, .. }) =
        (rules.feed_mode, d.next.gate)
    {
        if now_ms.saturating_sub(since_ms) >= u64::from(open_ms) {
            d.move_gate(GateState::Closed, rules.closed_angle);
            let _ = d.events.push(RuleEvent::GateClosed);
        }
    }
}

/// Gate angle proportional to how far below full the bowl is, never equal
/// to the closed angle.
pub fn proportional_angle(rules: &RuleConfig, weight_g: f32) -> u8 {
    let need = ((rules.feed_full_g - weight_g) / rules.feed_full_g).clamp(0.0, 1.0);
    let closed = i16::from(rules.closed_angle);
    let span = i16::from(rules.open_angle) - closed;
    let mut angle = closed + (f32::from(span) * need).round() as i16;
    if angle == closed {
        angle += span.signum();
    }
    angle.clamp(0, 180) as u8
}
