//! WiFi station-mode adapter.
//!
//! Validates credentials, then associates with the access point using the
//! bounded [`retry_blocking`] policy (fixed 300 ms spin by default).  A
//! failed bring-up is returned as [`CommsError::RetryExhausted`]; the
//! caller logs it and keeps looping with the broker off-line.
//!
//! After boot, [`WifiAdapter::poll`] runs once per loop iteration.  It
//! notices a dropped association and re-requests it on an unbounded
//! [`Reconnector`] schedule.  On device the request does not block: the
//! driver associates in the background and a later poll sees it.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use crate::connectivity::{LinkState, Reconnector, RetryPolicy, retry_blocking};
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

/// Simulated association state, shared with the simulated HTTP adapter.
#[cfg(not(target_os = "espidf"))]
static SIM_ASSOCIATED: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_associated(up: bool) {
    SIM_ASSOCIATED.store(up, Ordering::Relaxed);
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), CommsError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(CommsError::InvalidSsid);
    }
    Ok(())
}

/// Empty means an open network; WPA2 needs 8 – 64 bytes.
pub fn validate_password(password: &str) -> Result<(), CommsError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(CommsError::InvalidPassword);
    }
    Ok(())
}

/// Whether the station is associated right now.  Cheap; used by the HTTP
/// adapter to skip posts while the link is down.
#[cfg(target_os = "espidf")]
pub fn sta_associated() -> bool {
    let mut info = esp_idf_svc::sys::wifi_ap_record_t::default();
    // SAFETY: read-only query of the STA driver into a local record.
    unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut info) == esp_idf_svc::sys::ESP_OK as i32 }
}

#[cfg(not(target_os = "espidf"))]
pub fn sta_associated() -> bool {
    SIM_ASSOCIATED.load(Ordering::Relaxed)
}

// ───────────────────────────────────────────────────────────────
// Station (platform half)
// ───────────────────────────────────────────────────────────────

struct Station {
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    /// Simulation: number of upcoming association attempts that fail.
    #[cfg(not(target_os = "espidf"))]
    sim_failures: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_associated: bool,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl Station {
    #[cfg(target_os = "espidf")]
    fn configuration(&self) -> Result<Configuration, CommsError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        Ok(Configuration::Client(ClientConfiguration {
            ssid: self.ssid.as_str().try_into().map_err(|_| CommsError::InvalidSsid)?,
            password: self.password.as_str().try_into().map_err(|_| CommsError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        }))
    }

    /// Full association; blocks until the netif has an address.
    #[cfg(target_os = "espidf")]
    fn associate(&mut self) -> Result<(), CommsError> {
        let cfg = self.configuration()?;
        self.wifi.set_configuration(&cfg).map_err(|_| CommsError::LinkDown)?;
        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi.start().map_err(|_| CommsError::LinkDown)?;
        }
        self.wifi.connect().map_err(|_| CommsError::LinkDown)?;
        self.wifi.wait_netif_up().map_err(|_| CommsError::LinkDown)?;
        if let Ok(ip) = self.wifi.wifi().sta_netif().get_ip_info() {
            info!("WiFi: DHCP {:?}", ip.ip);
        }
        Ok(())
    }

    /// Ask the driver to associate and return at once.
    #[cfg(target_os = "espidf")]
    fn request_association(&mut self) -> Result<(), CommsError> {
        if !self.wifi.is_started().unwrap_or(false) {
            let cfg = self.configuration()?;
            let radio = self.wifi.wifi_mut();
            radio.set_configuration(&cfg).map_err(|_| CommsError::LinkDown)?;
            radio.start().map_err(|_| CommsError::LinkDown)?;
        }
        self.wifi.wifi_mut().connect().map_err(|_| CommsError::LinkDown)
    }

    #[cfg(target_os = "espidf")]
    fn is_associated(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn associate(&mut self) -> Result<(), CommsError> {
        if self.sim_failures > 0 {
            self.sim_failures -= 1;
            warn!("WiFi(sim): association refused");
            self.set_sim_associated(false);
            return Err(CommsError::LinkDown);
        }
        self.set_sim_associated(true);
        info!("WiFi(sim): associated with '{}'", self.ssid);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn request_association(&mut self) -> Result<(), CommsError> {
        self.associate()
    }

    #[cfg(not(target_os = "espidf"))]
    fn is_associated(&self) -> bool {
        self.sim_associated
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_sim_associated(&mut self, up: bool) {
        self.sim_associated = up;
        SIM_ASSOCIATED.store(up, Ordering::Relaxed);
    }
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    station: Station,
    /// Boot-time bring-up.
    policy: RetryPolicy,
    /// Loop-time re-association.
    link: Reconnector,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>, boot: RetryPolicy, reconnect: RetryPolicy) -> Self {
        Self {
            station: Station {
                wifi,
                ssid: heapless::String::new(),
                password: heapless::String::new(),
            },
            policy: boot,
            link: Reconnector::new(reconnect),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(boot: RetryPolicy, reconnect: RetryPolicy) -> Self {
        Self {
            station: Station {
                sim_failures: 0,
                sim_associated: false,
                ssid: heapless::String::new(),
                password: heapless::String::new(),
            },
            policy: boot,
            link: Reconnector::new(reconnect),
        }
    }

    /// Make the next `n` simulated association attempts fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, n: u32) {
        self.station.sim_failures = n;
    }

    /// Simulate the access point dropping this station.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_association(&mut self) {
        self.station.set_sim_associated(false);
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), CommsError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        let st = &mut self.station;
        st.ssid.clear();
        st.ssid.push_str(ssid).map_err(|_| CommsError::InvalidSsid)?;
        st.password.clear();
        st.password.push_str(password).map_err(|_| CommsError::InvalidPassword)?;
        info!("WiFi: credentials set (SSID='{}')", st.ssid);
        Ok(())
    }

    /// Associate, sleeping between attempts on the current thread.
    pub fn connect(&mut self) -> Result<(), CommsError> {
        self.connect_with(|ms| std::thread::sleep(std::time::Duration::from_millis(u64::from(ms))))
    }

    /// Associate with an injected sleep (tests pass a no-op).
    pub fn connect_with(&mut self, sleep_ms: impl FnMut(u32)) -> Result<(), CommsError> {
        if self.station.ssid.is_empty() {
            return Err(CommsError::NoCredentials);
        }
        info!("WiFi: connecting to '{}'", self.station.ssid);
        let policy = self.policy;
        retry_blocking(&policy, sleep_ms, |_| self.station.associate())?;
        info!("WiFi: connected");
        Ok(())
    }

    /// Keep the association alive.  Call once per loop iteration.
    ///
    /// A lost association is re-requested straight away, then on the
    /// reconnect policy's backoff until the station is back.
    pub fn poll(&mut self, now_ms: u64) -> LinkState {
        if self.station.ssid.is_empty() {
            return LinkState::Down;
        }
        let associated = self.station.is_associated();
        match self.link.state() {
            LinkState::Up if !associated => {
                warn!("WiFi: association lost, reconnecting");
                self.link.mark_lost();
            }
            // Associated in the background since the last request.
            LinkState::Waiting { .. } | LinkState::GaveUp { .. } if associated => self.link.reset(),
            _ => {}
        }

        let station = &mut self.station;
        self.link.poll(now_ms, || -> Result<(), CommsError> {
            if associated {
                return Ok(());
            }
            station.request_association()?;
            if station.is_associated() {
                Ok(())
            } else {
                Err(CommsError::LinkDown)
            }
        })
    }

    pub fn is_connected(&self) -> bool {
        self.station.is_associated()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(boot: RetryPolicy) -> WifiAdapter {
        WifiAdapter::new(boot, RetryPolicy::default())
    }

    #[test]
    fn rejects_empty_ssid() {
        let mut a = adapter(RetryPolicy::fixed(3, 300));
        assert_eq!(a.set_credentials("", "password123"), Err(CommsError::InvalidSsid));
    }

    #[test]
    fn rejects_control_chars_in_ssid() {
        assert_eq!(validate_ssid("bad\x00ssid"), Err(CommsError::InvalidSsid));
        assert_eq!(validate_ssid(&"x".repeat(33)), Err(CommsError::InvalidSsid));
    }

    #[test]
    fn rejects_short_password() {
        let mut a = adapter(RetryPolicy::fixed(3, 300));
        assert_eq!(a.set_credentials("MyNet", "short"), Err(CommsError::InvalidPassword));
    }

    #[test]
    fn accepts_open_network() {
        let mut a = adapter(RetryPolicy::fixed(3, 300));
        assert!(a.set_credentials("OpenCafe", "").is_ok());
    }

    #[test]
    fn connect_without_credentials_fails() {
        let mut a = adapter(RetryPolicy::fixed(3, 300));
        assert_eq!(a.connect_with(|_| {}), Err(CommsError::NoCredentials));
        assert_eq!(a.poll(0), LinkState::Down);
    }

    #[test]
    fn bounded_retry_outcomes() {
        let mut a = adapter(RetryPolicy::fixed(3, 300));
        a.set_credentials("HomeWiFi", "mysecret8").unwrap();

        a.sim_fail_next(2);
        let mut sleeps = 0;
        assert_eq!(a.connect_with(|_| sleeps += 1), Ok(()));
        assert_eq!(sleeps, 2);

        a.sim_fail_next(5);
        assert_eq!(a.connect_with(|_| {}), Err(CommsError::RetryExhausted));
    }

    #[test]
    fn poll_recovers_after_boot_bring_up_gave_up() {
        let mut a = adapter(RetryPolicy::fixed(2, 300));
        a.set_credentials("HomeWiFi", "mysecret8").unwrap();
        a.sim_fail_next(3);
        assert_eq!(a.connect_with(|_| {}), Err(CommsError::RetryExhausted));
        assert!(!a.is_connected());

        // Third refusal lands on the first loop poll.
        assert_eq!(a.poll(0), LinkState::Waiting { attempt: 1, retry_at_ms: 2_000 });
        assert_eq!(a.poll(1_000), LinkState::Waiting { attempt: 1, retry_at_ms: 2_000 });
        assert_eq!(a.poll(2_000), LinkState::Up);
        assert!(a.is_connected());
    }

    #[test]
    fn poll_reassociates_after_drop() {
        let mut a = adapter(RetryPolicy::fixed(3, 300));
        a.set_credentials("HomeWiFi", "mysecret8").unwrap();
        a.connect_with(|_| {}).unwrap();
        assert_eq!(a.poll(0), LinkState::Up);

        a.sim_drop_association();
        a.sim_fail_next(1);
        assert_eq!(a.poll(1_000), LinkState::Waiting { attempt: 1, retry_at_ms: 3_000 });
        assert!(!a.is_connected());
        assert_eq!(a.poll(3_000), LinkState::Up);
        assert!(a.is_connected());
    }

    #[test]
    fn reconnect_never_gives_up() {
        let mut a = adapter(RetryPolicy::fixed(1, 0));
        a.set_credentials("HomeWiFi", "mysecret8").unwrap();
        a.sim_fail_next(49);
        let mut now = 0;
        for _ in 0..49 {
            match a.poll(now) {
                LinkState::Waiting { retry_at_ms, .. } => now = retry_at_ms,
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(a.poll(now), LinkState::Up);
    }
}
