//! HTTP cloud adapter.
//!
//! Implements [`CloudPort`]: JSON posts to the REST log database and to the
//! chat webhook.  Every post is fire-and-forget.  The status code is handed
//! back to the caller for logging and nothing is retried.
//!
//! Posting is skipped (`LinkDown`) while Wi-Fi is not associated, and an
//! empty URL disables that sink (`EndpointDisabled`).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspHttpConnection` with the ESP-IDF
//!   certificate bundle for HTTPS.
//! - **all other targets**: records posts in memory for host-side tests.

use log::debug;

use crate::adapters::wifi;
use crate::app::ports::CloudPort;
use crate::config::Secrets;
use crate::error::CommsError;
use crate::telemetry::LOG_PATH;

#[cfg(target_os = "espidf")]
use embedded_svc::http::client::Client;
#[cfg(target_os = "espidf")]
use embedded_svc::io::Write;
#[cfg(target_os = "espidf")]
use esp_idf_svc::http::client::{Configuration as HttpConfig, EspHttpConnection};

pub struct HttpCloudAdapter {
    log_url: String,
    webhook_url: String,
    #[cfg(not(target_os = "espidf"))]
    sim_status: u16,
    #[cfg(not(target_os = "espidf"))]
    sim_posts: Vec<(String, String)>,
}

impl HttpCloudAdapter {
    /// `log_base` is the database root; the log path is appended.  Either
    /// argument may be empty to disable that sink.
    pub fn new(log_base: &str, webhook_url: &str) -> Self {
        let log_url = if log_base.is_empty() {
            String::new()
        } else {
            format!("{}{}", log_base.trim_end_matches('/'), LOG_PATH)
        };
        Self {
            log_url,
            webhook_url: webhook_url.to_owned(),
            #[cfg(not(target_os = "espidf"))]
            sim_status: 200,
            #[cfg(not(target_os = "espidf"))]
            sim_posts: Vec::new(),
        }
    }

    pub fn from_secrets(s: &Secrets) -> Self {
        Self::new(s.log_url, s.webhook_url)
    }

    pub fn log_url(&self) -> &str {
        &self.log_url
    }

    /// Status code the simulated server answers with.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_status(&mut self, status: u16) {
        self.sim_status = status;
    }

    /// `(url, body)` of every simulated post, oldest first.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_posts(&self) -> &[(String, String)] {
        &self.sim_posts
    }

    fn post(&mut self, which: Target, body: &str) -> Result<u16, CommsError> {
        let url = match which {
            Target::Log => self.log_url.as_str(),
            Target::Chat => self.webhook_url.as_str(),
        };
        if url.is_empty() {
            return Err(CommsError::EndpointDisabled);
        }
        if !wifi::sta_associated() {
            return Err(CommsError::LinkDown);
        }
        debug!("HTTP | POST {} ({} bytes)", url, body.len());
        let url = url.to_owned();
        self.platform_post(&url, body)
    }

    #[cfg(target_os = "espidf")]
    fn platform_post(&mut self, url: &str, body: &str) -> Result<u16, CommsError> {
        let conn = EspHttpConnection::new(&HttpConfig {
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        })
        .map_err(|_| CommsError::HttpRequestFailed)?;
        let mut client = Client::wrap(conn);

        let len = body.len().to_string();
        let headers = [("Content-Type", "application/json"), ("Content-Length", len.as_str())];
        let mut request = client.post(url, &headers).map_err(|_| CommsError::HttpRequestFailed)?;
        request
            .write_all(body.as_bytes())
            .map_err(|_| CommsError::HttpRequestFailed)?;
        let response = request.submit().map_err(|_| CommsError::HttpRequestFailed)?;
        Ok(response.status())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_post(&mut self, url: &str, body: &str) -> Result<u16, CommsError> {
        self.sim_posts.push((url.to_owned(), body.to_owned()));
        Ok(self.sim_status)
    }
}

#[derive(Clone, Copy)]
enum Target {
    Log,
    Chat,
}

impl CloudPort for HttpCloudAdapter {
    fn post_log(&mut self, json: &str) -> Result<u16, CommsError> {
        self.post(Target::Log, json)
    }

    fn post_chat(&mut self, json: &str) -> Result<u16, CommsError> {
        self.post(Target::Chat, json)
    }
}
