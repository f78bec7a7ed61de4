//! PetFeeder firmware library.
//!
//! Shared by the gateway and sensor-node binaries and by the host-side
//! test suites. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod rules;
pub mod telemetry;
pub mod topics;

pub mod pins;

// ESP-IDF-backed modules; host builds get the cfg-gated simulation paths.
pub mod adapters;
pub mod drivers;
pub mod sensors;
