//! Application core — pure domain logic, zero I/O.
//!
//! [`service::GatewayService`] merges readings and runs the feeding and
//! alert rules; [`node::SensorNodeService`] samples and publishes the
//! sensor node's readings.  All interaction with hardware and the network
//! happens through the **port traits** in [`ports`], keeping this layer
//! fully testable without real peripherals.

pub mod events;
pub mod node;
pub mod ports;
pub mod service;
