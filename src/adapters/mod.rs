//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements             | Connects to                  |
//! |-------------|------------------------|------------------------------|
//! | `hardware`  | AnalogPort, ServoPort  | ESP32 ADC1, LEDC             |
//! | `mqtt`      | BrokerPort             | MQTT broker (NETPIE)         |
//! | `http`      | CloudPort              | REST log DB, chat webhook    |
//! | `camera`    | FramePort              | OV2640 via esp32-camera      |
//! | `log_sink`  | EventSink              | Serial log output            |
//! | `wifi`      |                        | ESP-IDF WiFi STA             |
//! | `time`      |                        | ESP32 system timer           |

#[cfg(all(target_os = "espidf", feature = "camera"))]
pub mod camera;
pub mod hardware;
pub mod http;
pub mod log_sink;
pub mod mqtt;
pub mod time;
pub mod wifi;
