//! GPIO / peripheral pin assignments for the gateway and sensor-node boards.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Both boards are classic ESP32 (WROOM / CAM).

// ---------------------------------------------------------------------------
// Gateway — analog sensors (ADC1)
// ---------------------------------------------------------------------------

/// MQ-135 air-quality sensor, analog out.  ADC1 channel 6.
pub const AIR_ADC_GPIO: i32 = 34;

/// LDR voltage divider.  ADC1 channel 7.
pub const LIGHT_ADC_GPIO: i32 = 35;

// ---------------------------------------------------------------------------
// Gateway — feeder gate servo (LEDC)
// ---------------------------------------------------------------------------

pub const SERVO_GPIO: i32 = 13;
/// Hobby-servo frame rate.
pub const SERVO_PWM_FREQ_HZ: u32 = 50;
/// LEDC duty resolution for the servo timer.
pub const SERVO_DUTY_BITS: u32 = 14;
/// Pulse width at 0°.
pub const SERVO_MIN_PULSE_US: u32 = 500;
/// Pulse width at 180°.
pub const SERVO_MAX_PULSE_US: u32 = 2400;

// ---------------------------------------------------------------------------
// Sensor node — HC-SR04 and HX711
// ---------------------------------------------------------------------------

pub const ULTRASONIC_TRIG_GPIO: i32 = 12;
pub const ULTRASONIC_ECHO_GPIO: i32 = 14;

pub const HX711_DT_GPIO: i32 = 15;
pub const HX711_SCK_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// Sensor node — OV2640 camera (AI-Thinker ESP32-CAM wiring)
// ---------------------------------------------------------------------------

pub const CAM_PWDN_GPIO: i32 = 32;
pub const CAM_RESET_GPIO: i32 = -1;
pub const CAM_XCLK_GPIO: i32 = 0;
pub const CAM_SIOD_GPIO: i32 = 26;
pub const CAM_SIOC_GPIO: i32 = 27;
pub const CAM_D7_GPIO: i32 = 35;
pub const CAM_D6_GPIO: i32 = 34;
pub const CAM_D5_GPIO: i32 = 39;
pub const CAM_D4_GPIO: i32 = 36;
pub const CAM_D3_GPIO: i32 = 21;
pub const CAM_D2_GPIO: i32 = 19;
pub const CAM_D1_GPIO: i32 = 18;
pub const CAM_D0_GPIO: i32 = 5;
pub const CAM_VSYNC_GPIO: i32 = 25;
pub const CAM_HREF_GPIO: i32 = 23;
pub const CAM_PCLK_GPIO: i32 = 22;
