//! OV2640 camera adapter (AI-Thinker ESP32-CAM).
//!
//! Implements [`FramePort`] with QQVGA grayscale frames from the
//! `esp32-camera` component.  Only built with the `camera` feature.

use log::{info, warn};

use esp_idf_svc::sys::camera;
use esp_idf_svc::sys::{ESP_OK, esp_err_t};

use crate::app::ports::FramePort;
use crate::error::SensorError;
use crate::pins::*;

const XCLK_HZ: i32 = 20_000_000;

pub struct Camera {
    _private: (),
}

impl Camera {
    /// Power up the sensor and allocate one frame buffer.
    pub fn init() -> Result<Self, esp_err_t> {
        let mut cfg = camera::camera_config_t {
            pin_pwdn: CAM_PWDN_GPIO,
            pin_reset: CAM_RESET_GPIO,
            pin_xclk: CAM_XCLK_GPIO,
            pin_d7: CAM_D7_GPIO,
            pin_d6: CAM_D6_GPIO,
            pin_d5: CAM_D5_GPIO,
            pin_d4: CAM_D4_GPIO,
            pin_d3: CAM_D3_GPIO,
            pin_d2: CAM_D2_GPIO,
            pin_d1: CAM_D1_GPIO,
            pin_d0: CAM_D0_GPIO,
            pin_vsync: CAM_VSYNC_GPIO,
            pin_href: CAM_HREF_GPIO,
            pin_pclk: CAM_PCLK_GPIO,
            xclk_freq_hz: XCLK_HZ,
            ledc_timer: camera::ledc_timer_t_LEDC_TIMER_0,
            ledc_channel: camera::ledc_channel_t_LEDC_CHANNEL_0,
            pixel_format: camera::pixformat_t_PIXFORMAT_GRAYSCALE,
            frame_size: camera::framesize_t_FRAMESIZE_QQVGA,
            jpeg_quality: 12,
            fb_count: 1,
            ..Default::default()
        };
        cfg.__bindgen_anon_1.pin_sccb_sda = CAM_SIOD_GPIO;
        cfg.__bindgen_anon_2.pin_sccb_scl = CAM_SIOC_GPIO;

        // SAFETY: the config outlives the call; the driver copies it.
        let ret = unsafe { camera::esp_camera_init(&cfg) };
        if ret != ESP_OK as i32 {
            warn!("MOTION | camera init failed ({})", ret);
            return Err(ret);
        }
        info!("MOTION | camera ready (QQVGA grayscale)");
        Ok(Self { _private: () })
    }
}

impl FramePort for Camera {
    fn capture(&mut self, buf: &mut [u8]) -> Result<(), SensorError> {
        // SAFETY: the frame is returned to the driver before leaving scope,
        // and only read within its reported length.
        unsafe {
            let fb = camera::esp_camera_fb_get();
            if fb.is_null() {
                return Err(SensorError::FrameUnavailable);
            }
            let len = (*fb).len;
            let result = if len == buf.len() {
                buf.copy_from_slice(core::slice::from_raw_parts((*fb).buf, len));
                Ok(())
            } else {
                Err(SensorError::FrameUnavailable)
            };
            camera::esp_camera_fb_return(fb);
            result
        }
    }
}
