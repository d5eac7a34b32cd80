//! Single-colour status LED driver.
//!
//! One LEDC PWM channel at 13-bit resolution. The pattern engine decides
//! the duty; this driver only writes it and remembers the last value.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the LEDC channel via hw_init.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;
use crate::drivers::led_patterns::MAX_DUTY;

pub struct StatusLed {
    duty: u16,
}

impl Default for StatusLed {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusLed {
    pub fn new() -> Self {
        Self { duty: 0 }
    }

    /// Write a duty, clamped to the 13-bit range. Skips the register
    /// write when the duty is unchanged.
    pub fn set_duty(&mut self, duty: u16) {
        let duty = duty.min(MAX_DUTY);
        if duty == self.duty {
            return;
        }
        hw_init::ledc_set(hw_init::LEDC_CH_STATUS, u32::from(duty));
        self.duty = duty;
    }

    pub fn off(&mut self) {
        self.set_duty(0);
    }

    pub fn duty(&self) -> u16 {
        self.duty
    }
}
