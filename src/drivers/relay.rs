//! Amp channel relay bank.
//!
//! One GPIO per channel, HIGH = engaged. At most one relay is ever on:
//! selecting channel `n` drops every other relay first, channel 0 drops
//! them all.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the relay GPIOs via hw_init helpers.
//! On host/test: tracks state in-memory only.

use heapless::Vec;

use crate::config::MAX_CHANNELS;
use crate::drivers::hw_init;
use crate::error::OutputError;

pub struct RelayBank {
    gpios: Vec<i32, MAX_CHANNELS>,
    active: u8,
}

impl RelayBank {
    pub fn new(gpios: &[i32]) -> Self {
        Self {
            gpios: gpios.iter().take(MAX_CHANNELS).copied().collect(),
            active: 0,
        }
    }

    pub fn channel_count(&self) -> u8 {
        self.gpios.len() as u8
    }

    /// Engage channel `channel` (1-based), or release everything for 0.
    pub fn select(&mut self, channel: u8) -> Result<(), OutputError> {
        let max = self.channel_count();
        if channel > max {
            return Err(OutputError::InvalidChannel { requested: channel, max });
        }

        // Break before make.
        for (i, &gpio) in self.gpios.iter().enumerate() {
            if i + 1 != channel as usize {
                hw_init::gpio_write(gpio, false);
            }
        }
        if channel > 0 {
            hw_init::gpio_write(self.gpios[channel as usize - 1], true);
        }

        self.active = channel;
        Ok(())
    }

    pub fn all_off(&mut self) {
        let _ = self.select(0);
    }

    /// Currently engaged channel, 0 = none.
    pub fn active(&self) -> u8 {
        self.active
    }

    pub fn is_engaged(&self, channel: u8) -> bool {
        channel != 0 && self.active == channel
    }
}
