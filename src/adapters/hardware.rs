//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the relay bank and the status LED and samples button pins through
//! [`GpioPin`], an `embedded-hal` digital input over the raw GPIO reads in
//! [`hw_init`]. This is the only module in the system that touches actual
//! hardware. On non-espidf targets the underlying drivers use cfg-gated
//! simulation stubs.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin};

use crate::app::ports::{InputPort, OutputPort};
use crate::config::DeviceConfig;
use crate::drivers::button::Level;
use crate::drivers::hw_init;
use crate::drivers::relay::RelayBank;
use crate::drivers::status_led::StatusLed;
use crate::error::OutputError;

/// A configured GPIO input.
#[derive(Debug, Clone, Copy)]
pub struct GpioPin(pub i32);

impl ErrorType for GpioPin {
    type Error = Infallible;
}

impl InputPin for GpioPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(hw_init::gpio_read(self.0))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!hw_init::gpio_read(self.0))
    }
}

/// Sample any `embedded-hal` input as a [`Level`].
pub fn sample(pin: &mut impl InputPin) -> Level {
    // A pin that cannot be read looks released.
    match pin.is_low() {
        Ok(true) => Level::Low,
        _ => Level::High,
    }
}

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    relays: RelayBank,
    led: StatusLed,
}

impl HardwareAdapter {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            relays: RelayBank::new(&config.relay_gpios),
            led: StatusLed::new(),
        }
    }

    pub fn active_channel(&self) -> u8 {
        self.relays.active()
    }

    /// Drop every relay and darken the LED (restart, update mode).
    pub fn all_off(&mut self) {
        self.relays.all_off();
        self.led.off();
    }
}

// ── InputPort implementation ──────────────────────────────────

impl InputPort for HardwareAdapter {
    fn read_pin(&mut self, gpio: i32) -> Level {
        sample(&mut GpioPin(gpio))
    }
}

// ── OutputPort implementation ─────────────────────────────────

impl OutputPort for HardwareAdapter {
    fn set_channel(&mut self, channel: u8) -> Result<(), OutputError> {
        self.relays.select(channel)
    }

    fn set_led_duty(&mut self, duty: u16) {
        self.led.set_duty(duty);
    }
}
