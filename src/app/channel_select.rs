//! Channel-select sub-mode.
//!
//! Entered from a long hold. Every button release advances the pending MIDI
//! receive channel (1..=16, wrapping). After a quiet period the pending
//! channel is committed and the LED blinks it back: `channel` flashes with
//! 200 ms toggles.

use crate::config::MAX_MIDI_CHANNEL;
use crate::drivers::led_patterns::LedPattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Confirmation {
    remaining_toggles: u8,
    led_on: bool,
    last_toggle_ms: u32,
}

#[derive(Debug, Default)]
pub struct ChannelSelect {
    active: bool,
    temp_channel: u8,
    last_input_ms: u32,
    confirm: Option<Confirmation>,
}

impl ChannelSelect {
    /// Start selecting from `current`. Omni (0) starts at 1.
    pub fn enter(&mut self, current: u8, now_ms: u32) {
        self.active = true;
        self.temp_channel = if current == 0 { 1 } else { current.min(MAX_MIDI_CHANNEL) };
        self.last_input_ms = now_ms;
        self.confirm = None;
    }

    /// Advance the pending channel and restart the inactivity timer.
    pub fn increment(&mut self, now_ms: u32) -> u8 {
        self.temp_channel = self.temp_channel % MAX_MIDI_CHANNEL + 1;
        self.last_input_ms = now_ms;
        self.temp_channel
    }

    /// Commit after `inactivity_ms` without input. Returns the committed
    /// channel once and starts the confirmation blink.
    pub fn tick(&mut self, now_ms: u32, inactivity_ms: u32) -> Option<u8> {
        if !self.active || now_ms.wrapping_sub(self.last_input_ms) <= inactivity_ms {
            return None;
        }
        self.active = false;
        self.confirm = Some(Confirmation {
            remaining_toggles: self.temp_channel.saturating_mul(2),
            led_on: false,
            last_toggle_ms: now_ms,
        });
        Some(self.temp_channel)
    }

    /// Advance the confirmation blink. Returns the LED pattern to apply
    /// when a toggle is due, and a final `Off` when the sequence ends.
    pub fn confirm_tick(&mut self, now_ms: u32, toggle_ms: u32) -> Option<LedPattern> {
        let c = self.confirm.as_mut()?;
        if c.remaining_toggles == 0 {
            self.confirm = None;
            return Some(LedPattern::Off);
        }
        if now_ms.wrapping_sub(c.last_toggle_ms) < toggle_ms {
            return None;
        }
        c.led_on = !c.led_on;
        c.remaining_toggles -= 1;
        c.last_toggle_ms = now_ms;
        Some(if c.led_on { LedPattern::SingleFlash } else { LedPattern::Off })
    }

    /// Abandon the sub-mode without committing.
    pub fn cancel(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_confirming(&self) -> bool {
        self.confirm.is_some()
    }

    pub fn temp_channel(&self) -> u8 {
        self.temp_channel
    }
}
