//! Polled button debouncer and edge detector.
//!
//! ## Hardware
//!
//! Active-low momentary switches with internal pull-ups. The main loop
//! samples each pin once per iteration and feeds the level to
//! [`Debouncer::poll`], which only trusts a level that has been stable for
//! longer than the debounce window.
//!
//! ## Transitions
//!
//! | Stable level | Tracked state | Transition              |
//! |--------------|---------------|-------------------------|
//! | LOW          | released      | `Pressed`               |
//! | LOW          | pressed       | `HeldFor(now - start)`  |
//! | HIGH         | pressed       | `Released(now - start)` |
//!
//! `HeldFor` is emitted on every stable poll while the button stays down,
//! so the gesture classifier can track milestones without its own timer.

use heapless::Vec;
use log::warn;

use crate::config::MAX_BUTTONS;
use crate::error::{InputError, Result};

/// Raw pin level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

/// Debounced edge reported for one button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Pressed,
    HeldFor(u32),
    Released(u32),
}

/// Per-button debounce state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonChannel {
    pub pin: i32,
    last_raw: Level,
    last_debounce_ms: u32,
    is_pressed: bool,
    press_start_ms: u32,
    /// Set when a long hold has already been acted on, so the release
    /// must not trigger anything else.
    long_press_handled: bool,
}

impl ButtonChannel {
    pub fn new(pin: i32) -> Self {
        Self {
            pin,
            last_raw: Level::High,
            last_debounce_ms: 0,
            is_pressed: false,
            press_start_ms: 0,
            long_press_handled: false,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.is_pressed
    }

    fn poll(&mut self, raw: Level, now_ms: u32, window_ms: u32) -> Option<Transition> {
        if raw != self.last_raw {
            self.last_debounce_ms = now_ms;
        }
        self.last_raw = raw;

        if now_ms.wrapping_sub(self.last_debounce_ms) <= window_ms {
            return None;
        }

        match (raw, self.is_pressed) {
            (Level::Low, false) => {
                self.is_pressed = true;
                self.press_start_ms = now_ms;
                self.long_press_handled = false;
                Some(Transition::Pressed)
            }
            (Level::Low, true) => Some(Transition::HeldFor(now_ms.wrapping_sub(self.press_start_ms))),
            (Level::High, true) => {
                self.is_pressed = false;
                Some(Transition::Released(now_ms.wrapping_sub(self.press_start_ms)))
            }
            (Level::High, false) => None,
        }
    }
}

/// Debouncer for every configured button.
pub struct Debouncer {
    channels: Vec<ButtonChannel, MAX_BUTTONS>,
    window_ms: u32,
}

impl Debouncer {
    pub fn new(pins: &[i32], window_ms: u32) -> Self {
        Self {
            channels: pins.iter().take(MAX_BUTTONS).map(|&p| ButtonChannel::new(p)).collect(),
            window_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn pin(&self, index: usize) -> Option<i32> {
        self.channels.get(index).map(|c| c.pin)
    }

    pub fn channel(&self, index: usize) -> Option<&ButtonChannel> {
        self.channels.get(index)
    }

    /// Feed one raw sample for button `index`.
    pub fn poll(&mut self, index: usize, raw: Level, now_ms: u32) -> Result<Option<Transition>> {
        let window = self.window_ms;
        let channel = self.channels.get_mut(index).ok_or_else(|| {
            warn!("Debouncer: button index {} out of range", index);
            InputError::InvalidButton(index)
        })?;
        Ok(channel.poll(raw, now_ms, window))
    }

    /// Suppress whatever the next release of button `index` would do.
    pub fn guard_release(&mut self, index: usize) {
        if let Some(c) = self.channels.get_mut(index) {
            c.long_press_handled = true;
        }
    }

    /// Guard every button that is currently held.
    pub fn guard_all(&mut self) {
        for c in self.channels.iter_mut().filter(|c| c.is_pressed) {
            c.long_press_handled = true;
        }
    }

    /// Read and clear the release guard.
    pub fn take_guard(&mut self, index: usize) -> bool {
        self.channels
            .get_mut(index)
            .is_some_and(|c| core::mem::replace(&mut c.long_press_handled, false))
    }
}
