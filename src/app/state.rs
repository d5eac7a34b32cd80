//! Shared runtime state.
//!
//! [`SystemState`] is the single owner of everything the poll loop mutates:
//! sub-mode state, the active relay channel, the learned Program Change
//! mapping, the MIDI receive channel and the LED engine. Components borrow
//! it mutably for the duration of one call and never hold on to it.

use heapless::Vec;

use crate::config::{DeviceConfig, MAX_CHANNELS};
use crate::drivers::led_patterns::LedPatternEngine;

use super::channel_select::ChannelSelect;
use super::midi_learn::MidiLearn;

/// Sub-mode and gesture bookkeeping.
#[derive(Debug, Default)]
pub struct ModeState {
    pub select: ChannelSelect,
    pub learn: MidiLearn,
    /// Bit `k` set = milestone `k` already fired during the current press.
    pub milestones_fired: u8,
    /// Learn just timed out; the next release must not trigger pairing.
    pub learn_just_timed_out: bool,
}

impl ModeState {
    pub fn reset_milestones(&mut self) {
        self.milestones_fired = 0;
    }
}

pub struct SystemState {
    pub mode: ModeState,
    /// 0 = all off, 1..=N.
    pub active_channel: u8,
    /// `mapping[i]` = Program Change number that selects channel `i + 1`.
    pub mapping: Vec<u8, MAX_CHANNELS>,
    /// 1..=16, 0 = omni.
    pub midi_channel: u8,
    pub led: LedPatternEngine,
    pub buttons_enabled: bool,
    /// Boot-time update trigger fired; LED shows FastBlink.
    pub update_mode: bool,
    pub channel_count: u8,
}

impl SystemState {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            mode: ModeState::default(),
            active_channel: 0,
            mapping: default_mapping(config.channel_count),
            midi_channel: 1,
            led: LedPatternEngine::new(),
            buttons_enabled: true,
            update_mode: false,
            channel_count: config.channel_count,
        }
    }

    /// Channel whose learned program equals `program`, 1-based.
    pub fn mapped_channel(&self, program: u8) -> Option<u8> {
        self.mapping
            .iter()
            .position(|&p| p == program)
            .map(|i| i as u8 + 1)
    }

    pub fn is_single_channel(&self) -> bool {
        self.channel_count == 1
    }
}

/// First-boot mapping: channel `i + 1` answers Program Change `i + 1`.
pub fn default_mapping(channel_count: u8) -> Vec<u8, MAX_CHANNELS> {
    (1..=channel_count.min(MAX_CHANNELS as u8)).collect()
}
