//! Device configuration
//!
//! Everything that differs between a relay client and the MIDI hub lives
//! here: channel count, button bindings, hold thresholds and the milestone
//! table. Pin defaults come from [`crate::pins`].

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::drivers::led_patterns::LedPattern;
use crate::pins;

/// Upper bound on relay channels per board.
pub const MAX_CHANNELS: usize = 4;
/// Upper bound on buttons per board (mode button + footswitches).
pub const MAX_BUTTONS: usize = MAX_CHANNELS + 1;
/// Upper bound on configured hold milestones.
pub const MAX_MILESTONES: usize = 8;
/// Highest MIDI receive channel. 0 means omni.
pub const MAX_MIDI_CHANNEL: u8 = 16;

/// Which side of the link this board plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Drives amp relays, listens for hub commands.
    Client,
    /// Reads footswitches and MIDI, broadcasts to clients.
    Server,
}

/// What a short press on a button does when no sub-mode claims it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShortPressAction {
    /// Switch to relay channel `n` (toggle on single-channel boards).
    SelectChannel(u8),
    /// Broadcast a Program Change to every paired client.
    SendProgram(u8),
    /// Drop every relay.
    AllOff,
    /// Flash the status LED only.
    Feedback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonBinding {
    pub gpio: i32,
    pub short_press: ShortPressAction,
    /// Mapping slot this button selects while MIDI learn is armed.
    pub learn_target: Option<u8>,
}

/// LED feedback fired once per press when a hold crosses `held_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub held_ms: u32,
    pub pattern: LedPattern,
}

/// Release thresholds for the primary button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureTimings {
    pub debounce_ms: u32,
    pub feedback_ms: u32,
    pub learn_ms: u32,
    pub channel_select_ms: u32,
    pub pairing_ms: u32,
}

impl Default for GestureTimings {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            feedback_ms: 5_000,
            learn_ms: 10_000,
            channel_select_ms: 15_000,
            pairing_ms: 30_000,
        }
    }
}

/// Full per-board configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub role: Role,
    /// Number of relay channels (1..=MAX_CHANNELS).
    pub channel_count: u8,
    pub relay_gpios: Vec<i32, MAX_CHANNELS>,
    /// Button 0 is the primary (mode) button.
    pub buttons: Vec<ButtonBinding, MAX_BUTTONS>,
    pub status_led_gpio: i32,
    pub midi_rx_gpio: Option<i32>,

    // --- Gestures ---
    pub timings: GestureTimings,
    /// Ascending by `held_ms`.
    pub milestones: Vec<Milestone, MAX_MILESTONES>,

    // --- Sub-modes ---
    pub select_inactivity_ms: u32,
    pub confirm_toggle_ms: u32,
    pub learn_timeout_ms: u32,
    pub learn_cooldown_ms: u32,

    // --- Pairing ---
    /// Radio channel the hub listens on; clients start discovery at 1.
    pub radio_channel: u8,
    pub pairing_window_ms: u32,
    pub discovery_retry_ms: u32,

    // --- Boot ---
    pub boot_update_window_ms: u32,
    pub boot_update_hold_ms: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::client(1)
    }
}

impl DeviceConfig {
    /// Relay client with `channels` relays and one button per relay.
    pub fn client(channels: u8) -> Self {
        let n = channels.clamp(1, MAX_CHANNELS as u8);
        let mut relay_gpios = Vec::new();
        let mut buttons = Vec::new();
        for i in 0..n {
            let _ = relay_gpios.push(pins::CLIENT_RELAY_GPIOS[i as usize]);
            let _ = buttons.push(ButtonBinding {
                gpio: pins::CLIENT_BUTTON_GPIOS[i as usize],
                short_press: ShortPressAction::SelectChannel(i + 1),
                learn_target: Some(i),
            });
        }

        Self {
            role: Role::Client,
            channel_count: n,
            relay_gpios,
            buttons,
            status_led_gpio: pins::CLIENT_STATUS_LED_GPIO,
            midi_rx_gpio: Some(pins::CLIENT_MIDI_RX_GPIO),
            timings: GestureTimings::default(),
            milestones: milestones(&[
                (5_000, LedPattern::SingleFlash),
                (10_000, LedPattern::DoubleFlash),
                (15_000, LedPattern::TripleFlash),
                (20_000, LedPattern::QuadFlash),
                (25_000, LedPattern::PentaFlash),
                (30_000, LedPattern::HexaFlash),
            ]),
            select_inactivity_ms: 5_000,
            confirm_toggle_ms: 200,
            learn_timeout_ms: 30_000,
            learn_cooldown_ms: 2_000,
            radio_channel: 1,
            pairing_window_ms: 30_000,
            discovery_retry_ms: 1_000,
            boot_update_window_ms: 10_000,
            boot_update_hold_ms: 5_000,
        }
    }

    /// MIDI hub with a mode button, `channels` footswitches and as many
    /// local relays.
    pub fn server(channels: u8) -> Self {
        let n = channels.clamp(1, MAX_CHANNELS as u8);
        let mut relay_gpios = Vec::new();
        let mut buttons = Vec::new();
        let _ = buttons.push(ButtonBinding {
            gpio: pins::SERVER_MODE_BUTTON_GPIO,
            short_press: ShortPressAction::Feedback,
            learn_target: None,
        });
        for i in 0..n {
            let _ = relay_gpios.push(pins::SERVER_RELAY_GPIOS[i as usize]);
            let _ = buttons.push(ButtonBinding {
                gpio: pins::SERVER_FOOTSWITCH_GPIOS[i as usize],
                short_press: ShortPressAction::SendProgram(i + 1),
                learn_target: Some(i),
            });
        }

        Self {
            role: Role::Server,
            channel_count: n,
            relay_gpios,
            buttons,
            status_led_gpio: pins::SERVER_STATUS_LED_GPIO,
            midi_rx_gpio: Some(pins::SERVER_MIDI_RX_GPIO),
            timings: GestureTimings::default(),
            milestones: milestones(&[
                (5_000, LedPattern::SingleFlash),
                (10_000, LedPattern::DoubleFlash),
                (15_000, LedPattern::TripleFlash),
                (30_000, LedPattern::FastBlink),
            ]),
            select_inactivity_ms: 5_000,
            confirm_toggle_ms: 200,
            learn_timeout_ms: 30_000,
            learn_cooldown_ms: 750,
            radio_channel: 4,
            pairing_window_ms: 30_000,
            discovery_retry_ms: 1_000,
            boot_update_window_ms: 10_000,
            boot_update_hold_ms: 5_000,
        }
    }

    /// Reject configurations the state machines cannot run with.
    pub fn validate(&self) -> Result<(), &'static str> {
        let n = self.channel_count as usize;
        if n == 0 || n > MAX_CHANNELS {
            return Err("channel_count must be 1-4");
        }
        if self.relay_gpios.len() != n {
            return Err("relay_gpios must list one GPIO per channel");
        }
        if self.buttons.is_empty() {
            return Err("at least one button is required");
        }
        for b in &self.buttons {
            if b.learn_target.is_some_and(|t| t as usize >= n) {
                return Err("button learn_target beyond channel_count");
            }
            match b.short_press {
                ShortPressAction::SelectChannel(ch) if ch == 0 || ch as usize > n => {
                    return Err("button selects a channel beyond channel_count");
                }
                ShortPressAction::SendProgram(p) if p > 127 => {
                    return Err("button program must be 0-127");
                }
                _ => {}
            }
        }
        if !self.milestones.windows(2).all(|w| w[0].held_ms < w[1].held_ms) {
            return Err("milestones must be strictly ascending");
        }
        let t = &self.timings;
        let ascending = t.feedback_ms < t.learn_ms
            && t.learn_ms < t.channel_select_ms
            && t.channel_select_ms < t.pairing_ms;
        if !ascending {
            return Err("hold thresholds must be strictly ascending");
        }
        if t.debounce_ms >= t.feedback_ms {
            return Err("debounce window must be shorter than the first hold");
        }
        if !(1..=13).contains(&self.radio_channel) {
            return Err("radio_channel must be 1-13");
        }
        if self.confirm_toggle_ms == 0 || self.discovery_retry_ms == 0 {
            return Err("periodic intervals must be non-zero");
        }
        Ok(())
    }

    /// Profile selected at build time.
    ///
    /// `AMPSWITCH_ROLE=server` builds a hub; anything else a client.
    /// `AMPSWITCH_CHANNELS` sets the relay count (default 1 for a client,
    /// 4 for a hub). Used only when no configuration is stored yet.
    pub fn build_profile() -> Self {
        Self::profile(option_env!("AMPSWITCH_ROLE"), option_env!("AMPSWITCH_CHANNELS"))
    }

    fn profile(role: Option<&str>, channels: Option<&str>) -> Self {
        let channels = channels.and_then(|c| c.trim().parse::<u8>().ok());
        match role.map(str::trim) {
            Some(r) if r.eq_ignore_ascii_case("server") => Self::server(channels.unwrap_or(MAX_CHANNELS as u8)),
            _ => Self::client(channels.unwrap_or(1)),
        }
    }

    /// Index of the primary (mode) button.
    pub const fn primary_button(&self) -> usize {
        0
    }
}

fn milestones(table: &[(u32, LedPattern)]) -> Vec<Milestone, MAX_MILESTONES> {
    table
        .iter()
        .take(MAX_MILESTONES)
        .map(|&(held_ms, pattern)| Milestone { held_ms, pattern })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_profile_is_valid() {
        for n in 1..=4 {
            let c = DeviceConfig::client(n);
            assert_eq!(c.validate(), Ok(()));
            assert_eq!(c.buttons.len(), n as usize);
            assert_eq!(c.relay_gpios.len(), n as usize);
        }
    }

    #[test]
    fn server_profile_is_valid() {
        let c = DeviceConfig::server(4);
        assert_eq!(c.validate(), Ok(()));
        assert_eq!(c.buttons.len(), 5);
        assert_eq!(c.buttons[0].learn_target, None);
        assert_eq!(c.buttons[1].short_press, ShortPressAction::SendProgram(1));
        assert_eq!(c.learn_cooldown_ms, 750);
    }

    #[test]
    fn build_profile_parses_role_and_channels() {
        assert_eq!(DeviceConfig::profile(None, None), DeviceConfig::client(1));
        assert_eq!(DeviceConfig::profile(Some("SERVER"), None), DeviceConfig::server(4));
        assert_eq!(DeviceConfig::profile(Some("client"), Some("3")), DeviceConfig::client(3));
        assert_eq!(DeviceConfig::profile(Some("server"), Some("x")), DeviceConfig::server(4));
    }

    #[test]
    fn channel_count_is_clamped() {
        assert_eq!(DeviceConfig::client(0).channel_count, 1);
        assert_eq!(DeviceConfig::client(9).channel_count, 4);
    }

    #[test]
    fn milestone_tables_match_roles() {
        let client: std::vec::Vec<u32> = DeviceConfig::client(1).milestones.iter().map(|m| m.held_ms).collect();
        assert_eq!(client, [5_000, 10_000, 15_000, 20_000, 25_000, 30_000]);
        let server = DeviceConfig::server(1);
        assert_eq!(server.milestones.len(), 4);
        assert_eq!(server.milestones[3].pattern, LedPattern::FastBlink);
    }

    #[test]
    fn descending_milestones_rejected() {
        let mut c = DeviceConfig::client(1);
        c.milestones.swap(0, 1);
        assert!(c.validate().is_err());
    }

    #[test]
    fn learn_target_beyond_channels_rejected() {
        let mut c = DeviceConfig::client(2);
        c.buttons[1].learn_target = Some(2);
        assert!(c.validate().is_err());
    }

    #[test]
    fn overlapping_thresholds_rejected() {
        let mut c = DeviceConfig::client(1);
        c.timings.learn_ms = c.timings.channel_select_ms;
        assert!(c.validate().is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let c = DeviceConfig::server(2);
        let json = serde_json::to_string(&c).unwrap();
        let c2: DeviceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, c2);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = DeviceConfig::client(4);
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: DeviceConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c, c2);
    }
}
