//! GPIO / peripheral pin assignments for the AmpSwitch boards.
//!
//! Single source of truth: the role profiles in [`crate::config`] pull
//! their defaults from here rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Client board (relay node, ESP32-C3)
// ---------------------------------------------------------------------------

/// Relay driver outputs, one per amp channel. HIGH = channel engaged.
pub const CLIENT_RELAY_GPIOS: [i32; 4] = [4, 5, 3, 1];
/// Momentary channel buttons, active-low with internal pull-up.
/// Button 0 doubles as the mode button.
pub const CLIENT_BUTTON_GPIOS: [i32; 4] = [9, 10, 20, 21];
/// Status LED (LEDC PWM).
pub const CLIENT_STATUS_LED_GPIO: i32 = 8;
/// Optional DIN MIDI input (optocoupler output).
pub const CLIENT_MIDI_RX_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// Server board (hub, ESP32)
// ---------------------------------------------------------------------------

/// Local relay outputs on the hub.
pub const SERVER_RELAY_GPIOS: [i32; 4] = [6, 7, 18, 19];
/// Mode button (BOOT button on most dev boards).
pub const SERVER_MODE_BUTTON_GPIO: i32 = 0;
/// Footswitch inputs. Each sends its configured Program Change.
pub const SERVER_FOOTSWITCH_GPIOS: [i32; 4] = [4, 5, 12, 13];
/// Status LED (LEDC PWM).
pub const SERVER_STATUS_LED_GPIO: i32 = 2;
/// DIN MIDI input.
pub const SERVER_MIDI_RX_GPIO: i32 = 9;

// ---------------------------------------------------------------------------
// Shared peripheral settings
// ---------------------------------------------------------------------------

/// Status LED PWM frequency.
pub const STATUS_LED_PWM_FREQ_HZ: u32 = 5_000;
/// Status LED PWM resolution (13-bit → duty 0..=8191).
pub const STATUS_LED_PWM_BITS: u32 = 13;
/// MIDI serial rate.
pub const MIDI_BAUD_RATE: u32 = 31_250;
/// UART used for MIDI input.
pub const MIDI_UART_PORT: i32 = 1;
