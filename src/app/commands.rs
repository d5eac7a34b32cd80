//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (today: the
//! serial console) that the [`AppService`](super::service::AppService)
//! interprets and acts upon.

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Print the command list.
    Help,
    /// Log channel, mapping, pairing and loop metrics.
    Status,
    /// Start pairing (client discovery / hub window).
    Pair,
    /// Release every relay.
    AllOff,
    /// Engage relay channel `n` (0 = off).
    SelectChannel(u8),
    /// Runtime log verbosity 0..=4, persisted.
    SetLogLevel(u8),
    /// MIDI receive channel 0..=16 (0 = omni), persisted.
    SetMidiChannel(u8),
    /// Log the learned mapping.
    ShowMapping,
    /// `mapping[channel - 1] = program`, persisted.
    SetMapping { channel: u8, program: u8 },
    /// Enable or disable button polling (boards without buttons fitted).
    SetButtonsEnabled(bool),
    /// Dump the device configuration as JSON.
    ShowConfig,
    /// Forget the hub (client) or the peer table (hub).
    ClearPairing,
    Restart,
    /// Boot-window update trigger from the console.
    EnterUpdateMode,
}

/// What the caller must do after a command was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Done,
    /// Reboot the chip.
    Restart,
}
