//! Unified error types for the AmpSwitch firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! poll loop's error handling uniform. All variants are `Copy` so they can
//! be returned from hot paths (button polling, relay switching) without
//! allocation. None of them are fatal: the loop logs and continues.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A button index or input value was out of range.
    Input(InputError),
    /// A relay or LED output command was rejected.
    Output(OutputError),
    /// A radio message could not be encoded, decoded, or sent.
    Comms(CommsError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(e) => write!(f, "input: {e}"),
            Self::Output(e) => write!(f, "output: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    /// Button index is not configured.
    InvalidButton(usize),
    /// MIDI channel outside 1..=16.
    InvalidMidiChannel(u8),
    /// MIDI program outside 0..=127.
    InvalidProgram(u8),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidButton(i) => write!(f, "button index {i} out of range"),
            Self::InvalidMidiChannel(c) => write!(f, "MIDI channel {c} (must be 1-16)"),
            Self::InvalidProgram(p) => write!(f, "MIDI program {p} (must be 0-127)"),
        }
    }
}

impl From<InputError> for Error {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

// ---------------------------------------------------------------------------
// Output errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputError {
    /// Requested relay channel is above the configured channel count.
    InvalidChannel { requested: u8, max: u8 },
    /// Learn target or mapping slot is out of range.
    InvalidSlot(u8),
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChannel { requested, max } => {
                write!(f, "channel {requested} requested (valid: 0-{max})")
            }
            Self::InvalidSlot(s) => write!(f, "mapping slot {s} out of range"),
        }
    }
}

impl From<OutputError> for Error {
    fn from(e: OutputError) -> Self {
        Self::Output(e)
    }
}

// ---------------------------------------------------------------------------
// Communication errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// Radio send returned an error.
    SendFailed,
    /// Frame could not be decoded into a known message.
    Malformed,
    /// Command type byte is not one we understand.
    UnknownCommand(u8),
    /// Frame came from a peer that is not in the peer table.
    UnknownPeer,
    /// Peer table is full.
    PeerTableFull,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendFailed => write!(f, "send failed"),
            Self::Malformed => write!(f, "malformed frame"),
            Self::UnknownCommand(t) => write!(f, "unknown command type {t}"),
            Self::UnknownPeer => write!(f, "unknown peer"),
            Self::PeerTableFull => write!(f, "peer table full"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
