//! Radio wire protocol.
//!
//! Every ESP-NOW frame carries exactly one postcard-encoded [`Message`].
//! Commands carry their type as a raw byte so that an older node can log
//! and drop command types it does not know instead of failing to decode
//! the whole frame.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::CommsError;

/// 48-bit station MAC address.
pub type MacAddr = [u8; 6];

/// ESP-NOW broadcast address.
pub const BROADCAST: MacAddr = [0xFF; 6];

/// Largest ESP-NOW payload.
pub const MAX_FRAME_LEN: usize = 250;

/// Board identifier sent in pairing requests.
pub const BOARD_ID_CLIENT: u8 = 1;

/// Maximum device name length carried in a pairing request.
pub const NAME_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Hub → client command.
    Command {
        command_type: u8,
        value: u8,
        sequence: u32,
        timestamp_ms: u32,
    },
    /// Client → broadcast discovery.
    PairingRequest {
        board_id: u8,
        mac: MacAddr,
        channel: u8,
        name: String<NAME_LEN>,
    },
    /// Hub → client acceptance.
    PairingResponse { mac: MacAddr, channel: u8 },
}

/// Known command types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    ProgramChange = 0,
    Reserved = 1,
    AllChannelsOff = 2,
    StatusRequest = 3,
}

impl TryFrom<u8> for CommandType {
    type Error = CommsError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::ProgramChange),
            1 => Ok(Self::Reserved),
            2 => Ok(Self::AllChannelsOff),
            3 => Ok(Self::StatusRequest),
            other => Err(CommsError::UnknownCommand(other)),
        }
    }
}

impl Message {
    pub fn command(command_type: CommandType, value: u8, sequence: u32, timestamp_ms: u32) -> Self {
        Self::Command {
            command_type: command_type as u8,
            value,
            sequence,
            timestamp_ms,
        }
    }

    /// Build a pairing request, truncating `name` to what fits.
    pub fn pairing_request(mac: MacAddr, channel: u8, name: &str) -> Self {
        let mut short = String::new();
        for c in name.chars() {
            if short.push(c).is_err() {
                break;
            }
        }
        Self::PairingRequest {
            board_id: BOARD_ID_CLIENT,
            mac,
            channel,
            name: short,
        }
    }

    /// Encode into `buf`, returning the written prefix.
    pub fn encode<'a>(&self, buf: &'a mut [u8]) -> Result<&'a [u8], CommsError> {
        postcard::to_slice(self, buf)
            .map(|used| &*used)
            .map_err(|_| CommsError::Malformed)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CommsError> {
        postcard::from_bytes(bytes).map_err(|_| CommsError::Malformed)
    }
}

/// `AA:BB:CC:DD:EE:FF` rendering for logs.
pub struct MacDisplay<'a>(pub &'a MacAddr);

impl core::fmt::Display for MacDisplay<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let m = self.0;
        write!(f, "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}", m[0], m[1], m[2], m[3], m[4], m[5])
    }
}
