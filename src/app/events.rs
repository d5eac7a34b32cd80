//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them; today that is one log line each.

use crate::config::Role;
use crate::protocol::MacAddr;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The service has started.
    Started { role: Role, channel_count: u8 },

    /// The dispatcher moved the relay bank.
    ChannelChanged { from: u8, to: u8 },

    /// A primary-button hold crossed a milestone.
    MilestoneReached { held_ms: u32 },

    ChannelSelectEntered { channel: u8 },
    ChannelSelectAdvanced { channel: u8 },
    /// Channel select committed a new MIDI receive channel.
    MidiChannelSaved { channel: u8 },

    /// Learn armed; `target` is set immediately on single-channel boards.
    LearnArmed { target: Option<u8> },
    LearnTargetSelected(u8),
    LearnCommitted { slot: u8, program: u8 },
    LearnTimedOut,

    /// Client discovery started, or the hub opened its window.
    PairingStarted,
    /// Client: a hub answered.
    Paired { server: MacAddr, radio_channel: u8 },
    /// Hub: a client joined (or refreshed) the peer table.
    PeerAdded { mac: MacAddr, count: usize },
    PairingWindowClosed,

    /// Hub: a Program Change went out to `peers` clients.
    ProgramForwarded { program: u8, peers: usize },

    /// Boot window trigger fired.
    UpdateModeRequested,
}
