//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::protocol::MacDisplay;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { role, channel_count } => {
                info!("START | role={:?} channels={}", role, channel_count);
            }
            AppEvent::ChannelChanged { from, to } => info!("RELAY | {} -> {}", from, to),
            AppEvent::MilestoneReached { held_ms } => info!("HOLD  | {} ms", held_ms),
            AppEvent::ChannelSelectEntered { channel } => info!("SELECT| entered at {}", channel),
            AppEvent::ChannelSelectAdvanced { channel } => info!("SELECT| {}", channel),
            AppEvent::MidiChannelSaved { channel } => info!("SELECT| saved MIDI channel {}", channel),
            AppEvent::LearnArmed { target: Some(t) } => info!("LEARN | armed, channel {}", t + 1),
            AppEvent::LearnArmed { target: None } => info!("LEARN | armed, awaiting target"),
            AppEvent::LearnTargetSelected(t) => info!("LEARN | target channel {}", t + 1),
            AppEvent::LearnCommitted { slot, program } => {
                info!("LEARN | channel {} <- program {}", slot + 1, program);
            }
            AppEvent::LearnTimedOut => info!("LEARN | timed out"),
            AppEvent::PairingStarted => info!("PAIR  | started"),
            AppEvent::Paired { server, radio_channel } => {
                info!("PAIR  | paired with {} on channel {}", MacDisplay(server), radio_channel);
            }
            AppEvent::PeerAdded { mac, count } => info!("PAIR  | peer {} ({} total)", MacDisplay(mac), count),
            AppEvent::PairingWindowClosed => info!("PAIR  | window closed"),
            AppEvent::ProgramForwarded { program, peers } => {
                info!("SEND  | program {} to {} peers", program, peers);
            }
            AppEvent::UpdateModeRequested => info!("OTA   | update mode"),
        }
    }
}
