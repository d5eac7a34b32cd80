//! Command dispatcher: the only writer of the active relay channel.
//!
//! Short presses, Program Changes and radio commands all end up here and
//! are turned into relay switching, LED feedback and, on the hub, outbound
//! radio messages.

use log::{debug, info, warn};

use crate::error::{OutputError, Result};
use crate::drivers::led_patterns::LedPattern;
use crate::protocol::{CommandType, MacAddr, MacDisplay, Message};

use super::ports::{OutputPort, TransportPort};
use super::state::SystemState;

/// Where a Program Change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramSource {
    /// DIN MIDI input on this board.
    Midi,
    /// Hub command over the radio. Accepts legacy direct channel numbers.
    Remote,
}

/// Engage `channel` (0 = all off) and record it.
pub fn set_channel(state: &mut SystemState, hw: &mut impl OutputPort, channel: u8) -> Result<()> {
    if channel > state.channel_count {
        warn!("Invalid channel {} requested (max: {})", channel, state.channel_count);
        return Err(OutputError::InvalidChannel { requested: channel, max: state.channel_count }.into());
    }
    if channel == state.active_channel {
        return Ok(());
    }
    hw.set_channel(channel)?;
    state.active_channel = channel;
    Ok(())
}

/// Select `channel`, or toggle it on single-channel boards. Returns the
/// channel now engaged.
pub fn select_or_toggle(state: &mut SystemState, hw: &mut impl OutputPort, channel: u8) -> Result<u8> {
    let target = if state.is_single_channel() && state.active_channel == channel {
        0
    } else {
        channel
    };
    set_channel(state, hw, target)?;
    Ok(target)
}

/// Map a Program Change onto the local relays. Returns the engaged channel
/// when the program did anything.
pub fn dispatch_program(
    state: &mut SystemState,
    hw: &mut impl OutputPort,
    program: u8,
    source: ProgramSource,
    now_ms: u32,
) -> Result<Option<u8>> {
    if program == 0 && source == ProgramSource::Remote {
        info!("Remote: Program 0 -> all off");
        set_channel(state, hw, 0)?;
        state.led.set_pattern(LedPattern::DoubleFlash, now_ms);
        return Ok(Some(0));
    }

    if let Some(channel) = state.mapped_channel(program) {
        let engaged = select_or_toggle(state, hw, channel)?;
        let pattern = if engaged == 0 { LedPattern::DoubleFlash } else { LedPattern::TripleFlash };
        state.led.set_pattern(pattern, now_ms);
        info!("{:?}: Program {} -> channel {}", source, program, engaged);
        return Ok(Some(engaged));
    }

    if source == ProgramSource::Remote && (1..=state.channel_count).contains(&program) {
        let engaged = select_or_toggle(state, hw, program)?;
        state.led.set_pattern(LedPattern::SingleFlash, now_ms);
        info!("Remote: direct channel select {}", engaged);
        return Ok(Some(engaged));
    }

    debug!("{:?}: Program {} has no mapping (ignored)", source, program);
    Ok(None)
}

/// Execute a radio command received from the hub.
pub fn dispatch_remote(
    state: &mut SystemState,
    hw: &mut impl OutputPort,
    command_type: u8,
    value: u8,
    now_ms: u32,
) -> Result<()> {
    let kind = CommandType::try_from(command_type).map_err(|e| {
        warn!("Unknown command received - type: {}, value: {}", command_type, value);
        e
    })?;

    match kind {
        CommandType::ProgramChange => {
            dispatch_program(state, hw, value, ProgramSource::Remote, now_ms)?;
        }
        CommandType::Reserved => {}
        CommandType::AllChannelsOff => {
            info!("All channels off command received");
            set_channel(state, hw, 0)?;
            state.led.set_pattern(LedPattern::DoubleFlash, now_ms);
        }
        CommandType::StatusRequest => {
            info!("Status request received - current channel: {}", state.active_channel);
            state.led.set_pattern(LedPattern::SingleFlash, now_ms);
        }
    }
    Ok(())
}

/// Send a Program Change command to every peer. Returns how many sends
/// succeeded; failures are logged and skipped.
pub fn broadcast_program(
    radio: &mut impl TransportPort,
    peers: &[MacAddr],
    program: u8,
    sequence: u32,
    now_ms: u32,
) -> usize {
    let msg = Message::command(CommandType::ProgramChange, program, sequence, now_ms);
    let mut delivered = 0;
    for peer in peers {
        match radio.send(peer, &msg) {
            Ok(()) => delivered += 1,
            Err(e) => warn!("Send to {} failed: {}", MacDisplay(peer), e),
        }
    }
    if peers.is_empty() {
        debug!("Program {} not forwarded: no peers", program);
    }
    delivered
}
