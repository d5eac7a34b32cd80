//! MIDI-learn sub-mode.
//!
//! Arming waits for the next Program Change and writes it into the mapping
//! slot of the selected target channel. Single-channel boards target slot 0
//! immediately; multi-channel boards wait for a target to be chosen by a
//! button. An armed session expires after the learn timeout, and a commit
//! opens a cooldown during which Program Change actions and short presses
//! are ignored so the learning message (or its echo) cannot switch relays.

use crate::config::MAX_MIDI_CHANNEL;
use crate::drivers::midi::ProgramChange;
use crate::error::{InputError, OutputError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LearnState {
    #[default]
    Idle,
    Armed { target: Option<u8>, started_ms: u32 },
}

/// What a Program Change did to an armed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnOutcome {
    /// Not armed; the message belongs to normal dispatch.
    NotArmed,
    /// Armed but no target chosen yet; the message is dropped.
    AwaitingTarget,
    /// `mapping[slot] = program` should be written and persisted.
    Committed { slot: u8, program: u8 },
}

#[derive(Debug, Default)]
pub struct MidiLearn {
    state: LearnState,
    completed_ms: Option<u32>,
}

impl MidiLearn {
    /// Arm learning. Returns the target chosen immediately, if any.
    pub fn arm(&mut self, channel_count: u8, now_ms: u32) -> Option<u8> {
        let target = (channel_count == 1).then_some(0);
        self.state = LearnState::Armed { target, started_ms: now_ms };
        target
    }

    /// Step the target `None → 0 → 1 → … → N-1 → 0` and restart the
    /// timeout. No-op unless armed on a multi-channel board.
    pub fn cycle_target(&mut self, channel_count: u8, now_ms: u32) -> Option<u8> {
        let LearnState::Armed { target, .. } = self.state else {
            return None;
        };
        if channel_count <= 1 {
            return None;
        }
        let next = match target {
            None => 0,
            Some(t) => (t + 1) % channel_count,
        };
        self.state = LearnState::Armed { target: Some(next), started_ms: now_ms };
        Some(next)
    }

    /// Choose `slot` directly (secondary button bound to it).
    pub fn select_target(&mut self, slot: u8, channel_count: u8, now_ms: u32) -> Result<(), OutputError> {
        if slot >= channel_count {
            return Err(OutputError::InvalidSlot(slot));
        }
        if self.is_armed() {
            self.state = LearnState::Armed { target: Some(slot), started_ms: now_ms };
        }
        Ok(())
    }

    /// Offer a Program Change to the session. The receive-channel filter
    /// has already been applied by the caller.
    pub fn on_program_change(&mut self, program: u8, now_ms: u32) -> LearnOutcome {
        match self.state {
            LearnState::Idle => LearnOutcome::NotArmed,
            LearnState::Armed { target: None, .. } => LearnOutcome::AwaitingTarget,
            LearnState::Armed { target: Some(slot), .. } => {
                self.state = LearnState::Idle;
                self.completed_ms = Some(now_ms);
                LearnOutcome::Committed { slot, program }
            }
        }
    }

    /// Expire an armed session. Returns `true` exactly once on timeout.
    pub fn tick(&mut self, now_ms: u32, timeout_ms: u32) -> bool {
        match self.state {
            LearnState::Armed { started_ms, .. } if now_ms.wrapping_sub(started_ms) > timeout_ms => {
                self.state = LearnState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Inside the post-commit cooldown window.
    pub fn in_cooldown(&self, now_ms: u32, cooldown_ms: u32) -> bool {
        self.completed_ms
            .is_some_and(|done| now_ms.wrapping_sub(done) < cooldown_ms)
    }

    pub fn disarm(&mut self) {
        self.state = LearnState::Idle;
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, LearnState::Armed { .. })
    }

    pub fn target(&self) -> Option<u8> {
        match self.state {
            LearnState::Armed { target, .. } => target,
            LearnState::Idle => None,
        }
    }

    pub fn state(&self) -> LearnState {
        self.state
    }
}

/// Reject Program Changes outside MIDI's ranges.
pub fn validate(pc: ProgramChange) -> Result<ProgramChange, InputError> {
    if pc.channel == 0 || pc.channel > MAX_MIDI_CHANNEL {
        return Err(InputError::InvalidMidiChannel(pc.channel));
    }
    if pc.program > 127 {
        return Err(InputError::InvalidProgram(pc.program));
    }
    Ok(pc)
}

/// Receive-channel filter: exact match, or everything when set to omni (0).
pub fn accepts(receive_channel: u8, channel: u8) -> bool {
    receive_channel == 0 || receive_channel == channel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_channel_arms_with_target() {
        let mut learn = MidiLearn::default();
        assert_eq!(learn.arm(1, 0), Some(0));
        assert_eq!(
            learn.on_program_change(42, 100),
            LearnOutcome::Committed { slot: 0, program: 42 }
        );
        assert!(!learn.is_armed());
    }

    #[test]
    fn multi_channel_waits_for_target() {
        let mut learn = MidiLearn::default();
        assert_eq!(learn.arm(4, 0), None);
        assert_eq!(learn.on_program_change(9, 10), LearnOutcome::AwaitingTarget);
        assert!(learn.is_armed());
    }

    #[test]
    fn target_cycles_and_wraps() {
        let mut learn = MidiLearn::default();
        learn.arm(3, 0);
        let seq: Vec<_> = (0..5).map(|i| learn.cycle_target(3, i)).collect();
        assert_eq!(seq, [Some(0), Some(1), Some(2), Some(0), Some(1)]);
    }

    #[test]
    fn cycle_is_noop_on_single_channel_or_idle() {
        let mut learn = MidiLearn::default();
        assert_eq!(learn.cycle_target(4, 0), None);
        learn.arm(1, 0);
        assert_eq!(learn.cycle_target(1, 10), None);
        assert_eq!(learn.target(), Some(0));
    }

    #[test]
    fn select_target_validates_slot() {
        let mut learn = MidiLearn::default();
        learn.arm(2, 0);
        assert_eq!(learn.select_target(2, 2, 5), Err(OutputError::InvalidSlot(2)));
        learn.select_target(1, 2, 5).unwrap();
        assert_eq!(learn.target(), Some(1));
    }

    #[test]
    fn timeout_fires_once_after_deadline() {
        let mut learn = MidiLearn::default();
        learn.arm(1, 1000);
        assert!(!learn.tick(31_000, 30_000));
        assert!(learn.tick(31_001, 30_000));
        assert!(!learn.tick(31_002, 30_000));
        assert!(!learn.is_armed());
    }

    #[test]
    fn target_selection_restarts_timeout() {
        let mut learn = MidiLearn::default();
        learn.arm(2, 0);
        learn.cycle_target(2, 20_000);
        assert!(!learn.tick(40_000, 30_000));
        assert!(learn.tick(50_001, 30_000));
    }

    #[test]
    fn cooldown_follows_commit() {
        let mut learn = MidiLearn::default();
        assert!(!learn.in_cooldown(0, 2000));
        learn.arm(1, 0);
        learn.on_program_change(5, 1000);
        assert!(learn.in_cooldown(2999, 2000));
        assert!(!learn.in_cooldown(3000, 2000));
    }

    #[test]
    fn range_and_filter() {
        assert!(validate(ProgramChange { channel: 0, program: 1 }).is_err());
        assert!(validate(ProgramChange { channel: 17, program: 1 }).is_err());
        assert!(validate(ProgramChange { channel: 1, program: 128 }).is_err());
        assert!(validate(ProgramChange { channel: 16, program: 127 }).is_ok());
        assert!(accepts(0, 9));
        assert!(accepts(9, 9));
        assert!(!accepts(1, 9));
    }
}
