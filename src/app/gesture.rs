//! Gesture classification and mode arbitration.
//!
//! One noisy button has to mean many things, distinguished only by how long
//! it is held. While the primary button is down, hold milestones give LED
//! feedback; on release, [`decide_release`] picks exactly one outcome:
//!
//! | Priority | Condition                                  | Decision               |
//! |----------|--------------------------------------------|------------------------|
//! | 1        | channel select active (any button)         | `ChannelSelectIncrement` |
//! | 2        | held ≥ pairing and learn did not time out  | `TriggerPairing`       |
//! | 3        | held ≥ channel select                      | `EnterChannelSelect`   |
//! | 4        | held ≥ learn                               | `ArmLearn`             |
//! | 5        | held ≥ feedback                            | `FeedbackOnly`         |
//! | 6        | short press                                | `ShortPress`           |
//!
//! Priorities 2–4 are blocked while learn is armed so the two sub-modes can
//! never be active together. Short presses are blocked inside the learn
//! cooldown and while learn is armed.

use crate::config::{GestureTimings, Milestone};

/// Why a release was swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    Cooldown,
    LearnArmed,
    SecondaryHold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseDecision {
    /// A long hold already acted on this press.
    Suppressed,
    ChannelSelectIncrement,
    TriggerPairing,
    EnterChannelSelect,
    ArmLearn,
    FeedbackOnly,
    ShortPress,
    /// Secondary button picked learn target `slot`.
    LearnTargetSelect(u8),
    Blocked(BlockReason),
}

/// Everything [`decide_release`] looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseInput {
    pub primary: bool,
    pub held_ms: u32,
    pub guarded: bool,
    pub select_active: bool,
    pub learn_armed: bool,
    pub learn_just_timed_out: bool,
    pub in_cooldown: bool,
    /// Learn slot bound to the released button.
    pub learn_target: Option<u8>,
}

pub fn decide_release(input: &ReleaseInput, timings: &GestureTimings) -> ReleaseDecision {
    use ReleaseDecision as D;

    if input.guarded {
        return D::Suppressed;
    }
    if input.select_active {
        return D::ChannelSelectIncrement;
    }

    let held = input.held_ms;

    if !input.primary {
        if held >= timings.feedback_ms {
            return D::Blocked(BlockReason::SecondaryHold);
        }
        if input.learn_armed {
            return match input.learn_target {
                Some(slot) => D::LearnTargetSelect(slot),
                None => D::Blocked(BlockReason::LearnArmed),
            };
        }
        return short_press(input);
    }

    if held >= timings.learn_ms && input.learn_armed {
        return D::Blocked(BlockReason::LearnArmed);
    }
    if held >= timings.pairing_ms && !input.learn_just_timed_out {
        D::TriggerPairing
    } else if held >= timings.channel_select_ms {
        D::EnterChannelSelect
    } else if held >= timings.learn_ms {
        D::ArmLearn
    } else if held >= timings.feedback_ms {
        D::FeedbackOnly
    } else {
        short_press(input)
    }
}

fn short_press(input: &ReleaseInput) -> ReleaseDecision {
    if input.in_cooldown {
        ReleaseDecision::Blocked(BlockReason::Cooldown)
    } else if input.learn_armed {
        ReleaseDecision::Blocked(BlockReason::LearnArmed)
    } else {
        ReleaseDecision::ShortPress
    }
}

/// Next milestone to fire for a hold of `held_ms`, marking it in `fired`.
///
/// At most one milestone fires per call, always the smallest one not yet
/// fired, so a poll that jumps past several thresholds still reports them
/// in ascending order on successive polls.
pub fn next_milestone<'a>(milestones: &'a [Milestone], fired: &mut u8, held_ms: u32) -> Option<&'a Milestone> {
    let (k, m) = milestones
        .iter()
        .enumerate()
        .take(8)
        .find(|(k, m)| held_ms >= m.held_ms && *fired & (1 << k) == 0)?;
    *fired |= 1 << k;
    Some(m)
}
