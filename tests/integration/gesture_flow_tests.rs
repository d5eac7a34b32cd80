//! Button gestures end to end: debounce, hold milestones, release
//! decisions and the channel-select sub-mode.

use crate::mock_hw::Rig;

use ampswitch::app::commands::AppCommand;
use ampswitch::app::events::AppEvent;
use ampswitch::app::pairing::PairingStatus;
use ampswitch::protocol::{Message, BROADCAST};
use ampswitch::settings;

// ── Relay buttons ─────────────────────────────────────────────

#[test]
fn single_channel_button_toggles_relay() {
    let mut rig = Rig::paired_client(1);

    rig.tap(0);
    assert_eq!(rig.app.state().active_channel, 1);
    assert!(rig.sink.contains(&AppEvent::ChannelChanged { from: 0, to: 1 }));

    rig.tap(0);
    assert_eq!(rig.app.state().active_channel, 0);
    assert_eq!(rig.hw.channel_calls, [1, 0]);
}

#[test]
fn each_button_selects_its_own_channel() {
    let mut rig = Rig::paired_client(3);

    rig.tap(1);
    assert_eq!(rig.hw.engaged(), 2);
    rig.tap(2);
    assert_eq!(rig.hw.engaged(), 3);
    // Re-selecting the active channel on a multi-channel board is a no-op.
    rig.tap(2);
    assert_eq!(rig.hw.channel_calls, [2, 3]);
}

#[test]
fn bounce_shorter_than_window_is_ignored() {
    let mut rig = Rig::paired_client(1);

    for _ in 0..5 {
        rig.press(0);
        rig.advance(50);
        rig.release(0);
        rig.advance(50);
    }
    rig.advance(500);
    assert!(rig.hw.channel_calls.is_empty());
}

#[test]
fn disabled_buttons_are_not_polled() {
    let mut rig = Rig::paired_client(1);
    rig.command(AppCommand::SetButtonsEnabled(false));

    rig.tap(0);
    assert!(rig.hw.channel_calls.is_empty());

    rig.command(AppCommand::SetButtonsEnabled(true));
    rig.tap(0);
    assert_eq!(rig.hw.engaged(), 1);
}

// ── Holds ─────────────────────────────────────────────────────

#[test]
fn feedback_hold_fires_one_milestone_and_changes_nothing() {
    let mut rig = Rig::paired_client(1);

    rig.hold(0, 6_000);

    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::MilestoneReached { .. })), 1);
    assert!(rig.sink.contains(&AppEvent::MilestoneReached { held_ms: 5_000 }));
    assert!(rig.hw.channel_calls.is_empty());
    assert!(!rig.app.state().mode.learn.is_armed());
}

#[test]
fn milestones_fire_in_order_once_per_hold() {
    let mut rig = Rig::paired_client(1);

    rig.hold(0, 31_000);

    let fired: Vec<u32> = rig
        .sink
        .0
        .iter()
        .filter_map(|e| match e {
            AppEvent::MilestoneReached { held_ms } => Some(*held_ms),
            _ => None,
        })
        .collect();
    assert_eq!(fired, [5_000, 10_000, 15_000, 20_000, 25_000, 30_000]);
}

#[test]
fn long_hold_starts_discovery_on_radio_channel_one() {
    let mut rig = Rig::paired_client(1);
    assert_eq!(rig.app.pairing_status(), Some(PairingStatus::Paired));

    rig.hold(0, 31_000);

    assert!(rig.sink.contains(&AppEvent::PairingStarted));
    assert_eq!(rig.app.pairing_status(), Some(PairingStatus::PairRequested));
    assert_eq!(rig.radio.channel, 1);
    assert!(settings::load_pairing(&rig.store).is_none(), "saved hub must be forgotten");
    assert!(rig.take_sent().iter().any(|(dest, msg)| {
        *dest == BROADCAST && matches!(msg, Message::PairingRequest { channel: 1, .. })
    }));
    assert!(rig.hw.channel_calls.is_empty());
}

#[test]
fn learn_timeout_during_hold_suppresses_pairing() {
    let mut rig = Rig::paired_client(1);

    rig.hold(0, 10_500);
    assert!(rig.sink.contains(&AppEvent::LearnArmed { target: Some(0) }));

    // Hold through the 30 s learn timeout and past the pairing threshold.
    rig.press(0);
    rig.advance(32_000);
    assert!(rig.sink.contains(&AppEvent::LearnTimedOut));
    rig.release(0);
    rig.advance(300);

    assert!(!rig.sink.contains(&AppEvent::PairingStarted));
    assert_eq!(rig.app.pairing_status(), Some(PairingStatus::Paired));
    assert!(rig.hw.channel_calls.is_empty());

    // The suppression lasts for one release only.
    rig.hold(0, 31_000);
    assert!(rig.sink.contains(&AppEvent::PairingStarted));
}

// ── Channel select ────────────────────────────────────────────

#[test]
fn channel_select_commits_after_inactivity() {
    let mut rig = Rig::paired_client(1);

    rig.hold(0, 16_000);
    assert!(rig.sink.contains(&AppEvent::ChannelSelectEntered { channel: 1 }));

    for _ in 0..3 {
        rig.tap(0);
    }
    assert!(rig.sink.contains(&AppEvent::ChannelSelectAdvanced { channel: 4 }));
    assert_eq!(rig.app.state().midi_channel, 1, "nothing commits while selecting");

    rig.advance(5_500);
    assert!(rig.sink.contains(&AppEvent::MidiChannelSaved { channel: 4 }));
    assert_eq!(rig.app.state().midi_channel, 4);
    assert_eq!(settings::load_midi_channel(&mut rig.store), 4);
    assert!(rig.hw.channel_calls.is_empty(), "select taps never touch relays");
}

#[test]
fn channel_select_wraps_past_sixteen() {
    let mut rig = Rig::paired_client(2);
    rig.command(AppCommand::SetMidiChannel(15));

    rig.hold(0, 16_000);
    for _ in 0..3 {
        rig.tap(1);
    }
    rig.advance(5_500);

    assert_eq!(rig.app.state().midi_channel, 2);
}

#[test]
fn relay_buttons_advance_select_without_switching() {
    let mut rig = Rig::paired_client(2);

    rig.hold(0, 16_000);
    rig.tap(1);
    rig.tap(1);

    assert!(!rig.app.state().mode.learn.is_armed());
    assert!(rig.app.state().mode.select.is_active());
    assert!(rig.sink.contains(&AppEvent::ChannelSelectAdvanced { channel: 3 }));
    assert!(rig.hw.channel_calls.is_empty());
}
