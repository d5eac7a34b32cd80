//! MIDI learn and Program Change dispatch on a relay client.

use crate::mock_hw::Rig;

use ampswitch::app::commands::AppCommand;
use ampswitch::app::events::AppEvent;
use ampswitch::app::service::AppService;
use ampswitch::config::DeviceConfig;
use ampswitch::drivers::led_patterns::LedPattern;
use ampswitch::settings;

/// Arm learn with a 10.5 s hold of the primary button.
fn arm(rig: &mut Rig) {
    rig.hold(0, 10_500);
    assert!(rig.app.state().mode.learn.is_armed());
}

#[test]
fn mapped_program_selects_channel() {
    let mut rig = Rig::paired_client(3);

    rig.midi(1, 2);
    assert_eq!(rig.hw.engaged(), 2);

    rig.midi(1, 99);
    assert_eq!(rig.hw.engaged(), 2, "unmapped program is ignored");
}

#[test]
fn single_channel_program_toggles() {
    let mut rig = Rig::paired_client(1);

    rig.midi(1, 1);
    rig.midi(1, 1);
    assert_eq!(rig.hw.channel_calls, [1, 0]);
}

#[test]
fn receive_channel_filters_programs() {
    let mut rig = Rig::paired_client(2);
    rig.command(AppCommand::SetMidiChannel(2));

    rig.midi(1, 1);
    assert!(rig.hw.channel_calls.is_empty());
    rig.midi(2, 1);
    assert_eq!(rig.hw.engaged(), 1);

    rig.command(AppCommand::SetMidiChannel(0));
    rig.midi(9, 2);
    assert_eq!(rig.hw.engaged(), 2, "omni accepts every channel");
}

#[test]
fn out_of_range_midi_is_dropped() {
    let mut rig = Rig::paired_client(2);

    rig.midi(0, 1);
    rig.midi(17, 1);
    rig.midi(1, 128);
    assert!(rig.hw.channel_calls.is_empty());
}

#[test]
fn secondary_button_picks_target_then_program_commits() {
    let mut rig = Rig::paired_client(2);
    arm(&mut rig);
    assert!(rig.sink.contains(&AppEvent::LearnArmed { target: None }));

    rig.tap(1);
    assert!(rig.sink.contains(&AppEvent::LearnTargetSelected(1)));
    assert!(rig.hw.channel_calls.is_empty(), "target taps never switch relays");

    rig.midi(1, 42);
    assert!(rig.sink.contains(&AppEvent::LearnCommitted { slot: 1, program: 42 }));
    assert_eq!(rig.app.state().mapping.as_slice(), [1, 42]);
    assert_eq!(settings::load_mapping(&mut rig.store, 2).as_slice(), [1, 42]);
    assert!(!rig.app.state().mode.learn.is_armed());
    assert!(rig.hw.channel_calls.is_empty(), "the learned program does not switch");
}

#[test]
fn primary_press_cycles_target() {
    let mut rig = Rig::paired_client(3);
    arm(&mut rig);

    rig.tap(0);
    rig.tap(0);
    assert_eq!(rig.app.state().mode.learn.target(), Some(1));
    assert!(rig.hw.channel_calls.is_empty(), "cycling presses are swallowed");

    rig.midi(1, 7);
    assert_eq!(rig.app.state().mapping.as_slice(), [1, 7, 3]);
}

#[test]
fn program_before_target_is_dropped() {
    let mut rig = Rig::paired_client(2);
    arm(&mut rig);

    rig.midi(1, 5);

    assert!(rig.app.state().mode.learn.is_armed());
    assert_eq!(rig.app.state().mapping.as_slice(), [1, 2]);
    assert!(rig.hw.channel_calls.is_empty());
}

#[test]
fn repeats_inside_cooldown_are_idempotent() {
    let mut rig = Rig::paired_client(2);
    arm(&mut rig);
    rig.tap(1);
    rig.midi(1, 42);
    let writes = rig.store.writes_to("midi_map");

    // Controllers often resend the same Program Change.
    rig.advance(500);
    rig.midi(1, 42);
    rig.midi(1, 42);

    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::LearnCommitted { .. })), 1);
    assert_eq!(rig.store.writes_to("midi_map"), writes);
    assert!(rig.hw.channel_calls.is_empty());

    rig.advance(2_000);
    rig.midi(1, 42);
    assert_eq!(rig.hw.engaged(), 2);
}

#[test]
fn button_presses_blocked_inside_cooldown() {
    let mut rig = Rig::paired_client(2);
    arm(&mut rig);
    rig.tap(1);
    rig.midi(1, 42);

    rig.tap(0);
    assert!(rig.hw.channel_calls.is_empty());

    rig.advance(2_000);
    rig.tap(0);
    assert_eq!(rig.hw.engaged(), 1);
}

#[test]
fn learn_times_out_after_thirty_seconds() {
    let mut rig = Rig::paired_client(2);
    arm(&mut rig);

    rig.advance(29_000);
    assert!(rig.app.state().mode.learn.is_armed());
    rig.advance(1_500);
    assert!(!rig.app.state().mode.learn.is_armed());
    assert!(rig.sink.contains(&AppEvent::LearnTimedOut));

    rig.midi(1, 42);
    assert_eq!(rig.app.state().mapping.as_slice(), [1, 2]);
}

#[test]
fn hub_led_goes_dark_when_learn_times_out_mid_hold() {
    let mut rig = Rig::server(1);
    arm(&mut rig);

    // Held through the learn timeout and past the 30 s blink milestone.
    rig.press(0);
    rig.advance(32_000);
    assert!(rig.sink.contains(&AppEvent::LearnTimedOut));
    assert_eq!(rig.led_pattern(), LedPattern::FastBlink);

    rig.release(0);
    rig.advance(300);
    assert!(!rig.sink.contains(&AppEvent::PairingStarted));
    assert_eq!(rig.led_pattern(), LedPattern::Off);

    rig.advance(60_000);
    assert_eq!(rig.led_pattern(), LedPattern::Off);
}

#[test]
fn armed_learn_keeps_blinking_after_release() {
    let mut rig = Rig::server(1);
    arm(&mut rig);

    rig.advance(1_000);
    assert_eq!(rig.led_pattern(), LedPattern::FastBlink);
}

#[test]
fn learned_mapping_survives_restart() {
    let mut rig = Rig::paired_client(2);
    arm(&mut rig);
    rig.tap(1);
    rig.midi(1, 42);

    let mut rebooted = AppService::new(DeviceConfig::client(2), "AmpSwitch-TEST01");
    rebooted.start(0, &mut rig.radio, &mut rig.store, &mut rig.sink);
    assert_eq!(rebooted.state().mapping.as_slice(), [1, 42]);
}
