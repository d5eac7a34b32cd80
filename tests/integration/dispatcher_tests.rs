//! Remote commands on clients, hub forwarding and console control.

use crate::mock_hw::{Rig, CLIENT_MAC, SERVER_MAC, STRANGER_MAC};

use ampswitch::app::commands::{AppCommand, CommandOutcome};
use ampswitch::app::events::AppEvent;
use ampswitch::events;
use ampswitch::protocol::{CommandType, Message};

fn program(value: u8, sequence: u32) -> Message {
    Message::command(CommandType::ProgramChange, value, sequence, 0)
}

/// Hub with one paired client.
fn hub_with_client(channels: u8) -> Rig {
    let mut rig = Rig::server(channels);
    rig.command(AppCommand::Pair);
    rig.deliver(CLIENT_MAC, &Message::pairing_request(CLIENT_MAC, 4, "AmpSwitch-000001"));
    assert_eq!(rig.app.peer_count(), 1);
    rig.take_sent();
    rig
}

// ── Client side ───────────────────────────────────────────────

#[test]
fn client_follows_its_server() {
    let mut rig = Rig::paired_client(3);

    rig.deliver(SERVER_MAC, &program(2, 1));
    assert_eq!(rig.hw.engaged(), 2);

    rig.deliver(SERVER_MAC, &Message::command(CommandType::AllChannelsOff, 0, 2, 0));
    assert_eq!(rig.hw.engaged(), 0);

    rig.deliver(SERVER_MAC, &program(3, 3));
    rig.deliver(SERVER_MAC, &program(0, 4));
    assert_eq!(rig.hw.channel_calls, [2, 0, 3, 0], "program 0 releases every relay");
}

#[test]
fn commands_from_strangers_are_rejected() {
    let mut rig = Rig::paired_client(2);

    rig.deliver(STRANGER_MAC, &program(1, 1));

    assert!(rig.hw.channel_calls.is_empty());
}

#[test]
fn unpaired_client_ignores_commands() {
    let mut rig = Rig::fresh_client(2);

    rig.deliver(SERVER_MAC, &program(1, 1));

    assert!(rig.hw.channel_calls.is_empty());
}

#[test]
fn unknown_and_reserved_types_are_dropped() {
    let mut rig = Rig::paired_client(2);

    let unknown = Message::Command { command_type: 9, value: 1, sequence: 1, timestamp_ms: 0 };
    rig.deliver(SERVER_MAC, &unknown);
    rig.deliver(SERVER_MAC, &Message::command(CommandType::Reserved, 1, 2, 0));
    rig.deliver(SERVER_MAC, &Message::command(CommandType::StatusRequest, 0, 3, 0));

    assert!(rig.hw.channel_calls.is_empty());
}

#[test]
fn malformed_frame_is_dropped() {
    let mut rig = Rig::paired_client(2);

    assert!(events::push_frame(SERVER_MAC, &[0x07, 0xFF]));
    rig.advance(10);
    rig.deliver(SERVER_MAC, &program(1, 1));

    assert_eq!(rig.hw.channel_calls, [1]);
}

// ── Hub side ──────────────────────────────────────────────────

#[test]
fn hub_forwards_midi_then_switches_locally() {
    let mut rig = hub_with_client(2);

    rig.midi(1, 2);

    let sent = rig.take_sent();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        (dest, Message::Command { command_type, value, sequence, .. }) => {
            assert_eq!(*dest, CLIENT_MAC);
            assert_eq!(*command_type, CommandType::ProgramChange as u8);
            assert_eq!(*value, 2);
            assert_eq!(*sequence, 1);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(rig.sink.contains(&AppEvent::ProgramForwarded { program: 2, peers: 1 }));
    assert_eq!(rig.hw.engaged(), 2);
}

#[test]
fn hub_sequence_numbers_increase() {
    let mut rig = hub_with_client(2);

    rig.midi(1, 1);
    rig.midi(1, 2);

    let sequences: Vec<u32> = rig
        .take_sent()
        .iter()
        .filter_map(|(_, m)| match m {
            Message::Command { sequence, .. } => Some(*sequence),
            _ => None,
        })
        .collect();
    assert_eq!(sequences, [1, 2]);
}

#[test]
fn footswitch_sends_its_program_to_peers() {
    let mut rig = hub_with_client(2);

    rig.tap(2);

    let sent = rig.take_sent();
    assert!(sent.iter().any(|(dest, m)| {
        *dest == CLIENT_MAC && matches!(m, Message::Command { command_type: 0, value: 2, .. })
    }));
    assert!(rig.hw.channel_calls.is_empty(), "footswitches only drive the clients");
}

#[test]
fn hub_mode_tap_only_flashes() {
    let mut rig = hub_with_client(2);

    rig.tap(0);

    assert!(rig.take_sent().is_empty());
    assert!(rig.hw.channel_calls.is_empty());
}

#[test]
fn hub_without_peers_still_switches() {
    let mut rig = Rig::server(2);

    rig.midi(1, 1);

    assert!(rig.take_sent().is_empty());
    assert!(rig.sink.contains(&AppEvent::ProgramForwarded { program: 1, peers: 0 }));
    assert_eq!(rig.hw.engaged(), 1);
}

#[test]
fn hub_rejects_commands_from_unknown_peers() {
    let mut rig = hub_with_client(2);

    rig.deliver(STRANGER_MAC, &program(1, 1));
    assert!(rig.hw.channel_calls.is_empty());

    rig.deliver(CLIENT_MAC, &program(1, 1));
    assert_eq!(rig.hw.engaged(), 1);
}

// ── Console ───────────────────────────────────────────────────

#[test]
fn console_channel_commands() {
    let mut rig = Rig::paired_client(3);

    rig.command(AppCommand::SelectChannel(3));
    assert_eq!(rig.hw.engaged(), 3);

    rig.command(AppCommand::SelectChannel(9));
    assert_eq!(rig.hw.engaged(), 3, "out-of-range channel leaves relays alone");

    rig.command(AppCommand::AllOff);
    assert_eq!(rig.hw.engaged(), 0);
    assert!(rig.sink.contains(&AppEvent::ChannelChanged { from: 3, to: 0 }));
}

#[test]
fn console_mapping_is_persisted() {
    let mut rig = Rig::paired_client(2);

    rig.command(AppCommand::SetMapping { channel: 2, program: 64 });
    rig.midi(1, 64);

    assert_eq!(rig.hw.engaged(), 2);
    assert_eq!(ampswitch::settings::load_mapping(&mut rig.store, 2).as_slice(), [1, 64]);
}

#[test]
fn console_restart_is_left_to_the_caller() {
    let mut rig = Rig::paired_client(1);

    assert_eq!(rig.command(AppCommand::Restart), CommandOutcome::Restart);
    assert_eq!(rig.command(AppCommand::Status), CommandOutcome::Done);
}
