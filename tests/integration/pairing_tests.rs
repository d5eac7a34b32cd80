//! Client discovery and hub pairing window over the simulated radio.

use crate::mock_hw::{Rig, CLIENT_MAC, SERVER_MAC, STRANGER_MAC};

use ampswitch::app::commands::AppCommand;
use ampswitch::app::events::AppEvent;
use ampswitch::app::pairing::PairingStatus;
use ampswitch::protocol::{MacAddr, Message, BROADCAST};
use ampswitch::settings;

fn requests(sent: &[(MacAddr, Message)]) -> Vec<u8> {
    sent.iter()
        .filter_map(|(dest, msg)| match msg {
            Message::PairingRequest { channel, .. } if *dest == BROADCAST => Some(*channel),
            _ => None,
        })
        .collect()
}

// ── Client ────────────────────────────────────────────────────

#[test]
fn fresh_client_discovers_and_pairs() {
    let mut rig = Rig::fresh_client(1);
    assert!(rig.sink.contains(&AppEvent::PairingStarted));

    rig.advance(10);
    let sent = rig.take_sent();
    assert_eq!(requests(&sent), [1]);
    match &sent[0].1 {
        Message::PairingRequest { mac, name, .. } => {
            assert_eq!(*mac, CLIENT_MAC);
            assert_eq!(name.as_str(), "AmpSwitch-TEST01");
        }
        other => panic!("unexpected {:?}", other),
    }

    // No answer within a second: hop to the next radio channel.
    rig.advance(1_100);
    assert_eq!(requests(&rig.take_sent()), [2]);
    assert_eq!(rig.radio.channel, 2);

    rig.deliver(SERVER_MAC, &Message::PairingResponse { mac: SERVER_MAC, channel: 6 });
    assert!(rig.sink.contains(&AppEvent::Paired { server: SERVER_MAC, radio_channel: 6 }));
    assert_eq!(rig.app.pairing_status(), Some(PairingStatus::Paired));
    assert_eq!(rig.radio.channel, 6);
    assert!(rig.radio.peers.contains(&(SERVER_MAC, 6)));
    assert_eq!(settings::load_pairing(&rig.store), Some((SERVER_MAC, 6)));

    rig.take_sent();
    rig.advance(3_000);
    assert!(requests(&rig.take_sent()).is_empty(), "paired clients stop asking");
}

#[test]
fn discovery_wraps_after_channel_thirteen() {
    let mut rig = Rig::fresh_client(1);

    rig.advance(13 * 1_020);
    let channels = requests(&rig.take_sent());
    assert_eq!(&channels[..13], &(1..=13).collect::<Vec<u8>>()[..]);
    rig.advance(1_020);
    assert!(requests(&rig.take_sent()).contains(&1));
}

#[test]
fn response_while_paired_is_ignored() {
    let mut rig = Rig::paired_client(1);

    rig.deliver(STRANGER_MAC, &Message::PairingResponse { mac: STRANGER_MAC, channel: 3 });

    assert_eq!(rig.app.pairing_status(), Some(PairingStatus::Paired));
    assert_eq!(settings::load_pairing(&rig.store), Some((SERVER_MAC, 6)));
    assert_eq!(rig.radio.channel, 6);
}

#[test]
fn re_pairing_unregisters_the_old_hub() {
    let mut rig = Rig::paired_client(1);
    assert!(rig.radio.peers.contains(&(SERVER_MAC, 6)));

    rig.hold(0, 31_000);

    assert!(rig.radio.peers.iter().all(|(mac, _)| *mac != SERVER_MAC));
    assert!(rig.radio.peers.contains(&(BROADCAST, 1)));
}

#[test]
fn clear_pairing_forgets_the_hub() {
    let mut rig = Rig::paired_client(1);

    rig.command(AppCommand::ClearPairing);

    assert_eq!(rig.app.pairing_status(), Some(PairingStatus::NotPaired));
    assert!(settings::load_pairing(&rig.store).is_none());
    rig.advance(2_000);
    assert!(rig.radio.peers.is_empty(), "old hub unregistered");
    assert!(requests(&rig.take_sent()).is_empty(), "clearing does not start discovery");
}

// ── Hub ───────────────────────────────────────────────────────

#[test]
fn hub_hold_opens_window_and_answers_requests() {
    let mut rig = Rig::server(2);

    rig.hold(0, 31_000);
    assert!(rig.sink.contains(&AppEvent::PairingStarted));

    rig.deliver(CLIENT_MAC, &Message::pairing_request(CLIENT_MAC, 4, "AmpSwitch-000001"));

    assert!(rig.sink.contains(&AppEvent::PeerAdded { mac: CLIENT_MAC, count: 1 }));
    assert!(rig.radio.peers.contains(&(CLIENT_MAC, 4)));
    assert!(settings::load_peers(&rig.store).contains(&CLIENT_MAC));
    assert!(rig.take_sent().contains(&(
        CLIENT_MAC,
        Message::PairingResponse { mac: SERVER_MAC, channel: 4 }
    )));
}

#[test]
fn repeated_request_is_answered_but_not_duplicated() {
    let mut rig = Rig::server(2);
    rig.command(AppCommand::Pair);

    let request = Message::pairing_request(CLIENT_MAC, 4, "AmpSwitch-000001");
    rig.deliver(CLIENT_MAC, &request);
    rig.deliver(CLIENT_MAC, &request);

    assert_eq!(rig.app.peer_count(), 1);
    let answers = rig
        .take_sent()
        .iter()
        .filter(|(_, m)| matches!(m, Message::PairingResponse { .. }))
        .count();
    assert_eq!(answers, 2);
}

#[test]
fn hub_ignores_requests_outside_window() {
    let mut rig = Rig::server(2);

    rig.deliver(CLIENT_MAC, &Message::pairing_request(CLIENT_MAC, 4, "late"));

    assert_eq!(rig.app.peer_count(), 0);
    assert!(rig.take_sent().is_empty());
}

#[test]
fn window_closes_after_thirty_seconds() {
    let mut rig = Rig::server(2);
    rig.command(AppCommand::Pair);

    rig.advance(30_100);
    assert!(rig.sink.contains(&AppEvent::PairingWindowClosed));

    rig.deliver(CLIENT_MAC, &Message::pairing_request(CLIENT_MAC, 4, "late"));
    assert_eq!(rig.app.peer_count(), 0);
}

#[test]
fn hub_restores_peers_at_start() {
    let mut rig = Rig::server(2);
    rig.command(AppCommand::Pair);
    rig.deliver(CLIENT_MAC, &Message::pairing_request(CLIENT_MAC, 4, "AmpSwitch-000001"));

    let mut rebooted = ampswitch::app::service::AppService::new(
        ampswitch::config::DeviceConfig::server(2),
        "AmpSwitch-HUB",
    );
    rig.radio.peers.clear();
    rebooted.start(0, &mut rig.radio, &mut rig.store, &mut rig.sink);

    assert_eq!(rebooted.peer_count(), 1);
    assert!(rig.radio.peers.contains(&(CLIENT_MAC, 4)));
}
