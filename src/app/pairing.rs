//! Radio pairing.
//!
//! ## Client discovery
//!
//! ```text
//!  NotPaired ──trigger──▶ PairRequest ──send──▶ PairRequested
//!                              ▲                     │
//!                              └── retry: next ch ───┘ (no reply in 1 s)
//!                                                    │
//!                                      PairingResponse
//!                                                    ▼
//!                                                 Paired
//! ```
//!
//! The client does not know which radio channel the hub is on, so each
//! request is broadcast on the current channel and the channel advances
//! 1..=13 until a hub answers.
//!
//! ## Hub window
//!
//! The hub only accepts requests during a window opened by the pairing
//! gesture. Accepted clients go into a bounded, de-duplicated peer table.

use heapless::{String, Vec};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::CommsError;
use crate::protocol::{MacAddr, MacDisplay, Message, BROADCAST, NAME_LEN};

use super::ports::{TransportError, TransportPort};

/// Maximum clients a hub remembers.
pub const MAX_PEERS: usize = 10;
/// Highest 2.4 GHz channel scanned during discovery.
pub const MAX_RADIO_CHANNEL: u8 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingStatus {
    NotPaired,
    PairRequest,
    PairRequested,
    Paired,
}

// ───────────────────────────────────────────────────────────────
// Client side
// ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ClientPairing {
    status: PairingStatus,
    server: MacAddr,
    radio_channel: u8,
    last_request_ms: u32,
    /// Previous hub still registered with the radio driver.
    stale_peer: Option<MacAddr>,
}

impl Default for ClientPairing {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientPairing {
    pub fn new() -> Self {
        Self {
            status: PairingStatus::NotPaired,
            server: BROADCAST,
            radio_channel: 1,
            last_request_ms: 0,
            stale_peer: None,
        }
    }

    /// Resume a pairing loaded from storage.
    pub fn restore(server: MacAddr, radio_channel: u8) -> Self {
        Self {
            status: PairingStatus::Paired,
            server,
            radio_channel: radio_channel.clamp(1, MAX_RADIO_CHANNEL),
            last_request_ms: 0,
            stale_peer: None,
        }
    }

    /// Forget the hub and start discovery from radio channel 1.
    ///
    /// The old hub is dropped from the radio on the next [`tick`](Self::tick).
    pub fn trigger(&mut self) {
        self.retire_server();
        self.server = BROADCAST;
        self.radio_channel = 1;
        self.status = PairingStatus::PairRequest;
        info!("Pairing: discovery started on radio channel 1");
    }

    /// Drive discovery. Sends at most one request per call.
    pub fn tick(
        &mut self,
        now_ms: u32,
        retry_ms: u32,
        radio: &mut impl TransportPort,
        device_name: &str,
    ) -> Result<(), TransportError> {
        if let Some(mac) = self.stale_peer.take() {
            match radio.remove_peer(&mac) {
                Ok(()) => debug!("Pairing: old hub {} removed", MacDisplay(&mac)),
                Err(e) => warn!("Pairing: could not remove old hub {}: {}", MacDisplay(&mac), e),
            }
        }
        match self.status {
            PairingStatus::PairRequest => {
                // Advance even if the send fails so a dead channel cannot wedge discovery.
                self.status = PairingStatus::PairRequested;
                self.last_request_ms = now_ms;
                radio.set_radio_channel(self.radio_channel)?;
                radio.add_peer(&BROADCAST, self.radio_channel)?;
                let request = Message::pairing_request(radio.local_mac(), self.radio_channel, device_name);
                radio.send(&BROADCAST, &request)?;
                debug!("Pairing request sent on radio channel {}", self.radio_channel);
            }
            PairingStatus::PairRequested if now_ms.wrapping_sub(self.last_request_ms) > retry_ms => {
                self.radio_channel = self.radio_channel % MAX_RADIO_CHANNEL + 1;
                self.status = PairingStatus::PairRequest;
                debug!("Pairing timeout, trying radio channel {}", self.radio_channel);
            }
            _ => {}
        }
        Ok(())
    }

    /// Accept a hub's response. Returns `true` when this completes pairing.
    pub fn on_response(
        &mut self,
        server: MacAddr,
        radio_channel: u8,
        radio: &mut impl TransportPort,
    ) -> Result<bool, TransportError> {
        if !self.is_pairing() {
            debug!("Pairing response from {} ignored (not pairing)", MacDisplay(&server));
            return Ok(false);
        }
        radio.set_radio_channel(radio_channel)?;
        radio.add_peer(&server, radio_channel)?;
        self.server = server;
        self.radio_channel = radio_channel;
        self.status = PairingStatus::Paired;
        info!("Pairing successful: server {} on channel {}", MacDisplay(&server), radio_channel);
        Ok(true)
    }

    /// Drop the pairing without starting discovery.
    pub fn clear(&mut self) {
        self.retire_server();
        let stale_peer = self.stale_peer.take();
        *self = Self::new();
        self.stale_peer = stale_peer;
    }

    fn retire_server(&mut self) {
        if self.server != BROADCAST {
            self.stale_peer = Some(self.server);
        }
    }

    pub fn is_pairing(&self) -> bool {
        matches!(self.status, PairingStatus::PairRequest | PairingStatus::PairRequested)
    }

    pub fn is_paired(&self) -> bool {
        self.status == PairingStatus::Paired
    }

    /// Frames from anyone but the paired hub are not commands for us.
    pub fn accepts_commands_from(&self, src: &MacAddr) -> bool {
        self.is_paired() && *src == self.server
    }

    pub fn status(&self) -> PairingStatus {
        self.status
    }

    pub fn server(&self) -> MacAddr {
        self.server
    }

    pub fn radio_channel(&self) -> u8 {
        self.radio_channel
    }
}

// ───────────────────────────────────────────────────────────────
// Hub side
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub mac: MacAddr,
    pub name: String<NAME_LEN>,
}

/// Bounded, de-duplicated client list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerTable {
    peers: Vec<Peer, MAX_PEERS>,
}

impl PeerTable {
    /// Add or refresh a peer. Returns `true` if it was not known before.
    pub fn add(&mut self, mac: MacAddr, name: &str) -> Result<bool, CommsError> {
        if mac == [0; 6] || mac == BROADCAST {
            warn!("Refusing peer with invalid MAC {}", MacDisplay(&mac));
            return Err(CommsError::Malformed);
        }
        let mut label = String::new();
        for c in name.chars() {
            if label.push(c).is_err() {
                break;
            }
        }
        if let Some(existing) = self.peers.iter_mut().find(|p| p.mac == mac) {
            existing.name = label;
            return Ok(false);
        }
        self.peers
            .push(Peer { mac, name: label })
            .map_err(|_| CommsError::PeerTableFull)?;
        Ok(true)
    }

    pub fn contains(&self, mac: &MacAddr) -> bool {
        self.peers.iter().any(|p| p.mac == *mac)
    }

    pub fn macs(&self) -> impl Iterator<Item = MacAddr> + '_ {
        self.peers.iter().map(|p| p.mac)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }
}

#[derive(Debug, Default)]
pub struct ServerPairing {
    window_opened_ms: Option<u32>,
    pub peers: PeerTable,
}

impl ServerPairing {
    pub fn with_peers(peers: PeerTable) -> Self {
        Self { window_opened_ms: None, peers }
    }

    pub fn open_window(&mut self, now_ms: u32) {
        self.window_opened_ms = Some(now_ms);
        info!("Pairing window open");
    }

    /// Close the window once it has been open for `window_ms`. Returns
    /// `true` exactly once when it closes.
    pub fn tick(&mut self, now_ms: u32, window_ms: u32) -> bool {
        match self.window_opened_ms {
            Some(opened) if now_ms.wrapping_sub(opened) > window_ms => {
                self.window_opened_ms = None;
                info!("Pairing window closed (timeout)");
                true
            }
            _ => false,
        }
    }

    pub fn is_window_open(&self) -> bool {
        self.window_opened_ms.is_some()
    }

    /// Handle a pairing request. Returns whether the peer is new; the
    /// caller persists the table and sends the response.
    pub fn on_request(&mut self, mac: MacAddr, name: &str) -> Result<bool, CommsError> {
        if !self.is_window_open() {
            info!("Pairing request from {} ignored: window closed", MacDisplay(&mac));
            return Err(CommsError::UnknownPeer);
        }
        let added = self.peers.add(mac, name)?;
        info!(
            "Pairing request from {} ({}) accepted, {} peers",
            MacDisplay(&mac),
            name,
            self.peers.len()
        );
        Ok(added)
    }
}
