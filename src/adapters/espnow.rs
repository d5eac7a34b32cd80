//! ESP-NOW transport adapter.
//!
//! Implements [`TransportPort`] over `esp_idf_svc::espnow`. Wi-Fi runs in
//! station mode without connecting anywhere; ESP-NOW only needs the radio
//! up and tuned to the right channel.
//!
//! The receive callback runs in the Wi-Fi task. It copies the frame into
//! [`crate::events`] and returns; decoding happens in the poll loop.
//!
//! On host builds a simulation backend records every send so the adapter
//! can be exercised without a radio.

use log::{debug, info};

use crate::app::pairing::MAX_RADIO_CHANNEL;
use crate::app::ports::{TransportError, TransportPort};
use crate::protocol::{MacAddr, MacDisplay, Message, MAX_FRAME_LEN};

fn check_channel(channel: u8) -> Result<(), TransportError> {
    if (1..=MAX_RADIO_CHANNEL).contains(&channel) {
        Ok(())
    } else {
        Err(TransportError::BadChannel(channel))
    }
}

fn encode<'a>(message: &Message, buf: &'a mut [u8; MAX_FRAME_LEN]) -> Result<&'a [u8], TransportError> {
    message.encode(buf).map_err(|_| TransportError::Encode)
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF backend
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod platform {
    use esp_idf_svc::espnow::{EspNow, PeerInfo, ReceiveInfo};
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::sys::{self, EspError};
    use esp_idf_svc::wifi::{ClientConfiguration, Configuration, EspWifi};
    use log::warn;

    use super::*;
    use crate::events;

    pub struct EspNowTransport {
        _wifi: EspWifi<'static>,
        espnow: EspNow<'static>,
        mac: MacAddr,
        channel: u8,
    }

    impl EspNowTransport {
        /// Bring Wi-Fi up in station mode and attach ESP-NOW.
        pub fn new(modem: Modem, sysloop: EspSystemEventLoop, mac: MacAddr) -> Result<Self, EspError> {
            let mut wifi = EspWifi::new(modem, sysloop, None)?;
            wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
            wifi.start()?;
            // SAFETY: Wi-Fi is started; power save off keeps the receiver awake.
            sys::esp!(unsafe { sys::esp_wifi_set_ps(sys::wifi_ps_type_t_WIFI_PS_NONE) })?;

            let espnow = EspNow::take()?;
            espnow.register_recv_cb(|info: &ReceiveInfo, data: &[u8]| {
                if !events::push_frame(*info.src_addr, data) {
                    warn!("ESP-NOW: inbound frame dropped");
                }
            })?;

            info!("ESP-NOW up, station MAC {}", MacDisplay(&mac));
            Ok(Self {
                _wifi: wifi,
                espnow,
                mac,
                channel: 1,
            })
        }
    }

    impl TransportPort for EspNowTransport {
        fn send(&mut self, dest: &MacAddr, message: &Message) -> Result<(), TransportError> {
            let mut buf = [0u8; MAX_FRAME_LEN];
            let bytes = encode(message, &mut buf)?;
            self.espnow.send(*dest, bytes).map_err(|e| {
                warn!("ESP-NOW send to {} failed: {}", MacDisplay(dest), e);
                TransportError::SendFailed
            })
        }

        fn set_radio_channel(&mut self, channel: u8) -> Result<(), TransportError> {
            check_channel(channel)?;
            // SAFETY: Wi-Fi is started and not connected to an AP.
            let hop = unsafe {
                sys::esp!(sys::esp_wifi_set_promiscuous(true)).and_then(|()| {
                    sys::esp!(sys::esp_wifi_set_channel(
                        channel,
                        sys::wifi_second_chan_t_WIFI_SECOND_CHAN_NONE
                    ))
                })
            };
            // Leave promiscuous mode even when the hop failed.
            // SAFETY: as above.
            let restore = unsafe { sys::esp!(sys::esp_wifi_set_promiscuous(false)) };
            if let Err(e) = hop.and(restore) {
                warn!("ESP-NOW: retune to channel {} failed: {}", channel, e);
                return Err(TransportError::BadChannel(channel));
            }
            self.channel = channel;
            debug!("Radio channel {}", channel);
            Ok(())
        }

        fn add_peer(&mut self, mac: &MacAddr, channel: u8) -> Result<(), TransportError> {
            check_channel(channel)?;
            let peer = PeerInfo {
                peer_addr: *mac,
                channel,
                ifidx: sys::wifi_interface_t_WIFI_IF_STA,
                encrypt: false,
                ..Default::default()
            };
            let result = if self.espnow.peer_exists(*mac).unwrap_or(false) {
                self.espnow.mod_peer(peer)
            } else {
                self.espnow.add_peer(peer)
            };
            result.map_err(|e| {
                warn!("ESP-NOW add_peer {} failed: {}", MacDisplay(mac), e);
                TransportError::PeerTableFull
            })
        }

        fn remove_peer(&mut self, mac: &MacAddr) -> Result<(), TransportError> {
            if !self.espnow.peer_exists(*mac).unwrap_or(false) {
                return Ok(());
            }
            self.espnow.del_peer(*mac).map_err(|e| {
                warn!("ESP-NOW del_peer {} failed: {}", MacDisplay(mac), e);
                TransportError::PeerRemoveFailed
            })
        }

        fn local_mac(&self) -> MacAddr {
            self.mac
        }
    }
}

#[cfg(target_os = "espidf")]
pub use platform::EspNowTransport;

// ───────────────────────────────────────────────────────────────
// Host simulation backend
// ───────────────────────────────────────────────────────────────

/// Records every outbound message instead of transmitting it.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct SimTransport {
    pub mac: MacAddr,
    pub channel: u8,
    pub peers: Vec<(MacAddr, u8)>,
    pub sent: Vec<(MacAddr, Message)>,
}

#[cfg(not(target_os = "espidf"))]
impl SimTransport {
    pub fn new(mac: MacAddr) -> Self {
        info!("ESP-NOW: simulation backend, MAC {}", MacDisplay(&mac));
        Self {
            mac,
            channel: 1,
            ..Default::default()
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl TransportPort for SimTransport {
    fn send(&mut self, dest: &MacAddr, message: &Message) -> Result<(), TransportError> {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let bytes = encode(message, &mut buf)?;
        debug!("sim: {} bytes to {}", bytes.len(), MacDisplay(dest));
        self.sent.push((*dest, message.clone()));
        Ok(())
    }

    fn set_radio_channel(&mut self, channel: u8) -> Result<(), TransportError> {
        check_channel(channel)?;
        self.channel = channel;
        Ok(())
    }

    fn add_peer(&mut self, mac: &MacAddr, channel: u8) -> Result<(), TransportError> {
        check_channel(channel)?;
        match self.peers.iter_mut().find(|(m, _)| m == mac) {
            Some(entry) => entry.1 = channel,
            None => self.peers.push((*mac, channel)),
        }
        Ok(())
    }

    fn remove_peer(&mut self, mac: &MacAddr) -> Result<(), TransportError> {
        self.peers.retain(|(m, _)| m != mac);
        Ok(())
    }

    fn local_mac(&self) -> MacAddr {
        self.mac
    }
}
