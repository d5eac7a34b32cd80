//! Device identity derived from the ESP32 factory MAC address.
//!
//! The name `AmpSwitch-XXYYZZ` (last 3 MAC bytes, uppercase hex) is sent in
//! pairing requests and shown in the hub's peer list.

use core::fmt::Write;

use crate::protocol::{MacAddr, NAME_LEN};

pub type DeviceName = heapless::String<NAME_LEN>;

/// Read the station MAC (the address ESP-NOW frames carry).
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddr {
    let mut mac: MacAddr = [0u8; 6];
    // SAFETY: writes exactly 6 bytes into `mac`.
    unsafe {
        esp_idf_svc::sys::esp_read_mac(mac.as_mut_ptr(), esp_idf_svc::sys::esp_mac_type_t_ESP_MAC_WIFI_STA);
    }
    mac
}

/// Simulation: a deterministic locally administered MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddr {
    [0x02, 0xA5, 0x00, 0xC0, 0xFF, 0xEE]
}

pub fn device_name(mac: &MacAddr) -> DeviceName {
    let mut name = DeviceName::new();
    let _ = write!(name, "AmpSwitch-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_format() {
        let mac = [0x00, 0x11, 0x22, 0xAA, 0xBB, 0xCC];
        assert_eq!(device_name(&mac).as_str(), "AmpSwitch-AABBCC");
    }

    #[test]
    fn sim_mac_is_stable() {
        assert_eq!(read_mac(), read_mac());
        assert_eq!(device_name(&read_mac()).as_str(), "AmpSwitch-C0FFEE");
    }
}
