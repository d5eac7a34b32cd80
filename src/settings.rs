//! Versioned persisted settings.
//!
//! Each setting lives in its own namespace next to a `version` key. Reads
//! check the version first; a missing or stale version (or a value that no
//! longer decodes) falls back to defaults and rewrites them, so a layout
//! change never bricks a board. Values are postcard-encoded.
//!
//! | Namespace      | Keys                    | Value                 |
//! |----------------|-------------------------|-----------------------|
//! | `midi_map`     | `map`                   | program per channel   |
//! | `midi_channel` | `channel`               | 0 (omni) or 1..=16    |
//! | `logging`      | `log_level`             | 0 (off) ..= 4 (debug) |
//! | `pairing`      | `server_mac`, `channel` | client's hub          |
//! | `peers`        | `list`                  | hub's client table    |

use heapless::Vec;
use log::{info, warn, LevelFilter};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::app::pairing::PeerTable;
use crate::app::ports::{StorageError, StoragePort};
use crate::app::state::default_mapping;
use crate::config::{MAX_CHANNELS, MAX_MIDI_CHANNEL};
use crate::protocol::MacAddr;

pub const STORAGE_VERSION: u8 = 1;

const KEY_VERSION: &str = "version";

const NS_MAP: &str = "midi_map";
const KEY_MAP: &str = "map";
const NS_MIDI_CHANNEL: &str = "midi_channel";
const KEY_MIDI_CHANNEL: &str = "channel";
const NS_LOGGING: &str = "logging";
const KEY_LOG_LEVEL: &str = "log_level";
const NS_PAIRING: &str = "pairing";
const KEY_SERVER_MAC: &str = "server_mac";
const KEY_RADIO_CHANNEL: &str = "channel";
const NS_PEERS: &str = "peers";
const KEY_PEER_LIST: &str = "list";

pub const DEFAULT_MIDI_CHANNEL: u8 = 1;
pub const DEFAULT_LOG_LEVEL: u8 = 3;
pub const MAX_LOG_LEVEL: u8 = 4;

const VALUE_BUF: usize = 512;

// ── Generic helpers ───────────────────────────────────────────

fn version_ok(store: &impl StoragePort, ns: &str) -> bool {
    let mut buf = [0u8; 1];
    matches!(store.read(ns, KEY_VERSION, &mut buf), Ok(1) if buf[0] == STORAGE_VERSION)
}

fn read_value<T: DeserializeOwned>(store: &impl StoragePort, ns: &str, key: &str) -> Option<T> {
    if !version_ok(store, ns) {
        return None;
    }
    let mut buf = [0u8; VALUE_BUF];
    let n = store.read(ns, key, &mut buf).ok()?;
    postcard::from_bytes(&buf[..n]).ok()
}

fn write_value<T: Serialize>(store: &mut impl StoragePort, ns: &str, key: &str, value: &T) -> Result<(), StorageError> {
    let mut buf = [0u8; VALUE_BUF];
    let bytes = postcard::to_slice(value, &mut buf).map_err(|_| StorageError::TooLarge)?;
    store.write(ns, key, bytes)?;
    store.write(ns, KEY_VERSION, &[STORAGE_VERSION])
}

/// Read `ns/key`, or write `default` back and return it.
fn load_or_reset<T: Serialize + DeserializeOwned>(
    store: &mut impl StoragePort,
    ns: &str,
    key: &str,
    default: T,
    valid: impl Fn(&T) -> bool,
) -> T {
    if let Some(v) = read_value::<T>(store, ns, key).filter(|v| valid(v)) {
        return v;
    }
    warn!("Settings: {}/{} missing or stale, writing defaults", ns, key);
    if let Err(e) = write_value(store, ns, key, &default) {
        warn!("Settings: failed to rewrite {}/{}: {}", ns, key, e);
    }
    default
}

// ── Learned mapping ───────────────────────────────────────────

pub fn load_mapping(store: &mut impl StoragePort, channel_count: u8) -> Vec<u8, MAX_CHANNELS> {
    let valid = |m: &Vec<u8, MAX_CHANNELS>| m.len() == channel_count as usize && m.iter().all(|&p| p <= 127);
    load_or_reset(store, NS_MAP, KEY_MAP, default_mapping(channel_count), valid)
}

pub fn save_mapping(store: &mut impl StoragePort, mapping: &[u8]) -> Result<(), StorageError> {
    let mapping: Vec<u8, MAX_CHANNELS> = mapping.iter().copied().take(MAX_CHANNELS).collect();
    write_value(store, NS_MAP, KEY_MAP, &mapping)?;
    info!("Settings: MIDI map saved {:?}", mapping.as_slice());
    Ok(())
}

// ── MIDI receive channel ──────────────────────────────────────

pub fn load_midi_channel(store: &mut impl StoragePort) -> u8 {
    load_or_reset(store, NS_MIDI_CHANNEL, KEY_MIDI_CHANNEL, DEFAULT_MIDI_CHANNEL, |&c| c <= MAX_MIDI_CHANNEL)
}

pub fn save_midi_channel(store: &mut impl StoragePort, channel: u8) -> Result<(), StorageError> {
    write_value(store, NS_MIDI_CHANNEL, KEY_MIDI_CHANNEL, &channel)
}

// ── Log level ─────────────────────────────────────────────────

pub fn load_log_level(store: &mut impl StoragePort) -> u8 {
    load_or_reset(store, NS_LOGGING, KEY_LOG_LEVEL, DEFAULT_LOG_LEVEL, |&l| l <= MAX_LOG_LEVEL)
}

pub fn save_log_level(store: &mut impl StoragePort, level: u8) -> Result<(), StorageError> {
    write_value(store, NS_LOGGING, KEY_LOG_LEVEL, &level)
}

/// 0 = off, 1 = error, 2 = warn, 3 = info, 4 = debug.
pub fn level_filter(level: u8) -> LevelFilter {
    match level {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

// ── Client pairing ────────────────────────────────────────────

pub fn load_pairing(store: &impl StoragePort) -> Option<(MacAddr, u8)> {
    let mac: MacAddr = read_value(store, NS_PAIRING, KEY_SERVER_MAC)?;
    let channel: u8 = read_value(store, NS_PAIRING, KEY_RADIO_CHANNEL)?;
    (mac != [0; 6] && (1..=13).contains(&channel)).then_some((mac, channel))
}

pub fn save_pairing(store: &mut impl StoragePort, mac: &MacAddr, channel: u8) -> Result<(), StorageError> {
    write_value(store, NS_PAIRING, KEY_SERVER_MAC, mac)?;
    write_value(store, NS_PAIRING, KEY_RADIO_CHANNEL, &channel)
}

pub fn clear_pairing(store: &mut impl StoragePort) -> Result<(), StorageError> {
    store.delete(NS_PAIRING, KEY_SERVER_MAC)?;
    store.delete(NS_PAIRING, KEY_RADIO_CHANNEL)?;
    info!("Settings: pairing cleared");
    Ok(())
}

// ── Hub peer table ────────────────────────────────────────────

pub fn load_peers(store: &impl StoragePort) -> PeerTable {
    read_value(store, NS_PEERS, KEY_PEER_LIST).unwrap_or_default()
}

pub fn save_peers(store: &mut impl StoragePort, peers: &PeerTable) -> Result<(), StorageError> {
    write_value(store, NS_PEERS, KEY_PEER_LIST, peers)
}

pub fn clear_peers(store: &mut impl StoragePort) -> Result<(), StorageError> {
    store.delete(NS_PEERS, KEY_PEER_LIST)
}
