//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (buttons, relays, radio, storage, event sinks) implement
//! these traits. The [`AppService`](super::service::AppService) consumes them
//! via generics, so the gesture and mode logic never touches hardware
//! directly.

use crate::config::DeviceConfig;
use crate::drivers::button::Level;
use crate::error::OutputError;
use crate::protocol::{MacAddr, Message};

// ───────────────────────────────────────────────────────────────
// Input port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw digital input sampling.
pub trait InputPort {
    /// Current level of `gpio`. Buttons are active-low.
    fn read_pin(&mut self, gpio: i32) -> Level;
}

// ───────────────────────────────────────────────────────────────
// Output port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Relay bank and status LED.
pub trait OutputPort {
    /// Engage relay `channel` (1-based) and release every other one.
    /// Channel 0 releases all relays.
    fn set_channel(&mut self, channel: u8) -> Result<(), OutputError>;

    /// Write the status LED duty (0..=8191).
    fn set_led_duty(&mut self, duty: u16);
}

// ───────────────────────────────────────────────────────────────
// Transport port (driven adapter: domain ↔ radio)
// ───────────────────────────────────────────────────────────────

/// Best-effort point-to-multipoint radio link.
///
/// Inbound frames do not come through this trait: the receive callback
/// pushes them into [`crate::events`] and the service drains that queue.
pub trait TransportPort {
    /// Encode and send one message.
    fn send(&mut self, dest: &MacAddr, message: &Message) -> Result<(), TransportError>;

    /// Retune the radio (1..=13).
    fn set_radio_channel(&mut self, channel: u8) -> Result<(), TransportError>;

    /// Register a peer so unicast sends reach it.
    fn add_peer(&mut self, mac: &MacAddr, channel: u8) -> Result<(), TransportError>;

    /// Forget a peer. Unknown peers are not an error.
    fn remove_peer(&mut self, mac: &MacAddr) -> Result<(), TransportError>;

    /// This node's station MAC.
    fn local_mac(&self) -> MacAddr;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the device configuration.
///
/// Implementations MUST call [`DeviceConfig::validate`] before persisting
/// and reject invalid configurations with [`ConfigError::ValidationFailed`].
pub trait ConfigPort {
    /// Load configuration. Returns [`ConfigError::NotFound`] on first boot.
    fn load(&self) -> Result<DeviceConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &DeviceConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage, namespaced.
///
/// Write operations MUST be atomic: no partial writes on power loss. The
/// ESP-IDF NVS API guarantees this natively.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed validation.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Value does not fit the caller's buffer.
    TooLarge,
    /// Generic I/O error.
    IoError,
}

/// Errors from [`TransportPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Message could not be encoded into one frame.
    Encode,
    /// Radio rejected the send.
    SendFailed,
    /// Radio channel outside 1..=13 or retune failed.
    BadChannel(u8),
    /// Driver peer table is full.
    PeerTableFull,
    /// Driver refused to drop a peer.
    PeerRemoveFailed,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::TooLarge => write!(f, "value larger than buffer"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Encode => write!(f, "encode failed"),
            Self::SendFailed => write!(f, "send failed"),
            Self::BadChannel(ch) => write!(f, "radio channel {} rejected", ch),
            Self::PeerTableFull => write!(f, "peer table full"),
            Self::PeerRemoveFailed => write!(f, "peer removal failed"),
        }
    }
}
