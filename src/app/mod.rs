//! Application core: pure domain logic, zero I/O.
//!
//! Gesture classification, the channel-select and MIDI-learn sub-modes,
//! pairing and command dispatch. All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod channel_select;
pub mod commands;
pub mod dispatcher;
pub mod events;
pub mod gesture;
pub mod midi_learn;
pub mod pairing;
pub mod ports;
pub mod service;
pub mod state;
