//! AmpSwitch firmware library.
//!
//! Exposes the pure-logic modules for integration testing. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod boot;
pub mod config;
pub mod console;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod pins;
pub mod protocol;
pub mod settings;

// Hardware-facing modules; host builds get simulation fallbacks.
pub mod adapters;
pub mod drivers;
