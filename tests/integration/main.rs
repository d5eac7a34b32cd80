//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below drives a full [`AppService`](ampswitch::app::service::AppService)
//! through scripted button levels, MIDI input and radio frames against the
//! mock adapters in `mock_hw`. Everything runs on the host.

mod dispatcher_tests;
mod gesture_flow_tests;
mod midi_learn_tests;
mod mock_hw;
mod pairing_tests;
