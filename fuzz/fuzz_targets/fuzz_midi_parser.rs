//! Fuzz target: `MidiParser::feed`
//!
//! Arbitrary DIN byte streams (running status, SysEx, stray data, real-time
//! bytes anywhere) must only ever yield in-range Program Changes.
//!
//! cargo fuzz run fuzz_midi_parser

#![no_main]

use ampswitch::drivers::midi::MidiParser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut parser = MidiParser::new();
    for &byte in data {
        if let Some(pc) = parser.feed(byte) {
            assert!((1..=16).contains(&pc.channel));
            assert!(pc.program <= 127);
        }
    }
});
