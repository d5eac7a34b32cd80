//! Fuzz target: serial console input
//!
//! Raw bytes go through the line buffer and every completed line through
//! the command parser. Neither may panic; accepted arguments stay in range.
//!
//! cargo fuzz run fuzz_console_line

#![no_main]

use ampswitch::adapters::serial::LineBuffer;
use ampswitch::app::commands::AppCommand;
use ampswitch::console;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut lines = LineBuffer::new();
    for &byte in data {
        let Some(line) = lines.push(byte) else {
            continue;
        };
        match console::parse(&line) {
            Ok(AppCommand::SetLogLevel(level)) => assert!(level <= 4),
            Ok(AppCommand::SetMidiChannel(channel)) => assert!(channel <= 16),
            Ok(AppCommand::SetMapping { channel, program }) => {
                assert!(channel >= 1);
                assert!(program <= 127);
            }
            _ => {}
        }
    }
});
