//! DIN MIDI input: byte stream parser and UART reader.
//!
//! Only Program Change messages matter to the switcher. Everything else is
//! parsed far enough to stay in sync and then dropped:
//!
//! - running status is honoured for channel messages
//! - real-time bytes (0xF8..=0xFF) may appear anywhere and are ignored
//! - SysEx (0xF0 .. 0xF7) is skipped entirely
//! - system common messages cancel running status

use heapless::Vec;

use crate::drivers::hw_init;

/// A received Program Change, channel 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramChange {
    pub channel: u8,
    pub program: u8,
}

const STATUS_PROGRAM_CHANGE: u8 = 0xC0;
const SYSEX_START: u8 = 0xF0;
const SYSEX_END: u8 = 0xF7;

#[derive(Debug, Default)]
pub struct MidiParser {
    running_status: Option<u8>,
    data: Vec<u8, 2>,
    in_sysex: bool,
}

impl MidiParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns a Program Change when one completes.
    pub fn feed(&mut self, byte: u8) -> Option<ProgramChange> {
        if byte >= 0xF8 {
            return None;
        }

        if byte & 0x80 != 0 {
            self.data.clear();
            match byte {
                SYSEX_START => {
                    self.in_sysex = true;
                    self.running_status = None;
                }
                SYSEX_END => self.in_sysex = false,
                0xF1..=0xF6 => {
                    // System common: consumes its own data bytes, no running status.
                    self.in_sysex = false;
                    self.running_status = (data_len(byte) > 0).then_some(byte);
                }
                _ => {
                    self.in_sysex = false;
                    self.running_status = Some(byte);
                }
            }
            return None;
        }

        if self.in_sysex {
            return None;
        }

        let status = self.running_status?;
        let _ = self.data.push(byte);
        if self.data.len() < data_len(status) {
            return None;
        }
        self.data.clear();

        if status >= 0xF0 {
            // System common messages do not support running status.
            self.running_status = None;
            return None;
        }

        if status & 0xF0 == STATUS_PROGRAM_CHANGE {
            Some(ProgramChange { channel: (status & 0x0F) + 1, program: byte })
        } else {
            None
        }
    }
}

/// Data bytes following `status`.
fn data_len(status: u8) -> usize {
    match status & 0xF0 {
        0xC0 | 0xD0 => 1,
        0xF0 => match status {
            0xF1 | 0xF3 => 1,
            0xF2 => 2,
            _ => 0,
        },
        _ => 2,
    }
}

/// Non-blocking reader over the MIDI UART.
#[derive(Debug, Default)]
pub struct MidiInput {
    parser: MidiParser,
}

impl MidiInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the UART buffer and hand each Program Change to `on_pc`.
    pub fn poll(&mut self, mut on_pc: impl FnMut(ProgramChange)) {
        let mut buf = [0u8; 32];
        loop {
            let n = hw_init::midi_uart_read(&mut buf);
            if n == 0 {
                break;
            }
            for &b in &buf[..n] {
                if let Some(pc) = self.parser.feed(b) {
                    on_pc(pc);
                }
            }
            if n < buf.len() {
                break;
            }
        }
    }
}
