//! Serial console line reader.
//!
//! Bytes arrive on stdin (UART0 / USB-CDC through the ESP-IDF VFS). The
//! descriptor is switched to non-blocking so the poll loop never stalls;
//! [`LineBuffer`] assembles complete lines.

use heapless::String;
use log::warn;

/// Longest accepted console line.
pub const LINE_LEN: usize = 64;

/// Accumulates bytes until CR or LF.
///
/// Overlong lines are discarded whole; the next terminator resets.
#[derive(Debug, Default)]
pub struct LineBuffer {
    line: String<LINE_LEN>,
    overflow: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte; returns a finished, non-empty line.
    pub fn push(&mut self, byte: u8) -> Option<String<LINE_LEN>> {
        match byte {
            b'\r' | b'\n' => {
                let line = core::mem::take(&mut self.line);
                if core::mem::take(&mut self.overflow) {
                    warn!("Console: line longer than {} bytes dropped", LINE_LEN);
                    return None;
                }
                (!line.trim().is_empty()).then_some(line)
            }
            // Backspace / DEL from interactive terminals.
            0x08 | 0x7F => {
                self.line.pop();
                None
            }
            b if b.is_ascii() && !b.is_ascii_control() => {
                if self.line.push(b as char).is_err() {
                    self.overflow = true;
                }
                None
            }
            _ => None,
        }
    }
}

#[cfg(target_os = "espidf")]
pub struct SerialConsole {
    buffer: LineBuffer,
}

#[cfg(target_os = "espidf")]
impl SerialConsole {
    pub fn new() -> Self {
        use esp_idf_svc::sys::{fcntl, F_GETFL, F_SETFL, O_NONBLOCK};
        // SAFETY: fd 0 is the VFS console and stays open for the program's lifetime.
        unsafe {
            let flags = fcntl(0, F_GETFL as _);
            if flags < 0 || fcntl(0, F_SETFL as _, flags | O_NONBLOCK as i32) < 0 {
                warn!("Console: could not make stdin non-blocking");
            }
        }
        Self { buffer: LineBuffer::new() }
    }

    /// Return the next complete line, if one is buffered.
    pub fn poll_line(&mut self) -> Option<String<LINE_LEN>> {
        use std::io::Read;

        let mut byte = [0u8; 1];
        let mut stdin = std::io::stdin().lock();
        while let Ok(1) = stdin.read(&mut byte) {
            if let Some(line) = self.buffer.push(byte[0]) {
                return Some(line);
            }
        }
        None
    }
}
