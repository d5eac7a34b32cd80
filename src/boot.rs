//! Boot-time update trigger window.
//!
//! For a short window after power-up the board listens for a request to
//! enter update mode: either `ota` typed on the console or the primary
//! button held down long enough. This is the only place the firmware
//! blocks, and the wait is bounded by the window length.

use log::info;

/// How long update mode stays up before the board reboots.
pub const UPDATE_MODE_TIMEOUT_MS: u32 = 300_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootTrigger {
    Button,
    Console,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootStep {
    Waiting,
    Triggered(BootTrigger),
    Expired,
}

#[derive(Debug)]
pub struct BootWindow {
    started_ms: u32,
    window_ms: u32,
    hold_ms: u32,
    hold_start_ms: Option<u32>,
}

impl BootWindow {
    pub fn new(now_ms: u32, window_ms: u32, hold_ms: u32) -> Self {
        Self { started_ms: now_ms, window_ms, hold_ms, hold_start_ms: None }
    }

    /// Advance with one sample of the primary button (raw, `true` = down)
    /// and whether an `ota` console line arrived.
    pub fn step(&mut self, now_ms: u32, button_down: bool, console_ota: bool) -> BootStep {
        if console_ota {
            return BootStep::Triggered(BootTrigger::Console);
        }

        if button_down {
            let since = *self.hold_start_ms.get_or_insert(now_ms);
            if now_ms.wrapping_sub(since) > self.hold_ms {
                return BootStep::Triggered(BootTrigger::Button);
            }
        } else {
            self.hold_start_ms = None;
        }

        // A hold in progress keeps the window open until it resolves.
        if self.hold_start_ms.is_none() && now_ms.wrapping_sub(self.started_ms) >= self.window_ms {
            return BootStep::Expired;
        }
        BootStep::Waiting
    }
}

/// Run the window to completion.
///
/// `sample` returns `(button_down, console_ota)`; `idle` is called between
/// samples (sleep, LED refresh).
pub fn run_window(
    window: &mut BootWindow,
    mut now_ms: impl FnMut() -> u32,
    mut sample: impl FnMut() -> (bool, bool),
    mut idle: impl FnMut(u32),
) -> Option<BootTrigger> {
    info!("Type 'ota' or hold button 1 to enter update mode...");
    loop {
        let now = now_ms();
        let (button_down, console_ota) = sample();
        match window.step(now, button_down, console_ota) {
            BootStep::Waiting => idle(now),
            BootStep::Triggered(trigger) => {
                info!("Update mode triggered by {:?}", trigger);
                return Some(trigger);
            }
            BootStep::Expired => return None,
        }
    }
}
