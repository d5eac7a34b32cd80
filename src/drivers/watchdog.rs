//! Task watchdog for the poll loop.
//!
//! The main task subscribes to the ESP-IDF TWDT and feeds it once per
//! loop iteration, including the boot window and update-mode waits. A
//! loop that stalls past the timeout panics and reboots the board with
//! every relay released.

use log::{info, warn};

/// Stall tolerance. Far above the worst loop iteration.
pub const WATCHDOG_TIMEOUT_MS: u32 = 5_000;

pub struct LoopWatchdog {
    armed: bool,
}

impl LoopWatchdog {
    /// Subscribe the calling task.
    #[cfg(target_os = "espidf")]
    pub fn subscribe(timeout_ms: u32) -> Self {
        use esp_idf_svc::sys::{esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure, ESP_OK};

        let cfg = esp_task_wdt_config_t {
            timeout_ms,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        // SAFETY: called once from the main task; a null handle means "this task".
        let armed = unsafe {
            if esp_task_wdt_reconfigure(&cfg) != ESP_OK as i32 {
                warn!("Watchdog: keeping the existing TWDT configuration");
            }
            esp_task_wdt_add(core::ptr::null_mut()) == ESP_OK as i32
        };
        if armed {
            info!("Watchdog: main loop subscribed ({} ms)", timeout_ms);
        } else {
            warn!("Watchdog: subscribe failed, loop stalls go undetected");
        }
        Self { armed }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn subscribe(timeout_ms: u32) -> Self {
        info!("Watchdog(sim): {} ms, never fires", timeout_ms);
        Self { armed: false }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.armed {
            // SAFETY: the task subscribed in `subscribe`.
            unsafe {
                esp_idf_svc::sys::esp_task_wdt_reset();
            }
        }
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn host_watchdog_is_inert() {
        let wd = LoopWatchdog::subscribe(WATCHDOG_TIMEOUT_MS);
        assert!(!wd.is_armed());
        wd.feed();
    }
}
