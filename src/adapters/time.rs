//! Monotonic time source.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side simulation.
//!
//! The core works in wrapping `u32` milliseconds; [`Clock::now_ms`]
//! truncates, so every comparison downstream uses `wrapping_sub`.

pub struct Clock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot.
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot.
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Milliseconds since boot, wrapping every ~49.7 days.
    pub fn now_ms(&self) -> u32 {
        (self.uptime_us() / 1_000) as u32
    }
}
