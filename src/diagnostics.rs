//! Runtime diagnostics.
//!
//! Loop timing is sampled every iteration and reported by the `status`
//! console command together with a heap snapshot. Averages are computed
//! over the current reporting window and reset on [`LoopMetrics::take`].

use log::info;

/// Min / max / average loop duration over a reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopMetrics {
    min_us: u32,
    max_us: u32,
    total_us: u64,
    samples: u32,
}

impl Default for LoopMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopMetrics {
    pub const fn new() -> Self {
        Self {
            min_us: u32::MAX,
            max_us: 0,
            total_us: 0,
            samples: 0,
        }
    }

    /// Record one iteration.
    pub fn record(&mut self, elapsed_us: u32) {
        self.min_us = self.min_us.min(elapsed_us);
        self.max_us = self.max_us.max(elapsed_us);
        self.total_us += u64::from(elapsed_us);
        self.samples = self.samples.saturating_add(1);
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// `(min, max, avg)` in microseconds, `None` before the first sample.
    pub fn summary(&self) -> Option<(u32, u32, u32)> {
        if self.samples == 0 {
            return None;
        }
        let avg = (self.total_us / u64::from(self.samples)) as u32;
        Some((self.min_us, self.max_us, avg))
    }

    /// Return the current window and start a new one.
    pub fn take(&mut self) -> Self {
        core::mem::take(self)
    }

    pub fn log(&self) {
        match self.summary() {
            Some((min, max, avg)) => info!(
                "Loop: {} samples, min {} us, max {} us, avg {} us",
                self.samples, min, max, avg
            ),
            None => info!("Loop: no samples yet"),
        }
    }
}

/// Heap snapshot for the status report.
#[derive(Debug, Clone, Copy)]
pub struct HeapStats {
    pub free: u32,
    pub min_free: u32,
}

impl HeapStats {
    #[cfg(target_os = "espidf")]
    pub fn collect() -> Self {
        use esp_idf_svc::sys::*;
        // SAFETY: plain reads of allocator counters.
        let (free, min_free) = unsafe { (esp_get_free_heap_size(), esp_get_minimum_free_heap_size()) };
        Self { free, min_free }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn collect() -> Self {
        Self {
            free: 300 * 1024,
            min_free: 256 * 1024,
        }
    }

    pub fn log(&self) {
        info!("Heap: {} bytes free, {} minimum", self.free, self.min_free);
    }
}
