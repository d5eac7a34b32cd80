//! Inbound radio frame queue.
//!
//! The ESP-NOW receive callback runs in the Wi-Fi task, not the main loop.
//! It copies each raw frame into this lock-free queue and returns; the poll
//! loop drains the queue once per iteration and decodes frames there.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Wi-Fi task  │     │              │     │              │
//! │ recv cb     │────▶│  Frame Queue │────▶│  Main Loop   │
//! │ (producer)  │     │  (lock-free) │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use heapless::mpmc::Q16;

use crate::protocol::{MacAddr, MAX_FRAME_LEN};

/// One raw frame as received from the radio.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub src: MacAddr,
    len: u8,
    data: [u8; MAX_FRAME_LEN],
}

impl Frame {
    /// Copy `payload` into a frame. Oversized payloads are rejected.
    pub fn new(src: MacAddr, payload: &[u8]) -> Option<Self> {
        if payload.len() > MAX_FRAME_LEN {
            return None;
        }
        let mut data = [0u8; MAX_FRAME_LEN];
        data[..payload.len()].copy_from_slice(payload);
        Some(Self { src, len: payload.len() as u8, data })
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }
}

static INBOUND: Q16<Frame> = Q16::new();
static DROPPED: AtomicU32 = AtomicU32::new(0);

/// Queue a received frame. Safe to call from the Wi-Fi task.
/// Returns `false` if the frame was dropped (oversized or queue full).
pub fn push_frame(src: MacAddr, payload: &[u8]) -> bool {
    let queued = Frame::new(src, payload).is_some_and(|f| INBOUND.enqueue(f).is_ok());
    if !queued {
        DROPPED.fetch_add(1, Ordering::Relaxed);
    }
    queued
}

/// Pop the next frame. Main loop only.
pub fn pop_frame() -> Option<Frame> {
    INBOUND.dequeue()
}

/// Drain all pending frames into a callback, FIFO order.
pub fn drain_frames(mut handler: impl FnMut(Frame)) {
    while let Some(frame) = pop_frame() {
        handler(frame);
    }
}

/// Frames lost since boot.
pub fn dropped_frames() -> u32 {
    DROPPED.load(Ordering::Relaxed)
}
