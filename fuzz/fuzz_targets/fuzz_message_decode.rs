//! Fuzz target: `Message::decode`
//!
//! Every ESP-NOW frame from the air goes through the decoder before any
//! trust check. It must never panic, and anything it accepts must encode
//! back into a single frame.
//!
//! cargo fuzz run fuzz_message_decode

#![no_main]

use ampswitch::protocol::{Message, MAX_FRAME_LEN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = Message::decode(data) {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let bytes = message.encode(&mut buf).expect("decoded message must re-encode");
        assert_eq!(Message::decode(bytes).ok(), Some(message));
    }
});
