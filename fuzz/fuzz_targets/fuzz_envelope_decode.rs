//! Fuzz target for MessageEnvelope::from_bytes.
//!
//! Decoding arbitrary bytes must never panic, and anything that decodes must
//! re-encode to an envelope that decodes identically.

#![no_main]

use album_protocol::{MessageEnvelope, MAX_ENVELOPE_SIZE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(envelope) = MessageEnvelope::from_bytes(data) {
        assert!(data.len() <= MAX_ENVELOPE_SIZE);

        let bytes = envelope.to_bytes().unwrap();
        let again = MessageEnvelope::from_bytes(&bytes).unwrap();
        assert_eq!(envelope, again);
    }
});
