//! Fuzz target for UserId validation.

#![no_main]

use album_identity::UserId;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(id) = UserId::new(s) {
            assert_eq!(id.as_str(), s);
            assert!(!s.is_empty());
            assert!(UserId::new(id.as_str()).is_ok());
        }
    }
});
