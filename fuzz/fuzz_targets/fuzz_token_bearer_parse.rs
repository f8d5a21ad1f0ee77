//! Fuzz target for SessionToken::from_bearer.
//!
//! Parsing must be total, and a parsed token must survive a bearer roundtrip.

#![no_main]

use album_auth::{SessionToken, MAX_BEARER_LEN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(token) = SessionToken::from_bearer(s) {
            assert!(s.len() <= MAX_BEARER_LEN);

            let bearer = token.to_bearer().unwrap();
            assert_eq!(SessionToken::from_bearer(&bearer).unwrap(), token);
        }
    }
});
