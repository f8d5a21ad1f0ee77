//! Property-based tests for session tokens.

use std::sync::Arc;

use proptest::prelude::*;

use album_identity::UserId;

use crate::{
    AuthConfig, AuthError, ManualClock, SessionToken, TokenKey, TokenRegistry, TokenValidator,
};

fn validator_for(key: Arc<TokenKey>, clock: Arc<ManualClock>) -> TokenValidator {
    TokenValidator::new(key, Arc::new(TokenRegistry::new()), clock, &AuthConfig::default())
}

proptest! {
    /// A token is valid exactly while `now < expires_at`.
    #[test]
    fn expiry_boundary(start in 0u64..1u64 << 40, ttl in 1u64..100_000, offset in 0u64..200_000) {
        let key = Arc::new(TokenKey::generate());
        let registry = Arc::new(TokenRegistry::new());
        let clock = Arc::new(ManualClock::new(start));
        let config = AuthConfig::default().with_ttl_secs(ttl);
        let issuer = crate::TokenIssuer::new(key.clone(), registry.clone(), clock.clone(), &config);
        let validator = TokenValidator::new(key, registry, clock.clone(), &config);

        let credentials = crate::CredentialStore::new(crate::CredentialParams::testing()).unwrap();
        let alice = UserId::new("alice").unwrap();
        credentials.enroll(&alice, b"pw").unwrap();
        let crate::Verification::Verified(login) = credentials.verify("alice", b"pw").unwrap() else {
            panic!("login failed");
        };
        let token = issuer.issue(&login).unwrap();

        clock.advance(offset);
        let result = validator.validate(&token);
        if offset < ttl {
            prop_assert_eq!(result, Ok(alice));
        } else {
            prop_assert_eq!(result, Err(AuthError::TokenExpired));
        }
    }

    /// Arbitrary bearer strings never decode into a token this service accepts.
    #[test]
    fn arbitrary_bearer_is_never_valid(bearer in "[0-9a-f]{0,600}") {
        let key = Arc::new(TokenKey::generate());
        let validator = validator_for(key, Arc::new(ManualClock::new(0)));
        if let Ok(token) = SessionToken::from_bearer(&bearer) {
            prop_assert_eq!(validator.validate(&token), Err(AuthError::TokenUnknown));
        }
    }

    /// Bearer decoding never panics on arbitrary text.
    #[test]
    fn bearer_parse_total(bearer in ".{0,2048}") {
        let _ = SessionToken::from_bearer(&bearer);
    }
}
