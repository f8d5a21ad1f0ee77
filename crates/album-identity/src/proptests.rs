//! Property-based tests for identity handling.

use proptest::prelude::*;

use album_crypto::seal;

use crate::{IdentityError, KeyStore, UserId, MAX_USER_ID_LEN};

fn user_id_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9_.@-]{1,64}"
}

proptest! {
    /// Every well-formed id is accepted and displays as itself.
    #[test]
    fn valid_user_ids_roundtrip(raw in user_id_strategy()) {
        let id = UserId::new(raw.clone()).unwrap();
        prop_assert_eq!(id.as_str(), raw.as_str());
        prop_assert_eq!(id.to_string(), raw);
    }

    /// Ids longer than the limit are rejected.
    #[test]
    fn overlong_user_ids_rejected(extra in 1usize..64) {
        let raw = "a".repeat(MAX_USER_ID_LEN + extra);
        let rejected = matches!(UserId::new(raw), Err(IdentityError::InvalidUserId { .. }));
        prop_assert!(rejected);
    }

    /// Registering the same id twice always fails and keeps the first keys.
    #[test]
    fn duplicate_registration_rejected(raw in user_id_strategy()) {
        let store = KeyStore::new();
        let id = UserId::new(raw).unwrap();
        let first = store.register(&id).unwrap();
        prop_assert!(matches!(store.register(&id), Err(IdentityError::DuplicateIdentity(_))));
        prop_assert_eq!(store.lookup_public_keys(&id).unwrap(), first);
    }

    /// Data sealed to a user's published key opens with their private key.
    #[test]
    fn sealed_to_published_key_opens(plaintext in prop::collection::vec(any::<u8>(), 0..512)) {
        let store = KeyStore::new();
        let id = UserId::new("recipient").unwrap();
        let keys = store.register(&id).unwrap();
        let sealed = seal(&keys.exchange, &plaintext, b"").unwrap();
        prop_assert_eq!(store.decrypt_with_private_key(&id, &sealed, b"").unwrap(), plaintext);
    }
}
