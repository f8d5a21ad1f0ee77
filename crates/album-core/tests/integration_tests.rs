//! Integration tests for the album-core service.
//!
//! These drive [`AlbumService`] end to end: provisioning, login, messaging,
//! token lifecycle under a manual clock, and tamper handling.

use std::sync::Arc;

use album_core::{
    AlbumService, CoreConfig, CoreConfigBuilder, CoreError, CredentialParams, EnvelopeStore,
    ManualClock, MemoryEnvelopeStore, MessageEnvelope, SessionToken, UserId,
};

const START: u64 = 1_700_000_000;

struct Harness {
    service: AlbumService,
    clock: Arc<ManualClock>,
    store: Arc<MemoryEnvelopeStore>,
}

fn harness_with(config: CoreConfig) -> Harness {
    let clock = Arc::new(ManualClock::new(START));
    let store = Arc::new(MemoryEnvelopeStore::new());
    let service = AlbumService::with_components(config, store.clone(), clock.clone())
        .expect("Failed to create service");
    Harness {
        service,
        clock,
        store,
    }
}

fn harness() -> Harness {
    harness_with(CoreConfig::testing())
}

async fn provision(h: &Harness, users: &[&str]) {
    for user in users {
        h.service
            .register_user(user, format!("{user}-secret").as_bytes())
            .await
            .expect("Failed to register user");
    }
}

async fn login(h: &Harness, user: &str) -> SessionToken {
    h.service
        .login(user, format!("{user}-secret").as_bytes())
        .await
        .expect("Failed to log in")
}

// ============================================================================
// End-to-end scenario
// ============================================================================

mod scenario {
    use super::*;

    #[tokio::test]
    async fn test_register_login_send_receive_revoke() {
        let h = harness();
        provision(&h, &["alice", "bob"]).await;

        let alice = login(&h, "alice").await;
        let sent = h
            .service
            .send_message(&alice, "bob", b"hello bob")
            .await
            .unwrap();
        assert_eq!(sent.sender().as_str(), "alice");
        assert_eq!(sent.recipient().as_str(), "bob");
        assert_eq!(sent.sent_at(), START);

        let bob = login(&h, "bob").await;
        let inbox = h.service.receive_messages(&bob).await.unwrap();
        assert_eq!(inbox, vec![sent.clone()]);
        assert_eq!(
            h.service.open_message(&bob, &inbox[0]).await.unwrap(),
            b"hello bob"
        );

        // The sender cannot read what they sent.
        assert_eq!(
            h.service.open_message(&alice, &sent).await,
            Err(CoreError::RecipientMismatch)
        );

        h.service.revoke_token(&alice).await.unwrap();
        assert_eq!(
            h.service.send_message(&alice, "bob", b"again").await,
            Err(CoreError::TokenRevoked)
        );
        // Bob's session is unaffected.
        assert!(h.service.receive_messages(&bob).await.is_ok());
    }

    #[tokio::test]
    async fn test_stored_envelopes_are_ciphertext() {
        let h = harness();
        provision(&h, &["alice", "bob"]).await;
        let alice = login(&h, "alice").await;
        let plaintext = b"a rather distinctive plaintext string";
        h.service.send_message(&alice, "bob", plaintext).await.unwrap();

        let bob = UserId::new("bob").unwrap();
        let stored = h.store.list_for_recipient(&bob).await.unwrap();
        let bytes = stored[0].to_bytes().unwrap();
        assert!(!bytes
            .windows(plaintext.len())
            .any(|window| window == plaintext));
    }

    #[tokio::test]
    async fn test_inbox_in_send_order() {
        let h = harness();
        provision(&h, &["alice", "bob", "carol"]).await;
        let alice = login(&h, "alice").await;
        let carol = login(&h, "carol").await;

        h.service.send_message(&alice, "bob", b"one").await.unwrap();
        h.clock.advance(5);
        h.service.send_message(&carol, "bob", b"two").await.unwrap();
        h.clock.advance(5);
        h.service.send_message(&alice, "bob", b"three").await.unwrap();

        let bob = login(&h, "bob").await;
        let inbox = h.service.receive_messages(&bob).await.unwrap();
        let mut opened = Vec::new();
        for envelope in &inbox {
            opened.push(h.service.open_message(&bob, envelope).await.unwrap());
        }
        assert_eq!(opened, vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
        assert!(h.service.receive_messages(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_message() {
        let h = harness();
        provision(&h, &["alice", "bob"]).await;
        let alice = login(&h, "alice").await;
        let bob = login(&h, "bob").await;
        let sent = h.service.send_message(&alice, "bob", b"x").await.unwrap();

        // Only the recipient's mailbox holds it.
        assert!(!h.service.delete_message(&alice, sent.id()).await.unwrap());
        assert!(h.service.delete_message(&bob, sent.id()).await.unwrap());
        assert!(h.service.receive_messages(&bob).await.unwrap().is_empty());
    }
}

// ============================================================================
// Login
// ============================================================================

mod login {
    use super::*;

    #[tokio::test]
    async fn test_failures_are_indistinguishable() {
        let h = harness();
        provision(&h, &["alice"]).await;

        let wrong_secret = h.service.login("alice", b"nope").await;
        let unknown_user = h.service.login("mallory", b"alice-secret").await;
        let empty_secret = h.service.login("alice", b"").await;
        let bad_id = h.service.login("\u{0}", b"alice-secret").await;

        for outcome in [wrong_secret, unknown_user, empty_secret, bad_id] {
            assert_eq!(outcome, Err(CoreError::InvalidCredential));
        }
    }

    #[tokio::test]
    async fn test_tokens_for_same_instant_differ() {
        let h = harness();
        provision(&h, &["alice"]).await;
        let a = login(&h, "alice").await;
        let b = login(&h, "alice").await;
        assert_ne!(a, b);
        assert_eq!(a.issued_at(), b.issued_at());
    }

    #[tokio::test]
    async fn test_bearer_roundtrip_through_service() {
        let h = harness();
        provision(&h, &["alice"]).await;
        let token = login(&h, "alice").await;
        let bearer = token.to_bearer().unwrap();
        let parsed = SessionToken::from_bearer(&bearer).unwrap();
        assert!(h.service.receive_messages(&parsed).await.is_ok());
    }

    #[tokio::test]
    async fn test_change_secret_revokes_sessions() {
        let h = harness();
        provision(&h, &["alice"]).await;
        let first = login(&h, "alice").await;
        let second = login(&h, "alice").await;

        assert_eq!(
            h.service.change_secret(&first, b"wrong", b"new secret").await,
            Err(CoreError::InvalidCredential)
        );
        h.service
            .change_secret(&first, b"alice-secret", b"new secret")
            .await
            .unwrap();

        assert_eq!(
            h.service.receive_messages(&first).await,
            Err(CoreError::TokenRevoked)
        );
        assert_eq!(
            h.service.receive_messages(&second).await,
            Err(CoreError::TokenRevoked)
        );
        assert_eq!(
            h.service.login("alice", b"alice-secret").await,
            Err(CoreError::InvalidCredential)
        );
        let fresh = h.service.login("alice", b"new secret").await.unwrap();
        assert!(h.service.receive_messages(&fresh).await.is_ok());
    }
}

// ============================================================================
// Token lifecycle
// ============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn test_expiry_with_manual_clock() {
        let h = harness_with(
            CoreConfigBuilder::new()
                .with_in_memory_storage()
                .with_credential_params(CredentialParams::testing())
                .with_token_ttl(std::time::Duration::from_secs(60))
                .build(),
        );
        provision(&h, &["alice"]).await;
        let token = login(&h, "alice").await;
        assert_eq!(token.expires_at(), START + 60);

        h.clock.advance(59);
        assert!(h.service.receive_messages(&token).await.is_ok());

        h.clock.advance(1);
        let err = h.service.receive_messages(&token).await.unwrap_err();
        assert_eq!(err, CoreError::TokenExpired);
        assert!(err.is_recoverable());

        // Logging in again yields a working token.
        let renewed = login(&h, "alice").await;
        assert!(h.service.receive_messages(&renewed).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoked_stays_revoked() {
        let h = harness();
        provision(&h, &["alice"]).await;
        let token = login(&h, "alice").await;
        h.service.revoke_token(&token).await.unwrap();
        h.service.revoke_token(&token).await.unwrap();
        h.clock.advance(10_000);
        assert_eq!(
            h.service.receive_messages(&token).await,
            Err(CoreError::TokenRevoked)
        );
    }

    #[tokio::test]
    async fn test_foreign_token_unknown() {
        let ours = harness();
        let theirs = harness();
        provision(&ours, &["alice"]).await;
        provision(&theirs, &["alice"]).await;
        let foreign = login(&theirs, "alice").await;
        assert_eq!(
            ours.service.receive_messages(&foreign).await,
            Err(CoreError::TokenUnknown)
        );
    }

    #[tokio::test]
    async fn test_revocation_disabled() {
        let h = harness_with(
            CoreConfigBuilder::new()
                .with_in_memory_storage()
                .with_credential_params(CredentialParams::testing())
                .disable_revocation()
                .build(),
        );
        provision(&h, &["alice"]).await;
        let token = login(&h, "alice").await;
        assert_eq!(
            h.service.revoke_token(&token).await,
            Err(CoreError::RevocationDisabled)
        );
        assert!(h.service.receive_messages(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_purge_expired_tokens() {
        let h = harness();
        provision(&h, &["alice"]).await;
        let token = login(&h, "alice").await;
        h.clock.advance(h.service.config().auth.ttl_secs);
        assert_eq!(h.service.purge_expired_tokens().await.unwrap(), 1);
        assert_eq!(
            h.service.receive_messages(&token).await,
            Err(CoreError::TokenUnknown)
        );
    }
}

// ============================================================================
// Messaging failures
// ============================================================================

mod messaging {
    use super::*;

    async fn sent_to_bob(h: &Harness) -> (MessageEnvelope, SessionToken) {
        provision(h, &["alice", "bob", "eve"]).await;
        let alice = login(h, "alice").await;
        let envelope = h
            .service
            .send_message(&alice, "bob", b"for bob")
            .await
            .unwrap();
        (envelope, login(h, "bob").await)
    }

    #[tokio::test]
    async fn test_unknown_recipient() {
        let h = harness();
        provision(&h, &["alice"]).await;
        let alice = login(&h, "alice").await;
        assert_eq!(
            h.service.send_message(&alice, "ghost", b"x").await,
            Err(CoreError::UnknownIdentity("ghost".into()))
        );
        assert_eq!(h.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_payload_too_large_stores_nothing() {
        let h = harness_with(
            CoreConfigBuilder::new()
                .with_in_memory_storage()
                .with_credential_params(CredentialParams::testing())
                .with_max_plaintext_size(16)
                .build(),
        );
        provision(&h, &["alice", "bob"]).await;
        let alice = login(&h, "alice").await;
        assert_eq!(
            h.service.send_message(&alice, "bob", &[0u8; 17]).await,
            Err(CoreError::PayloadTooLarge { max: 16, actual: 17 })
        );
        assert_eq!(h.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_third_party_cannot_open() {
        let h = harness();
        let (envelope, _) = sent_to_bob(&h).await;
        let eve = login(&h, "eve").await;
        assert_eq!(
            h.service.open_message(&eve, &envelope).await,
            Err(CoreError::RecipientMismatch)
        );
    }

    #[tokio::test]
    async fn test_tampered_envelope_rejected() {
        let h = harness();
        let (envelope, bob) = sent_to_bob(&h).await;

        let mut bytes = envelope.to_bytes().unwrap();
        // Last byte belongs to the signature.
        let last = bytes.len() - 1;
        bytes[last] ^= 0x80;
        let tampered = MessageEnvelope::from_bytes(&bytes).unwrap();
        assert_eq!(
            h.service.open_message(&bob, &tampered).await,
            Err(CoreError::SignatureInvalid)
        );
    }

    #[tokio::test]
    async fn test_rekey_invalidates_old_envelopes() {
        let h = harness();
        let (envelope, bob) = sent_to_bob(&h).await;
        let before = h.service.lookup_public_keys("bob").await.unwrap();

        let after = h.service.rekey(&bob).await.unwrap();
        assert_ne!(before, after);
        assert_eq!(
            h.service.open_message(&bob, &envelope).await,
            Err(CoreError::DecryptionFailed)
        );

        let alice = login(&h, "alice").await;
        let fresh = h
            .service
            .send_message(&alice, "bob", b"after rekey")
            .await
            .unwrap();
        assert_eq!(
            h.service.open_message(&bob, &fresh).await.unwrap(),
            b"after rekey"
        );
    }

    #[tokio::test]
    async fn test_concurrent_senders() {
        let h = Arc::new(harness());
        provision(&h, &["bob", "u0", "u1", "u2", "u3"]).await;

        let mut tasks = Vec::new();
        for i in 0..4 {
            let h = Arc::clone(&h);
            tasks.push(tokio::spawn(async move {
                let user = format!("u{i}");
                let token = login(&h, &user).await;
                for n in 0..10 {
                    h.service
                        .send_message(&token, "bob", format!("{user}:{n}").as_bytes())
                        .await
                        .unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let bob = login(&h, "bob").await;
        let inbox = h.service.receive_messages(&bob).await.unwrap();
        assert_eq!(inbox.len(), 40);
        for envelope in &inbox {
            assert!(h.service.open_message(&bob, envelope).await.is_ok());
        }
    }
}

// ============================================================================
// Accounts
// ============================================================================

mod accounts {
    use super::*;
    use std::future::Future;
    use std::net::IpAddr;
    use std::time::Duration;

    use album_core::AccountStatus;

    /// Poll `check` until it holds, for up to five seconds.
    async fn eventually<F, Fut>(mut check: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        for _ in 0..500 {
            if check().await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_dropped_change_secret_completes() {
        let h = harness();
        provision(&h, &["alice"]).await;
        let token = login(&h, "alice").await;

        // Polled once, so the work is handed off, then dropped.
        let _ = tokio::time::timeout(
            Duration::ZERO,
            h.service.change_secret(&token, b"alice-secret", b"changed"),
        )
        .await;

        let (h, token) = (&h, &token);
        let revoked = eventually(move || async move {
            h.service.receive_messages(token).await == Err(CoreError::TokenRevoked)
        })
        .await;
        assert!(revoked);
        assert!(h.service.login("alice", b"changed").await.is_ok());
        assert_eq!(
            h.service.login("alice", b"alice-secret").await,
            Err(CoreError::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn test_dropped_register_completes() {
        let h = harness();
        provision(&h, &["bob"]).await;

        let _ = tokio::time::timeout(
            Duration::ZERO,
            h.service.register_user("alice", b"alice-secret"),
        )
        .await;

        let hr = &h;
        let registered =
            eventually(move || async move { hr.service.has_user("alice").await.unwrap() }).await;
        assert!(registered);

        assert_eq!(
            h.service.register_user("alice", b"other").await,
            Err(CoreError::DuplicateIdentity("alice".into()))
        );
        let alice = login(&h, "alice").await;
        h.service.send_message(&alice, "bob", b"hi").await.unwrap();
        let bob = login(&h, "bob").await;
        let envelope = h.service.send_message(&bob, "alice", b"hello").await.unwrap();
        assert_eq!(
            h.service.open_message(&alice, &envelope).await.unwrap(),
            b"hello"
        );
    }

    #[tokio::test]
    async fn test_failed_register_leaves_id_free() {
        let h = harness();
        assert!(matches!(
            h.service.register_user("alice", b"").await,
            Err(CoreError::InvalidRequest(_))
        ));
        assert!(!h.service.has_user("alice").await.unwrap());
        assert_eq!(
            h.service.lookup_public_keys("alice").await,
            Err(CoreError::UnknownIdentity("alice".into()))
        );

        provision(&h, &["alice"]).await;
        assert!(h.service.has_user("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_register_same_id() {
        let h = harness();
        let (a, b) = tokio::join!(
            h.service.register_user("alice", b"first"),
            h.service.register_user("alice", b"second"),
        );
        assert!(a.is_ok() != b.is_ok());
        assert!(matches!(
            a.and(b),
            Err(CoreError::DuplicateIdentity(id)) if id == "alice"
        ));
        assert!(h.service.has_user("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_deactivated_and_banned_cannot_log_in() {
        let h = harness();
        provision(&h, &["alice", "bob"]).await;
        let alice = login(&h, "alice").await;
        let bob = login(&h, "bob").await;

        h.service
            .set_account_status("alice", AccountStatus::Deactivated)
            .await
            .unwrap();
        h.service
            .set_account_status("bob", AccountStatus::Banned)
            .await
            .unwrap();

        for (user, token) in [("alice", &alice), ("bob", &bob)] {
            assert_eq!(
                h.service.receive_messages(token).await,
                Err(CoreError::TokenRevoked)
            );
            assert_eq!(
                h.service
                    .login(user, format!("{user}-secret").as_bytes())
                    .await,
                Err(CoreError::InvalidCredential)
            );
        }
        assert_eq!(
            h.service.account_status("bob").await.unwrap(),
            AccountStatus::Banned
        );

        h.service
            .set_account_status("alice", AccountStatus::Active)
            .await
            .unwrap();
        let again = login(&h, "alice").await;
        assert!(h.service.receive_messages(&again).await.is_ok());
        // Reactivation does not bring old sessions back.
        assert_eq!(
            h.service.receive_messages(&alice).await,
            Err(CoreError::TokenRevoked)
        );
    }

    #[tokio::test]
    async fn test_status_of_unknown_user() {
        let h = harness();
        assert_eq!(
            h.service
                .set_account_status("ghost", AccountStatus::Banned)
                .await,
            Err(CoreError::UnknownIdentity("ghost".into()))
        );
        assert_eq!(
            h.service.account_status("ghost").await,
            Err(CoreError::UnknownIdentity("ghost".into()))
        );
    }

    #[tokio::test]
    async fn test_login_history() {
        let h = harness();
        provision(&h, &["alice"]).await;
        let client: IpAddr = "198.51.100.4".parse().unwrap();

        h.service
            .login_from("alice", b"alice-secret", Some(client))
            .await
            .unwrap();
        h.clock.advance(30);
        assert!(h.service.login("alice", b"wrong").await.is_err());
        let token = login(&h, "alice").await;

        let history = h.service.login_history(&token).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].at, START);
        assert_eq!(history[0].client, Some(client));
        assert_eq!(history[1].at, START + 30);
        assert_eq!(history[1].client, None);
    }
}
