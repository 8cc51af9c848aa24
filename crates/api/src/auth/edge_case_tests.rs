// Test file - these are expected patterns in test code
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Edge case tests for the token codec and session store semantics:
//! expiry boundaries, secret separation, tampering, and activation codes.

#[cfg(test)]
mod token_edge_cases {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    use crate::auth::tokens::{PendingRegistration, TokenCodec, TokenError, TokenKind};
    use crate::testing;

    fn codec() -> TokenCodec {
        TokenCodec::from_config(&testing::test_config())
    }

    fn pending() -> PendingRegistration {
        PendingRegistration {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "pw123456".to_string(),
        }
    }

    /// Mirror of the private session claim layout, for crafting tokens the
    /// codec did not issue.
    #[derive(Serialize)]
    struct CraftedSessionClaims {
        sub: Uuid,
        exp: i64,
    }

    #[derive(Serialize)]
    struct CraftedActivationClaims {
        user: PendingRegistration,
        activation_code: String,
        exp: i64,
    }

    fn past_exp() -> i64 {
        // Beyond the verifier's default 60-second leeway.
        (OffsetDateTime::now_utc() - Duration::minutes(2)).unix_timestamp()
    }

    #[test]
    fn activation_code_is_always_four_digits() {
        let codec = codec();
        for _ in 0..100 {
            let minted = codec.sign_activation(&pending()).unwrap();
            let code: u32 = minted.activation_code.parse().unwrap();
            assert!((1000..=9999).contains(&code), "bad code {code}");
        }
    }

    #[test]
    fn expired_activation_token_is_rejected() {
        let claims = CraftedActivationClaims {
            user: pending(),
            activation_code: "1234".to_string(),
            exp: past_exp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("activation-secret-for-tests".as_bytes()),
        )
        .unwrap();

        let err = codec().verify_activation(&token).unwrap_err();
        assert!(matches!(err, TokenError::InvalidOrExpired));
    }

    #[test]
    fn expired_session_token_is_rejected() {
        let claims = CraftedSessionClaims {
            sub: Uuid::new_v4(),
            exp: past_exp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("access-secret-for-tests".as_bytes()),
        )
        .unwrap();

        let err = codec()
            .verify_session(&token, TokenKind::Access)
            .unwrap_err();
        assert!(matches!(err, TokenError::InvalidOrExpired));
    }

    #[test]
    fn access_and_refresh_secrets_are_disjoint() {
        let codec = codec();
        let user_id = Uuid::new_v4();

        let access = codec.sign_session(user_id, TokenKind::Access).unwrap();
        let refresh = codec.sign_session(user_id, TokenKind::Refresh).unwrap();

        assert!(codec.verify_session(&access, TokenKind::Refresh).is_err());
        assert!(codec.verify_session(&refresh, TokenKind::Access).is_err());
    }

    #[test]
    fn activation_tokens_never_verify_as_session_tokens() {
        let codec = codec();
        let minted = codec.sign_activation(&pending()).unwrap();

        assert!(codec
            .verify_session(&minted.token, TokenKind::Access)
            .is_err());
        assert!(codec
            .verify_session(&minted.token, TokenKind::Refresh)
            .is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let codec = codec();
        let token = codec
            .sign_session(Uuid::new_v4(), TokenKind::Access)
            .unwrap();

        // Flip a character in the payload segment.
        let mut tampered: Vec<char> = token.chars().collect();
        let mid = token.len() / 2;
        tampered[mid] = if tampered[mid] == 'A' { 'B' } else { 'A' };
        let tampered: String = tampered.into_iter().collect();

        assert!(codec.verify_session(&tampered, TokenKind::Access).is_err());
    }

    #[test]
    fn signature_failure_and_expiry_collapse_to_one_error() {
        let codec = codec();

        let garbage = codec.verify_activation("definitely.not.a-token").unwrap_err();
        assert!(matches!(garbage, TokenError::InvalidOrExpired));

        let wrong_secret = encode(
            &Header::default(),
            &CraftedActivationClaims {
                user: pending(),
                activation_code: "1234".to_string(),
                exp: (OffsetDateTime::now_utc() + Duration::minutes(5)).unix_timestamp(),
            },
            &EncodingKey::from_secret("some-other-secret".as_bytes()),
        )
        .unwrap();
        let err = codec.verify_activation(&wrong_secret).unwrap_err();
        assert!(matches!(err, TokenError::InvalidOrExpired));
    }
}

#[cfg(test)]
mod session_store_edge_cases {
    use uuid::Uuid;

    use crate::auth::sessions::SessionStore;
    use crate::testing::{self, MemorySessionStore};

    #[tokio::test]
    async fn put_overwrites_unconditionally() {
        let store = MemorySessionStore::new();
        let user = testing::user_fixture("ada@example.com");

        store.put(user.id, &user.to_public()).await.unwrap();

        let mut renamed = user.clone();
        renamed.name = "Grace".to_string();
        store.put(user.id, &renamed.to_public()).await.unwrap();

        let snapshot = store.get(user.id).await.unwrap().unwrap();
        assert_eq!(snapshot.name, "Grace");
    }

    #[tokio::test]
    async fn get_of_absent_key_is_none() {
        let store = MemorySessionStore::new();
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemorySessionStore::new();
        let user = testing::user_fixture("ada@example.com");

        store.put(user.id, &user.to_public()).await.unwrap();
        store.delete(user.id).await.unwrap();
        // Deleting an absent key is not an error.
        store.delete(user.id).await.unwrap();

        assert!(store.get(user.id).await.unwrap().is_none());
    }
}
