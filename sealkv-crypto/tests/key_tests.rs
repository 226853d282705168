use sealkv_crypto::{CryptoError, DataKey, KdfParams, Salt};

fn test_params() -> KdfParams {
    KdfParams {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

// ── derive ───────────────────────────────────────────────────────

#[test]
fn derive_produces_consistent_results() {
    let salt = Salt::from_bytes([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]);
    let params = test_params();
    let key1 = DataKey::derive("test_password_123", &salt, &params).unwrap();
    let key2 = DataKey::derive("test_password_123", &salt, &params).unwrap();
    assert_eq!(key1.as_bytes(), key2.as_bytes());
}

#[test]
fn different_salts_produce_different_keys() {
    let params = test_params();
    let key1 = DataKey::derive("same", &Salt::from_bytes([1; 16]), &params).unwrap();
    let key2 = DataKey::derive("same", &Salt::from_bytes([2; 16]), &params).unwrap();
    assert_ne!(key1.as_bytes(), key2.as_bytes());
}

#[test]
fn derive_rejects_invalid_params() {
    let params = KdfParams {
        memory_cost: 1,
        time_cost: 0,
        parallelism: 0,
    };
    let err = DataKey::derive("pw", &Salt::random(), &params).unwrap_err();
    assert!(matches!(err, CryptoError::KeyDerivation(_)));
}

// ── generate / encodings ─────────────────────────────────────────

#[test]
fn generate_produces_unique_keys() {
    assert_ne!(DataKey::generate().as_bytes(), DataKey::generate().as_bytes());
}

#[test]
fn base64_roundtrip() {
    let key = DataKey::generate();
    let parsed = DataKey::from_base64(&key.to_base64()).unwrap();
    assert_eq!(parsed.as_bytes(), key.as_bytes());
}

#[test]
fn base64_ignores_surrounding_whitespace() {
    let key = DataKey::from_bytes([7u8; 32]);
    let parsed = DataKey::from_base64(&format!("  {}\n", key.to_base64())).unwrap();
    assert_eq!(parsed.as_bytes(), &[7u8; 32]);
}

#[test]
fn base64_invalid_fails() {
    let err = DataKey::from_base64("!!!not-base64!!!").unwrap_err();
    assert!(matches!(err, CryptoError::InvalidEncoding(_)));
}

#[test]
fn from_slice_checks_length() {
    let err = DataKey::from_slice(&[0u8; 16]).unwrap_err();
    assert!(matches!(
        err,
        CryptoError::InvalidKeyLength {
            expected: 32,
            actual: 16
        }
    ));
}

#[test]
fn key_debug_does_not_leak_bytes() {
    let key = DataKey::generate();
    let debug = format!("{:?}", key);
    assert!(debug.contains("REDACTED"));
    assert!(!debug.contains(&format!("{:?}", key.as_bytes())));
}

#[test]
fn random_salts_differ() {
    assert_ne!(Salt::random().as_bytes(), Salt::random().as_bytes());
}

#[test]
fn salt_base64_roundtrip() {
    let salt = Salt::random();
    let decoded = Salt::from_base64(&salt.to_base64()).unwrap();
    assert_eq!(decoded.as_bytes(), salt.as_bytes());
}

#[test]
fn salt_base64_checks_length() {
    let err = Salt::from_base64("dG9vLXNob3J0").unwrap_err();
    match err {
        CryptoError::InvalidEncoding(msg) => assert!(msg.contains("16 bytes"), "{msg}"),
        other => panic!("expected encoding error, got {other:?}"),
    }
    assert!(matches!(
        Salt::from_base64("not base64!"),
        Err(CryptoError::InvalidEncoding(_))
    ));
}
