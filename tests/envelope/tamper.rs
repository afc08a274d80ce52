use kuvert::{
    EncryptionCodec, EnvelopeOrchestrator, SignatureCodec,
    crypto::jose::{JWEAlgorithm, JWEEncryption, JWK, JWKSet},
    error::ErrorKind,
};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use super::utils::{client_config, fixture, server_config};

fn key(set: &str, alg: &str) -> JWK {
    JWKSet::from_json_slice(fixture(set).as_bytes())
        .unwrap()
        .find_by_algorithm(alg)
        .unwrap()
        .clone()
}

/// Swap one base64url character of segment `index`.
fn flip(envelope: &str, index: usize) -> String {
    let mut segments: Vec<String> = envelope.split('.').map(ToOwned::to_owned).collect();
    let mut bytes = segments[index].clone().into_bytes();
    let at = bytes.len() / 2;
    bytes[at] = if bytes[at] == b'A' { b'B' } else { b'A' };
    segments[index] = String::from_utf8(bytes).unwrap();
    segments.join(".")
}

/// Encrypt a hand-made JWS for the client, as the server would.
fn seal_for_client(jws: &str) -> String {
    assert_ok!(EncryptionCodec::new().encrypt(
        jws.as_bytes(),
        &key("client.public.json", "RSA-OAEP-256"),
        JWEAlgorithm::RsaOaep256,
        JWEEncryption::A256CbcHs512,
    ))
    .into_string()
}

#[tokio::test]
async fn flipped_ciphertext_fails_decryption() {
    let server = EnvelopeOrchestrator::new(server_config());
    let client = EnvelopeOrchestrator::new(client_config());
    let envelope = assert_ok!(server.encrypt(&json!({"amount": 100})).await);

    for index in [2, 3, 4] {
        let err = assert_err!(client.decrypt(&flip(&envelope, index)).await);
        assert_eq!(err.kind(), ErrorKind::DecryptionFailed, "segment {index}");
        assert_eq!(err.subject(), Some("client-enc-2026"));
    }
}

#[tokio::test]
async fn flipped_protected_header_fails_decryption() {
    let server = EnvelopeOrchestrator::new(server_config());
    let client = EnvelopeOrchestrator::new(client_config());
    let envelope = assert_ok!(server.encrypt(&json!({"amount": 100})).await);

    let err = assert_err!(client.decrypt(&flip(&envelope, 0)).await);
    assert_eq!(err.kind(), ErrorKind::DecryptionFailed);
}

#[tokio::test]
async fn flipped_signature_fails_verification() {
    let jws = assert_ok!(SignatureCodec::new().sign(
        &json!({"amount": 100}),
        &key("server.private.json", "RS256"),
        5
    ))
    .into_string();
    let envelope = seal_for_client(&flip(&jws, 2));

    let client = EnvelopeOrchestrator::new(client_config());
    let err = assert_err!(client.decrypt(&envelope).await);
    assert_eq!(err.kind(), ErrorKind::SignatureInvalid);
    assert_eq!(err.subject(), Some("server-sig-2026"));
}

#[tokio::test]
async fn signature_by_another_party_fails_verification() {
    // the client's own key, not the server's
    let jws = assert_ok!(SignatureCodec::new().sign(
        &json!({"amount": 1_000_000}),
        &key("client.private.json", "RS256"),
        5
    ))
    .into_string();
    let envelope = seal_for_client(&jws);

    let client = EnvelopeOrchestrator::new(client_config());
    let err = assert_err!(client.decrypt(&envelope).await);
    assert_eq!(err.kind(), ErrorKind::SignatureInvalid);
}

#[tokio::test]
async fn plaintext_that_is_not_a_jws_fails_verification() {
    let client = EnvelopeOrchestrator::new(client_config());
    for plaintext in ["{\"amount\":100}", "a.b.c", "\u{0}\u{1}"] {
        let err = assert_err!(client.decrypt(&seal_for_client(plaintext)).await);
        assert_eq!(err.kind(), ErrorKind::SignatureInvalid, "{plaintext:?}");
    }
}

#[tokio::test]
async fn garbage_envelopes_fail_decryption() {
    let client = EnvelopeOrchestrator::new(client_config());
    for envelope in ["", "not-an-envelope", "a.b.c", "a.b.c.d.e.f"] {
        let err = assert_err!(client.decrypt(envelope).await);
        assert_eq!(err.kind(), ErrorKind::DecryptionFailed, "{envelope:?}");
    }
}
