use kuvert::{
    EncryptionCodec, EnvelopeOrchestrator,
    crypto::jose::{JWA, JWEEncryption, JWKSet, segment},
    error::ErrorKind,
};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use super::utils::{RecordingClient, client_config, fixture, server_config};

#[tokio::test]
async fn server_envelope_opens_on_client() {
    let server = EnvelopeOrchestrator::new(server_config());
    let client = EnvelopeOrchestrator::new(client_config());

    let envelope = assert_ok!(server.encrypt(&json!({"amount": 100})).await);
    let verified = assert_ok!(client.decrypt(&envelope).await);

    assert_eq!(verified.payload, json!({"amount": 100}));
    assert_eq!(verified.header.kid.as_deref(), Some("server-sig-2026"));
    assert_eq!(verified.header.alg, JWA::RS256);
    assert_eq!(verified.header.crit, Some(vec!["exp".to_owned()]));
}

#[tokio::test]
async fn client_envelope_opens_on_server_with_remote_keys_over_http() {
    let http = RecordingClient::new()
        .with_route(
            "https://server.example/jwks.json",
            200,
            fixture("server.public.json"),
        )
        .with_route(
            "https://client.example/jwks.json",
            200,
            fixture("client.public.json"),
        );

    let client = EnvelopeOrchestrator::builder(
        client_config().with_remote_key_set("https://server.example/jwks.json"),
    )
    .with_http_client(http.clone())
    .build();
    let server = EnvelopeOrchestrator::builder(
        server_config().with_remote_key_set("https://client.example/jwks.json"),
    )
    .with_http_client(http.clone())
    .build();

    let envelope = assert_ok!(client.encrypt(&json!({"order": "A-17", "lines": [1, 2, 3]})).await);
    let verified = assert_ok!(server.decrypt(&envelope).await);

    assert_eq!(verified.payload, json!({"order": "A-17", "lines": [1, 2, 3]}));
    assert_eq!(verified.header.kid.as_deref(), Some("client-sig-2026"));
    assert_eq!(
        http.requests(),
        [
            "https://server.example/jwks.json",
            "https://client.example/jwks.json"
        ]
    );
}

#[tokio::test]
async fn envelope_is_a_jwe_wrapping_a_jws() {
    let client = EnvelopeOrchestrator::new(client_config());
    let envelope = assert_ok!(client.encrypt(&json!({"amount": 100})).await);

    assert_eq!(envelope.split('.').count(), 5);
    let header: serde_json::Value =
        assert_ok!(assert_ok!(segment::peek_protected_header(&envelope)).decode());
    assert_eq!(
        header,
        json!({"alg": "RSA-OAEP-256", "enc": "A256CBC-HS512", "kid": "server-enc-2026"})
    );

    let server_keys = assert_ok!(JWKSet::from_json_slice(fixture("server.private.json").as_bytes()));
    let decryption_key = server_keys.find_by_algorithm("RSA-OAEP-256").unwrap();
    let jws = assert_ok!(EncryptionCodec::new().decrypt(&envelope, decryption_key));
    let jws = String::from_utf8(jws).unwrap();

    assert_eq!(jws.split('.').count(), 3);
    let header: serde_json::Value =
        assert_ok!(assert_ok!(segment::peek_protected_header(&jws)).decode());
    assert_eq!(header["alg"], "RS256");
    assert_eq!(header["kid"], "client-sig-2026");
    assert_eq!(header["crit"], json!(["exp"]));
    assert!(header["exp"].is_i64());
}

#[tokio::test]
async fn every_call_produces_a_fresh_envelope() {
    let client = EnvelopeOrchestrator::new(client_config());
    let first = assert_ok!(client.encrypt(&json!({"amount": 100})).await);
    let second = assert_ok!(client.encrypt(&json!({"amount": 100})).await);
    assert_ne!(first, second);
}

#[tokio::test]
async fn gcm_content_encryption() {
    let server = EnvelopeOrchestrator::new(
        server_config().with_encryption_method(JWEEncryption::A256Gcm),
    );
    let client = EnvelopeOrchestrator::new(
        client_config().with_encryption_method(JWEEncryption::A256Gcm),
    );

    let envelope = assert_ok!(server.encrypt("plain string payload").await);
    let header = assert_ok!(segment::peek_protected_header(&envelope));
    assert_eq!(header.get("enc"), Some(&json!("A256GCM")));

    let verified = assert_ok!(client.decrypt(&envelope).await);
    assert_eq!(verified.payload, json!("plain string payload"));
}

#[tokio::test]
async fn sender_cannot_open_its_own_envelope() {
    let client = EnvelopeOrchestrator::new(client_config());
    let envelope = assert_ok!(client.encrypt(&json!({"amount": 100})).await);

    let err = assert_err!(client.decrypt(&envelope).await);
    assert_eq!(err.kind(), ErrorKind::DecryptionFailed);
    assert_eq!(err.subject(), Some("client-enc-2026"));
}

#[tokio::test]
async fn orchestrator_is_shared_across_tasks() {
    let server = EnvelopeOrchestrator::new(server_config());
    let client = EnvelopeOrchestrator::new(client_config());

    let mut handles = Vec::new();
    for amount in 0..8 {
        let server = server.clone();
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let envelope = server.encrypt(&json!({"amount": amount})).await.unwrap();
            client.decrypt(&envelope).await
        }));
    }

    for (amount, handle) in handles.into_iter().enumerate() {
        let verified = assert_ok!(handle.await.unwrap());
        assert_eq!(verified.payload, json!({"amount": amount}));
    }
}
