use kuvert::{
    EnvelopeConfig, EnvelopeOrchestrator, KeyStoreState, crypto::jose::JWA, error::ErrorKind,
};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use super::utils::{RecordingClient, client_config, fixture, fixture_path, server_config};

#[tokio::test]
async fn ecdsa_only_local_keys_cannot_sign_rs256() {
    let client = EnvelopeOrchestrator::new(
        client_config().with_local_key_set(fixture_path("ecdsa-only.private.json")),
    );

    let err = assert_err!(client.encrypt(&json!({"amount": 100})).await);
    assert_eq!(err.kind(), ErrorKind::AlgorithmNotProvisioned);
    assert_eq!(err.subject(), Some("RS256"));
    assert!(!err.kind().is_cryptographic());
}

#[tokio::test]
async fn remote_without_encryption_key_is_not_provisioned() {
    let client = EnvelopeOrchestrator::new(
        client_config().with_remote_key_set(fixture_path("ecdsa-only.public.json")),
    );

    let err = assert_err!(client.encrypt(&json!({"amount": 100})).await);
    assert_eq!(err.kind(), ErrorKind::AlgorithmNotProvisioned);
    assert_eq!(err.subject(), Some("RSA-OAEP-256"));
}

#[tokio::test]
async fn local_without_decryption_key_is_not_provisioned() {
    let server = EnvelopeOrchestrator::new(server_config());
    let envelope = assert_ok!(server.encrypt(&json!({"amount": 100})).await);

    let client = EnvelopeOrchestrator::new(
        client_config().with_local_key_set(fixture_path("ecdsa-only.private.json")),
    );
    let err = assert_err!(client.decrypt(&envelope).await);
    assert_eq!(err.kind(), ErrorKind::AlgorithmNotProvisioned);
    assert_eq!(err.subject(), Some("RSA-OAEP-256"));
}

#[tokio::test]
async fn es256_signatures_when_configured() {
    let edge = EnvelopeOrchestrator::new(
        EnvelopeConfig::new(
            fixture_path("ecdsa-only.private.json"),
            fixture_path("server.public.json"),
        )
        .with_signing_algorithm(JWA::ES256),
    );
    let server = EnvelopeOrchestrator::new(
        EnvelopeConfig::new(
            fixture_path("server.private.json"),
            fixture_path("ecdsa-only.public.json"),
        )
        .with_signing_algorithm(JWA::ES256),
    );

    let envelope = assert_ok!(edge.encrypt(&json!({"reading": 21.5})).await);
    let verified = assert_ok!(server.decrypt(&envelope).await);
    assert_eq!(verified.payload, json!({"reading": 21.5}));
    assert_eq!(verified.header.alg, JWA::ES256);
    assert_eq!(verified.header.kid.as_deref(), Some("edge-sig-2026"));
}

#[tokio::test]
async fn malformed_key_set_over_http() {
    let http = RecordingClient::new().with_route(
        "https://server.example/jwks.json",
        200,
        "<html><body>maintenance</body></html>",
    );
    let client = EnvelopeOrchestrator::builder(
        client_config().with_remote_key_set("https://server.example/jwks.json"),
    )
    .with_http_client(http)
    .build();

    let err = assert_err!(client.encrypt(&json!({"amount": 100})).await);
    assert_eq!(err.kind(), ErrorKind::MalformedKeySet);
    assert_eq!(client.local_state(), KeyStoreState::Ready);
    assert_eq!(client.remote_state(), KeyStoreState::Uninitialized);
}

#[tokio::test]
async fn key_set_with_unknown_key_type_is_malformed() {
    let mut document: serde_json::Value = serde_json::from_str(&fixture("server.public.json")).unwrap();
    document["keys"]
        .as_array_mut()
        .unwrap()
        .push(json!({"kty": "OKP", "crv": "Ed25519", "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"}));

    let http = RecordingClient::new().with_route(
        "https://server.example/jwks.json",
        200,
        document.to_string(),
    );
    let client = EnvelopeOrchestrator::builder(
        client_config().with_remote_key_set("https://server.example/jwks.json"),
    )
    .with_http_client(http)
    .build();

    let err = assert_err!(client.warm_up().await);
    assert_eq!(err.kind(), ErrorKind::MalformedKeySet);
}

#[tokio::test]
async fn unreadable_key_set_is_unavailable() {
    let missing = fixture_path("does-not-exist.json");
    let client = EnvelopeOrchestrator::new(client_config().with_local_key_set(missing.as_str()));

    let err = assert_err!(client.encrypt(&json!({"amount": 100})).await);
    assert_eq!(err.kind(), ErrorKind::KeySourceUnavailable);
    assert_eq!(err.subject(), Some(missing.as_str()));
}
