use std::time::Duration;

use kuvert::{EnvelopeOrchestrator, error::ErrorKind, utils::time::ManualClock};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use super::utils::{client_config, server_config};

// 2026-03-01T12:00:00.000Z
const SENT_AT_MS: i64 = 1_772_366_400_000;

fn pair(clock: &ManualClock) -> (EnvelopeOrchestrator, EnvelopeOrchestrator) {
    let server = EnvelopeOrchestrator::builder(server_config())
        .with_clock(clock.clone())
        .build();
    let client = EnvelopeOrchestrator::builder(client_config())
        .with_clock(clock.clone())
        .build();
    (server, client)
}

#[tokio::test]
async fn fresh_envelope_verifies_immediately() {
    let clock = ManualClock::new(SENT_AT_MS);
    let (server, client) = pair(&clock);

    let envelope = assert_ok!(server.encrypt(&json!({"amount": 100})).await);
    let verified = assert_ok!(client.decrypt(&envelope).await);
    assert_eq!(verified.header.exp, SENT_AT_MS / 1000 + 5 * 60);
}

#[tokio::test]
async fn envelope_expires_after_validity_window() {
    let clock = ManualClock::new(SENT_AT_MS);
    let (server, client) = pair(&clock);
    let envelope = assert_ok!(server.encrypt(&json!({"amount": 100})).await);

    clock.advance(Duration::from_secs(5 * 60));
    assert_ok!(client.decrypt(&envelope).await);

    clock.advance(Duration::from_secs(1));
    let err = assert_err!(client.decrypt(&envelope).await);
    assert_eq!(err.kind(), ErrorKind::SignatureExpired);
    assert_eq!(err.subject(), Some("server-sig-2026"));
}

#[tokio::test]
async fn validity_window_is_configurable() {
    let clock = ManualClock::new(SENT_AT_MS);
    let server = EnvelopeOrchestrator::builder(server_config().with_signature_validity_minutes(1))
        .with_clock(clock.clone())
        .build();
    let client = EnvelopeOrchestrator::builder(client_config())
        .with_clock(clock.clone())
        .build();

    let envelope = assert_ok!(server.encrypt(&json!({"amount": 100})).await);
    clock.advance(Duration::from_secs(61));
    let err = assert_err!(client.decrypt(&envelope).await);
    assert_eq!(err.kind(), ErrorKind::SignatureExpired);
}

#[tokio::test]
async fn receiver_clock_decides_expiry() {
    let sender_clock = ManualClock::new(SENT_AT_MS - 10 * 60 * 1000);
    let receiver_clock = ManualClock::new(SENT_AT_MS);
    let server = EnvelopeOrchestrator::builder(server_config())
        .with_clock(sender_clock)
        .build();
    let client = EnvelopeOrchestrator::builder(client_config())
        .with_clock(receiver_clock)
        .build();

    let envelope = assert_ok!(server.encrypt(&json!({"amount": 100})).await);
    let err = assert_err!(client.decrypt(&envelope).await);
    assert_eq!(err.kind(), ErrorKind::SignatureExpired);
}
