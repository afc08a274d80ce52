use kuvert::{EnvelopeOrchestrator, KeyStoreState, error::ErrorKind};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use super::utils::{RecordingClient, client_config, fixture};

const LOCAL: &str = "https://vault.example/client.private.json";
const REMOTE: &str = "https://server.example/jwks.json";

fn served_client() -> (RecordingClient, EnvelopeOrchestrator<RecordingClient>) {
    let http = RecordingClient::new()
        .with_route(LOCAL, 200, fixture("client.private.json"))
        .with_route(REMOTE, 200, fixture("server.public.json"));
    let orchestrator = EnvelopeOrchestrator::builder(
        client_config()
            .with_local_key_set(LOCAL)
            .with_remote_key_set(REMOTE),
    )
    .with_http_client(http.clone())
    .build();
    (http, orchestrator)
}

#[tokio::test]
async fn sequential_calls_fetch_each_store_once() {
    let (http, client) = served_client();
    assert_eq!(client.local_state(), KeyStoreState::Uninitialized);
    assert_eq!(client.remote_state(), KeyStoreState::Uninitialized);

    assert_ok!(client.encrypt(&json!({"amount": 100})).await);
    assert_ok!(client.encrypt(&json!({"amount": 200})).await);

    assert_eq!(http.request_count(LOCAL), 1);
    assert_eq!(http.request_count(REMOTE), 1);
    assert_eq!(client.local_state(), KeyStoreState::Ready);
    assert_eq!(client.remote_state(), KeyStoreState::Ready);
}

#[tokio::test]
async fn concurrent_first_calls_share_one_fetch() {
    let (http, client) = served_client();

    let (first, second) = (json!({"amount": 1}), json!({"amount": 2}));
    let (a, b, c) = tokio::join!(
        client.encrypt(&first),
        client.encrypt(&second),
        client.warm_up(),
    );
    assert_ok!(a);
    assert_ok!(b);
    assert_ok!(c);

    assert_eq!(http.request_count(LOCAL), 1);
    assert_eq!(http.request_count(REMOTE), 1);
}

#[tokio::test]
async fn concurrent_tasks_share_one_fetch() {
    let (http, client) = served_client();

    let handles: Vec<_> = (0..16)
        .map(|amount| {
            let client = client.clone();
            tokio::spawn(async move { client.encrypt(&json!({"amount": amount})).await })
        })
        .collect();
    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    assert_eq!(http.request_count(LOCAL), 1);
    assert_eq!(http.request_count(REMOTE), 1);
}

#[tokio::test]
async fn decrypt_loads_remote_store_only_after_decryption() {
    let (http, client) = served_client();

    let err = assert_err!(client.decrypt("a.b.c.d.e").await);
    assert_eq!(err.kind(), ErrorKind::DecryptionFailed);
    assert_eq!(client.local_state(), KeyStoreState::Ready);
    assert_eq!(client.remote_state(), KeyStoreState::Uninitialized);
    assert_eq!(http.requests(), [LOCAL]);
}

#[tokio::test]
async fn failed_load_is_retried_on_next_call() {
    let http = RecordingClient::new().with_route(LOCAL, 200, fixture("client.private.json"));
    let client = EnvelopeOrchestrator::builder(
        client_config()
            .with_local_key_set(LOCAL)
            .with_remote_key_set(REMOTE),
    )
    .with_http_client(http.clone())
    .build();

    let err = assert_err!(client.encrypt(&json!({"amount": 100})).await);
    assert_eq!(err.kind(), ErrorKind::KeySourceUnavailable);
    assert_eq!(err.subject(), Some(REMOTE));
    assert_eq!(client.local_state(), KeyStoreState::Ready);
    assert_eq!(client.remote_state(), KeyStoreState::Uninitialized);

    http.add_route(REMOTE, 200, fixture("server.public.json"));
    assert_ok!(client.encrypt(&json!({"amount": 100})).await);
    assert_eq!(client.remote_state(), KeyStoreState::Ready);
    assert_eq!(http.request_count(LOCAL), 1);
    assert_eq!(http.request_count(REMOTE), 2);
}
