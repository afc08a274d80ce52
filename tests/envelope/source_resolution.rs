use kuvert::{
    EnvelopeOrchestrator, KeyMaterialSource, KeySetLocation, KeyStoreState, RawKeySet,
    error::ErrorKind,
};
use tokio_test::{assert_err, assert_ok};

use super::utils::{RecordingClient, client_config, fixture, fixture_path};

#[tokio::test]
async fn path_locations_never_hit_the_network() {
    let http = RecordingClient::new();
    let client = EnvelopeOrchestrator::builder(client_config())
        .with_http_client(http.clone())
        .build();

    assert_ok!(client.warm_up().await);
    assert_eq!(client.local_state(), KeyStoreState::Ready);
    assert_eq!(client.remote_state(), KeyStoreState::Ready);
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn url_locations_never_touch_the_filesystem() {
    // the url ends in a path that does exist on disk
    let url = format!("https://{}", fixture_path("server.public.json"));
    let location = KeySetLocation::parse(url.as_str());
    assert!(location.is_url());

    let http = RecordingClient::new();
    let source = KeyMaterialSource::with_client(http.clone());
    let err = assert_err!(source.fetch(&location).await);

    assert_eq!(err.kind(), ErrorKind::KeySourceUnavailable);
    assert_eq!(err.subject(), Some(url.as_str()));
    assert_eq!(http.requests(), [url]);
}

#[tokio::test]
async fn scheme_is_matched_case_insensitively() {
    let http = RecordingClient::new().with_route(
        "HTTPS://Server.Example/jwks.json",
        200,
        fixture("server.public.json"),
    );
    let client = EnvelopeOrchestrator::builder(
        client_config().with_remote_key_set("HTTPS://Server.Example/jwks.json"),
    )
    .with_http_client(http.clone())
    .build();

    assert_ok!(client.warm_up().await);
    assert_eq!(http.request_count("HTTPS://Server.Example/jwks.json"), 1);
}

#[tokio::test]
async fn json_and_text_bodies() {
    let http = RecordingClient::new()
        .with_route("https://keys.example/json", 200, r#"{"keys": []}"#)
        .with_route("https://keys.example/text", 200, "keys: none");
    let source = KeyMaterialSource::with_client(http);

    let raw = assert_ok!(source.fetch(&KeySetLocation::parse("https://keys.example/json")).await);
    assert_eq!(raw, RawKeySet::Json(serde_json::json!({"keys": []})));

    let raw = assert_ok!(source.fetch(&KeySetLocation::parse("https://keys.example/text")).await);
    assert_eq!(raw, RawKeySet::Text("keys: none".to_owned()));
}

#[tokio::test]
async fn error_status_is_unavailable() {
    let http = RecordingClient::new().with_route(
        "https://keys.example/jwks.json",
        404,
        r#"{"error": "not found"}"#,
    );
    let source = KeyMaterialSource::with_client(http);

    let err = assert_err!(
        source
            .fetch(&KeySetLocation::parse("https://keys.example/jwks.json"))
            .await
    );
    assert_eq!(err.kind(), ErrorKind::KeySourceUnavailable);
    assert_eq!(err.subject(), Some("https://keys.example/jwks.json"));
}

#[tokio::test]
async fn reachability_requires_ok_status() {
    let http = RecordingClient::new()
        .with_route("https://up.example/", 200, "ok")
        .with_route("https://created.example/", 201, "")
        .with_route("https://down.example/", 503, "maintenance");
    let source = KeyMaterialSource::with_client(http.clone());

    assert!(source.is_reachable("https://up.example/").await);
    assert!(!source.is_reachable("https://created.example/").await);
    assert!(!source.is_reachable("https://down.example/").await);
    assert!(!source.is_reachable("https://unknown.example/").await);
    assert_eq!(http.requests().len(), 4);
}
