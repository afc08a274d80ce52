use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use kuvert::{EnvelopeConfig, HttpClient, HttpResponse, error::BoxError};

pub fn fixture_path(name: &str) -> String {
    format!("{}/test-files/jwks/{name}", env!("CARGO_MANIFEST_DIR"))
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).unwrap()
}

/// Client side: own private keys, server public keys.
pub fn client_config() -> EnvelopeConfig {
    EnvelopeConfig::new(
        fixture_path("client.private.json"),
        fixture_path("server.public.json"),
    )
}

/// Server side, the mirror of [`client_config`].
pub fn server_config() -> EnvelopeConfig {
    EnvelopeConfig::new(
        fixture_path("server.private.json"),
        fixture_path("client.public.json"),
    )
}

/// In-memory [`HttpClient`] serving canned responses and recording every GET.
///
/// Unknown urls fail like a refused connection.
#[derive(Debug, Clone, Default)]
pub struct RecordingClient {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    routes: HashMap<String, (u16, String)>,
    requests: Vec<String>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(self, url: &str, status: u16, body: impl Into<String>) -> Self {
        self.add_route(url, status, body);
        self
    }

    pub fn add_route(&self, url: &str, status: u16, body: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(url.to_owned(), (status, body.into()));
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|request| *request == url).count()
    }
}

impl HttpClient for RecordingClient {
    async fn get<'a>(&'a self, url: &'a str) -> Result<HttpResponse, BoxError> {
        let route = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(url.to_owned());
            state.routes.get(url).cloned()
        };

        // leave room for concurrent callers to pile up
        tokio::time::sleep(Duration::from_millis(20)).await;

        match route {
            Some((status, body)) => Ok(HttpResponse::from_text(status, body)),
            None => Err(format!("connection refused: {url}").into()),
        }
    }
}
