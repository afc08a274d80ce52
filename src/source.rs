//! Resolution of key-set documents from disk or over HTTP.
//!
//! A [`KeySetLocation`] is either a filesystem path or an HTTP(S) URL.
//! The [`KeyMaterialSource`] reads paths with `tokio::fs` and fetches
//! URLs through an [`HttpClient`], [`ReqwestClient`] by default.

use std::{fmt, path::PathBuf, str::FromStr, sync::Arc};

use kuvert_error::{BoxError, EnvelopeError, OpaqueError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

/// Where a JWK-set document lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeySetLocation {
    /// A local file, read as UTF-8 text.
    Path(PathBuf),
    /// An `http://` or `https://` URL, fetched with a single GET.
    Url(String),
}

impl KeySetLocation {
    /// Classify a location string.
    ///
    /// An `http://` or `https://` prefix (in any case) makes it a URL,
    /// anything else is treated as a filesystem path.
    pub fn parse(location: impl Into<String>) -> Self {
        let location = location.into();
        if has_http_scheme(&location) {
            Self::Url(location)
        } else {
            Self::Path(PathBuf::from(location))
        }
    }

    /// Returns true if this location is fetched over HTTP.
    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

fn has_http_scheme(location: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        location
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

impl FromStr for KeySetLocation {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for KeySetLocation {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for KeySetLocation {
    fn from(value: String) -> Self {
        Self::parse(value)
    }
}

impl From<PathBuf> for KeySetLocation {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl fmt::Display for KeySetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

impl Serialize for KeySetLocation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KeySetLocation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::parse)
    }
}

/// Response of an [`HttpClient`] GET.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    status: u16,
    body: Option<Value>,
    text: String,
}

impl HttpResponse {
    /// Create a response from its status and raw body text,
    /// the JSON `body` is derived from the text when it parses.
    pub fn from_text(status: u16, text: impl Into<String>) -> Self {
        let text = text.into();
        let body = serde_json::from_str(&text).ok();
        Self { status, body, text }
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns true for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body as JSON, if it parsed as such.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// The raw body text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Minimal HTTP collaborator: a plain GET without custom headers.
pub trait HttpClient: Send + Sync + 'static {
    /// Fetch `url` and return its status and body.
    fn get<'a>(
        &'a self,
        url: &'a str,
    ) -> impl Future<Output = Result<HttpResponse, BoxError>> + Send + 'a;
}

impl<C: HttpClient> HttpClient for Arc<C> {
    fn get<'a>(
        &'a self,
        url: &'a str,
    ) -> impl Future<Output = Result<HttpResponse, BoxError>> + Send + 'a {
        self.as_ref().get(url)
    }
}

/// [`HttpClient`] backed by [`reqwest`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a client with reqwest's default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already configured [`reqwest::Client`].
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpClient for ReqwestClient {
    async fn get<'a>(&'a self, url: &'a str) -> Result<HttpResponse, BoxError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok(HttpResponse::from_text(status, text))
    }
}

/// A key-set document as it came out of a [`KeyMaterialSource`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawKeySet {
    /// Body that already parsed as JSON.
    Json(Value),
    /// Unparsed text, from a file or a non-JSON HTTP body.
    Text(String),
}

/// Reads key-set documents from a [`KeySetLocation`].
#[derive(Debug, Clone, Default)]
pub struct KeyMaterialSource<C = ReqwestClient> {
    client: C,
}

impl KeyMaterialSource {
    /// Create a source using a default [`ReqwestClient`].
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C> KeyMaterialSource<C> {
    /// Create a source using the given [`HttpClient`].
    pub fn with_client(client: C) -> Self {
        Self { client }
    }

    /// Reference to the [`HttpClient`] used for URL locations.
    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: HttpClient> KeyMaterialSource<C> {
    /// Fetch the raw key-set document at `location`.
    ///
    /// Paths never touch the network and URLs never touch the filesystem.
    /// Any failure, including a non-2xx response, is reported as
    /// [`KeySourceUnavailable`] carrying the location.
    ///
    /// [`KeySourceUnavailable`]: kuvert_error::ErrorKind::KeySourceUnavailable
    pub async fn fetch(&self, location: &KeySetLocation) -> Result<RawKeySet, EnvelopeError> {
        match location {
            KeySetLocation::Path(path) => {
                trace!(path = %path.display(), "read key set from file");
                let text = tokio::fs::read_to_string(path).await.map_err(|err| {
                    EnvelopeError::key_source_unavailable(location.to_string()).with_source(err)
                })?;
                debug!(path = %path.display(), bytes = text.len(), "key set read from file");
                Ok(RawKeySet::Text(text))
            }
            KeySetLocation::Url(url) => {
                trace!(%url, "fetch key set over http");
                let response = self
                    .client
                    .get(url)
                    .await
                    .map_err(|err| EnvelopeError::key_source_unavailable(url.as_str()).with_source(err))?;
                if !response.is_success() {
                    return Err(EnvelopeError::key_source_unavailable(url.as_str()).with_source(
                        OpaqueError::from_display(format!(
                            "unexpected http status {}",
                            response.status()
                        )),
                    ));
                }
                debug!(%url, status = response.status(), "key set fetched over http");
                Ok(match response.body {
                    Some(body) => RawKeySet::Json(body),
                    None => RawKeySet::Text(response.text),
                })
            }
        }
    }

    /// Pre-flight probe: true only when a GET of `url` answers 200.
    ///
    /// Errors are logged and reported as false.
    pub async fn is_reachable(&self, url: &str) -> bool {
        match self.client.get(url).await {
            Ok(response) => {
                trace!(%url, status = response.status(), "probe answered");
                response.status() == 200
            }
            Err(err) => {
                warn!(%url, error = %err, "probe failed");
                false
            }
        }
    }
}
