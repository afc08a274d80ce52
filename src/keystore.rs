//! Immutable key stores and their lazy, once-only population.

use std::fmt;

use kuvert_crypto::jose::{JWK, JWKSet};
use kuvert_error::EnvelopeError;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

use crate::source::{HttpClient, KeyMaterialSource, KeySetLocation, RawKeySet};

/// Keys of one party, parsed from a single JWK-set document.
///
/// Lookups by algorithm return the first matching key in document order.
#[derive(Debug, Clone)]
pub struct KeyStore {
    keys: JWKSet,
}

impl KeyStore {
    /// Parse a key store from a raw JWK-set document.
    ///
    /// Fails with [`MalformedKeySet`] when the document is not a JWK set,
    /// or when any key in it has an unknown `kty` or broken material.
    ///
    /// [`MalformedKeySet`]: kuvert_error::ErrorKind::MalformedKeySet
    pub fn parse(raw: RawKeySet) -> Result<Self, EnvelopeError> {
        let keys = match raw {
            RawKeySet::Json(value) => JWKSet::from_json_value(value),
            RawKeySet::Text(text) => JWKSet::from_json_slice(text.as_bytes()),
        }
        .map_err(|err| EnvelopeError::malformed_key_set().with_source(err))?;
        Ok(Self { keys })
    }

    /// First key whose `alg` equals `alg`.
    ///
    /// Absence is a valid answer, see [`KeyStore::require`]
    /// for the variant that turns it into an error.
    pub fn find_by_algorithm(&self, alg: &str) -> Option<&JWK> {
        self.keys.find_by_algorithm(alg)
    }

    /// First key whose `alg` equals `alg`, or [`AlgorithmNotProvisioned`].
    ///
    /// [`AlgorithmNotProvisioned`]: kuvert_error::ErrorKind::AlgorithmNotProvisioned
    pub fn require(&self, alg: &str) -> Result<&JWK, EnvelopeError> {
        self.find_by_algorithm(alg)
            .ok_or_else(|| EnvelopeError::algorithm_not_provisioned(alg))
    }

    pub fn find_by_kid(&self, kid: &str) -> Option<&JWK> {
        self.keys.find_by_kid(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The underlying [`JWKSet`].
    pub fn key_set(&self) -> &JWKSet {
        &self.keys
    }
}

/// Lifecycle of a lazily populated [`KeyStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyStoreState {
    /// Nothing loaded yet, or the last attempt failed.
    Uninitialized,
    /// Fully populated, stays so for the lifetime of the owner.
    Ready,
}

impl fmt::Display for KeyStoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
        })
    }
}

/// A [`KeyStore`] loaded from its location on first use.
///
/// Concurrent first callers wait on a single load and share its result.
/// A failed load leaves the store uninitialized so the next call retries.
pub(crate) struct LazyKeyStore {
    role: &'static str,
    location: KeySetLocation,
    cell: OnceCell<KeyStore>,
}

impl LazyKeyStore {
    pub(crate) fn new(role: &'static str, location: KeySetLocation) -> Self {
        Self {
            role,
            location,
            cell: OnceCell::new(),
        }
    }

    pub(crate) fn state(&self) -> KeyStoreState {
        if self.cell.initialized() {
            KeyStoreState::Ready
        } else {
            KeyStoreState::Uninitialized
        }
    }

    pub(crate) async fn get_or_load<C: HttpClient>(
        &self,
        source: &KeyMaterialSource<C>,
    ) -> Result<&KeyStore, EnvelopeError> {
        self.cell
            .get_or_try_init(|| async {
                trace!(role = self.role, location = %self.location, "load key store");
                let raw = source.fetch(&self.location).await?;
                let store = KeyStore::parse(raw)?;
                debug!(
                    role = self.role,
                    location = %self.location,
                    keys = store.len(),
                    "key store ready"
                );
                Ok::<_, EnvelopeError>(store)
            })
            .await
    }
}

impl fmt::Debug for LazyKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyKeyStore")
            .field("role", &self.role)
            .field("location", &self.location)
            .field("state", &self.state())
            .finish()
    }
}
