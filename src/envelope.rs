//! The mutual envelope pipeline.
//!
//! Outbound payloads are signed with the local party's key and then
//! encrypted for the remote party. Inbound envelopes are decrypted with the
//! local party's key and then verified against the remote party's key.
//!
//! ```text
//!  encrypt:  payload -> JWS(local RS256) -> JWE(remote RSA-OAEP-256) -> envelope
//!  decrypt:  envelope -> JWE(local RSA-OAEP-256) -> JWS(remote RS256) -> payload
//! ```

use std::{fmt, sync::Arc};

use kuvert_error::EnvelopeError;
use kuvert_utils::time::{Clock, SystemClock};
use serde::Serialize;
use tracing::{debug, trace};

use crate::{
    config::EnvelopeConfig,
    encryption::EncryptionCodec,
    keystore::{KeyStore, KeyStoreState, LazyKeyStore},
    signature::{SignatureCodec, VerifiedPayload},
    source::{HttpClient, KeyMaterialSource, ReqwestClient},
};

/// Seals payloads for, and opens envelopes from, a single remote party.
///
/// Both key stores are loaded on first use, at most once,
/// and are shared by every clone of the orchestrator.
pub struct EnvelopeOrchestrator<C = ReqwestClient> {
    inner: Arc<Inner<C>>,
}

struct Inner<C> {
    config: EnvelopeConfig,
    source: KeyMaterialSource<C>,
    local: LazyKeyStore,
    remote: LazyKeyStore,
    signatures: SignatureCodec,
    encryption: EncryptionCodec,
}

impl<C> Clone for EnvelopeOrchestrator<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C> fmt::Debug for EnvelopeOrchestrator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeOrchestrator")
            .field("config", &self.inner.config)
            .field("local", &self.inner.local)
            .field("remote", &self.inner.remote)
            .finish_non_exhaustive()
    }
}

impl EnvelopeOrchestrator {
    /// Create an orchestrator fetching remote key sets with a default [`ReqwestClient`].
    pub fn new(config: EnvelopeConfig) -> Self {
        Self::builder(config).build()
    }

    /// Start building an orchestrator with custom collaborators.
    pub fn builder(config: EnvelopeConfig) -> EnvelopeOrchestratorBuilder {
        EnvelopeOrchestratorBuilder {
            config,
            client: ReqwestClient::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl<C: HttpClient> EnvelopeOrchestrator<C> {
    /// The configuration this orchestrator was built with.
    pub fn config(&self) -> &EnvelopeConfig {
        &self.inner.config
    }

    /// Lifecycle state of the local (private) key store.
    pub fn local_state(&self) -> KeyStoreState {
        self.inner.local.state()
    }

    /// Lifecycle state of the remote (public) key store.
    pub fn remote_state(&self) -> KeyStoreState {
        self.inner.remote.state()
    }

    /// Populate both key stores now instead of on first use.
    pub async fn warm_up(&self) -> Result<(), EnvelopeError> {
        self.local_store().await?;
        self.remote_store().await?;
        Ok(())
    }

    /// Sign `payload` with the local signing key, then encrypt the signed
    /// envelope for the remote party.
    pub async fn encrypt<T>(&self, payload: &T) -> Result<String, EnvelopeError>
    where
        T: Serialize + ?Sized,
    {
        let config = &self.inner.config;
        let local = self.local_store().await?;
        let remote = self.remote_store().await?;

        let signing_key = local.require(config.signing_algorithm().as_str())?;
        let jws = self.inner.signatures.sign(
            payload,
            signing_key,
            config.signature_validity_minutes(),
        )?;

        let encryption_key = remote.require(config.encryption_algorithm().as_str())?;
        let jwe = self.inner.encryption.encrypt(
            jws.as_str().as_bytes(),
            encryption_key,
            config.encryption_algorithm(),
            config.encryption_method(),
        )?;

        debug!(
            signing_kid = signing_key.kid(),
            encryption_kid = encryption_key.kid(),
            enc = %config.encryption_method(),
            "envelope sealed"
        );
        Ok(jwe.into_string())
    }

    /// Decrypt `envelope` with the local decryption key, then verify the
    /// signed content against the remote party's signing key.
    pub async fn decrypt(&self, envelope: &str) -> Result<VerifiedPayload, EnvelopeError> {
        let config = &self.inner.config;
        let local = self.local_store().await?;
        let decryption_key = local.require(config.encryption_algorithm().as_str())?;
        let plaintext = self.inner.encryption.decrypt(envelope, decryption_key)?;

        let remote = self.remote_store().await?;
        let verification_key = remote.require(config.signing_algorithm().as_str())?;
        let jws = String::from_utf8(plaintext).map_err(|err| {
            EnvelopeError::signature_invalid(verification_key.display_id()).with_source(err)
        })?;
        let verified = self.inner.signatures.verify(&jws, verification_key)?;

        debug!(
            decryption_kid = decryption_key.kid(),
            signing_kid = verified.header.kid.as_deref(),
            exp = verified.header.exp,
            "envelope opened"
        );
        Ok(verified)
    }

    async fn local_store(&self) -> Result<&KeyStore, EnvelopeError> {
        trace!("resolve local key store");
        self.inner.local.get_or_load(&self.inner.source).await
    }

    async fn remote_store(&self) -> Result<&KeyStore, EnvelopeError> {
        trace!("resolve remote key store");
        self.inner.remote.get_or_load(&self.inner.source).await
    }
}

/// Builder for an [`EnvelopeOrchestrator`] with a custom [`HttpClient`] or [`Clock`].
pub struct EnvelopeOrchestratorBuilder<C = ReqwestClient> {
    config: EnvelopeConfig,
    client: C,
    clock: Arc<dyn Clock>,
}

impl<C> fmt::Debug for EnvelopeOrchestratorBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeOrchestratorBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C> EnvelopeOrchestratorBuilder<C> {
    /// Fetch remote key sets with `client` instead.
    pub fn with_http_client<D: HttpClient>(self, client: D) -> EnvelopeOrchestratorBuilder<D> {
        EnvelopeOrchestratorBuilder {
            config: self.config,
            client,
            clock: self.clock,
        }
    }

    /// Read the time used for `exp` from `clock` instead of the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

impl<C: HttpClient> EnvelopeOrchestratorBuilder<C> {
    /// Build the orchestrator, no key material is loaded yet.
    pub fn build(self) -> EnvelopeOrchestrator<C> {
        let local = LazyKeyStore::new("local", self.config.local_key_set().clone());
        let remote = LazyKeyStore::new("remote", self.config.remote_key_set().clone());
        EnvelopeOrchestrator {
            inner: Arc::new(Inner {
                source: KeyMaterialSource::with_client(self.client),
                local,
                remote,
                signatures: SignatureCodec::with_shared_clock(self.clock),
                encryption: EncryptionCodec::new(),
                config: self.config,
            }),
        }
    }
}
