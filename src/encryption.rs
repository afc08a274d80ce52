//! Compact JWE production and decryption for a single recipient.

use kuvert_crypto::jose::{
    DecryptingKey, EncryptingKey, JWEAlgorithm, JWECompact, JWEEncryption, JWK,
};
use kuvert_error::{EnvelopeError, OpaqueError};
use tracing::trace;

/// Parameters of a single encryption call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionContext {
    alg: JWEAlgorithm,
    enc: JWEEncryption,
    kid: Option<String>,
}

impl EncryptionContext {
    pub fn alg(&self) -> JWEAlgorithm {
        self.alg
    }

    pub fn enc(&self) -> JWEEncryption {
        self.enc
    }

    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }
}

/// Encrypts payloads into compact JWE envelopes and decrypts them.
///
/// The protected header is `{alg, enc, kid}`,
/// the content key is wrapped with the recipient's RSA-OAEP key.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncryptionCodec;

impl EncryptionCodec {
    pub fn new() -> Self {
        Self
    }

    /// Derive the [`EncryptionContext`] for encrypting to `key`.
    ///
    /// `key` must be provisioned for `alg`.
    pub fn encryption_context(
        &self,
        key: &JWK,
        alg: JWEAlgorithm,
        enc: JWEEncryption,
    ) -> Result<EncryptionContext, EnvelopeError> {
        let key_alg = key.alg().and_then(|alg| alg.key_management());
        if key_alg != Some(alg) {
            return Err(EnvelopeError::encryption_failed(key.display_id())
                .with_reason(format!("key is not provisioned for {alg}")));
        }
        Ok(EncryptionContext {
            alg,
            enc,
            kid: key.kid().map(ToOwned::to_owned),
        })
    }

    /// Encrypt `input` for the holder of the private half of `key`.
    pub fn encrypt(
        &self,
        input: &[u8],
        key: &JWK,
        alg: JWEAlgorithm,
        enc: JWEEncryption,
    ) -> Result<JWECompact, EnvelopeError> {
        let failed =
            |err: OpaqueError| EnvelopeError::encryption_failed(key.display_id()).with_source(err);

        let context = self.encryption_context(key, alg, enc)?;
        let encryptor = EncryptingKey::from_jwk(key).map_err(failed)?;
        let jwe = JWECompact::builder(context.enc)
            .with_plaintext(input)
            .build_compact(&encryptor)
            .map_err(failed)?;

        trace!(alg = %context.alg, enc = %context.enc, kid = context.kid(), "payload encrypted");
        Ok(jwe)
    }

    /// Decrypt `envelope` with the private half of `key`.
    ///
    /// Malformed envelopes, a header `alg` other than the key's
    /// and failed integrity checks all surface as [`DecryptionFailed`].
    ///
    /// [`DecryptionFailed`]: kuvert_error::ErrorKind::DecryptionFailed
    pub fn decrypt(&self, envelope: &str, key: &JWK) -> Result<Vec<u8>, EnvelopeError> {
        let failed =
            |err: OpaqueError| EnvelopeError::decryption_failed(key.display_id()).with_source(err);

        let jwe: JWECompact = envelope.parse().map_err(failed)?;
        let decryptor = DecryptingKey::from_jwk(key).map_err(failed)?;
        let decrypted = jwe.decrypt(&decryptor).map_err(failed)?;

        trace!(enc = %decrypted.enc(), kid = key.kid(), "envelope decrypted");
        Ok(decrypted.into_plaintext())
    }
}
