//! Compact JWS production and verification with an `exp` protected header.

use std::{fmt, sync::Arc};

use kuvert_crypto::jose::{JWA, JWK, JWSCompact, SigningKey, VerifyingKey};
use kuvert_error::{EnvelopeError, OpaqueError};
use kuvert_utils::time::{Clock, SystemClock, unix_seconds_rounded};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

/// The only `crit` extension understood when verifying.
const EXP_HEADER: &str = "exp";

/// Parameters of a single signing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningContext {
    alg: JWA,
    kid: Option<String>,
    exp: i64,
}

impl SigningContext {
    pub fn alg(&self) -> JWA {
        self.alg
    }

    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// Expiry, in unix seconds.
    pub fn exp(&self) -> i64 {
        self.exp
    }
}

/// Protected header of a verified JWS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureHeader {
    pub alg: JWA,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit: Option<Vec<String>>,
    /// Expiry, in unix seconds.
    pub exp: i64,
    /// Any other protected header member.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of a successful verification: the payload and the header used to verify it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedPayload {
    pub payload: Value,
    pub header: SignatureHeader,
}

/// Signs payloads into compact JWS envelopes and verifies them.
///
/// Every signature carries `exp` as a critical protected header.
/// Verification checks the signature first and the expiry second.
#[derive(Clone)]
pub struct SignatureCodec {
    clock: Arc<dyn Clock>,
}

impl Default for SignatureCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SignatureCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureCodec").finish_non_exhaustive()
    }
}

impl SignatureCodec {
    /// Create a codec reading the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Create a codec reading the given [`Clock`].
    pub fn with_clock(clock: impl Clock) -> Self {
        Self {
            clock: Arc::new(clock),
        }
    }

    pub(crate) fn with_shared_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Derive the [`SigningContext`] for a signature made now with `key`.
    ///
    /// `exp` is the current time plus the validity window, rounded to whole seconds.
    pub fn signing_context(
        &self,
        key: &JWK,
        validity_minutes: u32,
    ) -> Result<SigningContext, EnvelopeError> {
        let alg = key
            .alg()
            .and_then(|alg| alg.signing())
            .ok_or_else(|| {
                EnvelopeError::signing_failed(key.display_id())
                    .with_reason("key alg is not a signing algorithm")
            })?;
        let validity_ms = i64::from(validity_minutes) * 60_000;
        let exp = unix_seconds_rounded(self.clock.now_unix_ms().saturating_add(validity_ms));
        Ok(SigningContext {
            alg,
            kid: key.kid().map(ToOwned::to_owned),
            exp,
        })
    }

    /// Sign the JSON serialization of `payload` with `key`.
    pub fn sign<T>(
        &self,
        payload: &T,
        key: &JWK,
        validity_minutes: u32,
    ) -> Result<JWSCompact, EnvelopeError>
    where
        T: Serialize + ?Sized,
    {
        let failed =
            |err: OpaqueError| EnvelopeError::signing_failed(key.display_id()).with_source(err);

        let context = self.signing_context(key, validity_minutes)?;
        let payload = serde_json::to_vec(payload)
            .map_err(|err| EnvelopeError::signing_failed(key.display_id()).with_source(err))?;
        let signer = SigningKey::from_jwk(key).map_err(failed)?;

        let jws = JWSCompact::builder()
            .with_payload(payload)
            .try_with_protected_headers(serde_json::json!({
                "crit": [EXP_HEADER],
                "exp": context.exp,
            }))
            .and_then(|builder| builder.build_compact(&signer))
            .map_err(failed)?;

        trace!(alg = %context.alg, kid = context.kid(), exp = context.exp, "payload signed");
        Ok(jws)
    }

    /// Verify `envelope` against the public half of `key`.
    ///
    /// A malformed or forged envelope is [`SignatureInvalid`], a genuine one
    /// whose `exp` lies before the current second is [`SignatureExpired`].
    ///
    /// [`SignatureInvalid`]: kuvert_error::ErrorKind::SignatureInvalid
    /// [`SignatureExpired`]: kuvert_error::ErrorKind::SignatureExpired
    pub fn verify(&self, envelope: &str, key: &JWK) -> Result<VerifiedPayload, EnvelopeError> {
        let invalid =
            |err: OpaqueError| EnvelopeError::signature_invalid(key.display_id()).with_source(err);

        let jws: JWSCompact = envelope.parse().map_err(invalid)?;
        let verifier = VerifyingKey::from_jwk(key).map_err(invalid)?;
        let decoded = jws.decode(&verifier).map_err(invalid)?;

        let header: SignatureHeader = decoded.decode_protected_headers().map_err(invalid)?;
        if let Some(crit) = &header.crit {
            // RFC 7515 §4.1.11: an empty list MUST NOT be used
            if crit.is_empty() {
                return Err(EnvelopeError::signature_invalid(key.display_id())
                    .with_reason("empty critical header list"));
            }
            if let Some(unknown) = crit.iter().find(|name| name.as_str() != EXP_HEADER) {
                return Err(EnvelopeError::signature_invalid(key.display_id())
                    .with_reason(format!("unsupported critical header {unknown}")));
            }
        }

        let now = self.clock.now_unix_secs();
        if header.exp < now {
            trace!(kid = key.kid(), exp = header.exp, now, "signature expired");
            return Err(EnvelopeError::signature_expired(key.display_id())
                .with_reason(format!("expired at {}, now is {now}", header.exp)));
        }

        let payload = serde_json::from_slice(decoded.payload())
            .map_err(|err| EnvelopeError::signature_invalid(key.display_id()).with_source(err))?;
        trace!(alg = %header.alg, kid = header.kid.as_deref(), "signature verified");
        Ok(VerifiedPayload { payload, header })
    }
}
