use crate::{BoxError, OpaqueError};
use std::fmt;

/// The closed set of failures the envelope pipeline can report.
///
/// Every kind is terminal for the call that produced it,
/// nothing is retried or downgraded internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The key-set location is neither a readable file nor a reachable URL.
    KeySourceUnavailable,
    /// The key-set document does not parse as a JWK set.
    MalformedKeySet,
    /// No key in the relevant store matches the required algorithm.
    ///
    /// This points at a provisioning problem,
    /// as opposed to the cryptographic kinds below.
    AlgorithmNotProvisioned,
    /// Producing a signature failed.
    SigningFailed,
    /// The signature is valid but its `exp` claim lies in the past.
    SignatureExpired,
    /// The signature does not verify, or the JWS is malformed.
    SignatureInvalid,
    /// Producing a JWE failed.
    EncryptionFailed,
    /// Decrypting a JWE failed, including integrity check failures.
    DecryptionFailed,
}

impl ErrorKind {
    /// Short, human readable description of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeySourceUnavailable => "key source unavailable",
            Self::MalformedKeySet => "malformed key set",
            Self::AlgorithmNotProvisioned => "algorithm not provisioned",
            Self::SigningFailed => "signing failed",
            Self::SignatureExpired => "signature expired",
            Self::SignatureInvalid => "signature invalid",
            Self::EncryptionFailed => "encryption failed",
            Self::DecryptionFailed => "decryption failed",
        }
    }

    /// Returns true for the kinds produced by a cryptographic operation,
    /// as opposed to key provisioning and key loading failures.
    pub fn is_cryptographic(&self) -> bool {
        !matches!(
            self,
            Self::KeySourceUnavailable | Self::MalformedKeySet | Self::AlgorithmNotProvisioned
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failure of the envelope pipeline.
///
/// The `subject` names what the failure is about:
/// the key id for the cryptographic kinds (a key without `kid` is named by
/// its thumbprint), the location for [`ErrorKind::KeySourceUnavailable`]
/// and the algorithm for [`ErrorKind::AlgorithmNotProvisioned`].
pub struct EnvelopeError {
    kind: ErrorKind,
    subject: Option<String>,
    source: Option<BoxError>,
}

impl EnvelopeError {
    /// Create a new [`EnvelopeError`] of the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            subject: None,
            source: None,
        }
    }

    /// Attach the subject (key id, location or algorithm) this error is about.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Attach the underlying cause of this error.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach an underlying cause described by a message only.
    #[must_use]
    pub fn with_reason(self, reason: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        self.with_source(OpaqueError::from_display(reason))
    }

    /// The location could not be read or fetched.
    pub fn key_source_unavailable(location: impl Into<String>) -> Self {
        Self::new(ErrorKind::KeySourceUnavailable).with_subject(location)
    }

    /// The key-set document is not a JWK set.
    pub fn malformed_key_set() -> Self {
        Self::new(ErrorKind::MalformedKeySet)
    }

    /// No key is provisioned for the given algorithm.
    pub fn algorithm_not_provisioned(alg: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlgorithmNotProvisioned).with_subject(alg)
    }

    /// Signing with the given key failed.
    pub fn signing_failed(key_id: impl Into<String>) -> Self {
        Self::new(ErrorKind::SigningFailed).with_subject(key_id)
    }

    /// The signature made by the given key expired.
    pub fn signature_expired(key_id: impl Into<String>) -> Self {
        Self::new(ErrorKind::SignatureExpired).with_subject(key_id)
    }

    /// The signature does not verify against the given key.
    pub fn signature_invalid(key_id: impl Into<String>) -> Self {
        Self::new(ErrorKind::SignatureInvalid).with_subject(key_id)
    }

    /// Encrypting for the given key failed.
    pub fn encryption_failed(key_id: impl Into<String>) -> Self {
        Self::new(ErrorKind::EncryptionFailed).with_subject(key_id)
    }

    /// Decrypting with the given key failed.
    pub fn decryption_failed(key_id: impl Into<String>) -> Self {
        Self::new(ErrorKind::DecryptionFailed).with_subject(key_id)
    }

    /// The [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The key id, location or algorithm this error is about, if known.
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }
}

impl fmt::Debug for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeError")
            .field("kind", &self.kind)
            .field("subject", &self.subject)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(subject) = &self.subject {
            write!(f, " ({subject})")?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl std::error::Error for EnvelopeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn std::error::Error + 'static))
    }
}
