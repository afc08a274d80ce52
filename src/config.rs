use kuvert_crypto::jose::{JWA, JWEAlgorithm, JWEEncryption};
use kuvert_utils::macros::generate_set_and_with;
use serde::{Deserialize, Serialize};

use crate::source::KeySetLocation;

/// Configuration of an [`EnvelopeOrchestrator`].
///
/// Only the two key-set locations are required,
/// the algorithms and the validity window fall back to their defaults
/// when omitted from a serialized config:
///
/// | field | default |
/// |---|---|
/// | `signing_algorithm` | `RS256` |
/// | `encryption_algorithm` | `RSA-OAEP-256` |
/// | `encryption_method` | `A256CBC-HS512` |
/// | `signature_validity_minutes` | `5` |
///
/// [`EnvelopeOrchestrator`]: crate::EnvelopeOrchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    #[serde(default = "default_signing_algorithm")]
    signing_algorithm: JWA,
    #[serde(default = "default_encryption_algorithm")]
    encryption_algorithm: JWEAlgorithm,
    #[serde(default = "default_encryption_method")]
    encryption_method: JWEEncryption,
    #[serde(default = "default_signature_validity_minutes")]
    signature_validity_minutes: u32,
    local_key_set: KeySetLocation,
    remote_key_set: KeySetLocation,
}

fn default_signing_algorithm() -> JWA {
    JWA::RS256
}

fn default_encryption_algorithm() -> JWEAlgorithm {
    JWEAlgorithm::RsaOaep256
}

fn default_encryption_method() -> JWEEncryption {
    JWEEncryption::A256CbcHs512
}

fn default_signature_validity_minutes() -> u32 {
    5
}

impl EnvelopeConfig {
    /// Create a config for the given local (private) and remote (public)
    /// key sets, with default algorithms and validity.
    pub fn new(
        local_key_set: impl Into<KeySetLocation>,
        remote_key_set: impl Into<KeySetLocation>,
    ) -> Self {
        Self {
            signing_algorithm: default_signing_algorithm(),
            encryption_algorithm: default_encryption_algorithm(),
            encryption_method: default_encryption_method(),
            signature_validity_minutes: default_signature_validity_minutes(),
            local_key_set: local_key_set.into(),
            remote_key_set: remote_key_set.into(),
        }
    }

    generate_set_and_with! {
        /// Set the algorithm used to sign outbound and verify inbound payloads.
        pub fn signing_algorithm(mut self, alg: JWA) -> Self {
            self.signing_algorithm = alg;
            self
        }
    }

    generate_set_and_with! {
        /// Set the key management algorithm used to wrap the content key.
        pub fn encryption_algorithm(mut self, alg: JWEAlgorithm) -> Self {
            self.encryption_algorithm = alg;
            self
        }
    }

    generate_set_and_with! {
        /// Set the content encryption method.
        pub fn encryption_method(mut self, enc: JWEEncryption) -> Self {
            self.encryption_method = enc;
            self
        }
    }

    generate_set_and_with! {
        /// Set how long a produced signature stays valid, in minutes.
        pub fn signature_validity_minutes(mut self, minutes: u32) -> Self {
            self.signature_validity_minutes = minutes;
            self
        }
    }

    generate_set_and_with! {
        /// Set where the local party's private key set lives.
        pub fn local_key_set(mut self, location: impl Into<KeySetLocation>) -> Self {
            self.local_key_set = location.into();
            self
        }
    }

    generate_set_and_with! {
        /// Set where the remote party's public key set lives.
        pub fn remote_key_set(mut self, location: impl Into<KeySetLocation>) -> Self {
            self.remote_key_set = location.into();
            self
        }
    }

    pub fn signing_algorithm(&self) -> JWA {
        self.signing_algorithm
    }

    pub fn encryption_algorithm(&self) -> JWEAlgorithm {
        self.encryption_algorithm
    }

    pub fn encryption_method(&self) -> JWEEncryption {
        self.encryption_method
    }

    pub fn signature_validity_minutes(&self) -> u32 {
        self.signature_validity_minutes
    }

    pub fn local_key_set(&self) -> &KeySetLocation {
        &self.local_key_set
    }

    pub fn remote_key_set(&self) -> &KeySetLocation {
        &self.remote_key_set
    }
}
