use std::{fmt, ops::Deref, str::FromStr};

use aws_lc_rs::{
    rsa::{OAEP_SHA1_MGF1SHA1, OAEP_SHA256_MGF1SHA256, OaepAlgorithm},
    signature::{
        self, ECDSA_P256_SHA256_FIXED_SIGNING, ECDSA_P384_SHA384_FIXED_SIGNING,
        ECDSA_P521_SHA512_FIXED_SIGNING, EcdsaSigningAlgorithm, EcdsaVerificationAlgorithm,
        RsaEncoding, RsaParameters,
    },
};
use kuvert_error::OpaqueError;
use serde::{Deserialize, Serialize};

use crate::jose::JWKEllipticCurves;

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
/// [`JWA`] or JSON Web Algorithms for digital signatures as defined in [`rfc7518`]
///
/// Only the asymmetric algorithms are supported,
/// an envelope is always signed by one party and verified by another.
///
/// [`rfc7518`]: https://datatracker.ietf.org/doc/html/rfc7518#section-3.1
pub enum JWA {
    /// RSASSA-PKCS1-v1_5 using SHA-256 (Recommended)
    RS256,
    /// RSASSA-PKCS1-v1_5 using SHA-384 (Optional)
    RS384,
    /// RSASSA-PKCS1-v1_5 using SHA-512 (Optional)
    RS512,
    /// ECDSA using P-256 and SHA-256 (Recommended+)
    ES256,
    /// ECDSA using P-384 and SHA-384 (Optional)
    ES384,
    /// ECDSA using P-521 and SHA-512 (Optional)
    ES512,
    /// RSASSA-PSS using SHA-256 and MGF1 with SHA-256 (Optional)
    PS256,
    /// RSASSA-PSS using SHA-384 and MGF1 with SHA-384 (Optional)
    PS384,
    /// RSASSA-PSS using SHA-512 and MGF1 with SHA-512 (Optional)
    PS512,
}

impl JWA {
    /// Registered JOSE name of this algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
        }
    }

    /// Returns true for the RSASSA algorithms, both PKCS1-v1_5 and PSS.
    pub fn is_rsa(&self) -> bool {
        !self.is_ecdsa()
    }

    /// Returns true for the ECDSA algorithms.
    pub fn is_ecdsa(&self) -> bool {
        matches!(self, Self::ES256 | Self::ES384 | Self::ES512)
    }
}

impl fmt::Display for JWA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JWA {
    type Err = OpaqueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "RS256" => Self::RS256,
            "RS384" => Self::RS384,
            "RS512" => Self::RS512,
            "ES256" => Self::ES256,
            "ES384" => Self::ES384,
            "ES512" => Self::ES512,
            "PS256" => Self::PS256,
            "PS384" => Self::PS384,
            "PS512" => Self::PS512,
            _ => {
                return Err(OpaqueError::from_display(format!(
                    "unsupported signing algorithm: {s}"
                )));
            }
        })
    }
}

impl From<JWKEllipticCurves> for JWA {
    fn from(value: JWKEllipticCurves) -> Self {
        match value {
            JWKEllipticCurves::P256 => Self::ES256,
            JWKEllipticCurves::P384 => Self::ES384,
            JWKEllipticCurves::P521 => Self::ES512,
        }
    }
}

impl TryFrom<JWA> for JWKEllipticCurves {
    type Error = OpaqueError;

    fn try_from(value: JWA) -> Result<Self, Self::Error> {
        match value {
            JWA::ES256 => Ok(Self::P256),
            JWA::ES384 => Ok(Self::P384),
            JWA::ES512 => Ok(Self::P521),
            JWA::RS256 | JWA::RS384 | JWA::RS512 | JWA::PS256 | JWA::PS384 | JWA::PS512 => Err(
                OpaqueError::from_display("RSA cannot be converted to elliptic curve"),
            ),
        }
    }
}

impl TryFrom<JWA> for &'static EcdsaSigningAlgorithm {
    type Error = OpaqueError;

    fn try_from(value: JWA) -> Result<Self, Self::Error> {
        match value {
            JWA::ES256 => Ok(&ECDSA_P256_SHA256_FIXED_SIGNING),
            JWA::ES384 => Ok(&ECDSA_P384_SHA384_FIXED_SIGNING),
            JWA::ES512 => Ok(&ECDSA_P521_SHA512_FIXED_SIGNING),
            JWA::RS256 | JWA::RS384 | JWA::RS512 | JWA::PS256 | JWA::PS384 | JWA::PS512 => Err(
                OpaqueError::from_display("RSA cannot be converted to elliptic curve"),
            ),
        }
    }
}

impl TryFrom<JWA> for &'static EcdsaVerificationAlgorithm {
    type Error = OpaqueError;

    fn try_from(value: JWA) -> Result<Self, Self::Error> {
        let signing_algo: &'static EcdsaSigningAlgorithm = value.try_into()?;
        Ok(signing_algo.deref())
    }
}

impl TryFrom<JWA> for &'static dyn RsaEncoding {
    type Error = OpaqueError;

    fn try_from(value: JWA) -> Result<Self, Self::Error> {
        match value {
            JWA::RS256 => Ok(&signature::RSA_PKCS1_SHA256),
            JWA::RS384 => Ok(&signature::RSA_PKCS1_SHA384),
            JWA::RS512 => Ok(&signature::RSA_PKCS1_SHA512),
            JWA::PS256 => Ok(&signature::RSA_PSS_SHA256),
            JWA::PS384 => Ok(&signature::RSA_PSS_SHA384),
            JWA::PS512 => Ok(&signature::RSA_PSS_SHA512),
            JWA::ES256 | JWA::ES384 | JWA::ES512 => Err(OpaqueError::from_display(
                "elliptic curve algorithm cannot be used with RSA key",
            )),
        }
    }
}

impl TryFrom<JWA> for &'static RsaParameters {
    type Error = OpaqueError;

    fn try_from(value: JWA) -> Result<Self, Self::Error> {
        match value {
            JWA::RS256 => Ok(&signature::RSA_PKCS1_2048_8192_SHA256),
            JWA::RS384 => Ok(&signature::RSA_PKCS1_2048_8192_SHA384),
            JWA::RS512 => Ok(&signature::RSA_PKCS1_2048_8192_SHA512),
            JWA::PS256 => Ok(&signature::RSA_PSS_2048_8192_SHA256),
            JWA::PS384 => Ok(&signature::RSA_PSS_2048_8192_SHA384),
            JWA::PS512 => Ok(&signature::RSA_PSS_2048_8192_SHA512),
            JWA::ES256 | JWA::ES384 | JWA::ES512 => Err(OpaqueError::from_display(
                "elliptic curve algorithm cannot be used with RSA key",
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
/// [`JWEAlgorithm`] is the key management algorithm used to
/// wrap the content encryption key of a JWE, as defined in [`rfc7518, section 4`]
///
/// [`rfc7518, section 4`]: https://datatracker.ietf.org/doc/html/rfc7518#section-4
pub enum JWEAlgorithm {
    /// RSAES OAEP using default parameters (SHA-1 and MGF1 with SHA-1)
    #[serde(rename = "RSA-OAEP")]
    RsaOaep,
    /// RSAES OAEP using SHA-256 and MGF1 with SHA-256
    #[serde(rename = "RSA-OAEP-256")]
    RsaOaep256,
}

impl JWEAlgorithm {
    /// Registered JOSE name of this algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RsaOaep => "RSA-OAEP",
            Self::RsaOaep256 => "RSA-OAEP-256",
        }
    }

    pub(crate) fn oaep_algorithm(&self) -> &'static OaepAlgorithm {
        match self {
            Self::RsaOaep => &OAEP_SHA1_MGF1SHA1,
            Self::RsaOaep256 => &OAEP_SHA256_MGF1SHA256,
        }
    }
}

impl fmt::Display for JWEAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JWEAlgorithm {
    type Err = OpaqueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RSA-OAEP" => Ok(Self::RsaOaep),
            "RSA-OAEP-256" => Ok(Self::RsaOaep256),
            _ => Err(OpaqueError::from_display(format!(
                "unsupported key management algorithm: {s}"
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
/// [`JWEEncryption`] is the content encryption method (`enc`) of a JWE,
/// as defined in [`rfc7518, section 5`]
///
/// [`rfc7518, section 5`]: https://datatracker.ietf.org/doc/html/rfc7518#section-5
pub enum JWEEncryption {
    /// AES_128_CBC_HMAC_SHA_256 authenticated encryption (Required)
    #[serde(rename = "A128CBC-HS256")]
    A128CbcHs256,
    /// AES_256_CBC_HMAC_SHA_512 authenticated encryption (Required)
    #[serde(rename = "A256CBC-HS512")]
    A256CbcHs512,
    /// AES GCM using 128-bit key (Recommended)
    #[serde(rename = "A128GCM")]
    A128Gcm,
    /// AES GCM using 256-bit key (Recommended)
    #[serde(rename = "A256GCM")]
    A256Gcm,
}

impl JWEEncryption {
    /// Registered JOSE name of this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A128CbcHs256 => "A128CBC-HS256",
            Self::A256CbcHs512 => "A256CBC-HS512",
            Self::A128Gcm => "A128GCM",
            Self::A256Gcm => "A256GCM",
        }
    }

    /// Length in bytes of the content encryption key.
    ///
    /// For the CBC-HMAC methods this is the MAC key and
    /// the encryption key concatenated.
    pub fn key_len(&self) -> usize {
        match self {
            Self::A128CbcHs256 => 32,
            Self::A256CbcHs512 => 64,
            Self::A128Gcm => 16,
            Self::A256Gcm => 32,
        }
    }

    /// Length in bytes of the initialization vector.
    pub fn iv_len(&self) -> usize {
        match self {
            Self::A128CbcHs256 | Self::A256CbcHs512 => 16,
            Self::A128Gcm | Self::A256Gcm => 12,
        }
    }

    /// Length in bytes of the authentication tag.
    pub fn tag_len(&self) -> usize {
        match self {
            Self::A128CbcHs256 => 16,
            Self::A256CbcHs512 => 32,
            Self::A128Gcm | Self::A256Gcm => 16,
        }
    }
}

impl fmt::Display for JWEEncryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JWEEncryption {
    type Err = OpaqueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A128CBC-HS256" => Ok(Self::A128CbcHs256),
            "A256CBC-HS512" => Ok(Self::A256CbcHs512),
            "A128GCM" => Ok(Self::A128Gcm),
            "A256GCM" => Ok(Self::A256Gcm),
            _ => Err(OpaqueError::from_display(format!(
                "unsupported content encryption method: {s}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Value of the `alg` member of a [`JWK`](crate::jose::JWK).
///
/// A key set can carry keys for algorithms kuvert has no use for,
/// those are kept as [`JWKAlgorithm::Unknown`] instead of rejecting the set.
pub enum JWKAlgorithm {
    /// Digital signature algorithm.
    Signing(JWA),
    /// Key management algorithm.
    KeyManagement(JWEAlgorithm),
    /// Any other registered or private algorithm name.
    Unknown(String),
}

impl JWKAlgorithm {
    /// Name of the algorithm as found in the `alg` member.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Signing(alg) => alg.as_str(),
            Self::KeyManagement(alg) => alg.as_str(),
            Self::Unknown(alg) => alg,
        }
    }

    /// The signing algorithm, if this is one.
    pub fn signing(&self) -> Option<JWA> {
        match self {
            Self::Signing(alg) => Some(*alg),
            _ => None,
        }
    }

    /// The key management algorithm, if this is one.
    pub fn key_management(&self) -> Option<JWEAlgorithm> {
        match self {
            Self::KeyManagement(alg) => Some(*alg),
            _ => None,
        }
    }
}

impl From<&str> for JWKAlgorithm {
    fn from(value: &str) -> Self {
        if let Ok(alg) = value.parse() {
            Self::Signing(alg)
        } else if let Ok(alg) = value.parse() {
            Self::KeyManagement(alg)
        } else {
            Self::Unknown(value.to_owned())
        }
    }
}

impl From<JWA> for JWKAlgorithm {
    fn from(value: JWA) -> Self {
        Self::Signing(value)
    }
}

impl From<JWEAlgorithm> for JWKAlgorithm {
    fn from(value: JWEAlgorithm) -> Self {
        Self::KeyManagement(value)
    }
}

impl fmt::Display for JWKAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JWKAlgorithm {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JWKAlgorithm {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from(name.as_str()))
    }
}
