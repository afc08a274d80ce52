use std::fmt;

use aws_lc_rs::digest::{Digest, SHA256, digest};
use base64::{Engine as _, prelude::BASE64_URL_SAFE_NO_PAD};
use kuvert_error::{ErrorContext, OpaqueError};
use kuvert_utils::macros::generate_set_and_with;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};

use crate::jose::{
    JWKAlgorithm,
    jwk_utils::{RsaPrivateComponents, create_pkcs8_rsa_private_key, create_subject_public_key_info},
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// [`JWK`] or JSON Web Key as defined in [`rfc7517`]
///
/// A [`JWK`] can hold private key material, but serializing it
/// only ever emits the public members of its [`JWKType`].
///
/// [`rfc7517`]: https://datatracker.ietf.org/doc/html/rfc7517
pub struct JWK {
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
    /// Intended algorithm to be used with this key
    #[serde(skip_serializing_if = "Option::is_none")]
    alg: Option<JWKAlgorithm>,
    #[serde(flatten)]
    key_type: JWKType,
    #[serde(skip_serializing_if = "Option::is_none")]
    r#use: Option<JWKUse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_ops: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    x5c: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    x5t: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "x5t#S256")]
    x5t_sha256: Option<String>,
}

#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "kty")]
/// The "kty" (key type) parameter identifies the cryptographic algorithm family used with the key, such as "RSA", "EC", or "oct"
pub enum JWKType {
    /// RSA key, private when `d` and the CRT members are present
    RSA {
        n: String,
        e: String,
        #[serde(default)]
        d: Option<String>,
        #[serde(default)]
        p: Option<String>,
        #[serde(default)]
        q: Option<String>,
        #[serde(default)]
        dp: Option<String>,
        #[serde(default)]
        dq: Option<String>,
        #[serde(default)]
        qi: Option<String>,
    },
    /// Elliptic curve, private when `d` is present
    EC {
        crv: JWKEllipticCurves,
        x: String,
        y: String,
        #[serde(default)]
        d: Option<String>,
    },
    /// an octet sequence key, which represents a symmetric key
    #[serde(rename = "oct")]
    OCT { k: String },
}

impl Serialize for JWKType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Order here is important as this output will be used to generate jwk thumb
        match &self {
            JWKType::EC { crv, x, y, .. } => {
                let mut state = serializer.serialize_struct("JWKType", 4)?;
                state.serialize_field("crv", crv)?;
                state.serialize_field("kty", "EC")?;
                state.serialize_field("x", x)?;
                state.serialize_field("y", y)?;
                state.end()
            }
            JWKType::RSA { n, e, .. } => {
                let mut state = serializer.serialize_struct("JWKType", 3)?;
                state.serialize_field("e", e)?;
                state.serialize_field("kty", "RSA")?;
                state.serialize_field("n", n)?;
                state.end()
            }
            JWKType::OCT { k } => {
                let mut state = serializer.serialize_struct("JWKType", 2)?;
                state.serialize_field("k", k)?;
                state.serialize_field("kty", "oct")?;
                state.end()
            }
        }
    }
}

impl fmt::Debug for JWKType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RSA { n, e, d, .. } => f
                .debug_struct("RSA")
                .field("n", n)
                .field("e", e)
                .field("private", &d.is_some())
                .finish(),
            Self::EC { crv, x, y, d } => f
                .debug_struct("EC")
                .field("crv", crv)
                .field("x", x)
                .field("y", y)
                .field("private", &d.is_some())
                .finish(),
            Self::OCT { .. } => f.debug_struct("OCT").finish_non_exhaustive(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum JWKEllipticCurves {
    #[serde(rename = "P-256")]
    P256,
    #[serde(rename = "P-384")]
    P384,
    #[serde(rename = "P-521")]
    P521,
}

impl JWKEllipticCurves {
    /// Length in bytes of a single coordinate or private scalar on this curve.
    pub fn coordinate_len(&self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// [`JWKUse`] identifies the intended use of the public key
pub enum JWKUse {
    #[serde(rename = "sig")]
    Signature,
    #[serde(rename = "enc")]
    Encryption,
}

impl JWK {
    /// Create a new [`JWK`] for the given key material,
    /// without any of the optional members set.
    pub fn new(key_type: JWKType) -> Self {
        Self {
            kid: None,
            alg: None,
            key_type,
            r#use: None,
            key_ops: None,
            x5c: None,
            x5t: None,
            x5t_sha256: None,
        }
    }

    generate_set_and_with! {
        /// Set the key id (`kid`) of this [`JWK`]
        pub fn kid(mut self, kid: Option<String>) -> Self {
            self.kid = kid;
            self
        }
    }

    generate_set_and_with! {
        /// Set the intended algorithm (`alg`) of this [`JWK`]
        pub fn alg(mut self, alg: Option<JWKAlgorithm>) -> Self {
            self.alg = alg;
            self
        }
    }

    generate_set_and_with! {
        /// Set the intended use (`use`) of this [`JWK`]
        pub fn key_use(mut self, key_use: Option<JWKUse>) -> Self {
            self.r#use = key_use;
            self
        }
    }

    /// Key id (`kid`) of this [`JWK`], if any
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// Intended algorithm (`alg`) of this [`JWK`], if any
    pub fn alg(&self) -> Option<&JWKAlgorithm> {
        self.alg.as_ref()
    }

    /// Key material of this [`JWK`]
    pub fn key_type(&self) -> &JWKType {
        &self.key_type
    }

    /// Intended use (`use`) of this [`JWK`], if any
    pub fn key_use(&self) -> Option<JWKUse> {
        self.r#use
    }

    /// Permitted operations (`key_ops`) of this [`JWK`], if any
    pub fn key_ops(&self) -> Option<&[String]> {
        self.key_ops.as_deref()
    }

    /// X.509 certificate chain (`x5c`) of this [`JWK`], if any
    pub fn x5c(&self) -> Option<&[String]> {
        self.x5c.as_deref()
    }

    /// SHA-1 certificate thumbprint (`x5t`) of this [`JWK`], if any
    pub fn x5t(&self) -> Option<&str> {
        self.x5t.as_deref()
    }

    /// SHA-256 certificate thumbprint (`x5t#S256`) of this [`JWK`], if any
    pub fn x5t_sha256(&self) -> Option<&str> {
        self.x5t_sha256.as_deref()
    }

    /// Returns true if this [`JWK`] carries private key material.
    pub fn is_private(&self) -> bool {
        match &self.key_type {
            JWKType::RSA { d, .. } | JWKType::EC { d, .. } => d.is_some(),
            JWKType::OCT { .. } => true,
        }
    }

    /// [`JWKThumb`] as defined in [`rfc7638`] is url safe identifier for a [`JWK`]
    ///
    /// [`rfc7638`]: https://datatracker.ietf.org/doc/html/rfc7638
    pub fn thumb_sha256(&self) -> Result<Digest, OpaqueError> {
        Ok(digest(
            &SHA256,
            &serde_json::to_vec(&self.key_type).context("failed to serialise JWK")?,
        ))
    }

    /// Identifier used in logs and errors: the `kid`, or the thumbprint
    /// when no `kid` was provisioned.
    pub fn display_id(&self) -> String {
        match (&self.kid, self.thumb_sha256()) {
            (Some(kid), _) => kid.clone(),
            (None, Ok(thumb)) => BASE64_URL_SAFE_NO_PAD.encode(thumb.as_ref()),
            (None, Err(_)) => "<unidentified>".to_owned(),
        }
    }

    /// DER encoded `SubjectPublicKeyInfo` of an RSA [`JWK`]
    pub(crate) fn rsa_subject_public_key_info(&self) -> Result<Vec<u8>, OpaqueError> {
        let (n, e) = self.rsa_public_components()?;
        Ok(create_subject_public_key_info(&n, &e))
    }

    /// Decoded modulus and public exponent of an RSA [`JWK`]
    pub(crate) fn rsa_public_components(&self) -> Result<(Vec<u8>, Vec<u8>), OpaqueError> {
        match &self.key_type {
            JWKType::RSA { n, e, .. } => Ok((
                decode_member(n, "n")?,
                decode_member(e, "e")?,
            )),
            JWKType::EC { .. } | JWKType::OCT { .. } => {
                Err(OpaqueError::from_display("JWK is not an RSA key"))
            }
        }
    }

    /// PKCS#8 DER encoded private key of an RSA [`JWK`]
    pub(crate) fn rsa_pkcs8_der(&self) -> Result<Vec<u8>, OpaqueError> {
        let JWKType::RSA {
            n,
            e,
            d,
            p,
            q,
            dp,
            dq,
            qi,
        } = &self.key_type
        else {
            return Err(OpaqueError::from_display("JWK is not an RSA key"));
        };

        let components = RsaPrivateComponents {
            n: decode_member(n, "n")?,
            e: decode_member(e, "e")?,
            d: decode_private_member(d.as_deref(), "d")?,
            p: decode_private_member(p.as_deref(), "p")?,
            q: decode_private_member(q.as_deref(), "q")?,
            dp: decode_private_member(dp.as_deref(), "dp")?,
            dq: decode_private_member(dq.as_deref(), "dq")?,
            qi: decode_private_member(qi.as_deref(), "qi")?,
        };
        Ok(create_pkcs8_rsa_private_key(&components))
    }

    /// Uncompressed public point (`0x04 || x || y`) of an EC [`JWK`]
    pub(crate) fn ec_public_point(&self) -> Result<(JWKEllipticCurves, Vec<u8>), OpaqueError> {
        match &self.key_type {
            JWKType::EC { crv, x, y, .. } => {
                let x_bytes = decode_member(x, "x").context("decode ec curve x point")?;
                let y_bytes = decode_member(y, "y").context("decode ec curve y point")?;
                if x_bytes.len() != crv.coordinate_len() || y_bytes.len() != crv.coordinate_len()
                {
                    return Err(OpaqueError::from_display(
                        "ec curve point does not match curve size",
                    ));
                }

                let mut point_bytes = Vec::with_capacity(1 + x_bytes.len() + y_bytes.len());
                point_bytes.push(0x04);
                point_bytes.extend_from_slice(&x_bytes);
                point_bytes.extend_from_slice(&y_bytes);
                Ok((*crv, point_bytes))
            }
            JWKType::RSA { .. } | JWKType::OCT { .. } => {
                Err(OpaqueError::from_display("JWK is not an elliptic curve key"))
            }
        }
    }

    /// Private scalar of an EC [`JWK`]
    pub(crate) fn ec_private_scalar(&self) -> Result<Vec<u8>, OpaqueError> {
        match &self.key_type {
            JWKType::EC { d, .. } => decode_private_member(d.as_deref(), "d"),
            JWKType::RSA { .. } | JWKType::OCT { .. } => {
                Err(OpaqueError::from_display("JWK is not an elliptic curve key"))
            }
        }
    }

    /// Check that the key material can actually be decoded,
    /// so that a set with a broken key is rejected as a whole.
    pub(crate) fn validate_material(&self) -> Result<(), OpaqueError> {
        match &self.key_type {
            JWKType::RSA { d, .. } => {
                if d.is_some() {
                    self.rsa_pkcs8_der().map(|_| ())
                } else {
                    self.rsa_public_components().map(|_| ())
                }
            }
            JWKType::EC { d, .. } => {
                self.ec_public_point()?;
                if d.is_some() {
                    self.ec_private_scalar()?;
                }
                Ok(())
            }
            JWKType::OCT { k } => decode_member(k, "k").map(|_| ()),
        }
    }
}

fn decode_member(value: &str, name: &'static str) -> Result<Vec<u8>, OpaqueError> {
    BASE64_URL_SAFE_NO_PAD
        .decode(value)
        .with_context(|| format!("decode JWK member '{name}'"))
}

fn decode_private_member(value: Option<&str>, name: &'static str) -> Result<Vec<u8>, OpaqueError> {
    let value = value.with_context(|| format!("JWK private member '{name}'"))?;
    decode_member(value, name)
}
