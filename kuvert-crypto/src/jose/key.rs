//! Operational keys built from a [`JWK`].
//!
//! A [`JWK`] is only a description of key material. The types in this module
//! turn that description into `aws-lc-rs` keys once, so that signing,
//! verifying, wrapping and unwrapping can be done without re-parsing.

use std::fmt;

use aws_lc_rs::{
    rand::SystemRandom,
    rsa::{
        OaepPrivateDecryptingKey, OaepPublicEncryptingKey, PrivateDecryptingKey,
        PublicEncryptingKey,
    },
    signature::{
        EcdsaKeyPair, EcdsaSigningAlgorithm, EcdsaVerificationAlgorithm, RsaEncoding, RsaKeyPair,
        RsaParameters, RsaPublicKeyComponents, UnparsedPublicKey,
    },
};
use base64::{Engine as _, prelude::BASE64_URL_SAFE_NO_PAD};
use kuvert_error::{ErrorContext, OpaqueError};

use crate::jose::{
    Headers, JWA, JWEAlgorithm, JWK, JWKEllipticCurves, KeyDecryptor, KeyEncryptor, Signer,
    ToVerifySignature, Verifier,
};

fn signing_alg(jwk: &JWK) -> Result<JWA, OpaqueError> {
    jwk.alg()
        .and_then(|alg| alg.signing())
        .context("JWK has no supported signing algorithm")
}

fn key_management_alg(jwk: &JWK) -> Result<JWEAlgorithm, OpaqueError> {
    jwk.alg()
        .and_then(|alg| alg.key_management())
        .context("JWK has no supported key management algorithm")
}

fn check_curve(alg: JWA, crv: JWKEllipticCurves) -> Result<(), OpaqueError> {
    if JWKEllipticCurves::try_from(alg)? != crv {
        return Err(OpaqueError::from_display(format!(
            "curve {crv:?} cannot be used with {alg}"
        )));
    }
    Ok(())
}

enum SigningKeyPair {
    Rsa(RsaKeyPair),
    Ecdsa(EcdsaKeyPair),
}

/// [`SigningKey`] is the private half of a signing [`JWK`]
///
/// It implements [`Signer`], setting the `alg` and `kid` protected headers.
pub struct SigningKey {
    kid: Option<String>,
    alg: JWA,
    rng: SystemRandom,
    inner: SigningKeyPair,
}

impl SigningKey {
    /// Create a [`SigningKey`] from a private [`JWK`] whose `alg` is a [`JWA`]
    pub fn from_jwk(jwk: &JWK) -> Result<Self, OpaqueError> {
        let alg = signing_alg(jwk)?;

        let inner = if alg.is_rsa() {
            let der = jwk.rsa_pkcs8_der()?;
            let key_pair = RsaKeyPair::from_pkcs8(&der).context("create RsaKeyPair from JWK")?;
            SigningKeyPair::Rsa(key_pair)
        } else {
            let (crv, point) = jwk.ec_public_point()?;
            check_curve(alg, crv)?;
            let scalar = jwk.ec_private_scalar()?;
            let ec_alg: &'static EcdsaSigningAlgorithm = alg.try_into()?;
            let key_pair = EcdsaKeyPair::from_private_key_and_public_key(ec_alg, &scalar, &point)
                .context("create EcdsaKeyPair from JWK")?;
            SigningKeyPair::Ecdsa(key_pair)
        };

        Ok(Self {
            kid: jwk.kid().map(ToOwned::to_owned),
            alg,
            rng: SystemRandom::new(),
            inner,
        })
    }

    /// Algorithm this key signs with
    pub fn alg(&self) -> JWA {
        self.alg
    }

    /// Key id of the [`JWK`] this key was created from
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("alg", &self.alg)
            .finish_non_exhaustive()
    }
}

impl Signer for SigningKey {
    type Signature = Vec<u8>;
    type Error = OpaqueError;

    fn set_headers(
        &self,
        protected_headers: &mut Headers,
        _unprotected_headers: &mut Headers,
    ) -> Result<(), Self::Error> {
        protected_headers.try_set_header("alg".to_owned(), self.alg)?;
        if let Some(kid) = &self.kid {
            protected_headers.try_set_header("kid".to_owned(), kid)?;
        }
        Ok(())
    }

    fn sign(&self, data: &str) -> Result<Self::Signature, Self::Error> {
        match &self.inner {
            SigningKeyPair::Rsa(key_pair) => {
                let encoding: &'static dyn RsaEncoding = self.alg.try_into()?;
                let mut signature = vec![0; key_pair.public_modulus_len()];
                key_pair
                    .sign(encoding, &self.rng, data.as_bytes(), &mut signature)
                    .context("rsa sign")?;
                Ok(signature)
            }
            SigningKeyPair::Ecdsa(key_pair) => {
                let signature = key_pair
                    .sign(&self.rng, data.as_bytes())
                    .context("ecdsa sign")?;
                Ok(signature.as_ref().to_vec())
            }
        }
    }
}

enum PublicKey {
    Rsa(RsaPublicKeyComponents<Vec<u8>>),
    Ecdsa(UnparsedPublicKey<Vec<u8>>),
}

/// [`VerifyingKey`] is the public half of a signing [`JWK`]
///
/// It can be created from a public as well as from a private [`JWK`],
/// only the public members are used.
pub struct VerifyingKey {
    kid: Option<String>,
    alg: JWA,
    inner: PublicKey,
}

impl VerifyingKey {
    /// Create a [`VerifyingKey`] from a [`JWK`] whose `alg` is a [`JWA`]
    pub fn from_jwk(jwk: &JWK) -> Result<Self, OpaqueError> {
        let alg = signing_alg(jwk)?;

        let inner = if alg.is_rsa() {
            let (n, e) = jwk.rsa_public_components()?;
            PublicKey::Rsa(RsaPublicKeyComponents { n, e })
        } else {
            let (crv, point) = jwk.ec_public_point()?;
            check_curve(alg, crv)?;
            let ec_alg: &'static EcdsaVerificationAlgorithm = alg.try_into()?;
            PublicKey::Ecdsa(UnparsedPublicKey::new(ec_alg, point))
        };

        Ok(Self {
            kid: jwk.kid().map(ToOwned::to_owned),
            alg,
            inner,
        })
    }

    /// Algorithm this key verifies
    pub fn alg(&self) -> JWA {
        self.alg
    }

    /// Key id of the [`JWK`] this key was created from
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// Verify a raw signature over `message`
    pub fn verify_signature(&self, message: &[u8], signature: &[u8]) -> Result<(), OpaqueError> {
        match &self.inner {
            PublicKey::Rsa(components) => {
                let params: &'static RsaParameters = self.alg.try_into()?;
                components
                    .verify(params, message, signature)
                    .context("rsa verify")
            }
            PublicKey::Ecdsa(key) => key.verify(message, signature).context("ecdsa verify"),
        }
    }
}

impl fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyingKey")
            .field("kid", &self.kid)
            .field("alg", &self.alg)
            .finish_non_exhaustive()
    }
}

impl Verifier for VerifyingKey {
    type Error = OpaqueError;

    fn verify(&self, _payload: &[u8], signatures: &[ToVerifySignature]) -> Result<(), Self::Error> {
        let [to_verify] = signatures else {
            return Err(OpaqueError::from_display(
                "expected exactly one signature to verify",
            ));
        };

        let header_alg = to_verify
            .decoded_signature()
            .protected_headers()
            .get("alg")
            .and_then(|alg| alg.as_str())
            .context("protected header alg")?;
        if header_alg != self.alg.as_str() {
            return Err(OpaqueError::from_display(format!(
                "protected header alg {header_alg} does not match key alg {}",
                self.alg
            )));
        }

        let signature = BASE64_URL_SAFE_NO_PAD
            .decode(to_verify.decoded_signature().signature())
            .context("decode signature")?;
        self.verify_signature(to_verify.signed_data().as_bytes(), &signature)
    }
}

/// [`EncryptingKey`] wraps content encryption keys with the public half
/// of an RSA-OAEP [`JWK`]
pub struct EncryptingKey {
    kid: Option<String>,
    alg: JWEAlgorithm,
    inner: OaepPublicEncryptingKey,
}

impl EncryptingKey {
    /// Create an [`EncryptingKey`] from an RSA [`JWK`] whose `alg` is a [`JWEAlgorithm`]
    pub fn from_jwk(jwk: &JWK) -> Result<Self, OpaqueError> {
        let alg = key_management_alg(jwk)?;
        let der = jwk.rsa_subject_public_key_info()?;
        let public_key =
            PublicEncryptingKey::from_der(&der).context("create PublicEncryptingKey from JWK")?;
        let inner = OaepPublicEncryptingKey::new(public_key).context("create oaep public key")?;

        Ok(Self {
            kid: jwk.kid().map(ToOwned::to_owned),
            alg,
            inner,
        })
    }

    /// Key management algorithm of this key
    pub fn alg(&self) -> JWEAlgorithm {
        self.alg
    }

    /// Key id of the [`JWK`] this key was created from
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }
}

impl fmt::Debug for EncryptingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptingKey")
            .field("kid", &self.kid)
            .field("alg", &self.alg)
            .finish_non_exhaustive()
    }
}

impl KeyEncryptor for EncryptingKey {
    type Error = OpaqueError;

    fn set_headers(&self, protected_headers: &mut Headers) -> Result<(), Self::Error> {
        protected_headers.try_set_header("alg".to_owned(), self.alg)?;
        if let Some(kid) = &self.kid {
            protected_headers.try_set_header("kid".to_owned(), kid)?;
        }
        Ok(())
    }

    fn encrypt_key(&self, cek: &[u8]) -> Result<Vec<u8>, Self::Error> {
        let mut output = vec![0; self.inner.ciphertext_size()];
        let wrapped = self
            .inner
            .encrypt(self.alg.oaep_algorithm(), cek, &mut output, None)
            .context("oaep encrypt content encryption key")?;
        Ok(wrapped.to_vec())
    }
}

/// [`DecryptingKey`] unwraps content encryption keys with the private half
/// of an RSA-OAEP [`JWK`]
pub struct DecryptingKey {
    kid: Option<String>,
    alg: JWEAlgorithm,
    inner: OaepPrivateDecryptingKey,
}

impl DecryptingKey {
    /// Create a [`DecryptingKey`] from a private RSA [`JWK`] whose `alg` is a [`JWEAlgorithm`]
    pub fn from_jwk(jwk: &JWK) -> Result<Self, OpaqueError> {
        let alg = key_management_alg(jwk)?;
        let der = jwk.rsa_pkcs8_der()?;
        let private_key =
            PrivateDecryptingKey::from_pkcs8(&der).context("create PrivateDecryptingKey from JWK")?;
        let inner =
            OaepPrivateDecryptingKey::new(private_key).context("create oaep private key")?;

        Ok(Self {
            kid: jwk.kid().map(ToOwned::to_owned),
            alg,
            inner,
        })
    }

    /// Key management algorithm of this key
    pub fn alg(&self) -> JWEAlgorithm {
        self.alg
    }

    /// Key id of the [`JWK`] this key was created from
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }
}

impl fmt::Debug for DecryptingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptingKey")
            .field("kid", &self.kid)
            .field("alg", &self.alg)
            .finish_non_exhaustive()
    }
}

impl KeyDecryptor for DecryptingKey {
    type Error = OpaqueError;

    fn decrypt_key(
        &self,
        protected_headers: &Headers,
        encrypted_key: &[u8],
    ) -> Result<Vec<u8>, Self::Error> {
        let header_alg = protected_headers
            .get("alg")
            .and_then(|alg| alg.as_str())
            .context("protected header alg")?;
        if header_alg != self.alg.as_str() {
            return Err(OpaqueError::from_display(format!(
                "protected header alg {header_alg} does not match key alg {}",
                self.alg
            )));
        }

        let mut output = vec![0; self.inner.min_output_size()];
        let cek = self
            .inner
            .decrypt(self.alg.oaep_algorithm(), encrypted_key, &mut output, None)
            .context("oaep decrypt content encryption key")?;
        Ok(cek.to_vec())
    }
}
