use std::{fmt, str::FromStr};

use aws_lc_rs::rand::SystemRandom;
use kuvert_error::{BoxError, ErrorContext as _, OpaqueError};
use kuvert_utils::macros::generate_set_and_with;
use serde::{Deserialize, Serialize};

use crate::jose::{
    Headers, JWEEncryption, content,
    segment::{self, JWE_COMPACT_SEGMENTS},
};

/// [`KeyEncryptor`] wraps the content encryption key of a JWE
/// for its recipient and sets the headers the recipient needs to unwrap it.
pub trait KeyEncryptor {
    type Error: Into<BoxError>;

    /// Set headers which are needed to unwrap the key
    ///
    /// Example headers are: `alg`, `kid`
    fn set_headers(&self, protected_headers: &mut Headers) -> Result<(), Self::Error>;

    /// Wrap the content encryption key
    fn encrypt_key(&self, cek: &[u8]) -> Result<Vec<u8>, Self::Error>;
}

/// [`KeyDecryptor`] unwraps the content encryption key of a received JWE
pub trait KeyDecryptor {
    type Error: Into<BoxError>;

    /// Unwrap the content encryption key
    ///
    /// The protected headers are passed in so that the
    /// implementation can refuse an `alg` it is not meant for.
    fn decrypt_key(
        &self,
        protected_headers: &Headers,
        encrypted_key: &[u8],
    ) -> Result<Vec<u8>, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// [`JWEBuilder`] should be used when creating a [`JWECompact`]
pub struct JWEBuilder {
    enc: JWEEncryption,
    protected_headers: Headers,
    plaintext: Vec<u8>,
}

impl JWEBuilder {
    /// Create a new builder for the given content encryption method
    pub fn new(enc: JWEEncryption) -> Self {
        Self {
            enc,
            protected_headers: Headers::default(),
            plaintext: Vec::new(),
        }
    }

    generate_set_and_with! {
        /// Set the plaintext to be encrypted
        pub fn plaintext(mut self, plaintext: impl AsRef<[u8]>) -> Self {
            self.plaintext = plaintext.as_ref().to_vec();
            self
        }
    }

    generate_set_and_with! {
        /// Set provided header in the protected header map
        ///
        /// Warning: `alg` and `enc` are always overwritten when building
        pub fn protected_header(
            mut self,
            name: String,
            value: impl Serialize,
        ) -> Result<Self, OpaqueError> {
            self.protected_headers.try_set_header(name, value)?;
            Ok(self)
        }
    }

    /// Encrypt the plaintext and generate the compact serialization
    ///
    /// A fresh content encryption key and initialization vector
    /// are generated for every call.
    pub fn build_compact(
        mut self,
        encryptor: &impl KeyEncryptor,
    ) -> Result<JWECompact, OpaqueError> {
        encryptor
            .set_headers(&mut self.protected_headers)
            .map_err(|err| OpaqueError::from_boxed(err.into()))
            .context("encryptor set headers")?;
        self.protected_headers
            .try_set_header("enc".to_owned(), self.enc)?;

        let rng = SystemRandom::new();
        let cek = content::random_bytes(&rng, self.enc.key_len())?;
        let iv = content::random_bytes(&rng, self.enc.iv_len())?;

        let encrypted_key = encryptor
            .encrypt_key(&cek)
            .map_err(|err| OpaqueError::from_boxed(err.into()))
            .context("encryptor wrap content encryption key")?;

        let protected = self.protected_headers.as_encoded_string()?;
        // the additional authenticated data is the ASCII of the encoded protected header
        let sealed = content::encrypt(self.enc, &cek, &iv, protected.as_bytes(), &self.plaintext)
            .context("encrypt content")?;

        Ok(JWECompact(segment::join_segments([
            protected,
            segment::encode_segment(encrypted_key),
            segment::encode_segment(iv),
            segment::encode_segment(sealed.ciphertext),
            segment::encode_segment(sealed.tag),
        ])))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// [`JWECompact`] is a compact `JWE` representation as defined in [`rfc7516, section 7.1`]
///
/// [`rfc7516, section 7.1`]: https://datatracker.ietf.org/doc/html/rfc7516#section-7.1
pub struct JWECompact(String);

impl JWECompact {
    /// Create a builder which can be used to create a [`JWECompact`]
    pub fn builder(enc: JWEEncryption) -> JWEBuilder {
        JWEBuilder::new(enc)
    }

    /// The compact serialization as a str
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume this [`JWECompact`] into its compact serialization
    pub fn into_string(self) -> String {
        self.0
    }

    /// Decrypt this [`JWECompact`] with the given [`KeyDecryptor`]
    pub fn decrypt(&self, decryptor: &impl KeyDecryptor) -> Result<DecryptedJWE, OpaqueError> {
        let [protected, encrypted_key, iv, ciphertext, tag] =
            segment::split_compact::<JWE_COMPACT_SEGMENTS>(&self.0)?;

        let protected_headers = Headers::from_encoded_str(protected)?;
        let enc: JWEEncryption = protected_headers
            .get("enc")
            .and_then(|enc| enc.as_str())
            .context("protected header enc")?
            .parse()?;

        let encrypted_key = segment::decode_segment(encrypted_key).context("decode encrypted key")?;
        let iv = segment::decode_segment(iv).context("decode initialization vector")?;
        let ciphertext = segment::decode_segment(ciphertext).context("decode ciphertext")?;
        let tag = segment::decode_segment(tag).context("decode authentication tag")?;

        let cek = decryptor
            .decrypt_key(&protected_headers, &encrypted_key)
            .map_err(|err| OpaqueError::from_boxed(err.into()))
            .context("decryptor unwrap content encryption key")?;

        let plaintext = content::decrypt(enc, &cek, &iv, protected.as_bytes(), &ciphertext, &tag)
            .context("decrypt content")?;

        Ok(DecryptedJWE {
            protected: protected_headers,
            enc,
            plaintext,
        })
    }
}

impl FromStr for JWECompact {
    type Err = OpaqueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        segment::split_compact::<JWE_COMPACT_SEGMENTS>(s).context("parse compact jwe")?;
        Ok(Self(s.to_owned()))
    }
}

impl fmt::Display for JWECompact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<JWECompact> for String {
    fn from(value: JWECompact) -> Self {
        value.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Decrypted version of a [`JWECompact`]
///
/// The plaintext has passed the integrity check of its content encryption method.
pub struct DecryptedJWE {
    protected: Headers,
    enc: JWEEncryption,
    plaintext: Vec<u8>,
}

impl DecryptedJWE {
    /// Reference to the protected [`Headers`]
    pub fn protected_headers(&self) -> &Headers {
        &self.protected
    }

    /// Trying decoding the protected headers to the provided `T`
    pub fn decode_protected_headers<'de, 'a: 'de, T: Deserialize<'de>>(
        &'a self,
    ) -> Result<T, OpaqueError> {
        self.protected.decode()
    }

    /// Content encryption method that was used
    pub fn enc(&self) -> JWEEncryption {
        self.enc
    }

    /// Reference to the plaintext
    pub fn plaintext(&self) -> &[u8] {
        &self.plaintext
    }

    /// Consume into the plaintext
    pub fn into_plaintext(self) -> Vec<u8> {
        self.plaintext
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_err;

    use super::*;

    // Wraps by xor-ing with a fixed byte, only good enough to test the plumbing
    struct XorKey(u8);

    impl KeyEncryptor for XorKey {
        type Error = OpaqueError;

        fn set_headers(&self, protected_headers: &mut Headers) -> Result<(), OpaqueError> {
            protected_headers.try_set_header("alg".to_owned(), "xor")?;
            protected_headers.try_set_header("kid".to_owned(), "xor-key")?;
            Ok(())
        }

        fn encrypt_key(&self, cek: &[u8]) -> Result<Vec<u8>, OpaqueError> {
            Ok(cek.iter().map(|b| b ^ self.0).collect())
        }
    }

    impl KeyDecryptor for XorKey {
        type Error = OpaqueError;

        fn decrypt_key(
            &self,
            protected_headers: &Headers,
            encrypted_key: &[u8],
        ) -> Result<Vec<u8>, OpaqueError> {
            if protected_headers.get("alg").and_then(|v| v.as_str()) != Some("xor") {
                return Err(OpaqueError::from_display("unexpected alg"));
            }
            Ok(encrypted_key.iter().map(|b| b ^ self.0).collect())
        }
    }

    #[derive(Debug, Deserialize, PartialEq, Eq)]
    struct Protected {
        alg: String,
        enc: JWEEncryption,
        kid: String,
    }

    #[test]
    fn can_encrypt_and_decrypt_compact() {
        let key = XorKey(0x5a);
        let jwe = JWECompact::builder(JWEEncryption::A256CbcHs512)
            .with_plaintext(r#"{"amount":100}"#)
            .build_compact(&key)
            .unwrap();
        assert_eq!(jwe.as_str().split('.').count(), 5);

        let received: JWECompact = jwe.to_string().parse().unwrap();
        let decrypted = received.decrypt(&key).unwrap();
        assert_eq!(decrypted.plaintext(), br#"{"amount":100}"#);
        assert_eq!(decrypted.enc(), JWEEncryption::A256CbcHs512);
        assert_eq!(
            decrypted.decode_protected_headers::<Protected>().unwrap(),
            Protected {
                alg: "xor".to_owned(),
                enc: JWEEncryption::A256CbcHs512,
                kid: "xor-key".to_owned(),
            }
        );
    }

    #[test]
    fn every_call_uses_a_fresh_key_and_iv() {
        let key = XorKey(0x01);
        let a = JWECompact::builder(JWEEncryption::A128Gcm)
            .with_plaintext("same")
            .build_compact(&key)
            .unwrap();
        let b = JWECompact::builder(JWEEncryption::A128Gcm)
            .with_plaintext("same")
            .build_compact(&key)
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails() {
        let jwe = JWECompact::builder(JWEEncryption::A128CbcHs256)
            .with_plaintext("secret")
            .build_compact(&XorKey(0x01))
            .unwrap();
        assert_err!(jwe.decrypt(&XorKey(0x02)));
    }

    #[test]
    fn tampering_should_be_detected() {
        let key = XorKey(0x33);
        let jwe = JWECompact::builder(JWEEncryption::A256CbcHs512)
            .with_plaintext(r#"{"amount":100}"#)
            .build_compact(&key)
            .unwrap()
            .into_string();

        // the xor wrapped key has no integrity of its own, so that segment is skipped
        let mut segment_index = 0;
        for i in 0..jwe.len() - 1 {
            if jwe.as_bytes()[i] == b'.' {
                segment_index += 1;
                continue;
            }
            if segment_index == 1 {
                continue;
            }
            let mut tampered = jwe.clone().into_bytes();
            tampered[i] = if tampered[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(tampered).unwrap();

            let result = tampered
                .parse::<JWECompact>()
                .and_then(|jwe| jwe.decrypt(&key));
            assert_err!(result, "failed at {i}");
        }
    }

    #[test]
    fn unsupported_enc_is_rejected() {
        let key = XorKey(0x01);
        let jwe = JWECompact::builder(JWEEncryption::A128Gcm)
            .with_plaintext("x")
            .build_compact(&key)
            .unwrap()
            .into_string();
        let [_, rest @ ..] = segment::split_compact::<5>(&jwe).unwrap();

        let header = segment::encode_segment(r#"{"alg":"xor","enc":"A192GCM","kid":"xor-key"}"#);
        let forged = segment::join_segments(std::iter::once(header.as_str()).chain(rest));
        assert_err!(forged.parse::<JWECompact>().unwrap().decrypt(&key));
    }
}
