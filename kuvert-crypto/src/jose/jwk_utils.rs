//! Minimal DER writers used to hand RSA JWK material to `aws-lc-rs`.
//!
//! A JWK carries the raw big-endian integers of an RSA key, while `aws-lc-rs`
//! wants them as DER documents: a `SubjectPublicKeyInfo` for public keys and a
//! PKCS#8 `PrivateKeyInfo` for private keys. Only the handful of ASN.1 types
//! these two documents need are supported.

use crate::jose::constants::{
    BIT_STRING_NO_UNUSED_BITS, DER_LENGTH_SHORT_FORM_MAX, DER_TAG_BIT_STRING, DER_TAG_INTEGER,
    DER_TAG_OCTET_STRING, DER_TAG_SEQUENCE, DER_VERSION_ZERO, INTEGER_SIGN_BIT_MASK,
    RSA_ALGORITHM_IDENTIFIER,
};

/// Decoded big-endian integers of a two-prime RSA private key,
/// named after their JWK members (RFC 7518, section 6.3.2).
pub(crate) struct RsaPrivateComponents {
    pub(crate) n: Vec<u8>,
    pub(crate) e: Vec<u8>,
    pub(crate) d: Vec<u8>,
    pub(crate) p: Vec<u8>,
    pub(crate) q: Vec<u8>,
    pub(crate) dp: Vec<u8>,
    pub(crate) dq: Vec<u8>,
    pub(crate) qi: Vec<u8>,
}

/// In section 4.1 of [RFC 5280](https://datatracker.ietf.org/doc/rfc5280/) the standard DER
/// encoded public key format is defined as
///```rust,ignore
/// SubjectPublicKeyInfo = SEQUENCE {
///     algorithm AlgorithmIdentifier,
///     subjectPublicKey BIT STRING
/// }
///```
/// where the bit string holds the DER encoded
///```rust,ignore
/// RSAPublicKey = SEQUENCE {
///     modulus INTEGER,
///     exponent INTEGER,
/// }
/// ```
/// of section 2.3.1 of [RFC 3279](https://datatracker.ietf.org/doc/rfc3279/).
pub(crate) fn create_subject_public_key_info(n: &[u8], e: &[u8]) -> Vec<u8> {
    let rsa_public_key = encode_sequence(&[&encode_integer(n), &encode_integer(e)]);

    let mut bit_string_content = Vec::with_capacity(1 + rsa_public_key.len());
    bit_string_content.push(BIT_STRING_NO_UNUSED_BITS);
    bit_string_content.extend_from_slice(&rsa_public_key);

    encode_sequence(&[
        &RSA_ALGORITHM_IDENTIFIER,
        &encode_tlv(DER_TAG_BIT_STRING, &bit_string_content),
    ])
}

/// Section 5 of [RFC 5208](https://datatracker.ietf.org/doc/rfc5208/) defines
///```rust,ignore
/// PrivateKeyInfo = SEQUENCE {
///     version Version,
///     privateKeyAlgorithm AlgorithmIdentifier,
///     privateKey OCTET STRING
/// }
///```
/// where for RSA the octet string holds the DER encoded `RSAPrivateKey`
/// of appendix A.1.2 of [RFC 8017](https://datatracker.ietf.org/doc/rfc8017/):
///```rust,ignore
/// RSAPrivateKey = SEQUENCE {
///     version INTEGER, modulus INTEGER, publicExponent INTEGER,
///     privateExponent INTEGER, prime1 INTEGER, prime2 INTEGER,
///     exponent1 INTEGER, exponent2 INTEGER, coefficient INTEGER
/// }
///```
pub(crate) fn create_pkcs8_rsa_private_key(key: &RsaPrivateComponents) -> Vec<u8> {
    let version = encode_integer(&[DER_VERSION_ZERO]);
    let rsa_private_key = encode_sequence(&[
        &version,
        &encode_integer(&key.n),
        &encode_integer(&key.e),
        &encode_integer(&key.d),
        &encode_integer(&key.p),
        &encode_integer(&key.q),
        &encode_integer(&key.dp),
        &encode_integer(&key.dq),
        &encode_integer(&key.qi),
    ]);

    encode_sequence(&[
        &version,
        &RSA_ALGORITHM_IDENTIFIER,
        &encode_tlv(DER_TAG_OCTET_STRING, &rsa_private_key),
    ])
}

fn encode_sequence(parts: &[&[u8]]) -> Vec<u8> {
    let content_len = parts.iter().map(|part| part.len()).sum();
    let mut content = Vec::with_capacity(content_len);
    for part in parts {
        content.extend_from_slice(part);
    }
    encode_tlv(DER_TAG_SEQUENCE, &content)
}

fn encode_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let len = encode_der_length(content.len());
    let mut result = Vec::with_capacity(1 + len.len() + content.len());
    result.push(tag);
    result.extend_from_slice(&len);
    result.extend_from_slice(content);
    result
}

/// This function is an implementation of length encoding as defined in section 8.1.3
/// [ITU X.690](https://www.itu.int/ITU-T/studygroups/com17/languages/X.690-0207.pdf) specification.
fn encode_der_length(len: usize) -> Vec<u8> {
    if len <= DER_LENGTH_SHORT_FORM_MAX {
        return vec![len as u8];
    }

    let len_bytes = len.to_be_bytes();
    let first_significant = len_bytes
        .iter()
        .position(|byte| *byte != 0)
        .unwrap_or(len_bytes.len() - 1);
    let len_bytes = &len_bytes[first_significant..];

    let mut result = Vec::with_capacity(1 + len_bytes.len());
    result.push(INTEGER_SIGN_BIT_MASK | len_bytes.len() as u8);
    result.extend_from_slice(len_bytes);
    result
}

/// Minimal DER encoding of a non-negative big-endian integer,
/// as defined in section 8.3 of
/// [ITU X.690](https://www.itu.int/ITU-T/studygroups/com17/languages/X.690-0207.pdf).
///
/// Leading zero octets are stripped (JWK producers are not always minimal)
/// and a single zero octet is prepended when the sign bit would otherwise be set.
/// Not a general purpose ASN.1 integer encoder.
pub(crate) fn encode_integer(value: &[u8]) -> Vec<u8> {
    let first_significant = value.iter().position(|byte| *byte != 0);
    let magnitude = match first_significant {
        Some(idx) => &value[idx..],
        None => &[0u8][..],
    };

    let needs_leading_zero = magnitude[0] & INTEGER_SIGN_BIT_MASK != 0;
    let mut content = Vec::with_capacity(magnitude.len() + needs_leading_zero as usize);
    if needs_leading_zero {
        content.push(0);
    }
    content.extend_from_slice(magnitude);

    encode_tlv(DER_TAG_INTEGER, &content)
}
