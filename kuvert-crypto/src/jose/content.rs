//! Content encryption of a JWE, as defined in [`rfc7518, section 5`].
//!
//! [`rfc7518, section 5`]: https://datatracker.ietf.org/doc/html/rfc7518#section-5

use aws_lc_rs::{
    aead::{AES_128_GCM, AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey},
    cipher::{
        AES_128, AES_256, DecryptionContext, EncryptionContext, PaddedBlockDecryptingKey,
        PaddedBlockEncryptingKey, UnboundCipherKey,
    },
    constant_time,
    hmac::{self, HMAC_SHA256, HMAC_SHA512},
    iv::FixedLength,
    rand::{SecureRandom, SystemRandom},
};
use kuvert_error::{ErrorContext as _, OpaqueError};

use crate::jose::JWEEncryption;

const AES_CBC_IV_LEN: usize = 16;

/// Output of [`encrypt`]
pub(crate) struct Sealed {
    pub(crate) ciphertext: Vec<u8>,
    pub(crate) tag: Vec<u8>,
}

/// Generate `len` random bytes, used for content encryption keys and IVs.
pub(crate) fn random_bytes(rng: &SystemRandom, len: usize) -> Result<Vec<u8>, OpaqueError> {
    let mut bytes = vec![0; len];
    rng.fill(&mut bytes).context("fill random bytes")?;
    Ok(bytes)
}

/// Encrypt and authenticate `plaintext` and `aad` with the given content encryption key.
pub(crate) fn encrypt(
    enc: JWEEncryption,
    cek: &[u8],
    iv: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Sealed, OpaqueError> {
    check_lengths(enc, cek, iv)?;
    match enc {
        JWEEncryption::A128CbcHs256 | JWEEncryption::A256CbcHs512 => {
            cbc_hmac_encrypt(enc, cek, iv, aad, plaintext)
        }
        JWEEncryption::A128Gcm | JWEEncryption::A256Gcm => {
            gcm_encrypt(enc, cek, iv, aad, plaintext)
        }
    }
}

/// Check the authentication tag and decrypt `ciphertext`.
pub(crate) fn decrypt(
    enc: JWEEncryption,
    cek: &[u8],
    iv: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, OpaqueError> {
    check_lengths(enc, cek, iv)?;
    if tag.len() != enc.tag_len() {
        return Err(OpaqueError::from_display(format!(
            "authentication tag of {} bytes, {enc} expects {}",
            tag.len(),
            enc.tag_len()
        )));
    }
    match enc {
        JWEEncryption::A128CbcHs256 | JWEEncryption::A256CbcHs512 => {
            cbc_hmac_decrypt(enc, cek, iv, aad, ciphertext, tag)
        }
        JWEEncryption::A128Gcm | JWEEncryption::A256Gcm => {
            gcm_decrypt(enc, cek, iv, aad, ciphertext, tag)
        }
    }
}

fn check_lengths(enc: JWEEncryption, cek: &[u8], iv: &[u8]) -> Result<(), OpaqueError> {
    if cek.len() != enc.key_len() {
        return Err(OpaqueError::from_display(format!(
            "content encryption key of {} bytes, {enc} expects {}",
            cek.len(),
            enc.key_len()
        )));
    }
    if iv.len() != enc.iv_len() {
        return Err(OpaqueError::from_display(format!(
            "initialization vector of {} bytes, {enc} expects {}",
            iv.len(),
            enc.iv_len()
        )));
    }
    Ok(())
}

// MAC_KEY is the first half of the CEK, ENC_KEY the second half
fn split_cbc_hmac_key(enc: JWEEncryption, cek: &[u8]) -> (&[u8], &[u8]) {
    cek.split_at(enc.key_len() / 2)
}

fn cbc_hmac_tag(
    enc: JWEEncryption,
    mac_key: &[u8],
    iv: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
) -> Vec<u8> {
    let algorithm = match enc {
        JWEEncryption::A256CbcHs512 => HMAC_SHA512,
        _ => HMAC_SHA256,
    };
    let key = hmac::Key::new(algorithm, mac_key);
    // AL: number of bits in the AAD as a 64-bit big-endian integer
    let aad_len_bits = (aad.len() as u64).saturating_mul(8).to_be_bytes();

    let mut ctx = hmac::Context::with_key(&key);
    ctx.update(aad);
    ctx.update(iv);
    ctx.update(ciphertext);
    ctx.update(&aad_len_bits);
    let mac = ctx.sign();
    mac.as_ref()[..enc.tag_len()].to_vec()
}

fn cbc_cipher_key(enc: JWEEncryption, enc_key: &[u8]) -> Result<UnboundCipherKey, OpaqueError> {
    let algorithm = match enc {
        JWEEncryption::A256CbcHs512 => &AES_256,
        _ => &AES_128,
    };
    UnboundCipherKey::new(algorithm, enc_key).context("create aes cbc key")
}

fn cbc_iv(iv: &[u8]) -> Result<FixedLength<AES_CBC_IV_LEN>, OpaqueError> {
    let iv: [u8; AES_CBC_IV_LEN] = iv
        .try_into()
        .map_err(|_| OpaqueError::from_display("aes cbc iv must be 16 bytes"))?;
    Ok(FixedLength::from(iv))
}

fn cbc_hmac_encrypt(
    enc: JWEEncryption,
    cek: &[u8],
    iv: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Sealed, OpaqueError> {
    let (mac_key, enc_key) = split_cbc_hmac_key(enc, cek);

    let key = PaddedBlockEncryptingKey::cbc_pkcs7(cbc_cipher_key(enc, enc_key)?)
        .context("create aes cbc encrypting key")?;
    let mut ciphertext = plaintext.to_vec();
    key.less_safe_encrypt(&mut ciphertext, EncryptionContext::Iv128(cbc_iv(iv)?))
        .context("aes cbc encrypt")?;

    let tag = cbc_hmac_tag(enc, mac_key, iv, aad, &ciphertext);
    Ok(Sealed { ciphertext, tag })
}

fn cbc_hmac_decrypt(
    enc: JWEEncryption,
    cek: &[u8],
    iv: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, OpaqueError> {
    let (mac_key, enc_key) = split_cbc_hmac_key(enc, cek);

    // tag is checked before anything is decrypted
    let expected = cbc_hmac_tag(enc, mac_key, iv, aad, ciphertext);
    constant_time::verify_slices_are_equal(&expected, tag)
        .context("authentication tag mismatch")?;

    let key = PaddedBlockDecryptingKey::cbc_pkcs7(cbc_cipher_key(enc, enc_key)?)
        .context("create aes cbc decrypting key")?;
    let mut in_out = ciphertext.to_vec();
    let plaintext = key
        .decrypt(&mut in_out, DecryptionContext::Iv128(cbc_iv(iv)?))
        .context("aes cbc decrypt")?;
    Ok(plaintext.to_vec())
}

fn gcm_key(enc: JWEEncryption, cek: &[u8]) -> Result<LessSafeKey, OpaqueError> {
    let algorithm = match enc {
        JWEEncryption::A256Gcm => &AES_256_GCM,
        _ => &AES_128_GCM,
    };
    let key = UnboundKey::new(algorithm, cek).context("create aes gcm key")?;
    Ok(LessSafeKey::new(key))
}

fn gcm_encrypt(
    enc: JWEEncryption,
    cek: &[u8],
    iv: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Sealed, OpaqueError> {
    let key = gcm_key(enc, cek)?;
    let nonce = Nonce::try_assume_unique_for_key(iv).context("aes gcm nonce")?;

    let mut ciphertext = plaintext.to_vec();
    let tag = key
        .seal_in_place_separate_tag(nonce, Aad::from(aad), &mut ciphertext)
        .context("aes gcm seal")?;
    Ok(Sealed {
        ciphertext,
        tag: tag.as_ref().to_vec(),
    })
}

fn gcm_decrypt(
    enc: JWEEncryption,
    cek: &[u8],
    iv: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, OpaqueError> {
    let key = gcm_key(enc, cek)?;
    let nonce = Nonce::try_assume_unique_for_key(iv).context("aes gcm nonce")?;

    let mut in_out = Vec::with_capacity(ciphertext.len() + tag.len());
    in_out.extend_from_slice(ciphertext);
    in_out.extend_from_slice(tag);
    let plaintext = key
        .open_in_place(nonce, Aad::from(aad), &mut in_out)
        .context("aes gcm open")?;
    Ok(plaintext.to_vec())
}
