//! Base64url helpers for the segments of a compact serialization.
//!
//! A compact JWS has three segments and a compact JWE has five,
//! each of them base64url encoded without padding and joined by a `.`.
//! These helpers are meant for inspecting or reassembling envelopes
//! outside of [`JWSCompact`] and [`JWECompact`], for example to read the
//! `kid` of an incoming envelope before picking a key.
//!
//! [`JWSCompact`]: crate::jose::JWSCompact
//! [`JWECompact`]: crate::jose::JWECompact

use base64::{Engine as _, prelude::BASE64_URL_SAFE_NO_PAD};
use kuvert_error::{ErrorContext as _, OpaqueError};

use crate::jose::Headers;

/// Number of segments in a compact JWS.
pub const JWS_COMPACT_SEGMENTS: usize = 3;
/// Number of segments in a compact JWE.
pub const JWE_COMPACT_SEGMENTS: usize = 5;

const SEPARATOR: char = '.';

/// Encode raw bytes as a single base64url segment, without padding.
pub fn encode_segment(bytes: impl AsRef<[u8]>) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a single base64url segment, padding is not accepted.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, OpaqueError> {
    check_alphabet(segment)?;
    BASE64_URL_SAFE_NO_PAD
        .decode(segment)
        .context("decode base64url segment")
}

/// Split a compact serialization in exactly `N` segments.
///
/// Every segment is checked to only contain base64url characters,
/// but none of them is decoded.
pub fn split_compact<const N: usize>(compact: &str) -> Result<[&str; N], OpaqueError> {
    let segments: Vec<&str> = compact.split(SEPARATOR).collect();
    let found = segments.len();
    let segments: [&str; N] = segments.try_into().map_err(|_| {
        OpaqueError::from_display(format!(
            "compact serialization has {found} segments, expected {N}"
        ))
    })?;

    for segment in &segments {
        check_alphabet(segment)?;
    }
    Ok(segments)
}

/// Join already encoded segments back into a compact serialization.
pub fn join_segments<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut compact = String::new();
    for (index, segment) in segments.into_iter().enumerate() {
        if index > 0 {
            compact.push(SEPARATOR);
        }
        compact.push_str(segment.as_ref());
    }
    compact
}

/// Decode the protected header of a compact JWS or JWE,
/// without verifying or decrypting anything.
///
/// Nothing in the returned [`Headers`] can be trusted yet.
pub fn peek_protected_header(compact: &str) -> Result<Headers, OpaqueError> {
    let segments = compact.split(SEPARATOR).count();
    if segments != JWS_COMPACT_SEGMENTS && segments != JWE_COMPACT_SEGMENTS {
        return Err(OpaqueError::from_display(format!(
            "compact serialization has {segments} segments, expected {JWS_COMPACT_SEGMENTS} or {JWE_COMPACT_SEGMENTS}"
        )));
    }

    let protected = compact.split(SEPARATOR).next().unwrap_or_default();
    Headers::from_encoded_str(protected)
}

fn check_alphabet(segment: &str) -> Result<(), OpaqueError> {
    match segment
        .bytes()
        .position(|b| !(b.is_ascii_alphanumeric() || b == b'-' || b == b'_'))
    {
        Some(position) => Err(OpaqueError::from_display(format!(
            "invalid base64url character at position {position}"
        ))),
        None => Ok(()),
    }
}
