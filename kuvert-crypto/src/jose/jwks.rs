use std::collections::HashMap;

use kuvert_error::{ErrorContext as _, OpaqueError};
use serde::{Deserialize, Serialize};

use crate::jose::JWK;

#[derive(Debug, Clone, Deserialize)]
struct RawJWKSet {
    keys: Vec<JWK>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// [`JWKSet`] or JSON Web Key Set as defined in [`rfc7517, section 5`]
///
/// Keys keep their document order. Lookups by `alg` and by `kid`
/// are served from indices built once when the set is created,
/// and when several keys share an `alg` or `kid` the first one wins.
///
/// [`rfc7517, section 5`]: https://datatracker.ietf.org/doc/html/rfc7517#section-5
pub struct JWKSet {
    keys: Vec<JWK>,
    by_alg: HashMap<String, usize>,
    by_kid: HashMap<String, usize>,
}

impl JWKSet {
    /// Create a [`JWKSet`] from keys in document order
    pub fn new(keys: Vec<JWK>) -> Self {
        let mut by_alg = HashMap::new();
        let mut by_kid = HashMap::new();
        for (index, key) in keys.iter().enumerate() {
            if let Some(alg) = key.alg() {
                by_alg.entry(alg.as_str().to_owned()).or_insert(index);
            }
            if let Some(kid) = key.kid() {
                by_kid.entry(kid.to_owned()).or_insert(index);
            }
        }
        Self {
            keys,
            by_alg,
            by_kid,
        }
    }

    /// Parse a [`JWKSet`] from its JSON representation
    ///
    /// Every key must have a known `kty` and decodable key material,
    /// a single broken key rejects the whole document.
    pub fn from_json_slice(raw: &[u8]) -> Result<Self, OpaqueError> {
        let raw: RawJWKSet = serde_json::from_slice(raw).context("deserialize JWK set")?;
        Self::try_from_keys(raw.keys)
    }

    /// Parse a [`JWKSet`] from an already deserialized JSON value
    pub fn from_json_value(raw: serde_json::Value) -> Result<Self, OpaqueError> {
        let raw: RawJWKSet = serde_json::from_value(raw).context("deserialize JWK set")?;
        Self::try_from_keys(raw.keys)
    }

    fn try_from_keys(keys: Vec<JWK>) -> Result<Self, OpaqueError> {
        for (index, key) in keys.iter().enumerate() {
            key.validate_material()
                .with_context(|| format!("validate key {index} of JWK set"))?;
        }
        Ok(Self::new(keys))
    }

    /// First key whose `alg` equals `alg`, in document order
    pub fn find_by_algorithm(&self, alg: &str) -> Option<&JWK> {
        self.by_alg.get(alg).and_then(|index| self.keys.get(*index))
    }

    /// First key whose `kid` equals `kid`, in document order
    pub fn find_by_kid(&self, kid: &str) -> Option<&JWK> {
        self.by_kid.get(kid).and_then(|index| self.keys.get(*index))
    }

    /// Number of keys in this set
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if this set holds no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate over the keys in document order
    pub fn iter(&self) -> std::slice::Iter<'_, JWK> {
        self.keys.iter()
    }
}

impl<'a> IntoIterator for &'a JWKSet {
    type Item = &'a JWK;
    type IntoIter = std::slice::Iter<'a, JWK>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for JWKSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        struct Keys<'a> {
            keys: &'a [JWK],
        }

        Keys { keys: &self.keys }.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jose::{JWA, JWEAlgorithm, JWKAlgorithm};

    const CLIENT_PRIVATE: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../test-files/jwks/client.private.json"
    ));

    #[test]
    fn indexes_fixture_by_alg_and_kid() {
        let set = JWKSet::from_json_slice(CLIENT_PRIVATE).unwrap();
        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());

        let sig = set.find_by_algorithm("RS256").unwrap();
        assert_eq!(sig.kid(), Some("client-sig-2026"));
        assert_eq!(sig.alg(), Some(&JWKAlgorithm::Signing(JWA::RS256)));

        let enc = set.find_by_algorithm("RSA-OAEP-256").unwrap();
        assert_eq!(enc.alg(), Some(&JWKAlgorithm::KeyManagement(JWEAlgorithm::RsaOaep256)));
        assert_eq!(set.find_by_kid("client-enc-2026"), Some(enc));

        assert!(set.find_by_algorithm("ES256").is_none());
        assert!(set.find_by_kid("server-sig-2026").is_none());
    }

    #[test]
    fn first_key_wins() {
        let set = JWKSet::from_json_slice(
            br#"{"keys":[
                {"kty":"oct","k":"AAAA","kid":"one","alg":"HS256"},
                {"kty":"oct","k":"BBBB","kid":"two","alg":"HS256"},
                {"kty":"oct","k":"CCCC","kid":"one"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.find_by_algorithm("HS256").unwrap().kid(), Some("one"));
        assert!(set.find_by_kid("one").unwrap().alg().is_some());
        assert_eq!(set.iter().filter_map(|key| key.kid()).collect::<Vec<_>>(), ["one", "two", "one"]);
    }

    #[test]
    fn empty_set_is_valid() {
        let set = JWKSet::from_json_value(serde_json::json!({"keys": []})).unwrap();
        assert!(set.is_empty());
        assert!(set.find_by_algorithm("RS256").is_none());
    }

    #[test]
    fn malformed_documents_are_rejected() {
        for raw in [
            &br#"not json"#[..],
            br#"{"kids":[]}"#,
            br#"{"keys":{}}"#,
            br#"{"keys":[{"kty":"RSA","n":"AQAB"}]}"#,
            br#"{"keys":[{"kty":"RSA","n":"A=B","e":"AQAB"}]}"#,
            br#"{"keys":[{"kty":"OKP","crv":"Ed25519","x":"AAAA"}]}"#,
        ] {
            assert!(JWKSet::from_json_slice(raw).is_err(), "{}", String::from_utf8_lossy(raw));
        }
    }

    #[test]
    fn serializes_public_members_only() {
        let set = JWKSet::from_json_slice(CLIENT_PRIVATE).unwrap();
        let output = serde_json::to_value(&set).unwrap();
        let keys = output["keys"].as_array().unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|key| key.get("d").is_none()));
        assert_eq!(keys[0]["kid"], "client-sig-2026");
    }
}
