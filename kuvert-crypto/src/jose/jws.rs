use std::{fmt, str::FromStr};

use base64::{Engine as _, prelude::BASE64_URL_SAFE_NO_PAD};
use kuvert_error::{BoxError, ErrorContext as _, OpaqueError};
use kuvert_utils::macros::generate_set_and_with;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::jose::segment;

#[derive(Default, Debug, Clone, PartialEq, Eq)]
/// [`JWSBuilder`] should be used when manually creating a [`JWSCompact`]
pub struct JWSBuilder {
    protected_headers: Headers,
    payload: String,
}

#[derive(Default, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// [`Headers`] store protected headers and already
/// serializes them to correct JSON values.
///
/// Shared between JWS and JWE, as both use a JSON object
/// as protected header.
pub struct Headers(Option<Map<String, Value>>);

impl Headers {
    generate_set_and_with! {
        /// Set provided header in the header map
        ///
        /// Warning: this function will replace already existing headers
        /// If more control is needed, use `.header_map_mut()`
        /// to get access to the underlying header map
        pub fn header(
            mut self,
            name: String,
            value: impl Serialize,
        ) -> Result<Self, OpaqueError> {
            let headers = self.0.get_or_insert_default();
            let value = serde_json::to_value(value).context("convert to value")?;
            headers.insert(name, value);
            Ok(self)
        }
    }

    generate_set_and_with! {
        /// Set provided headers in the header map
        ///
        /// Warning: this function will replace already existing headers
        /// If more control is needed, use `.header_map_mut()`
        /// to get access to the underlying header map
        pub fn headers(mut self, headers: impl Serialize) -> Result<Self, OpaqueError> {
            let headers =
                serde_json::to_value(headers).context("convert headers to serde json value")?;

            let mut headers = match headers {
                Value::Object(map) => map,
                _ => Err(OpaqueError::from_display(
                    "Can only set multiple headers if input is key value object",
                ))?,
            };

            match &mut self.0 {
                Some(existing_headers) => existing_headers.append(&mut headers),
                None => self.0 = Some(headers),
            };

            Ok(self)
        }
    }

    /// Get the raw JSON value of a single header
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.as_ref().and_then(|headers| headers.get(name))
    }

    /// Get mutable access to the underlying header map, creating it if needed
    pub fn header_map_mut(&mut self) -> &mut Map<String, Value> {
        self.0.get_or_insert_default()
    }

    /// Encode headers to a base64 url safe representation
    pub(crate) fn as_encoded_string(&self) -> Result<String, OpaqueError> {
        let encoded = match &self.0 {
            Some(headers) => {
                let headers = serde_json::to_vec(headers).context("convert to bytes")?;
                segment::encode_segment(headers)
            }
            None => String::new(),
        };
        Ok(encoded)
    }

    /// Decode headers from their base64 url safe representation
    pub(crate) fn from_encoded_str(encoded: &str) -> Result<Self, OpaqueError> {
        let raw = segment::decode_segment(encoded).context("decode protected header")?;
        let headers = serde_json::from_slice::<Map<String, Value>>(&raw)
            .context("deserialize protected headers")?;
        Ok(Self(Some(headers)))
    }

    /// Try decode headers to the provided `T`
    pub fn decode<'de, 'a: 'de, T>(&'a self) -> Result<T, OpaqueError>
    where
        T: Deserialize<'de>,
    {
        match &self.0 {
            Some(headers) => Ok(T::deserialize(headers).context("deserialize headers into T")?),
            None => Err(OpaqueError::from_display(
                "headers are None, deserialize not supported",
            )),
        }
    }
}

impl JWSBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    generate_set_and_with! {
        /// Add the provided payload to this [`JWSBuilder`]
        pub fn payload(mut self, payload: impl AsRef<[u8]>) -> Self {
            let payload = BASE64_URL_SAFE_NO_PAD.encode(payload);
            self.payload = payload;
            self
        }
    }

    generate_set_and_with! {
        /// Set provided header in the protected header map
        ///
        /// Warning: this function will replace already existing headers
        /// If more control is needed, use [`Self::protected_headers_mut`] to get access
        /// to the underlying header store
        pub fn protected_header(
            mut self,
            name: String,
            value: impl Serialize,
        ) -> Result<Self, OpaqueError> {
            self.protected_headers.try_set_header(name, value)?;
            Ok(self)
        }
    }

    generate_set_and_with! {
        /// Set provided headers in the protected header map
        ///
        /// Warning: this function will replace already existing headers
        /// If more control is needed, use [`Self::protected_headers_mut`] to get access
        /// to the underlying header store
        pub fn protected_headers(mut self, headers: impl Serialize) -> Result<Self, OpaqueError> {
            self.protected_headers.try_set_headers(headers)?;
            Ok(self)
        }
    }

    /// Get mutable reference to the underlying protected header store
    ///
    /// Use this when individual members need to be edited or removed
    pub fn protected_headers_mut(&mut self) -> &mut Headers {
        &mut self.protected_headers
    }

    /// Generate compact serialization of this `JWS`
    pub fn build_compact(mut self, signer: &impl Signer) -> Result<JWSCompact, OpaqueError> {
        // compact serialization has no room for unprotected headers
        let mut unprotected_headers = Headers::default();
        signer
            .set_headers(&mut self.protected_headers, &mut unprotected_headers)
            .map_err(|err| OpaqueError::from_boxed(err.into()))
            .context("signer set headers")?;
        if unprotected_headers.0.is_some() {
            return Err(OpaqueError::from_display(
                "Compact jws does not support unprotected headers",
            ));
        }

        let protected = self.protected_headers.as_encoded_string()?;
        let signing_input = format!("{}.{}", protected, self.payload);

        let signature = signer
            .sign(&signing_input)
            .map_err(|err| OpaqueError::from_boxed(err.into()))
            .context("signer sign protected data")?;
        let signature = BASE64_URL_SAFE_NO_PAD.encode(signature.as_ref());

        Ok(JWSCompact(format!("{signing_input}.{signature}")))
    }
}

/// [`Signer`] implements all methods which are needed to sign our JWS requests,
/// and add the needed info to our JOSE headers (JOSE headers = protected + unprotected headers)
pub trait Signer {
    type Signature: AsRef<[u8]>;
    type Error: Into<BoxError>;

    /// Set headers which are needed to verify the final `Signature`
    ///
    /// Example headers are: `alg`, `kid`
    fn set_headers(
        &self,
        protected_headers: &mut Headers,
        unprotected_headers: &mut Headers,
    ) -> Result<(), Self::Error>;

    /// Sign the str encoded payload
    fn sign(&self, data: &str) -> Result<Self::Signature, Self::Error>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// [`JWSCompact`] is a compact `JWS` representation as defined in [`rfc7515, section 7.1`]
///
/// [`rfc7515, section 7.1`]: https://datatracker.ietf.org/doc/html/rfc7515#section-7.1
pub struct JWSCompact(String);

impl JWSCompact {
    /// Create a builder which can be used to create a [`JWSCompact`]
    pub fn builder() -> JWSBuilder {
        JWSBuilder::new()
    }

    /// The compact serialization as a str
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume this [`JWSCompact`] into its compact serialization
    pub fn into_string(self) -> String {
        self.0
    }

    /// Decode this [`JWSCompact`] to a [`DecodedJWS`] by decoding all values and checking with [`Verifier`]
    /// if the signature is correct
    pub fn decode(self, verifier: &impl Verifier) -> Result<DecodedJWS, OpaqueError> {
        let [protected, payload, signature] = segment::split_compact::<3>(&self.0)?;

        let protected_headers = Headers::from_encoded_str(protected)?;
        let decoded_signature = DecodedSignature {
            protected: protected_headers,
            signature: signature.to_owned(),
        };

        let to_verify = ToVerifySignature {
            decoded_signature,
            signed_data: format!("{protected}.{payload}"),
        };

        let payload = BASE64_URL_SAFE_NO_PAD
            .decode(payload)
            .context("decode payload")?;

        verifier
            .verify(&payload, std::slice::from_ref(&to_verify))
            .map_err(|err| OpaqueError::from_boxed(err.into()))
            .context("verifier verify signature")?;

        Ok(DecodedJWS {
            signature: to_verify.decoded_signature,
            payload,
        })
    }
}

impl FromStr for JWSCompact {
    type Err = OpaqueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        segment::split_compact::<3>(s).context("parse compact jws")?;
        Ok(Self(s.to_owned()))
    }
}

impl fmt::Display for JWSCompact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<JWSCompact> for String {
    fn from(value: JWSCompact) -> Self {
        value.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Decoded version of a [`JWSCompact`]
///
/// Data here has already been verified, so everything
/// here is ready for usage
pub struct DecodedJWS {
    payload: Vec<u8>,
    signature: DecodedSignature,
}

impl DecodedJWS {
    /// Reference to the protected [`Headers`]
    pub fn protected_headers(&self) -> &Headers {
        self.signature.protected_headers()
    }

    /// Decode the protected headers into `T`
    pub fn decode_protected_headers<'de, 'a: 'de, T: Deserialize<'de>>(
        &'a self,
    ) -> Result<T, OpaqueError> {
        self.signature.decode_protected_headers()
    }

    /// The encoded signature segment
    pub fn signature(&self) -> &str {
        self.signature.signature()
    }

    /// Reference to the verified payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume into the payload
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Decoded protected header and encoded signature of a JWS
///
/// Data here has already been verified, so everything
/// here is ready for usage
pub struct DecodedSignature {
    protected: Headers,
    signature: String,
}

impl DecodedSignature {
    /// Reference to the protected [`Headers`]
    pub fn protected_headers(&self) -> &Headers {
        &self.protected
    }

    /// Decode the protected headers into `T`
    pub fn decode_protected_headers<'de, 'a: 'de, T: Deserialize<'de>>(
        &'a self,
    ) -> Result<T, OpaqueError> {
        self.protected.decode()
    }

    /// The encoded signature segment
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A `Signature` which still needs to be checked
///
/// It includes the encoded signing input
/// so nothing needs to be re-encoded
pub struct ToVerifySignature {
    signed_data: String,
    decoded_signature: DecodedSignature,
}

impl ToVerifySignature {
    /// `BASE64URL(protected) || '.' || BASE64URL(payload)` exactly as received
    pub fn signed_data(&self) -> &str {
        &self.signed_data
    }

    /// Reference to the [`DecodedSignature`]
    pub fn decoded_signature(&self) -> &DecodedSignature {
        &self.decoded_signature
    }
}

/// [`Verifier`] will be called to confirm if the received data is valid
pub trait Verifier {
    type Error: Into<BoxError>;

    /// Check the signature over the signing input
    fn verify(&self, payload: &[u8], signatures: &[ToVerifySignature]) -> Result<(), Self::Error>;
}
