//! Mutual JOSE envelopes between two parties.
//!
//! Kuvert seals a JSON payload for a remote party by first signing it with the
//! local party's private key (compact JWS) and then encrypting the signed result
//! with the remote party's public key (compact JWE). Opening an envelope runs the
//! same steps in reverse: decrypt with the local private key, then verify with the
//! remote public key, including the `exp` carried in the signature header.
//!
//! Each party's keys come from a JWK set, read from a file or fetched over HTTP(S)
//! the first time they are needed and kept for the lifetime of the orchestrator.
//!
//! ```no_run
//! use kuvert::{EnvelopeConfig, EnvelopeOrchestrator};
//!
//! # async fn run() -> Result<(), kuvert::error::EnvelopeError> {
//! let client = EnvelopeOrchestrator::new(EnvelopeConfig::new(
//!     "keys/client.private.json",
//!     "https://server.example.com/.well-known/jwks.json",
//! ));
//!
//! let envelope = client.encrypt(&serde_json::json!({"amount": 100})).await?;
//! let reply = client.decrypt(&envelope).await?;
//! println!("{} signed by {:?}", reply.payload, reply.header.kid);
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! - [`kuvert-error`](error): error plumbing and the [`ErrorKind`](error::ErrorKind) taxonomy;
//! - [`kuvert-crypto`](crypto): JWA, JWK, JWK set, compact JWS and compact JWE on `aws-lc-rs`;
//! - [`kuvert-utils`](utils): builder macros and clocks.
//!
//! ## Defaults
//!
//! `RS256` signatures valid for 5 minutes, `RSA-OAEP-256` key wrapping and
//! `A256CBC-HS512` content encryption, all configurable in [`EnvelopeConfig`].

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

#[doc(inline)]
pub use ::kuvert_error as error;

#[doc(inline)]
pub use ::kuvert_crypto as crypto;

#[doc(inline)]
pub use ::kuvert_utils as utils;

pub mod config;
pub mod encryption;
pub mod envelope;
pub mod keystore;
pub mod signature;
pub mod source;
pub mod telemetry;

#[doc(inline)]
pub use config::EnvelopeConfig;
#[doc(inline)]
pub use encryption::{EncryptionCodec, EncryptionContext};
#[doc(inline)]
pub use envelope::{EnvelopeOrchestrator, EnvelopeOrchestratorBuilder};
#[doc(inline)]
pub use keystore::{KeyStore, KeyStoreState};
#[doc(inline)]
pub use signature::{SignatureCodec, SignatureHeader, SigningContext, VerifiedPayload};
#[doc(inline)]
pub use source::{HttpClient, HttpResponse, KeyMaterialSource, KeySetLocation, RawKeySet, ReqwestClient};
