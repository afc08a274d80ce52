//! Crypto primitives and dependencies used by kuvert.
//!
//! This includes but is not limited to:
//! - Javascript object signing and encryption (JOSE): JWS, JWE, JWK, JWK sets
//! - RSA and elliptic curve keys described as JWK
//! - Base64url segment helpers for compact serializations
//!
//! # Kuvert
//!
//! Crate used by the end-user `kuvert` crate and its member crates alike.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

pub mod jose;
