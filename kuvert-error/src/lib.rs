//! Error types and utilities for kuvert.
//!
//! Two layers live here:
//!
//! - the plumbing used by the JOSE building blocks: [`BoxError`], [`OpaqueError`]
//!   and the [`ErrorContext`] / [`ErrorExt`] extension traits, which make it cheap
//!   to attach a short context string to any failure on its way up;
//! - the protocol-level [`EnvelopeError`], whose [`ErrorKind`] is the closed
//!   taxonomy callers of the envelope pipeline are expected to match on.
//!
//! Building blocks fail with an [`OpaqueError`], the envelope pipeline wraps that
//! as the `source` of an [`EnvelopeError`] so the root cause stays reachable
//! through [`std::error::Error::source`] and [`ErrorExt::chain`].
//!
//! # Kuvert
//!
//! Crate used by the end-user `kuvert` crate and its member crates alike.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

/// Alias for a type-erased error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

mod ext;
pub use ext::{ErrorContext, ErrorExt, OpaqueError};

mod kind;
pub use kind::{EnvelopeError, ErrorKind};
