//! utilities crate for kuvert
//!
//! `kuvert-utils` contains utilities used by `kuvert`,
//! not really being part of one of the other crates, or used
//! by plenty of other crates.
//!
//! # Kuvert
//!
//! Crate used by the end-user `kuvert` crate and its member crates alike.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

#[doc(hidden)]
#[macro_use]
pub mod macros;

pub mod time;
