//! Tracing setup for binaries and demos embedding kuvert.
//!
//! The library itself only emits `tracing` events,
//! installing a subscriber is left to the application.

use kuvert_error::{BoxError, ErrorContext as _};
use tracing_subscriber::{
    EnvFilter, filter::Directive, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

pub use tracing_subscriber::filter::LevelFilter;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_directive` when set.
/// Fails if a global subscriber was already installed.
pub fn init_tracing(default_directive: impl Into<Directive>) -> Result<(), BoxError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(default_directive.into())
                .from_env_lossy(),
        )
        .try_init()
        .context("try init (default) tracing subscriber")?;

    Ok(())
}
