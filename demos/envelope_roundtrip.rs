//! This example demonstrates a full envelope round trip between
//! a client and a server, each holding its own private key set
//! and the public key set of the other party.
//!
//! ```sh
//! cargo run --example envelope_roundtrip
//! ```
//!
//! # Expected output
//!
//! Debug logs of both key stores being loaded, followed by
//! the sealed envelope and the payload recovered from it:
//!
//! ```text
//! envelope: eyJhbGciOiJSU0EtT0FFUC0yNTYi...
//! payload: {"amount":100} (signed by server-sig-2026)
//! ```
//!
//! Set `RUST_LOG=kuvert=trace` to follow every step.

use kuvert::{
    EnvelopeConfig, EnvelopeOrchestrator,
    error::{BoxError, ErrorContext as _},
    telemetry::{LevelFilter, init_tracing},
};
use serde_json::json;

fn fixture(name: &str) -> String {
    format!("{}/test-files/jwks/{name}", env!("CARGO_MANIFEST_DIR"))
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    init_tracing(LevelFilter::DEBUG)?;

    let server = EnvelopeOrchestrator::new(EnvelopeConfig::new(
        fixture("server.private.json"),
        fixture("client.public.json"),
    ));
    let client = EnvelopeOrchestrator::new(EnvelopeConfig::new(
        fixture("client.private.json"),
        fixture("server.public.json"),
    ));

    client.warm_up().await.context("load client key sets")?;

    let envelope = server
        .encrypt(&json!({"amount": 100}))
        .await
        .context("seal envelope on server")?;
    tracing::info!("envelope: {envelope}");

    let verified = client
        .decrypt(&envelope)
        .await
        .context("open envelope on client")?;
    tracing::info!(
        "payload: {} (signed by {})",
        verified.payload,
        verified.header.kid.as_deref().unwrap_or("<no kid>")
    );

    Ok(())
}
