mod utils;

mod expiry;
mod lazy_init;
mod provisioning;
mod roundtrip;
mod source_resolution;
mod tamper;
