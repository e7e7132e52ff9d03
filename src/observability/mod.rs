//! Observability
//!
//! Components log through `tracing` with structured fields (`provider`,
//! `tenant`, `attempt`, `content_hash`, `latency_ms`). This module only
//! installs a subscriber for binaries that embed the crate.

pub mod subscriber;

pub use subscriber::{OutputFormat, TracingConfig, init_tracing};
