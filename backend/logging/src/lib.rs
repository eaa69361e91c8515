//! Structured logging for BlindSpot.
//!
//! Installs the `tracing` subscriber from config and scrubs credentials out of
//! strings before they reach a log line.

pub mod logger;
pub mod redact;

pub use logger::init_logger;
pub use redact::redact_sensitive_data;
