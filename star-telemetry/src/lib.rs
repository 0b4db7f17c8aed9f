//! Logging setup for the star loader binaries and tests.

pub mod tracing;
