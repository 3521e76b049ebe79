//! Telemetry for the parfor demo binary.
//!
//! The library itself only emits `tracing` events; installing a
//! subscriber is left to the embedding application.

mod logging;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
