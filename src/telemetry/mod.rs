//! Run-time counters for the head process.
//!
//! The engine bumps these as it handles events so an operator can see, at
//! shutdown, how much traffic the head saw and whether commands were lost.

pub mod counters;

// Re-export commonly used types
pub use counters::{create_shared_telemetry, Channel, SharedTelemetry, Telemetry, TelemetryStats};
