//! Message bus connection for the head process.
//!
//! The engine only needs publish, subscribe and unsubscribe (the [`Bus`]
//! trait) plus an ordered stream of inbound messages. [`LocalBus`] provides
//! both in-process; [`stdio`] bridges it to line-oriented byte streams.

pub mod local;
pub mod stdio;
pub mod types;

// Re-export commonly used types
pub use local::LocalBus;
pub use types::{Bus, BusError, Message};
