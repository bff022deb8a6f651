//! Core functionality for the head process.
//!
//! This module contains:
//! - Payload parsing for the touch, proximity and sleep channels
//! - The deferred action scheduler
//! - The behavior arbitration engine and its inbound pump

pub mod command;
pub mod engine;
pub mod payload;
pub mod runner;
pub mod scheduler;
pub mod state;

// Re-export commonly used types
pub use command::{Command, EarPose, Face};
pub use engine::Engine;
pub use payload::{parse_proximity, parse_sleep, parse_touch, try_parse_touch, TouchReading};
pub use runner::{run, RunExit};
pub use scheduler::{Scheduler, TimerSlot, TimerToken};
pub use state::{EngineState, StateSnapshot};
