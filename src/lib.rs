//! Friend Head - behavior core for a desktop companion robot head.
//!
//! This library fuses the head's touch pads, its proximity radar and a
//! sleep/wake signal into one expression state (haptic buzz, ear pose, face,
//! sound cue) and publishes it to the actuator processes over a shared
//! publish/subscribe bus.
//!
//! # Behavior
//!
//! - **Touch wins**: touching the head shows the attention expression, and
//!   proximity never changes the face while it is shown
//! - **No flicker**: releases are debounced and followed by a short cooldown
//!   before proximity may take the face back
//! - **Idle sleep**: left untouched, the head goes to sleep; a proximity
//!   detection restarts the countdown, and any touch or detection wakes it
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Friend Head                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  LocalBus   │──▶│   Runner    │──▶│   Engine    │       │
//! │  │  (inbound)  │   │   (pump)    │   │ (one lock)  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         ▲                               │      ▲            │
//! │         │ commands                      ▼      │ fire       │
//! │  ┌─────────────┐                     ┌─────────────┐       │
//! │  │ stdio/taps  │                     │  Scheduler  │       │
//! │  │ (outbound)  │                     │  (4 slots)  │       │
//! │  └─────────────┘                     └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use friend_head::{bus::LocalBus, core::Engine, telemetry, Config};
//! use std::sync::Arc;
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let bus = Arc::new(LocalBus::new());
//! let engine = Engine::new(
//!     bus.clone(),
//!     &Config::default(),
//!     telemetry::create_shared_telemetry(),
//!     runtime.handle().clone(),
//! );
//! engine.start().expect("bus refused subscriptions");
//!
//! // Inbound messages arrive on bus.receiver()
//! ```

pub mod bus;
pub mod config;
pub mod core;
pub mod telemetry;

// Re-export key types at crate root for convenience
pub use bus::{Bus, BusError, LocalBus, Message};
pub use config::{Config, ConfigError, Cues, Timings, Topics};
pub use crate::core::{Engine, RunExit, StateSnapshot, TimerSlot, TouchReading};
pub use telemetry::{SharedTelemetry, Telemetry, TelemetryStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
