//! The engine's single mutable record.

use crate::core::scheduler::{Scheduler, TimerSlot};
use serde::Serialize;
use tokio::runtime::Handle;

/// Everything the engine knows, guarded by one lock.
///
/// There is no explicit state enum: behavior is the composition of these flags.
#[derive(Debug)]
pub struct EngineState {
    /// At least one touch pad reads active right now (raw, not debounced)
    pub touch_active: bool,
    /// The attention expression is showing (debounced touch)
    pub expression_active: bool,
    /// Someone is nearby (debounced proximity)
    pub radar_active: bool,
    /// Post-touch cooldown: proximity may not change the face
    pub radar_blocked: bool,
    pub sleeping: bool,
    /// Whether proximity events are currently being received
    pub radar_subscribed: bool,
    /// Set by shutdown; no transitions run afterwards
    pub stopped: bool,
    pub timers: Scheduler,
}

impl EngineState {
    /// Create the boot state: all flags clear, no slot armed.
    pub fn new(runtime: Handle) -> Self {
        Self {
            touch_active: false,
            expression_active: false,
            radar_active: false,
            radar_blocked: false,
            sleeping: false,
            radar_subscribed: false,
            stopped: false,
            timers: Scheduler::new(runtime),
        }
    }

    /// Nobody is touching the head. Proximity presence does not count.
    pub fn is_idle(&self) -> bool {
        !self.touch_active
    }

    /// Copy the flags and armed slots.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            touch_active: self.touch_active,
            expression_active: self.expression_active,
            radar_active: self.radar_active,
            radar_blocked: self.radar_blocked,
            sleeping: self.sleeping,
            radar_subscribed: self.radar_subscribed,
            stopped: self.stopped,
            armed_timers: self.timers.armed(),
        }
    }
}

/// Point-in-time copy of [`EngineState`] for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub touch_active: bool,
    pub expression_active: bool,
    pub radar_active: bool,
    pub radar_blocked: bool,
    pub sleeping: bool,
    pub radar_subscribed: bool,
    pub stopped: bool,
    pub armed_timers: Vec<TimerSlot>,
}

impl StateSnapshot {
    /// Check whether `slot` was armed when the snapshot was taken.
    pub fn is_armed(&self, slot: TimerSlot) -> bool {
        self.armed_timers.contains(&slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_state_is_all_clear() {
        let state = EngineState::new(Handle::current());
        let snap = state.snapshot();
        assert!(!snap.touch_active);
        assert!(!snap.expression_active);
        assert!(!snap.radar_active);
        assert!(!snap.radar_blocked);
        assert!(!snap.sleeping);
        assert!(!snap.radar_subscribed);
        assert!(snap.armed_timers.is_empty());
        assert!(state.is_idle());
    }

    #[tokio::test]
    async fn test_idle_follows_touch_only() {
        let mut state = EngineState::new(Handle::current());
        state.radar_active = true;
        assert!(state.is_idle());
        state.touch_active = true;
        assert!(!state.is_idle());
    }
}
