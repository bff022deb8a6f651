//! Deferred actions keyed by timer slot.
//!
//! Each slot holds at most one armed action. An armed action runs on the
//! tokio runtime after its delay and receives a [`TimerToken`]; the owner
//! must call [`Scheduler::claim`] with that token, under the same lock that
//! guards the scheduler, before running the action body. `claim` succeeds
//! only if the slot still holds that exact arming, so an action cancelled or
//! re-armed while it was waiting for the lock loses the race and does nothing,
//! and a claimed action has already left its slot and can no longer be cancelled.

use serde::Serialize;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// The independent deferred-action slots owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TimerSlot {
    /// Ends the attention expression after touch release
    TouchOff,
    /// Drops proximity presence after it clears
    RadarOff,
    /// Ends the post-touch cooldown on proximity display changes
    RadarBlock,
    /// Puts the head to sleep after the idle window
    Inactivity,
}

impl TimerSlot {
    pub const ALL: [TimerSlot; 4] = [
        TimerSlot::TouchOff,
        TimerSlot::RadarOff,
        TimerSlot::RadarBlock,
        TimerSlot::Inactivity,
    ];

    fn index(self) -> usize {
        match self {
            TimerSlot::TouchOff => 0,
            TimerSlot::RadarOff => 1,
            TimerSlot::RadarBlock => 2,
            TimerSlot::Inactivity => 3,
        }
    }

    /// Name used in log fields.
    pub fn name(self) -> &'static str {
        match self {
            TimerSlot::TouchOff => "touch_off",
            TimerSlot::RadarOff => "radar_off",
            TimerSlot::RadarBlock => "radar_block",
            TimerSlot::Inactivity => "inactivity",
        }
    }
}

/// Identifies one specific arming of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken {
    pub slot: TimerSlot,
    generation: u64,
}

#[derive(Debug)]
struct Armed {
    generation: u64,
    task: JoinHandle<()>,
}

/// Fixed map from [`TimerSlot`] to at most one pending action.
#[derive(Debug)]
pub struct Scheduler {
    runtime: Handle,
    slots: [Option<Armed>; 4],
    next_generation: u64,
}

impl Scheduler {
    /// Create a scheduler with every slot empty.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            slots: [None, None, None, None],
            next_generation: 0,
        }
    }

    /// Cancel whatever occupies `slot`, then schedule `on_fire` after `delay`.
    pub fn arm<F>(&mut self, slot: TimerSlot, delay: Duration, on_fire: F) -> TimerToken
    where
        F: FnOnce(TimerToken) + Send + 'static,
    {
        self.cancel(slot);

        self.next_generation += 1;
        let token = TimerToken {
            slot,
            generation: self.next_generation,
        };
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire(token);
        });
        self.slots[slot.index()] = Some(Armed {
            generation: token.generation,
            task,
        });
        tracing::trace!(slot = slot.name(), ?delay, "timer armed");
        token
    }

    /// Cancel and clear `slot`. Returns whether anything was armed.
    pub fn cancel(&mut self, slot: TimerSlot) -> bool {
        match self.slots[slot.index()].take() {
            Some(armed) => {
                armed.task.abort();
                tracing::trace!(slot = slot.name(), "timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Take ownership of a firing. Only the current arming of a slot can claim it.
    pub fn claim(&mut self, token: TimerToken) -> bool {
        let entry = &mut self.slots[token.slot.index()];
        match entry {
            Some(armed) if armed.generation == token.generation => {
                *entry = None;
                true
            }
            _ => false,
        }
    }

    /// Check whether `slot` holds an action.
    pub fn is_armed(&self, slot: TimerSlot) -> bool {
        self.slots[slot.index()].is_some()
    }

    /// Slots that currently hold an action.
    pub fn armed(&self) -> Vec<TimerSlot> {
        TimerSlot::ALL
            .into_iter()
            .filter(|slot| self.is_armed(*slot))
            .collect()
    }

    /// Cancel every slot. Returns how many were armed.
    pub fn cancel_all(&mut self) -> usize {
        TimerSlot::ALL
            .into_iter()
            .filter(|slot| self.cancel(*slot))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Fired = Arc<Mutex<Vec<TimerToken>>>;

    fn recorder(fired: &Fired) -> impl FnOnce(TimerToken) + Send + 'static {
        let fired = Arc::clone(fired);
        move |token| fired.lock().unwrap().push(token)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let fired: Fired = Arc::default();
        let mut scheduler = Scheduler::new(Handle::current());

        let token = scheduler.arm(TimerSlot::TouchOff, Duration::from_secs(3), recorder(&fired));
        assert!(scheduler.is_armed(TimerSlot::TouchOff));

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert!(fired.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*fired.lock().unwrap(), vec![token]);
        assert!(scheduler.claim(token));
        assert!(!scheduler.is_armed(TimerSlot::TouchOff));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_fire() {
        let fired: Fired = Arc::default();
        let mut scheduler = Scheduler::new(Handle::current());

        scheduler.arm(TimerSlot::RadarOff, Duration::from_secs(3), recorder(&fired));
        assert!(scheduler.cancel(TimerSlot::RadarOff));
        assert!(!scheduler.cancel(TimerSlot::RadarOff));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(fired.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_previous_occupant() {
        let fired: Fired = Arc::default();
        let mut scheduler = Scheduler::new(Handle::current());

        let first = scheduler.arm(TimerSlot::Inactivity, Duration::from_secs(1), recorder(&fired));
        let second = scheduler.arm(TimerSlot::Inactivity, Duration::from_secs(2), recorder(&fired));
        assert_ne!(first, second);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(*fired.lock().unwrap(), vec![second]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_token_cannot_claim() {
        let mut scheduler = Scheduler::new(Handle::current());

        let stale = scheduler.arm(TimerSlot::RadarBlock, Duration::from_secs(3), |_| {});
        let current = scheduler.arm(TimerSlot::RadarBlock, Duration::from_secs(3), |_| {});

        assert!(!scheduler.claim(stale));
        assert!(scheduler.is_armed(TimerSlot::RadarBlock));
        assert!(scheduler.claim(current));
        // A claimed firing is gone; cancelling afterwards is a no-op
        assert!(!scheduler.cancel(TimerSlot::RadarBlock));
        assert!(!scheduler.claim(current));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let mut scheduler = Scheduler::new(Handle::current());
        scheduler.arm(TimerSlot::TouchOff, Duration::from_secs(3), |_| {});
        scheduler.arm(TimerSlot::Inactivity, Duration::from_secs(180), |_| {});

        assert_eq!(
            scheduler.armed(),
            vec![TimerSlot::TouchOff, TimerSlot::Inactivity]
        );
        assert_eq!(scheduler.cancel_all(), 2);
        assert!(scheduler.armed().is_empty());
    }
}
