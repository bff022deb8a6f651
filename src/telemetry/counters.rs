//! Activity counters for one run of the head process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Inbound stimulus channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Touch,
    Radar,
    Sleep,
}

/// Counters updated by the engine as it runs.
#[derive(Debug)]
pub struct Telemetry {
    touch_events: AtomicU64,
    radar_events: AtomicU64,
    sleep_events: AtomicU64,
    /// Inbound payloads that could not be read
    malformed_payloads: AtomicU64,
    commands_published: AtomicU64,
    publish_failures: AtomicU64,
    wakes: AtomicU64,
    idle_sleeps: AtomicU64,
    timers_fired: AtomicU64,
    session_id: Uuid,
    session_start: DateTime<Utc>,
}

impl Telemetry {
    /// Create a new telemetry record for this session.
    pub fn new() -> Self {
        Self {
            touch_events: AtomicU64::new(0),
            radar_events: AtomicU64::new(0),
            sleep_events: AtomicU64::new(0),
            malformed_payloads: AtomicU64::new(0),
            commands_published: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
            wakes: AtomicU64::new(0),
            idle_sleeps: AtomicU64::new(0),
            timers_fired: AtomicU64::new(0),
            session_id: Uuid::new_v4(),
            session_start: Utc::now(),
        }
    }

    /// Get the session identifier.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Record an inbound message on `channel`.
    pub fn record_inbound(&self, channel: Channel) {
        let counter = match channel {
            Channel::Touch => &self.touch_events,
            Channel::Radar => &self.radar_events,
            Channel::Sleep => &self.sleep_events,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an unreadable payload.
    pub fn record_malformed(&self) {
        self.malformed_payloads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a published command.
    pub fn record_published(&self) {
        self.commands_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a command the bus refused.
    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a wake from sleep.
    pub fn record_wake(&self) {
        self.wakes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an idle-triggered sleep.
    pub fn record_idle_sleep(&self) {
        self.idle_sleeps.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a deferred action that ran.
    pub fn record_timer_fired(&self) {
        self.timers_fired.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TelemetryStats {
        TelemetryStats {
            touch_events: self.touch_events.load(Ordering::Relaxed),
            radar_events: self.radar_events.load(Ordering::Relaxed),
            sleep_events: self.sleep_events.load(Ordering::Relaxed),
            malformed_payloads: self.malformed_payloads.load(Ordering::Relaxed),
            commands_published: self.commands_published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            wakes: self.wakes.load(Ordering::Relaxed),
            idle_sleeps: self.idle_sleeps.load(Ordering::Relaxed),
            timers_fired: self.timers_fired.load(Ordering::Relaxed),
            session_id: self.session_id,
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session {}:\n\
             - Touch events: {}\n\
             - Radar events: {}\n\
             - Sleep events: {}\n\
             - Malformed payloads: {}\n\
             - Commands published: {} ({} failed)\n\
             - Wakes: {}, idle sleeps: {}\n\
             - Deferred actions fired: {}\n\
             - Session duration: {} seconds",
            stats.session_id,
            stats.touch_events,
            stats.radar_events,
            stats.sleep_events,
            stats.malformed_payloads,
            stats.commands_published,
            stats.publish_failures,
            stats.wakes,
            stats.idle_sleeps,
            stats.timers_fired,
            stats.session_duration_secs
        )
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryStats {
    pub touch_events: u64,
    pub radar_events: u64,
    pub sleep_events: u64,
    pub malformed_payloads: u64,
    pub commands_published: u64,
    pub publish_failures: u64,
    pub wakes: u64,
    pub idle_sleeps: u64,
    pub timers_fired: u64,
    pub session_id: Uuid,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared counters.
pub type SharedTelemetry = Arc<Telemetry>;

/// Create a new shared telemetry record.
pub fn create_shared_telemetry() -> SharedTelemetry {
    Arc::new(Telemetry::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let telemetry = Telemetry::new();
        telemetry.record_inbound(Channel::Touch);
        telemetry.record_inbound(Channel::Touch);
        telemetry.record_inbound(Channel::Radar);
        telemetry.record_published();
        telemetry.record_publish_failure();

        let stats = telemetry.stats();
        assert_eq!(stats.touch_events, 2);
        assert_eq!(stats.radar_events, 1);
        assert_eq!(stats.sleep_events, 0);
        assert_eq!(stats.commands_published, 1);
        assert_eq!(stats.publish_failures, 1);
    }

    #[test]
    fn test_summary_format() {
        let telemetry = Telemetry::new();
        let summary = telemetry.summary();
        assert!(summary.contains(&telemetry.session_id().to_string()));
        assert!(summary.contains("Touch events: 0"));
        assert!(summary.contains("Deferred actions fired"));
    }
}
