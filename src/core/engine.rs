//! The behavior arbitration engine.
//!
//! Fuses touch, proximity and sleep signals into one expression state and
//! drives the haptic, ear servo, screen and sound collaborators over the bus.
//!
//! Every inbound event and every fired deferred action runs its whole
//! transition (flag updates, emits, timer arming) while holding the single
//! state lock, so they never interleave. Priority rules:
//!
//! - Touch wins over proximity: while the attention expression shows,
//!   proximity changes are recorded but never change the face.
//! - After the attention expression ends there is a cooldown during which
//!   proximity may not change the face either; when it ends, a proximity
//!   presence that is still there gets its face.
//! - Releases are debounced; a brief dropout never reaches the actuators.

use crate::bus::{Bus, BusError, Message};
use crate::config::{Config, Cues, Timings, Topics};
use crate::core::command::{Command, EarPose, Face};
use crate::core::payload::{parse_proximity, parse_sleep, try_parse_touch, TouchReading};
use crate::core::scheduler::{TimerSlot, TimerToken};
use crate::core::state::{EngineState, StateSnapshot};
use crate::telemetry::{Channel, SharedTelemetry};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Handle to the engine. Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<EngineState>,
    bus: Arc<dyn Bus>,
    topics: Topics,
    cues: Cues,
    timings: Timings,
    telemetry: SharedTelemetry,
}

impl Engine {
    /// Build an engine whose deferred actions run on `runtime`.
    pub fn new(
        bus: Arc<dyn Bus>,
        config: &Config,
        telemetry: SharedTelemetry,
        runtime: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState::new(runtime)),
                bus,
                topics: config.topics.clone(),
                cues: config.cues.clone(),
                timings: config.timings,
                telemetry,
            }),
        }
    }

    /// Subscribe to the inbound topics and start the idle countdown.
    pub fn start(&self) -> Result<(), BusError> {
        let shared = &self.shared;
        let mut st = shared.lock();
        for topic in [&shared.topics.touch, &shared.topics.sleep, &shared.topics.radar] {
            shared.bus.subscribe(topic)?;
            info!(topic = %topic, "subscribed");
        }
        st.radar_subscribed = true;
        shared.refresh_inactivity(&mut st);
        Ok(())
    }

    /// Route one inbound message. Returns `false` for topics the engine does not consume.
    pub fn dispatch(&self, message: &Message) -> bool {
        let topics = &self.shared.topics;
        let telemetry = &self.shared.telemetry;

        if message.topic == topics.touch {
            telemetry.record_inbound(Channel::Touch);
            let reading = try_parse_touch(&message.payload).unwrap_or_else(|| {
                telemetry.record_malformed();
                debug!(payload = %message.payload, "unreadable touch payload, treating as released");
                TouchReading::default()
            });
            self.handle_touch(reading);
        } else if message.topic == topics.radar {
            telemetry.record_inbound(Channel::Radar);
            match parse_proximity(&message.payload) {
                Some(detected) => self.handle_proximity(detected),
                None => {
                    telemetry.record_malformed();
                    debug!(payload = %message.payload, "ignoring unreadable radar payload");
                }
            }
        } else if message.topic == topics.sleep {
            telemetry.record_inbound(Channel::Sleep);
            match parse_sleep(&message.payload) {
                Some(sleeping) => self.handle_sleep(sleeping),
                None => {
                    telemetry.record_malformed();
                    debug!(payload = %message.payload, "ignoring unreadable sleep payload");
                }
            }
        } else {
            return false;
        }
        true
    }

    /// Handle a touch reading.
    pub fn handle_touch(&self, reading: TouchReading) {
        self.shared.on_touch(reading);
    }

    /// Handle a proximity report.
    pub fn handle_proximity(&self, detected: bool) {
        self.shared.on_proximity(detected);
    }

    /// Handle an externally signalled sleep state.
    pub fn handle_sleep(&self, sleeping: bool) {
        self.shared.on_sleep(sleeping);
    }

    /// Copy the current state for inspection.
    pub fn snapshot(&self) -> StateSnapshot {
        self.shared.lock().snapshot()
    }

    /// Get the shared telemetry record.
    pub fn telemetry(&self) -> &SharedTelemetry {
        &self.shared.telemetry
    }

    /// Cancel every deferred action and stop processing events.
    ///
    /// Returns how many deferred actions were pending.
    pub fn shutdown(&self) -> usize {
        let mut st = self.shared.lock();
        st.stopped = true;
        let cancelled = st.timers.cancel_all();
        info!(cancelled, "engine stopped");
        cancelled
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- inbound events ----

    fn on_touch(self: &Arc<Self>, reading: TouchReading) {
        let mut st = self.lock();
        if st.stopped {
            return;
        }

        let now = reading.is_active();
        st.touch_active = now;

        if now {
            self.wake_if_sleeping(&mut st);
            st.timers.cancel(TimerSlot::TouchOff);

            if !st.expression_active {
                st.expression_active = true;
                self.emit(Command::Haptic(true));
                self.emit(Command::Ear(EarPose::Attention));
                self.emit(Command::Face(Face::Attention));
                self.emit(Command::Chirp);
                info!(left = reading.left, right = reading.right, "touch: attention on");
            } else if st.radar_active {
                self.emit(Command::Face(Face::Attention));
                debug!("touch re-asserts attention face over proximity");
            }
        } else {
            self.arm(&mut st, TimerSlot::TouchOff, self.timings.touch_release);
        }

        self.refresh_inactivity(&mut st);
    }

    fn on_proximity(self: &Arc<Self>, detected: bool) {
        let mut st = self.lock();
        if st.stopped {
            return;
        }

        if detected {
            self.wake_if_sleeping(&mut st);
            st.timers.cancel(TimerSlot::RadarOff);

            if !st.radar_active {
                st.radar_active = true;
                if st.expression_active {
                    debug!("proximity detected, touch keeps attention face");
                } else if st.radar_blocked {
                    debug!("proximity detected during touch cooldown, face unchanged");
                } else {
                    self.emit(Command::Face(Face::Proximity));
                    info!("proximity detected");
                }
                self.restart_inactivity(&mut st);
            }
            // A wake with presence already recorded still needs its countdown
            self.refresh_inactivity(&mut st);
        } else {
            self.arm(&mut st, TimerSlot::RadarOff, self.timings.radar_clear);
        }
    }

    fn on_sleep(self: &Arc<Self>, sleeping: bool) {
        let mut st = self.lock();
        if st.stopped {
            return;
        }
        if st.sleeping == sleeping {
            debug!(sleeping, "sleep unchanged");
            return;
        }

        st.sleeping = sleeping;
        if sleeping {
            st.timers.cancel(TimerSlot::Inactivity);
            self.unsubscribe_radar(&mut st);
        } else {
            self.subscribe_radar(&mut st);
            self.refresh_inactivity(&mut st);
        }
        info!(sleeping, "sleep state received");
    }

    // ---- deferred actions ----

    fn arm(self: &Arc<Self>, st: &mut EngineState, slot: TimerSlot, delay: Duration) {
        let shared = Arc::clone(self);
        st.timers.arm(slot, delay, move |token| shared.fire(token));
        debug!(slot = slot.name(), ?delay, "armed");
    }

    fn fire(self: &Arc<Self>, token: TimerToken) {
        let mut st = self.lock();
        if st.stopped || !st.timers.claim(token) {
            return;
        }
        self.telemetry.record_timer_fired();

        match token.slot {
            TimerSlot::TouchOff => self.release_attention(&mut st),
            TimerSlot::RadarOff => self.clear_proximity(&mut st),
            TimerSlot::RadarBlock => self.end_cooldown(&mut st),
            TimerSlot::Inactivity => self.idle_sleep(&mut st),
        }
    }

    fn release_attention(self: &Arc<Self>, st: &mut EngineState) {
        if st.touch_active || !st.expression_active {
            return;
        }
        self.emit(Command::Haptic(false));
        self.emit(Command::Ear(EarPose::Neutral));
        self.emit(Command::Face(Face::Normal));
        st.expression_active = false;
        info!("touch released: attention off");

        st.radar_blocked = true;
        self.arm(st, TimerSlot::RadarBlock, self.timings.radar_cooldown);
    }

    fn end_cooldown(&self, st: &mut EngineState) {
        st.radar_blocked = false;
        if st.radar_active && !st.expression_active {
            self.emit(Command::Face(Face::Proximity));
            info!("touch cooldown over, proximity still present");
        } else {
            debug!("touch cooldown over");
        }
    }

    fn clear_proximity(&self, st: &mut EngineState) {
        if !st.radar_active {
            return;
        }
        st.radar_active = false;

        if st.expression_active {
            debug!("proximity cleared, touch keeps attention face");
        } else if st.radar_blocked {
            debug!("proximity cleared during touch cooldown, face unchanged");
        } else {
            self.emit(Command::Face(Face::Normal));
            info!("proximity cleared");
        }
    }

    fn idle_sleep(&self, st: &mut EngineState) {
        if st.sleeping || !st.is_idle() {
            return;
        }
        self.emit(Command::Sleep(true));
        st.sleeping = true;
        self.unsubscribe_radar(st);
        self.telemetry.record_idle_sleep();
        info!(idle = ?self.timings.idle_timeout, "inactive, going to sleep");
    }

    // ---- shared transitions ----

    fn wake_if_sleeping(&self, st: &mut EngineState) {
        if !st.sleeping {
            return;
        }
        self.emit(Command::Sleep(false));
        st.sleeping = false;
        self.subscribe_radar(st);
        self.telemetry.record_wake();
        info!("waking from sleep");
    }

    /// Give a fresh idle window to an engagement that does not involve touch.
    fn restart_inactivity(self: &Arc<Self>, st: &mut EngineState) {
        if st.sleeping || !st.is_idle() {
            return;
        }
        st.timers.cancel(TimerSlot::Inactivity);
        self.arm(st, TimerSlot::Inactivity, self.timings.idle_timeout);
        debug!("proximity engagement, idle countdown restarted");
    }

    /// Keep the idle countdown armed exactly while awake and untouched.
    fn refresh_inactivity(self: &Arc<Self>, st: &mut EngineState) {
        if st.sleeping {
            st.timers.cancel(TimerSlot::Inactivity);
        } else if st.is_idle() {
            if !st.timers.is_armed(TimerSlot::Inactivity) {
                self.arm(st, TimerSlot::Inactivity, self.timings.idle_timeout);
            }
        } else if st.timers.cancel(TimerSlot::Inactivity) {
            debug!("touch engagement, idle countdown cancelled");
        }
    }

    fn subscribe_radar(&self, st: &mut EngineState) {
        if st.radar_subscribed {
            return;
        }
        if let Err(e) = self.bus.subscribe(&self.topics.radar) {
            warn!(topic = %self.topics.radar, "subscribe failed: {e}");
        }
        st.radar_subscribed = true;
        info!(topic = %self.topics.radar, "subscribed");
    }

    fn unsubscribe_radar(&self, st: &mut EngineState) {
        if !st.radar_subscribed {
            return;
        }
        if let Err(e) = self.bus.unsubscribe(&self.topics.radar) {
            warn!(topic = %self.topics.radar, "unsubscribe failed: {e}");
        }
        st.radar_subscribed = false;
        info!(topic = %self.topics.radar, "unsubscribed");
    }

    fn emit(&self, command: Command) {
        let message = command.to_message(&self.topics, &self.cues);
        match self.bus.publish(&message.topic, &message.payload) {
            Ok(()) => self.telemetry.record_published(),
            Err(e) => {
                // Local state stays authoritative; the next transition re-sends.
                self.telemetry.record_publish_failure();
                warn!(topic = %message.topic, payload = %message.payload, "publish failed: {e}");
            }
        }
    }
}
