//! In-process bus connection.
//!
//! `LocalBus` plays the role of the single broker connection a process holds:
//! it tracks the topics this process subscribed to, queues inbound messages
//! for those topics in arrival order, and lets observers tap everything the
//! process publishes. Like a real broker, a message published on a topic the
//! process is itself subscribed to is delivered back to it.

use crate::bus::types::{Bus, BusError, Message};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Inbound queue depth; anything beyond is dropped (at-most-once delivery).
const INBOUND_CAPACITY: usize = 10_000;

/// The in-process bus connection.
pub struct LocalBus {
    subscriptions: Mutex<HashSet<String>>,
    inbound_tx: Sender<Message>,
    inbound_rx: Receiver<Message>,
    taps: Mutex<Vec<Sender<Message>>>,
    connected: AtomicBool,
}

impl LocalBus {
    /// Create a new, connected bus with no subscriptions.
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = bounded(INBOUND_CAPACITY);
        Self {
            subscriptions: Mutex::new(HashSet::new()),
            inbound_tx,
            inbound_rx,
            taps: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        }
    }

    /// Receiver for messages delivered to this connection.
    pub fn receiver(&self) -> &Receiver<Message> {
        &self.inbound_rx
    }

    /// Deliver a message arriving from another participant on the bus.
    ///
    /// Returns `true` if the message was queued, `false` if this connection
    /// is not subscribed to the topic, is disconnected, or the queue is full.
    pub fn inject(&self, message: Message) -> bool {
        if !self.is_connected() || !self.is_subscribed(&message.topic) {
            return false;
        }
        match self.inbound_tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                tracing::warn!(topic = %dropped.topic, "inbound queue full, dropping message");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Observe every message this connection publishes from now on.
    pub fn tap(&self) -> Receiver<Message> {
        let (tx, rx) = unbounded();
        lock(&self.taps).push(tx);
        rx
    }

    /// Check whether inbound messages on `topic` are delivered.
    pub fn is_subscribed(&self, topic: &str) -> bool {
        lock(&self.subscriptions).contains(topic)
    }

    /// Topics currently subscribed, sorted.
    pub fn subscriptions(&self) -> Vec<String> {
        let mut topics: Vec<String> = lock(&self.subscriptions).iter().cloned().collect();
        topics.sort();
        topics
    }

    /// Check whether the connection is still up.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Tear down the connection. Later publishes fail and taps are closed.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        lock(&self.taps).clear();
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for LocalBus {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        if !self.is_connected() {
            return Err(BusError::Disconnected);
        }
        let message = Message::new(topic, payload);

        // Closed taps are pruned as we go
        lock(&self.taps).retain(|tap| tap.send(message.clone()).is_ok());

        self.inject(message);
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Result<(), BusError> {
        if !self.is_connected() {
            return Err(BusError::Disconnected);
        }
        lock(&self.subscriptions).insert(topic.to_string());
        Ok(())
    }

    fn unsubscribe(&self, topic: &str) -> Result<(), BusError> {
        if !self.is_connected() {
            return Err(BusError::Disconnected);
        }
        lock(&self.subscriptions).remove(topic);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_requires_subscription() {
        let bus = LocalBus::new();
        assert!(!bus.inject(Message::new("/touch", "L_HEAD=1")));

        bus.subscribe("/touch").unwrap();
        assert!(bus.inject(Message::new("/touch", "L_HEAD=1")));
        assert_eq!(bus.receiver().try_recv().unwrap().payload, "L_HEAD=1");
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = LocalBus::new();
        bus.subscribe("/radar").unwrap();
        bus.unsubscribe("/radar").unwrap();
        assert!(!bus.inject(Message::new("/radar", "1")));
        assert!(bus.receiver().try_recv().is_err());
    }

    #[test]
    fn test_publish_reaches_taps_and_echoes_subscribed_topics() {
        let bus = LocalBus::new();
        let tap = bus.tap();
        bus.subscribe("/sleep").unwrap();

        bus.publish("/screen", "happy").unwrap();
        bus.publish("/sleep", "1").unwrap();

        let seen: Vec<Message> = tap.try_iter().collect();
        assert_eq!(
            seen,
            vec![Message::new("/screen", "happy"), Message::new("/sleep", "1")]
        );

        // Only the subscribed topic comes back around
        let echoed: Vec<Message> = bus.receiver().try_iter().collect();
        assert_eq!(echoed, vec![Message::new("/sleep", "1")]);
    }

    #[test]
    fn test_disconnected_bus_rejects_calls() {
        let bus = LocalBus::new();
        bus.disconnect();
        assert!(matches!(bus.publish("/haptic", "1"), Err(BusError::Disconnected)));
        assert!(matches!(bus.subscribe("/touch"), Err(BusError::Disconnected)));
    }

    #[test]
    fn test_subscriptions_sorted() {
        let bus = LocalBus::new();
        bus.subscribe("/touch").unwrap();
        bus.subscribe("/radar").unwrap();
        assert_eq!(bus.subscriptions(), vec!["/radar", "/touch"]);
    }
}
