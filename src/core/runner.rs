//! Inbound pump: feeds bus deliveries to the engine in arrival order.

use crate::bus::Message;
use crate::core::engine::Engine;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How often the pump re-checks the running flag while no messages arrive.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Why the pump returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// The running flag was cleared
    Stopped,
    /// Every sender of the inbound queue is gone. A [`LocalBus`] holds its
    /// own sender, so this only happens with a caller-owned channel.
    ///
    /// [`LocalBus`]: crate::bus::LocalBus
    Disconnected,
}

/// Dispatch inbound messages to `engine` until `running` goes false.
pub fn run(engine: &Engine, inbound: &Receiver<Message>, running: &AtomicBool) -> RunExit {
    while running.load(Ordering::SeqCst) {
        match inbound.recv_timeout(POLL_INTERVAL) {
            Ok(message) => {
                if !engine.dispatch(&message) {
                    tracing::debug!(topic = %message.topic, "no handler for topic");
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("inbound queue disconnected");
                return RunExit::Disconnected;
            }
        }
    }
    RunExit::Stopped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Bus, LocalBus};
    use crate::config::Config;
    use crate::telemetry::create_shared_telemetry;
    use crossbeam_channel::unbounded;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_drains_until_disconnected() {
        let bus: Arc<dyn Bus> = Arc::new(LocalBus::new());
        let engine = Engine::new(
            bus,
            &Config::default(),
            create_shared_telemetry(),
            tokio::runtime::Handle::current(),
        );

        let (tx, rx) = unbounded();
        tx.send(Message::new("/touch", "L_HEAD=1")).unwrap();
        tx.send(Message::new("/radar", "1")).unwrap();
        drop(tx);

        let running = AtomicBool::new(true);
        assert_eq!(run(&engine, &rx, &running), RunExit::Disconnected);

        let snap = engine.snapshot();
        assert!(snap.expression_active);
        assert!(snap.radar_active);
    }

    #[tokio::test]
    async fn test_stops_when_flag_cleared() {
        let bus: Arc<dyn Bus> = Arc::new(LocalBus::new());
        let engine = Engine::new(
            bus,
            &Config::default(),
            create_shared_telemetry(),
            tokio::runtime::Handle::current(),
        );
        let (_tx, rx) = unbounded::<Message>();
        let running = AtomicBool::new(false);
        assert_eq!(run(&engine, &rx, &running), RunExit::Stopped);
    }
}
