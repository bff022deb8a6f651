//! Message and transport contracts shared by every bus backend.

use serde::{Deserialize, Serialize};

/// One message on the bus: a topic and a newline-free UTF-8 payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub topic: String,
    pub payload: String,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Errors a bus backend can report.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("bus connection is closed")]
    Disconnected,
    #[error("bus I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The process-wide publish/subscribe connection the engine talks through.
///
/// Every call is fire-and-forget: implementations must not block waiting for
/// an acknowledgment, since the engine calls them while holding its state lock.
pub trait Bus: Send + Sync + 'static {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError>;
    fn subscribe(&self, topic: &str) -> Result<(), BusError>;
    fn unsubscribe(&self, topic: &str) -> Result<(), BusError>;
}
