// Duplex channel seam - Implemented by the websocket adapter
use crate::domain::event::OutboundMessage;
use thiserror::Error;

/// What the transport reports to the session, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected,
    Frame(String),
    Disconnected { reason: String },
    Closed,
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("dashboard channel is closed")]
    Closed,
    #[error("failed to encode outbound message: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait DashboardChannel: Send + Sync {
    /// Queue a message for the server without waiting for delivery.
    fn send(&self, message: &OutboundMessage) -> Result<(), ChannelError>;

    /// Tear the connection down. Further sends fail with `ChannelError::Closed`.
    fn close(&self);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// In-memory channel that records everything sent through it.
    #[derive(Default)]
    pub struct RecordingChannel {
        sent: Mutex<Vec<OutboundMessage>>,
        closed: AtomicBool,
    }

    impl RecordingChannel {
        pub fn sent(&self) -> Vec<OutboundMessage> {
            self.sent.lock().unwrap().clone()
        }

        pub fn clear(&self) {
            self.sent.lock().unwrap().clear();
        }

        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    impl DashboardChannel for RecordingChannel {
        fn send(&self, message: &OutboundMessage) -> Result<(), ChannelError> {
            if self.is_closed() {
                return Err(ChannelError::Closed);
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }
}
