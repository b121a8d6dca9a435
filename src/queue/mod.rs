//! # Message Queue Layer
//!
//! The worker only needs two operations from a queue: a long-poll receive of
//! at most one message, and a delete that acknowledges it.
//!
//! ## Available Queues
//!
//! - [`sqs`]: Amazon SQS
//! - [`memory`]: In-process queue with visibility timeouts, for tests
//!
//! ## Delivery Semantics
//!
//! A received message stays invisible to other consumers for the visibility
//! timeout. If it is not deleted within that window it is delivered again,
//! so delivery is at-least-once.

pub mod memory;
pub mod sqs;

pub use memory::MemoryQueue;
pub use sqs::{QueueSettings, SqsQueue};

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Longest time a receive call blocks waiting for a message.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(20);

/// How long a received message stays reserved for this worker.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(60);

/// Acknowledgment token returned with a dequeued message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueHandle(String);

impl QueueHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Receipt handles are long; the tail is enough to correlate logs
        let tail = self.0.len().saturating_sub(12);
        match self.0.get(tail..) {
            Some(suffix) if tail > 0 => write!(f, "…{}", suffix),
            _ => f.write_str(&self.0),
        }
    }
}

/// One message as delivered by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub id: String,
    pub body: String,
    pub handle: QueueHandle,
    /// How many times this message has been delivered, this time included.
    pub receive_count: u32,
}

/// Long-poll parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveOptions {
    pub wait: Duration,
    pub visibility_timeout: Duration,
}

impl ReceiveOptions {
    /// Messages per receive. Fixed at one: print order must equal delivery
    /// order and only one job may be in flight on the printer.
    pub const MAX_MESSAGES: i32 = 1;
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self {
            wait: DEFAULT_WAIT,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }
}

/// A queue the worker can drain.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Wait up to `options.wait` for one message.
    async fn receive(&self, options: &ReceiveOptions) -> Result<Option<ReceivedMessage>>;

    /// Permanently remove a received message.
    async fn delete(&self, handle: &QueueHandle) -> Result<()>;

    /// Human readable target, for logs.
    fn describe(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_receive_options() {
        let options = ReceiveOptions::default();
        assert_eq!(options.wait, Duration::from_secs(20));
        assert_eq!(options.visibility_timeout, Duration::from_secs(60));
        assert_eq!(ReceiveOptions::MAX_MESSAGES, 1);
    }

    #[test]
    fn test_handle_display_is_shortened() {
        let handle = QueueHandle::new("AQEBwJnKyrHigUMZj6rYigCgxlaS3SLy0a");
        assert_eq!(handle.to_string(), "…CgxlaS3SLy0a");
    }

    #[test]
    fn test_short_handle_display_is_verbatim() {
        assert_eq!(QueueHandle::new("rh-1").to_string(), "rh-1");
    }
}
