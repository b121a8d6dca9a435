//! # In-Memory Queue
//!
//! A single-process stand-in for SQS with the parts of its behaviour the
//! worker relies on:
//!
//! - receive hides the message for the visibility timeout and hands out a
//!   fresh receipt handle on every delivery
//! - an undeleted message comes back once the timeout lapses
//! - delete with a stale handle fails
//! - receive blocks up to `wait` when nothing is visible
//!
//! Clones share the same queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::{MessageQueue, QueueHandle, ReceiveOptions, ReceivedMessage};
use crate::error::{PaperTrailError, Result};

#[derive(Debug)]
struct Entry {
    id: String,
    body: String,
    visible_at: Instant,
    receive_count: u32,
    receipt: Option<String>,
}

#[derive(Debug, Default)]
struct QueueState {
    entries: VecDeque<Entry>,
    next_id: u64,
    next_receipt: u64,
    deleted: Vec<String>,
    fail_receives: usize,
}

/// A delivered message, or when the next hidden one becomes visible.
type Take = std::result::Result<ReceivedMessage, Option<Instant>>;

/// Shared in-process queue.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enqueue a body; returns the message id.
    pub fn push(&self, body: impl Into<String>) -> String {
        let id = {
            let mut state = self.state();
            state.next_id += 1;
            let id = format!("msg-{}", state.next_id);
            state.entries.push_back(Entry {
                id: id.clone(),
                body: body.into(),
                visible_at: Instant::now(),
                receive_count: 0,
                receipt: None,
            });
            id
        };
        self.notify.notify_one();
        id
    }

    /// Messages not yet deleted, visible or not.
    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of deleted messages, in delete order.
    pub fn deleted(&self) -> Vec<String> {
        self.state().deleted.clone()
    }

    /// How many times `id` has been delivered so far.
    pub fn receive_count(&self, id: &str) -> Option<u32> {
        self.state()
            .entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.receive_count)
    }

    /// Make the next `n` receive calls fail.
    pub fn fail_next_receives(&self, n: usize) {
        self.state().fail_receives = n;
    }

    /// Take the first visible message, or report when the next one shows up.
    fn try_take(&self, options: &ReceiveOptions) -> Result<Take> {
        let mut state = self.state();
        if state.fail_receives > 0 {
            state.fail_receives -= 1;
            return Err(PaperTrailError::Queue("simulated receive failure".into()));
        }

        let now = Instant::now();
        state.next_receipt += 1;
        let receipt = format!("rh-{}", state.next_receipt);

        if let Some(entry) = state.entries.iter_mut().find(|e| e.visible_at <= now) {
            entry.visible_at = now + options.visibility_timeout;
            entry.receive_count += 1;
            entry.receipt = Some(receipt.clone());
            return Ok(Ok(ReceivedMessage {
                id: entry.id.clone(),
                body: entry.body.clone(),
                handle: QueueHandle::new(receipt),
                receive_count: entry.receive_count,
            }));
        }

        Ok(Err(state.entries.iter().map(|e| e.visible_at).min()))
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn receive(&self, options: &ReceiveOptions) -> Result<Option<ReceivedMessage>> {
        let deadline = Instant::now() + options.wait;

        loop {
            let next_visible = match self.try_take(options)? {
                Ok(message) => return Ok(Some(message)),
                Err(next_visible) => next_visible,
            };

            if Instant::now() >= deadline {
                return Ok(None);
            }

            let wake = next_visible.map_or(deadline, |at| at.min(deadline));
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }

    async fn delete(&self, handle: &QueueHandle) -> Result<()> {
        let mut state = self.state();
        let position = state
            .entries
            .iter()
            .position(|e| e.receipt.as_deref() == Some(handle.as_str()))
            .ok_or_else(|| {
                PaperTrailError::Queue(format!("receipt handle {} is stale or unknown", handle))
            })?;

        if let Some(entry) = state.entries.remove(position) {
            state.deleted.push(entry.id);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn quick(visibility_ms: u64) -> ReceiveOptions {
        ReceiveOptions {
            wait: Duration::from_millis(20),
            visibility_timeout: Duration::from_millis(visibility_ms),
        }
    }

    #[tokio::test]
    async fn test_fifo_and_hidden_while_in_flight() {
        let queue = MemoryQueue::new();
        let first = queue.push("one");
        let second = queue.push("two");

        let a = queue.receive(&quick(60_000)).await.unwrap().unwrap();
        let b = queue.receive(&quick(60_000)).await.unwrap().unwrap();
        assert_eq!((a.id.as_str(), a.body.as_str()), (first.as_str(), "one"));
        assert_eq!((b.id.as_str(), b.body.as_str()), (second.as_str(), "two"));

        // Both in flight: nothing visible
        assert!(queue.receive(&quick(60_000)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes() {
        let queue = MemoryQueue::new();
        let id = queue.push("one");

        let msg = queue.receive(&quick(60_000)).await.unwrap().unwrap();
        queue.delete(&msg.handle).await.unwrap();

        assert!(queue.is_empty());
        assert_eq!(queue.deleted(), vec![id]);
    }

    #[tokio::test]
    async fn test_redelivery_after_visibility_timeout() {
        let queue = MemoryQueue::new();
        let id = queue.push("one");

        let first = queue.receive(&quick(10)).await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;
        let second = queue.receive(&quick(10)).await.unwrap().unwrap();

        assert_eq!(second.id, id);
        assert_eq!(second.receive_count, 2);
        assert_ne!(first.handle, second.handle);

        // The old receipt no longer acknowledges anything
        assert!(queue.delete(&first.handle).await.is_err());
        queue.delete(&second.handle).await.unwrap();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_receive_waits_for_push() {
        let queue = MemoryQueue::new();
        let producer = queue.clone();

        let options = ReceiveOptions {
            wait: Duration::from_secs(5),
            visibility_timeout: Duration::from_secs(60),
        };
        let handle = tokio::spawn(async move { queue.receive(&options).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        producer.push("late");

        let msg = handle.await.unwrap().unwrap().unwrap();
        assert_eq!(msg.body, "late");
    }

    #[tokio::test]
    async fn test_empty_receive_times_out() {
        let queue = MemoryQueue::new();
        let started = Instant::now();
        assert!(queue.receive(&quick(10)).await.unwrap().is_none());
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_scripted_receive_failure() {
        let queue = MemoryQueue::new();
        queue.push("one");
        queue.fail_next_receives(1);

        assert!(queue.receive(&quick(10)).await.is_err());
        assert!(queue.receive(&quick(10)).await.unwrap().is_some());
    }
}
