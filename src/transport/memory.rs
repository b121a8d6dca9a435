//! # In-Memory Transport
//!
//! Records every write instead of sending it anywhere. Clones share the same
//! recording, so a test can hand one clone to the printer and inspect the
//! other. Failures can be scripted to exercise the reconnect path.

use std::sync::{Arc, Mutex, MutexGuard};

use super::Transport;
use crate::error::{PaperTrailError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    writes: Vec<Vec<u8>>,
    fail_next: usize,
    fail_at: Option<usize>,
    fail_always: bool,
    reconnects: usize,
    closed: bool,
}

/// Shared, inspectable byte sink.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next `n` writes fail.
    pub fn fail_next_writes(&self, n: usize) {
        self.state().fail_next = n;
    }

    /// Make the `n`-th upcoming write (1-based) fail once.
    pub fn fail_write_number(&self, n: usize) {
        self.state().fail_at = Some(n);
    }

    /// Make every write fail until switched off.
    pub fn fail_always(&self, fail: bool) {
        self.state().fail_always = fail;
    }

    /// Each successful `write_all` call, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state().writes.clone()
    }

    /// All successfully written bytes, concatenated.
    pub fn bytes(&self) -> Vec<u8> {
        self.state().writes.concat()
    }

    pub fn reconnects(&self) -> usize {
        self.state().reconnects
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

impl Transport for MemoryTransport {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.state();
        if state.closed {
            return Err(PaperTrailError::TransportWrite("memory transport is closed".into()));
        }
        if state.fail_always {
            return Err(PaperTrailError::TransportWrite("simulated write failure".into()));
        }
        if let Some(n) = state.fail_at {
            state.fail_at = n.checked_sub(1).filter(|&left| left > 0);
            if n <= 1 {
                return Err(PaperTrailError::TransportWrite("simulated write failure".into()));
            }
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(PaperTrailError::TransportWrite("simulated write failure".into()));
        }
        state.writes.push(data.to_vec());
        Ok(())
    }

    fn reconnect(&mut self) -> Result<()> {
        let mut state = self.state();
        state.reconnects += 1;
        state.closed = false;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.state().closed = true;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
