//! In-memory transport that records everything written to it.
//!
//! Clones share state, so a test can hand one clone to the dispatcher and
//! inspect the other. Opens and writes can be made to fail on demand.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use super::Transport;

/// Lifecycle record, in the order things happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Frame(String),
    Closed,
}

#[derive(Default)]
struct MemoryState {
    events: Vec<TransportEvent>,
    open: bool,
    failing_opens: u32,
    fail_writes: bool,
    open_attempts: u32,
}

#[derive(Clone)]
pub struct MemoryTransport {
    address: String,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next `count` opens fail.
    pub fn fail_next_opens(&self, count: u32) {
        self.lock().failing_opens = count;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    pub fn open_attempts(&self) -> u32 {
        self.lock().open_attempts
    }

    pub fn events(&self) -> Vec<TransportEvent> {
        self.lock().events.clone()
    }

    /// Frames written so far, as text.
    pub fn frames(&self) -> Vec<String> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                TransportEvent::Frame(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Transport for MemoryTransport {
    fn address(&self) -> &str {
        &self.address
    }

    fn open(&mut self) -> io::Result<()> {
        let mut state = self.lock();
        state.open_attempts += 1;
        if state.failing_opens > 0 {
            state.failing_opens -= 1;
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "memory transport refused open",
            ));
        }
        state.open = true;
        state.events.push(TransportEvent::Opened);
        Ok(())
    }

    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        if !state.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "not open"));
        }
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "write refused"));
        }
        state
            .events
            .push(TransportEvent::Frame(String::from_utf8_lossy(bytes).into_owned()));
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.lock();
        if state.open {
            state.open = false;
            state.events.push(TransportEvent::Closed);
        }
    }
}
