//! Actuator transport and command dispatch.
//!
//! A `Transport` is a byte channel to the gimbal controller. The `Dispatcher`
//! owns one, writes encoded command frames to it and turns I/O failures into
//! `ConnectionError` / `TransmissionError` for the tracking loop to act on.
//! Frames arrive already encoded; the digit width belongs to the tracker.

pub mod command;
mod console;
mod memory;
mod serial;

use std::io;

use crate::config::{TransportKind, TransportSettings};
use crate::error::{ConnectionError, TransmissionError};

pub use command::{CommandFrame, FRAME_MARKER};
pub use console::ConsoleTransport;
pub use memory::{MemoryTransport, TransportEvent};
pub use serial::SerialTransport;

/// Byte channel to the actuator.
pub trait Transport: Send {
    /// Port path or other human-readable address.
    fn address(&self) -> &str;

    fn open(&mut self) -> io::Result<()>;

    /// Write one complete frame. Either all bytes go out or an error returns.
    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Release the channel. Closing a closed transport is a no-op.
    fn close(&mut self);
}

/// Build the transport named by the settings.
pub fn build_transport(settings: &TransportSettings) -> Box<dyn Transport> {
    match settings.kind {
        TransportKind::Serial => Box::new(SerialTransport::new(
            settings.address.clone(),
            settings.baud_rate,
            settings.write_timeout,
        )),
        TransportKind::Console => Box::new(ConsoleTransport::stdout()),
    }
}

/// Owns the connection to the actuator for the lifetime of a session.
pub struct Dispatcher {
    transport: Box<dyn Transport>,
    connected: bool,
    frames_sent: u64,
}

impl Dispatcher {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            connected: false,
            frames_sent: 0,
        }
    }

    pub fn address(&self) -> &str {
        self.transport.address()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Open the transport. A single attempt; retry policy belongs to the caller.
    pub fn connect(&mut self) -> Result<(), ConnectionError> {
        match self.transport.open() {
            Ok(()) => {
                self.connected = true;
                log::info!("actuator connected at {}", self.address());
                Ok(())
            }
            Err(source) => {
                self.connected = false;
                Err(ConnectionError {
                    address: self.address().to_string(),
                    source,
                })
            }
        }
    }

    /// Write an encoded frame.
    pub fn send(&mut self, frame: &CommandFrame) -> Result<(), TransmissionError> {
        if !self.connected {
            return Err(TransmissionError::NotConnected {
                address: self.address().to_string(),
            });
        }
        self.transport
            .write_frame(frame.as_bytes())
            .map_err(|source| TransmissionError::Write {
                address: self.transport.address().to_string(),
                source,
            })?;
        self.frames_sent += 1;
        log::debug!("sent {}", frame);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if self.connected {
            self.transport.close();
            self.connected = false;
            log::info!("actuator disconnected from {}", self.address());
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.disconnect();
    }
}
