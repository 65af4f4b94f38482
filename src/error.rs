//! Typed failures surfaced by the command path.
//!
//! Connection and transmission failures are returned to the caller, which
//! decides whether to retry, continue or abort. Only these seams get typed
//! errors; configuration, ingestion and detection use `anyhow`.

use std::io;

use thiserror::Error;

/// The actuator transport could not be opened.
#[derive(Debug, Error)]
#[error("failed to connect to actuator at {address}: {source}")]
pub struct ConnectionError {
    pub address: String,
    #[source]
    pub source: io::Error,
}

/// A command frame could not be written to an open transport.
#[derive(Debug, Error)]
pub enum TransmissionError {
    #[error("transport {address} is not connected")]
    NotConnected { address: String },

    #[error("write to {address} failed: {source}")]
    Write {
        address: String,
        #[source]
        source: io::Error,
    },
}

/// A mapped value does not fit the configured digit width.
///
/// Values are never truncated to fit.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("value {value} does not fit in {digits} digits")]
pub struct MalformedValue {
    pub value: i32,
    pub digits: usize,
}

