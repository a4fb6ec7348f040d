// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the watcher and the actuator client
//!
//! Per-frame failures are isolated to their frame and never abort the scan
//! loop; only a capture-source open failure is loop-fatal.

use std::fmt;

/// Errors surfaced by the scan loop.
#[derive(Debug, Clone)]
pub enum WatchError {
    /// The capture source failed to open. Loop-fatal: surfaced once to the
    /// consumer, the loop does not start and does not retry.
    SourceUnavailable(String),
    /// A single frame read returned nothing. Non-fatal: the tick is skipped
    /// without advancing any registry or tracker state.
    FrameUnavailable,
    /// A decoded candidate could not be interpreted as text. The candidate
    /// is dropped; other candidates in the same frame are unaffected.
    DecodeGarbage(String),
    /// Cooperative cancellation was requested. Not a failure; triggers the
    /// graceful shutdown sequence.
    Cancelled,
}

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchError::SourceUnavailable(msg) => {
                write!(f, "capture source unavailable: {}", msg)
            }
            WatchError::FrameUnavailable => write!(f, "no frame available"),
            WatchError::DecodeGarbage(msg) => write!(f, "undecodable payload: {}", msg),
            WatchError::Cancelled => write!(f, "cancellation requested"),
        }
    }
}

impl std::error::Error for WatchError {}

/// Errors from the dropper actuator client.
#[derive(Debug)]
pub enum ActuatorError {
    /// The transport endpoint could not be opened or reached.
    Unavailable(String),
    /// The link reported busy ("SEND 1" status line); do not send.
    Busy,
    /// Transport-level I/O failure.
    Io(String),
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuatorError::Unavailable(msg) => write!(f, "dropper unavailable: {}", msg),
            ActuatorError::Busy => write!(f, "dropper busy"),
            ActuatorError::Io(msg) => write!(f, "dropper I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ActuatorError {}

impl From<std::io::Error> for ActuatorError {
    fn from(err: std::io::Error) -> Self {
        ActuatorError::Io(err.to_string())
    }
}
