// SPDX-License-Identifier: GPL-3.0-only

//! Dropper actuator client
//!
//! The dropper accepts three fixed position codes over either a serial line
//! or HTTP. A drop moves to a side position, settles, then returns to
//! center. The scan loop never calls into this module; wiring actuation to
//! detections is the consumer's decision.

pub mod http;
pub mod serial;

use crate::constants::DROPPER_SETTLE;
use crate::errors::ActuatorError;
use std::time::Duration;
use tracing::info;

pub use http::HttpTransport;
pub use serial::SerialTransport;

/// Mechanical position of the dropper arm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPosition {
    Left,
    Center,
    Right,
}

impl DropPosition {
    /// Wire code sent to the actuator
    pub fn code(&self) -> u32 {
        match self {
            DropPosition::Left => 0,
            DropPosition::Center => 90,
            DropPosition::Right => 180,
        }
    }
}

impl std::str::FromStr for DropPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" => Ok(DropPosition::Left),
            "center" => Ok(DropPosition::Center),
            "right" => Ok(DropPosition::Right),
            other => Err(format!(
                "unknown position '{}'; expected left, center or right",
                other
            )),
        }
    }
}

impl std::fmt::Display for DropPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropPosition::Left => write!(f, "left"),
            DropPosition::Center => write!(f, "center"),
            DropPosition::Right => write!(f, "right"),
        }
    }
}

/// Link health as reported by a transport probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// The endpoint answered at all
    pub connected: bool,
    /// The actuator will accept a position right now (serial links report
    /// "SEND 1" while the wireless hop is busy)
    pub ready: bool,
}

/// A channel capable of carrying position codes to the dropper
pub trait DropperTransport {
    fn send_position(&mut self, position: DropPosition) -> Result<(), ActuatorError>;

    /// Check link health without moving the actuator.
    fn probe(&mut self) -> ConnectionStatus;
}

/// High-level dropper client
pub struct Dropper<T: DropperTransport> {
    transport: T,
    settle: Duration,
}

impl<T: DropperTransport> Dropper<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            settle: DROPPER_SETTLE,
        }
    }

    #[cfg(test)]
    fn with_settle(transport: T, settle: Duration) -> Self {
        Self { transport, settle }
    }

    /// Move to `position`. Side positions settle for one second and then
    /// return to center; a center request is a single move.
    pub fn drop_to(&mut self, position: DropPosition) -> Result<(), ActuatorError> {
        info!(position = %position, code = position.code(), "Driving dropper");
        self.transport.send_position(position)?;
        if position != DropPosition::Center {
            std::thread::sleep(self.settle);
            self.transport.send_position(DropPosition::Center)?;
        }
        Ok(())
    }

    pub fn status(&mut self) -> ConnectionStatus {
        self.transport.probe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingTransport {
        sent: Vec<u32>,
    }

    impl DropperTransport for RecordingTransport {
        fn send_position(&mut self, position: DropPosition) -> Result<(), ActuatorError> {
            self.sent.push(position.code());
            Ok(())
        }

        fn probe(&mut self) -> ConnectionStatus {
            ConnectionStatus {
                connected: true,
                ready: true,
            }
        }
    }

    #[test]
    fn test_position_codes() {
        assert_eq!(DropPosition::Left.code(), 0);
        assert_eq!(DropPosition::Center.code(), 90);
        assert_eq!(DropPosition::Right.code(), 180);
    }

    #[test]
    fn test_position_parsing() {
        assert_eq!("left".parse::<DropPosition>().unwrap(), DropPosition::Left);
        assert_eq!("RIGHT".parse::<DropPosition>().unwrap(), DropPosition::Right);
        assert!("up".parse::<DropPosition>().is_err());
    }

    #[test]
    fn test_side_drop_recenters() {
        let transport = RecordingTransport { sent: Vec::new() };
        let mut dropper = Dropper::with_settle(transport, Duration::from_millis(1));
        dropper.drop_to(DropPosition::Left).unwrap();
        assert_eq!(dropper.transport.sent, vec![0, 90]);
    }

    #[test]
    fn test_center_drop_is_single_move() {
        let transport = RecordingTransport { sent: Vec::new() };
        let mut dropper = Dropper::with_settle(transport, Duration::from_millis(1));
        dropper.drop_to(DropPosition::Center).unwrap();
        assert_eq!(dropper.transport.sent, vec![90]);
    }
}
