// SPDX-License-Identifier: GPL-3.0-only

//! HTTP dropper transport
//!
//! Sends a position as a GET with a numeric `value` query parameter on a
//! fixed base URL. A reachable endpoint counts as connected regardless of
//! its HTTP status; HTTP carries no busy signal.

use super::{ConnectionStatus, DropPosition, DropperTransport};
use crate::constants::DROPPER_TIMEOUT;
use crate::errors::ActuatorError;
use tracing::debug;

pub struct HttpTransport {
    base_url: String,
}

impl HttpTransport {
    /// `base_url` is the bare endpoint, e.g. "http://10.0.1.9".
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl DropperTransport for HttpTransport {
    fn send_position(&mut self, position: DropPosition) -> Result<(), ActuatorError> {
        let url = format!("{}/?value={}", self.base_url, position.code());
        debug!(url = %url, "Sending dropper position");
        ureq::get(&url)
            .timeout(DROPPER_TIMEOUT)
            .call()
            .map_err(|e| ActuatorError::Unavailable(e.to_string()))?;
        Ok(())
    }

    fn probe(&mut self) -> ConnectionStatus {
        let reachable = match ureq::get(&self.base_url).timeout(DROPPER_TIMEOUT).call() {
            Ok(_) => true,
            // A status error still means something answered
            Err(ureq::Error::Status(_, _)) => true,
            Err(_) => false,
        };
        ConnectionStatus {
            connected: reachable,
            ready: reachable,
        }
    }
}
