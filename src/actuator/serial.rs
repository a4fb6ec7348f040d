// SPDX-License-Identifier: GPL-3.0-only

//! Serial dropper transport
//!
//! Raw tty configured to 115200 8N1 with a one second read timeout.
//! Position codes go out as ASCII; the link periodically emits status
//! lines, where "SEND 1" means the wireless hop is busy and positions
//! should not be sent.

use super::{ConnectionStatus, DropPosition, DropperTransport};
use crate::errors::ActuatorError;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;
use tracing::{debug, warn};

/// Status line emitted while the wireless hop is busy
const BUSY_STATUS_LINE: &str = "SEND 1";

pub struct SerialTransport {
    file: File,
    path: String,
}

impl SerialTransport {
    /// Open and configure a serial device (e.g. "/dev/ttyUSB0").
    pub fn open(path: &str) -> Result<Self, ActuatorError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| ActuatorError::Unavailable(format!("{}: {}", path, e)))?;
        configure_tty(&file).map_err(|e| ActuatorError::Unavailable(format!("{}: {}", path, e)))?;
        debug!(path, "Opened serial dropper link");
        Ok(Self {
            file,
            path: path.to_string(),
        })
    }

    /// Read one newline-terminated status line, or None on timeout.
    fn read_status_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            // VTIME makes this return 0 after the read timeout elapses
            let read = self.file.read(&mut byte)?;
            if read == 0 {
                return Ok(if line.is_empty() {
                    None
                } else {
                    Some(String::from_utf8_lossy(&line).trim().to_string())
                });
            }
            if byte[0] == b'\n' {
                return Ok(Some(String::from_utf8_lossy(&line).trim().to_string()));
            }
            line.push(byte[0]);
            if line.len() > 256 {
                line.clear();
            }
        }
    }
}

impl DropperTransport for SerialTransport {
    fn send_position(&mut self, position: DropPosition) -> Result<(), ActuatorError> {
        debug!(path = %self.path, code = position.code(), "Writing dropper position");
        self.file
            .write_all(position.code().to_string().as_bytes())?;
        self.file.flush()?;
        Ok(())
    }

    fn probe(&mut self) -> ConnectionStatus {
        match self.read_status_line() {
            Ok(Some(line)) => ConnectionStatus {
                connected: true,
                ready: line != BUSY_STATUS_LINE,
            },
            Ok(None) => ConnectionStatus {
                connected: true,
                ready: true,
            },
            Err(e) => {
                warn!(path = %self.path, error = %e, "Serial status read failed");
                ConnectionStatus {
                    connected: false,
                    ready: false,
                }
            }
        }
    }
}

/// Put the tty into raw mode at 115200 baud, 8N1, with a 1s read timeout
/// (VTIME is in tenths of a second, VMIN 0 so reads return on timeout).
fn configure_tty(file: &File) -> std::io::Result<()> {
    let fd = file.as_raw_fd();

    let mut tio = std::mem::MaybeUninit::<libc::termios>::uninit();
    if unsafe { libc::tcgetattr(fd, tio.as_mut_ptr()) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    let mut tio = unsafe { tio.assume_init() };

    unsafe {
        libc::cfmakeraw(&mut tio);
        libc::cfsetispeed(&mut tio, libc::B115200);
        libc::cfsetospeed(&mut tio, libc::B115200);
    }

    tio.c_cflag |= libc::CLOCAL | libc::CREAD;
    tio.c_cc[libc::VMIN] = 0;
    tio.c_cc[libc::VTIME] = 10;

    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
