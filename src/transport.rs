//! Byte-level link to the license scanner.
//!
//! `ScannerTransport` is the seam between the device session and the
//! hardware. `SerialTransport` drives a real port through the `serialport`
//! crate.

use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::ScanError;

// ---------------------------------------------------------------------------
// Transport state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// Abstract byte-level transport for the scanner.
pub trait ScannerTransport: Send {
    /// Open the underlying port.
    fn connect(&mut self) -> Result<(), ScanError>;

    /// Close the underlying port. Idempotent.
    fn disconnect(&mut self) -> Result<(), ScanError>;

    /// Send raw bytes. Returns number of bytes written.
    fn send(&mut self, data: &[u8]) -> Result<usize, ScanError>;

    /// Read at most `max_bytes`. A read timeout yields an empty buffer.
    fn receive(&mut self, max_bytes: usize) -> Result<Vec<u8>, ScanError>;

    fn is_connected(&self) -> bool;

    fn state(&self) -> TransportState;

    /// Human-readable description of the connection target.
    fn description(&self) -> String;
}

// ---------------------------------------------------------------------------
// Serial transport
// ---------------------------------------------------------------------------

/// USB-serial transport using the `serialport` crate.
pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
    read_timeout: Duration,
    port: Option<Box<dyn serialport::SerialPort>>,
    state: TransportState,
}

impl SerialTransport {
    pub fn new(port_name: &str, baud_rate: u32, read_timeout: Duration) -> Self {
        Self {
            port_name: port_name.to_string(),
            baud_rate,
            read_timeout,
            port: None,
            state: TransportState::Disconnected,
        }
    }
}

impl ScannerTransport for SerialTransport {
    fn connect(&mut self) -> Result<(), ScanError> {
        self.state = TransportState::Connecting;
        info!(
            port = %self.port_name,
            baud = self.baud_rate,
            timeout_ms = self.read_timeout.as_millis() as u64,
            "Opening scanner port"
        );

        let port = serialport::new(&self.port_name, self.baud_rate)
            .timeout(self.read_timeout)
            .open()
            .map_err(|e| {
                self.state = TransportState::Error;
                ScanError::PortOpen {
                    port: self.port_name.clone(),
                    reason: e.to_string(),
                }
            })?;

        self.port = Some(port);
        self.state = TransportState::Connected;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ScanError> {
        // Dropping the handle closes the OS file descriptor.
        if self.port.take().is_some() {
            info!(port = %self.port_name, "Scanner port closed");
        }
        self.state = TransportState::Disconnected;
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<usize, ScanError> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| ScanError::Transport("Serial port not connected".into()))?;
        debug!("Serial TX ({} bytes): {:02X?}", data.len(), data);
        port.write_all(data)
            .map_err(|e| ScanError::Transport(format!("write failed: {e}")))?;
        port.flush()
            .map_err(|e| ScanError::Transport(format!("flush failed: {e}")))?;
        Ok(data.len())
    }

    fn receive(&mut self, max_bytes: usize) -> Result<Vec<u8>, ScanError> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| ScanError::Transport("Serial port not connected".into()))?;

        let mut buf = vec![0u8; max_bytes];
        match port.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                debug!("Serial RX ({n} bytes): {:02X?}", &buf);
                Ok(buf)
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                debug!(
                    timeout_ms = self.read_timeout.as_millis() as u64,
                    "Serial RX timeout"
                );
                Ok(Vec::new())
            }
            Err(e) => {
                self.state = TransportState::Error;
                Err(ScanError::Transport(format!("read failed: {e}")))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.state == TransportState::Connected && self.port.is_some()
    }

    fn state(&self) -> TransportState {
        self.state
    }

    fn description(&self) -> String {
        format!("Serial({}@{})", self.port_name, self.baud_rate)
    }
}
