//! One command/response exchange with the scanner.
//!
//! Frame: `SOH <command bytes> EOT`. The device gets a fixed settle delay
//! before a single bounded read. The transport is closed before `exchange`
//! returns on every path that opened it.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::ScanError;
use crate::transport::ScannerTransport;

pub const SOH: u8 = 0x01;
pub const EOT: u8 = 0x04;
pub const NAK: u8 = 0x15;

pub const DEFAULT_COMMAND: &str = "<TXPING>";
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on a single response read.
pub const MAX_RESPONSE_BYTES: usize = 1024;

/// Wrap `command` in SOH/EOT.
pub fn frame_command(command: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(command.len() + 2);
    frame.push(SOH);
    frame.extend_from_slice(command.as_bytes());
    frame.push(EOT);
    frame
}

/// Decode device bytes as UTF-8, dropping invalid sequences.
pub fn decode_device_text(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// Send `command` and return the device's raw text response.
pub fn exchange(
    transport: &mut dyn ScannerTransport,
    command: &str,
    settle_delay: Duration,
) -> Result<String, ScanError> {
    transport.connect()?;

    let outcome = send_and_read(transport, command, settle_delay);

    if let Err(e) = transport.disconnect() {
        warn!(error = %e, device = %transport.description(), "Scanner port close failed");
    }

    let response = outcome?;
    if response.is_empty() || response == char::from(NAK).to_string() {
        info!(device = %transport.description(), "Scanner returned no data");
        return Err(ScanError::NoScan);
    }
    Ok(response)
}

fn send_and_read(
    transport: &mut dyn ScannerTransport,
    command: &str,
    settle_delay: Duration,
) -> Result<String, ScanError> {
    let frame = frame_command(command);
    transport.send(&frame)?;
    debug!(command = command, "Scanner command sent");

    if !settle_delay.is_zero() {
        std::thread::sleep(settle_delay);
    }

    let bytes = transport.receive(MAX_RESPONSE_BYTES)?;
    debug!(bytes = bytes.len(), "Scanner response received");
    Ok(decode_device_text(&bytes))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::transport::TransportState;
    use std::sync::{Arc, Mutex};

    /// Observable side effects of a `MockTransport`.
    #[derive(Debug, Default)]
    pub(crate) struct MockLog {
        pub connects: usize,
        pub disconnects: usize,
        pub sent: Vec<Vec<u8>>,
    }

    /// Scripted transport for session and orchestrator tests.
    pub(crate) struct MockTransport {
        pub log: Arc<Mutex<MockLog>>,
        pub fail_open: bool,
        pub response: Result<Vec<u8>, ScanError>,
        connected: bool,
    }

    impl MockTransport {
        pub fn responding(bytes: &[u8]) -> Self {
            Self {
                log: Arc::new(Mutex::new(MockLog::default())),
                fail_open: false,
                response: Ok(bytes.to_vec()),
                connected: false,
            }
        }

        pub fn failing_read() -> Self {
            Self {
                response: Err(ScanError::Transport("read failed: device unplugged".into())),
                ..Self::responding(b"")
            }
        }

        pub fn failing_open() -> Self {
            Self {
                fail_open: true,
                ..Self::responding(b"")
            }
        }
    }

    impl ScannerTransport for MockTransport {
        fn connect(&mut self) -> Result<(), ScanError> {
            self.log.lock().unwrap().connects += 1;
            if self.fail_open {
                return Err(ScanError::PortOpen {
                    port: "MOCK".into(),
                    reason: "Access is denied".into(),
                });
            }
            self.connected = true;
            Ok(())
        }

        fn disconnect(&mut self) -> Result<(), ScanError> {
            self.log.lock().unwrap().disconnects += 1;
            self.connected = false;
            Ok(())
        }

        fn send(&mut self, data: &[u8]) -> Result<usize, ScanError> {
            self.log.lock().unwrap().sent.push(data.to_vec());
            Ok(data.len())
        }

        fn receive(&mut self, max_bytes: usize) -> Result<Vec<u8>, ScanError> {
            self.response.clone().map(|mut bytes| {
                bytes.truncate(max_bytes);
                bytes
            })
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn state(&self) -> TransportState {
            if self.connected {
                TransportState::Connected
            } else {
                TransportState::Disconnected
            }
        }

        fn description(&self) -> String {
            "Mock".into()
        }
    }

    #[test]
    fn test_frame_command_wraps_soh_eot() {
        let frame = frame_command(DEFAULT_COMMAND);
        assert_eq!(frame.first(), Some(&SOH));
        assert_eq!(frame.last(), Some(&EOT));
        assert_eq!(&frame[1..frame.len() - 1], b"<TXPING>");
    }

    #[test]
    fn test_decode_drops_invalid_utf8() {
        let bytes = [b'D', b'C', b'S', 0xFF, 0xFE, b'D', b'O', b'E'];
        assert_eq!(decode_device_text(&bytes), "DCSDOE");
    }

    #[test]
    fn test_exchange_returns_response_unmodified() {
        let mut t = MockTransport::responding(b"\r\nDCSDOE\r\nDACJOHN\r\n");
        let raw = exchange(&mut t, DEFAULT_COMMAND, Duration::ZERO).unwrap();
        assert_eq!(raw, "\r\nDCSDOE\r\nDACJOHN\r\n");

        let log = t.log.lock().unwrap();
        assert_eq!(log.sent, vec![frame_command(DEFAULT_COMMAND)]);
        assert_eq!(log.connects, 1);
        assert_eq!(log.disconnects, 1);
    }

    #[test]
    fn test_exchange_empty_response_is_no_scan() {
        let mut t = MockTransport::responding(b"");
        let err = exchange(&mut t, DEFAULT_COMMAND, Duration::ZERO).unwrap_err();
        assert_eq!(err, ScanError::NoScan);
        assert_eq!(t.log.lock().unwrap().disconnects, 1);
    }

    #[test]
    fn test_exchange_bare_nak_is_no_scan() {
        let mut t = MockTransport::responding(&[NAK]);
        let err = exchange(&mut t, DEFAULT_COMMAND, Duration::ZERO).unwrap_err();
        assert_eq!(err, ScanError::NoScan);
    }

    #[test]
    fn test_exchange_nak_with_payload_is_returned() {
        let mut t = MockTransport::responding(b"\x15DCSDOE");
        let raw = exchange(&mut t, DEFAULT_COMMAND, Duration::ZERO).unwrap();
        assert_eq!(raw, "\u{15}DCSDOE");
    }

    #[test]
    fn test_port_closed_once_when_read_fails() {
        let mut t = MockTransport::failing_read();
        let err = exchange(&mut t, DEFAULT_COMMAND, Duration::ZERO).unwrap_err();
        assert_eq!(err.kind(), "TransportError");

        let log = t.log.lock().unwrap();
        assert_eq!(log.connects, 1);
        assert_eq!(log.disconnects, 1);
        assert!(!t.is_connected());
    }

    #[test]
    fn test_open_failure_propagates_port_open_error() {
        let mut t = MockTransport::failing_open();
        let err = exchange(&mut t, DEFAULT_COMMAND, Duration::ZERO).unwrap_err();
        assert_eq!(err.kind(), "PortOpenError");
        let log = t.log.lock().unwrap();
        assert!(log.sent.is_empty());
        assert_eq!(log.disconnects, 0);
    }
}
