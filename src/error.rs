//! Error types for the scan and print paths.
//!
//! Scan failures carry a stable `kind()` string so the HTTP layer can report
//! them without matching on display text.

use thiserror::Error;

/// Failure of a license scan attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// No enumerated serial port matched the platform naming convention.
    #[error("No compatible serial port found")]
    NoDeviceFound,

    /// The located port could not be opened (busy, missing, permission denied).
    #[error("Failed to open serial port {port}: {reason}")]
    PortOpen { port: String, reason: String },

    /// The device answered with nothing or a bare NAK.
    #[error("No license scanned or scanner not triggered")]
    NoScan,

    /// Write or read failed after the port was opened.
    #[error("Serial transport error: {0}")]
    Transport(String),
}

impl ScanError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoDeviceFound => "NoDeviceFound",
            Self::PortOpen { .. } => "PortOpenError",
            Self::NoScan => "NoScanError",
            Self::Transport(_) => "TransportError",
        }
    }
}

/// Failure of a receipt print request.
#[derive(Debug, Error)]
pub enum PrintError {
    /// Request body failed validation (e.g. missing transaction id).
    #[error("Invalid receipt: {0}")]
    InvalidReceipt(String),

    /// Receipt artifact could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The OS handler refused to open the artifact.
    #[error("Failed to open receipt for printing: {0}")]
    Open(String),
}
