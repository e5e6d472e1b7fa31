//! Serial port enumeration and the backend the scanner runs on.
//!
//! `SerialBackend` bundles the two OS facilities a scan needs: listing
//! port names and building a transport for one of them. `SystemSerial`
//! wraps `serialport`; tests supply their own backend.

use serde::Serialize;
use std::time::Duration;
use tracing::warn;

use crate::error::ScanError;
use crate::transport::{ScannerTransport, SerialTransport};

/// One system-visible serial port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortInfo {
    pub name: String,
    pub port_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

/// OS serial facilities used by the scan orchestrator.
pub trait SerialBackend: Send + Sync {
    /// Port identifiers in OS enumeration order.
    fn port_names(&self) -> Result<Vec<String>, ScanError>;

    /// A closed transport for `port`; the session opens it.
    fn transport(
        &self,
        port: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Box<dyn ScannerTransport>;
}

/// Backend over the real `serialport` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSerial;

impl SerialBackend for SystemSerial {
    fn port_names(&self) -> Result<Vec<String>, ScanError> {
        Ok(list_ports()?.into_iter().map(|p| p.name).collect())
    }

    fn transport(
        &self,
        port: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Box<dyn ScannerTransport> {
        Box::new(SerialTransport::new(port, baud_rate, read_timeout))
    }
}

/// List available serial ports on this system.
pub fn list_ports() -> Result<Vec<PortInfo>, ScanError> {
    let ports = serialport::available_ports().map_err(|e| {
        warn!(error = %e, "Failed to list serial ports");
        ScanError::NoDeviceFound
    })?;

    Ok(ports
        .into_iter()
        .map(|p| {
            let mut info = PortInfo {
                name: p.port_name,
                port_type: String::new(),
                vid: None,
                pid: None,
                manufacturer: None,
                product: None,
            };
            match p.port_type {
                serialport::SerialPortType::UsbPort(usb) => {
                    info.port_type = "usb".into();
                    info.vid = Some(usb.vid);
                    info.pid = Some(usb.pid);
                    info.manufacturer = usb.manufacturer;
                    info.product = usb.product;
                }
                serialport::SerialPortType::BluetoothPort => info.port_type = "bluetooth".into(),
                serialport::SerialPortType::PciPort => info.port_type = "pci".into(),
                serialport::SerialPortType::Unknown => info.port_type = "unknown".into(),
            }
            info
        })
        .collect())
}
