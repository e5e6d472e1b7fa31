//! Scanner port discovery.
//!
//! Picks the first serial port whose device name matches the naming
//! convention of the host platform. Enumeration order is whatever the OS
//! reports; with several matching adapters attached the pick is not stable.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ScanError;

/// Host platform family, resolved once from the build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Darwin,
    Linux,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Self::Windows,
            "macos" | "darwin" => Self::Darwin,
            "linux" => Self::Linux,
            _ => Self::Other,
        }
    }

    /// Whether `device` looks like a scanner port on this platform.
    pub fn matches_port(self, device: &str) -> bool {
        match self {
            Self::Windows => device.starts_with("COM"),
            Self::Darwin => device.to_lowercase().contains("usbserial"),
            Self::Linux => device.contains("ttyUSB") || device.to_lowercase().contains("usb"),
            Self::Other => false,
        }
    }
}

/// Return the first port in `ports` matching `platform`.
pub fn locate<S: AsRef<str>>(ports: &[S], platform: Platform) -> Result<String, ScanError> {
    for port in ports {
        let name = port.as_ref();
        debug!(port = name, platform = ?platform, "Checking port");
        if platform.matches_port(name) {
            return Ok(name.to_string());
        }
    }
    Err(ScanError::NoDeviceFound)
}

/// Resolve the scanner port on this machine.
///
/// A configured override is used verbatim; otherwise the system port list
/// from `source` is searched.
pub fn locate_with<F>(
    platform: Platform,
    port_override: Option<&str>,
    source: F,
) -> Result<String, ScanError>
where
    F: FnOnce() -> Result<Vec<String>, ScanError>,
{
    if let Some(port) = port_override.map(str::trim).filter(|p| !p.is_empty()) {
        info!(port = port, "Using configured scanner port override");
        return Ok(port.to_string());
    }

    let ports = source()?;
    if ports.is_empty() {
        warn!("No serial ports reported by the system");
        return Err(ScanError::NoDeviceFound);
    }
    info!(ports = ?ports, "Available serial ports");

    let port = locate(&ports, platform)?;
    info!(port = %port, platform = ?platform, "Scanner port located");
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYNTHETIC: [&str; 3] = ["COM3", "/dev/ttyUSB0", "/dev/tty.usbserial-A1"];

    #[test]
    fn test_windows_picks_com_port() {
        assert_eq!(locate(&SYNTHETIC, Platform::Windows).unwrap(), "COM3");
    }

    #[test]
    fn test_linux_picks_tty_usb() {
        assert_eq!(locate(&SYNTHETIC, Platform::Linux).unwrap(), "/dev/ttyUSB0");
    }

    #[test]
    fn test_darwin_picks_usbserial() {
        assert_eq!(
            locate(&SYNTHETIC, Platform::Darwin).unwrap(),
            "/dev/tty.usbserial-A1"
        );
    }

    #[test]
    fn test_darwin_match_is_case_insensitive() {
        let ports = ["/dev/cu.Bluetooth-Incoming-Port", "/dev/cu.USBSERIAL-42"];
        assert_eq!(
            locate(&ports, Platform::Darwin).unwrap(),
            "/dev/cu.USBSERIAL-42"
        );
    }

    #[test]
    fn test_linux_accepts_generic_usb_names() {
        let ports = ["/dev/ttyS0", "/dev/ttyACM0", "/dev/serial/by-id/USB-scanner"];
        assert_eq!(
            locate(&ports, Platform::Linux).unwrap(),
            "/dev/serial/by-id/USB-scanner"
        );
    }

    #[test]
    fn test_first_match_wins() {
        let ports = ["COM7", "COM3"];
        assert_eq!(locate(&ports, Platform::Windows).unwrap(), "COM7");
    }

    #[test]
    fn test_no_match_is_no_device_found() {
        let ports = ["/dev/ttyS0", "/dev/ttyS1"];
        assert_eq!(
            locate(&ports, Platform::Windows),
            Err(ScanError::NoDeviceFound)
        );
        assert_eq!(
            locate(&SYNTHETIC, Platform::Other),
            Err(ScanError::NoDeviceFound)
        );
    }

    #[test]
    fn test_windows_prefix_is_case_sensitive() {
        let ports = ["com3"];
        assert_eq!(
            locate(&ports, Platform::Windows),
            Err(ScanError::NoDeviceFound)
        );
    }

    #[test]
    fn test_override_skips_enumeration() {
        let port = locate_with(Platform::Linux, Some("COM9"), || {
            panic!("enumeration must not run when an override is set")
        })
        .unwrap();
        assert_eq!(port, "COM9");
    }

    #[test]
    fn test_blank_override_falls_back_to_enumeration() {
        let port = locate_with(Platform::Linux, Some("  "), || {
            Ok(vec!["/dev/ttyUSB1".to_string()])
        })
        .unwrap();
        assert_eq!(port, "/dev/ttyUSB1");
    }

    #[test]
    fn test_empty_enumeration_is_no_device_found() {
        let result = locate_with(Platform::Windows, None, || Ok(Vec::new()));
        assert_eq!(result, Err(ScanError::NoDeviceFound));
    }

    #[test]
    fn test_platform_from_os() {
        assert_eq!(Platform::from_os("windows"), Platform::Windows);
        assert_eq!(Platform::from_os("macos"), Platform::Darwin);
        assert_eq!(Platform::from_os("linux"), Platform::Linux);
        assert_eq!(Platform::from_os("freebsd"), Platform::Other);
    }
}
