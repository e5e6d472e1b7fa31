//! Runtime settings, read from `SCAN_BRIDGE_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::diagnostics;
use crate::session::{
    DEFAULT_BAUD_RATE, DEFAULT_COMMAND, DEFAULT_READ_TIMEOUT, DEFAULT_SETTLE_DELAY,
};

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3500";

/// Serial parameters for one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Fixed port name; skips enumeration when set.
    pub port_override: Option<String>,
    pub baud_rate: u32,
    pub read_timeout: Duration,
    pub settle_delay: Duration,
    pub command: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            port_override: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            command: DEFAULT_COMMAND.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub listen_addr: String,
    pub scanner: ScannerConfig,
    pub receipts_dir: PathBuf,
    /// Queue concurrent scan requests instead of letting the second fail
    /// with a busy port.
    pub serialize_scans: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            scanner: ScannerConfig::default(),
            receipts_dir: diagnostics::get_data_dir().join("receipts"),
            serialize_scans: true,
        }
    }
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut cfg = Self::default();

        if let Some(addr) = text("SCAN_BRIDGE_LISTEN") {
            cfg.listen_addr = addr;
        }
        cfg.scanner.port_override = text("SCAN_BRIDGE_PORT");
        if let Some(baud) = parse_setting::<u32>("SCAN_BRIDGE_BAUD", text("SCAN_BRIDGE_BAUD")) {
            cfg.scanner.baud_rate = baud;
        }
        if let Some(ms) = parse_setting::<u64>(
            "SCAN_BRIDGE_READ_TIMEOUT_MS",
            text("SCAN_BRIDGE_READ_TIMEOUT_MS"),
        ) {
            cfg.scanner.read_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) =
            parse_setting::<u64>("SCAN_BRIDGE_SETTLE_MS", text("SCAN_BRIDGE_SETTLE_MS"))
        {
            cfg.scanner.settle_delay = Duration::from_millis(ms);
        }
        if let Some(command) = text("SCAN_BRIDGE_COMMAND") {
            cfg.scanner.command = command;
        }
        if let Some(dir) = text("SCAN_BRIDGE_RECEIPTS_DIR") {
            cfg.receipts_dir = PathBuf::from(dir);
        }
        if let Some(flag) = text("SCAN_BRIDGE_SERIALIZE_SCANS") {
            match parse_bool(&flag) {
                Some(v) => cfg.serialize_scans = v,
                None => warn!(value = %flag, "Ignoring invalid SCAN_BRIDGE_SERIALIZE_SCANS"),
            }
        }
        cfg
    }
}

fn parse_setting<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key = key, value = %raw, "Ignoring invalid setting, using default");
            None
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
