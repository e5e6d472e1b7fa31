//! License scan orchestrator.
//!
//! Composes port discovery, the device exchange and the AAMVA decoder into
//! a single blocking `scan()`. Errors from every stage propagate unchanged;
//! nothing is retried here, the operator rescans.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::aamva::{self, LicenseRecord};
use crate::config::ScannerConfig;
use crate::error::ScanError;
use crate::locator::{self, Platform};
use crate::serial::{SerialBackend, SystemSerial};
use crate::session;

/// Everything one successful scan produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub port: String,
    pub record: LicenseRecord,
    pub raw: String,
    pub unrecognized_tags: Vec<String>,
}

/// Snapshot served on `/scanner/status`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScannerStatus {
    pub platform: Platform,
    pub port_override: Option<String>,
    pub last_port: Option<String>,
    pub last_scan_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub scan_count: u64,
}

pub struct Scanner {
    config: ScannerConfig,
    platform: Platform,
    backend: Arc<dyn SerialBackend>,
    status: Mutex<ScannerStatus>,
}

impl Scanner {
    /// Scanner on the real serial stack of this host.
    pub fn system(config: ScannerConfig) -> Self {
        Self::new(config, Platform::current(), Arc::new(SystemSerial))
    }

    pub fn new(config: ScannerConfig, platform: Platform, backend: Arc<dyn SerialBackend>) -> Self {
        let status = ScannerStatus {
            platform,
            port_override: config.port_override.clone(),
            last_port: None,
            last_scan_at: None,
            last_error: None,
            scan_count: 0,
        };
        Self {
            config,
            platform,
            backend,
            status: Mutex::new(status),
        }
    }

    /// Locate, exchange, decode.
    pub fn scan(&self) -> Result<LicenseRecord, ScanError> {
        self.scan_detailed().map(|outcome| outcome.record)
    }

    /// Like `scan`, keeping the raw payload and decode diagnostics.
    pub fn scan_detailed(&self) -> Result<ScanOutcome, ScanError> {
        let result = self.run_scan();
        self.record_attempt(&result);
        result
    }

    pub fn status(&self) -> ScannerStatus {
        self.status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn run_scan(&self) -> Result<ScanOutcome, ScanError> {
        let port = locator::locate_with(
            self.platform,
            self.config.port_override.as_deref(),
            || self.backend.port_names(),
        )?;

        let mut transport =
            self.backend
                .transport(&port, self.config.baud_rate, self.config.read_timeout);
        let raw = session::exchange(
            transport.as_mut(),
            &self.config.command,
            self.config.settle_delay,
        )?;

        let report = aamva::decode_report(&raw);
        info!(
            port = %port,
            bytes = raw.len(),
            license_class = %report.record.license_class,
            unrecognized = report.unrecognized_tags.len(),
            "License scan decoded"
        );

        Ok(ScanOutcome {
            port,
            record: report.record,
            raw,
            unrecognized_tags: report.unrecognized_tags,
        })
    }

    fn record_attempt(&self, result: &Result<ScanOutcome, ScanError>) {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        status.scan_count += 1;
        status.last_scan_at = Some(Utc::now());
        match result {
            Ok(outcome) => {
                status.last_port = Some(outcome.port.clone());
                status.last_error = None;
            }
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "License scan failed");
                status.last_error = Some(e.to_string());
            }
        }
    }
}
