//! Receipt printing.
//!
//! Each copy is rendered to an HTML artifact under the receipts directory
//! and handed to the OS: the shell `print` verb on Windows, the default
//! browser everywhere else.

use chrono::Local;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::PrintError;
use crate::receipt_renderer::{self, ReceiptData};

/// Hands a rendered receipt file to whatever prints or displays it.
pub trait DocumentOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<(), PrintError>;
}

/// Opener backed by the host OS.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl DocumentOpener for SystemOpener {
    fn open(&self, path: &Path) -> Result<(), PrintError> {
        #[cfg(target_os = "windows")]
        {
            let script = format!(
                "Start-Process -FilePath '{}' -Verb Print",
                path.display().to_string().replace('\'', "''")
            );
            let status = std::process::Command::new("powershell")
                .args(["-NoProfile", "-NonInteractive", "-Command", &script])
                .status()
                .map_err(|e| PrintError::Open(format!("powershell: {e}")))?;
            if status.success() {
                return Ok(());
            }
            warn!(path = %path.display(), "Print verb failed, opening receipt instead");
        }

        webbrowser::open(&path.to_string_lossy())
            .map_err(|e| PrintError::Open(format!("{}: {e}", path.display())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOutcome {
    pub printed: u32,
    pub requested: u32,
    pub files: Vec<String>,
}

impl PrintOutcome {
    pub fn message(&self) -> String {
        format!(
            "Printed {}/{} copies successfully",
            self.printed, self.requested
        )
    }
}

pub struct ReceiptPrinter {
    receipts_dir: PathBuf,
    opener: Arc<dyn DocumentOpener>,
}

impl ReceiptPrinter {
    pub fn new(receipts_dir: PathBuf, opener: Arc<dyn DocumentOpener>) -> Self {
        Self {
            receipts_dir,
            opener,
        }
    }

    pub fn receipts_dir(&self) -> &Path {
        &self.receipts_dir
    }

    /// Render without printing.
    pub fn preview(&self, receipt: &ReceiptData) -> Result<String, PrintError> {
        validate(receipt)?;
        Ok(receipt_renderer::render_html(receipt, &now_label()))
    }

    /// Render and dispatch `receipt.copies` copies (at least one).
    ///
    /// Succeeds when any copy reached the opener; the last error is returned
    /// when none did.
    pub fn print(&self, receipt: &ReceiptData) -> Result<PrintOutcome, PrintError> {
        validate(receipt)?;
        let requested = receipt.copies.max(1) as u32;

        let mut outcome = PrintOutcome {
            printed: 0,
            requested,
            files: Vec::new(),
        };
        let mut last_error = None;

        for copy in 1..=requested {
            match self.print_copy(receipt) {
                Ok(path) => {
                    outcome.printed += 1;
                    outcome.files.push(path.to_string_lossy().to_string());
                }
                Err(e) => {
                    warn!(copy = copy, requested = requested, error = %e, "Receipt copy failed");
                    last_error = Some(e);
                }
            }
        }

        match (outcome.printed, last_error) {
            (0, Some(e)) => Err(e),
            _ => {
                info!(
                    transaction_id = %receipt.transaction_id,
                    printed = outcome.printed,
                    requested = requested,
                    "Receipt dispatched"
                );
                Ok(outcome)
            }
        }
    }

    fn print_copy(&self, receipt: &ReceiptData) -> Result<PathBuf, PrintError> {
        let html = receipt_renderer::render_html(receipt, &now_label());
        let path = write_receipt_file(&self.receipts_dir, &html)?;
        self.opener.open(&path)?;
        Ok(path)
    }
}

fn validate(receipt: &ReceiptData) -> Result<(), PrintError> {
    if !receipt.is_no_sale() && receipt.transaction_id.trim().is_empty() {
        return Err(PrintError::InvalidReceipt(
            "transaction ID is required".into(),
        ));
    }
    Ok(())
}

fn now_label() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn write_receipt_file(dir: &Path, html: &str) -> Result<PathBuf, PrintError> {
    fs::create_dir_all(dir)?;
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let path = dir.join(format!("receipt-{timestamp}-{}.html", uuid::Uuid::new_v4()));
    fs::write(&path, html)?;
    Ok(path)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records opened paths instead of printing; optionally fails.
    #[derive(Default)]
    pub(crate) struct RecordingOpener {
        pub opened: Mutex<Vec<PathBuf>>,
        pub fail: bool,
    }

    impl DocumentOpener for RecordingOpener {
        fn open(&self, path: &Path) -> Result<(), PrintError> {
            if self.fail {
                return Err(PrintError::Open("no default handler".into()));
            }
            self.opened.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    pub(crate) fn temp_receipts_dir() -> PathBuf {
        std::env::temp_dir().join(format!("scan-bridge-receipts-{}", uuid::Uuid::new_v4()))
    }

    fn receipt(copies: i32) -> ReceiptData {
        ReceiptData {
            transaction_id: "TX-42".into(),
            payment_type: "cash".into(),
            total: 10.0,
            copies,
            ..Default::default()
        }
    }

    #[test]
    fn test_print_writes_and_opens_each_copy() {
        let dir = temp_receipts_dir();
        let opener = Arc::new(RecordingOpener::default());
        let printer = ReceiptPrinter::new(dir.clone(), opener.clone());

        let outcome = printer.print(&receipt(3)).unwrap();
        assert_eq!(outcome.printed, 3);
        assert_eq!(outcome.requested, 3);
        assert_eq!(outcome.message(), "Printed 3/3 copies successfully");

        let opened = opener.opened.lock().unwrap();
        assert_eq!(opened.len(), 3);
        for path in opened.iter() {
            let html = fs::read_to_string(path).unwrap();
            assert!(html.contains("TX-42"));
            assert!(path.starts_with(&dir));
        }
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_zero_copies_prints_one() {
        let dir = temp_receipts_dir();
        let printer = ReceiptPrinter::new(dir.clone(), Arc::new(RecordingOpener::default()));
        assert_eq!(printer.print(&receipt(0)).unwrap().requested, 1);
        assert_eq!(printer.print(&receipt(-4)).unwrap().printed, 1);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_transaction_id_rejected() {
        let opener = Arc::new(RecordingOpener::default());
        let printer = ReceiptPrinter::new(temp_receipts_dir(), opener.clone());
        let mut r = receipt(1);
        r.transaction_id = "  ".into();

        let err = printer.print(&r).unwrap_err();
        assert!(matches!(err, PrintError::InvalidReceipt(_)));
        assert!(opener.opened.lock().unwrap().is_empty());
    }

    #[test]
    fn test_no_sale_needs_no_transaction_id() {
        let dir = temp_receipts_dir();
        let printer = ReceiptPrinter::new(dir.clone(), Arc::new(RecordingOpener::default()));
        let r = ReceiptData {
            receipt_type: Some("noSale".into()),
            ..Default::default()
        };
        assert!(printer.print(&r).is_ok());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_all_copies_failing_returns_error() {
        let dir = temp_receipts_dir();
        let opener = Arc::new(RecordingOpener {
            fail: true,
            ..Default::default()
        });
        let printer = ReceiptPrinter::new(dir.clone(), opener);
        let err = printer.print(&receipt(2)).unwrap_err();
        assert!(matches!(err, PrintError::Open(_)));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_preview_does_not_open() {
        let opener = Arc::new(RecordingOpener::default());
        let printer = ReceiptPrinter::new(temp_receipts_dir(), opener.clone());
        let html = printer.preview(&receipt(1)).unwrap();
        assert!(html.contains("TX-42"));
        assert!(opener.opened.lock().unwrap().is_empty());
    }
}
