//! Printer capability
//!
//! Two ways to get a receipt onto paper:
//! - [`BleThermalPrinter`]: ESC/POS bytes over a Bluetooth LE connection
//! - [`HtmlDialogPrinter`]: an HTML page handed to the OS print dialog
//!
//! [`select_printer`] picks one at startup; call sites only see
//! [`ReceiptPrinter`].

use crate::ble::{BleCentral, BleConfig};
use crate::connection::{BlePrinterManager, ConnectionState};
use crate::error::{PrintError, PrintResult};
use crate::html::generate_receipt_html;
use crate::receipt::generate_receipt_bytes;
use async_trait::async_trait;
use shared::ReceiptDocument;
use shared::util::now_millis;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{info, instrument};

/// Something that can print a receipt
#[allow(async_fn_in_trait)]
pub trait ReceiptPrinter {
    async fn print_receipt(&self, receipt: &ReceiptDocument) -> PrintResult<()>;

    /// Whether a print call can go through right now
    async fn is_ready(&self) -> bool;
}

/// Thermal printer reached over Bluetooth LE
pub struct BleThermalPrinter<C: BleCentral> {
    manager: BlePrinterManager<C>,
}

impl<C: BleCentral> BleThermalPrinter<C> {
    pub fn new(manager: BlePrinterManager<C>) -> Self {
        Self { manager }
    }

    /// Connection manager, for scanning and device selection
    pub fn manager(&self) -> &BlePrinterManager<C> {
        &self.manager
    }
}

impl<C: BleCentral> ReceiptPrinter for BleThermalPrinter<C> {
    #[instrument(skip_all, fields(order_no = ?receipt.order_no))]
    async fn print_receipt(&self, receipt: &ReceiptDocument) -> PrintResult<()> {
        let data = generate_receipt_bytes(receipt);
        self.manager.print(&data).await
    }

    async fn is_ready(&self) -> bool {
        self.manager.state().await == ConnectionState::Connected
    }
}

/// OS-level "print this HTML" service
#[async_trait]
pub trait PrintDialog: Send + Sync {
    async fn present(&self, html: &str) -> PrintResult<()>;
}

/// Print dialog that spools each page as an HTML file
///
/// The OS print service picks files up from the spool directory.
pub struct FilePrintDialog {
    spool_dir: PathBuf,
    seq: AtomicU32,
}

impl FilePrintDialog {
    pub fn new(spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            spool_dir: spool_dir.into(),
            seq: AtomicU32::new(0),
        }
    }

    pub fn spool_dir(&self) -> &Path {
        &self.spool_dir
    }
}

#[async_trait]
impl PrintDialog for FilePrintDialog {
    async fn present(&self, html: &str) -> PrintResult<()> {
        tokio::fs::create_dir_all(&self.spool_dir).await?;
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let path = self
            .spool_dir
            .join(format!("receipt-{}-{}.html", now_millis(), seq));
        tokio::fs::write(&path, html).await?;
        info!(path = %path.display(), "Receipt spooled for printing");
        Ok(())
    }
}

/// Prints through the OS dialog; no connection state
pub struct HtmlDialogPrinter<D: PrintDialog> {
    dialog: D,
}

impl<D: PrintDialog> HtmlDialogPrinter<D> {
    pub fn new(dialog: D) -> Self {
        Self { dialog }
    }
}

impl<D: PrintDialog> ReceiptPrinter for HtmlDialogPrinter<D> {
    #[instrument(skip_all, fields(order_no = ?receipt.order_no))]
    async fn print_receipt(&self, receipt: &ReceiptDocument) -> PrintResult<()> {
        let html = generate_receipt_html(receipt);
        self.dialog.present(&html).await.map_err(|e| match e {
            PrintError::Dialog(_) => e,
            other => PrintError::Dialog(other.to_string()),
        })
    }

    async fn is_ready(&self) -> bool {
        true
    }
}

/// The printer chosen at startup
pub enum AnyPrinter<C: BleCentral, D: PrintDialog> {
    Ble(BleThermalPrinter<C>),
    Html(HtmlDialogPrinter<D>),
}

impl<C: BleCentral, D: PrintDialog> AnyPrinter<C, D> {
    /// Connection manager when printing over Bluetooth
    pub fn ble_manager(&self) -> Option<&BlePrinterManager<C>> {
        match self {
            Self::Ble(p) => Some(p.manager()),
            Self::Html(_) => None,
        }
    }
}

impl<C: BleCentral, D: PrintDialog> ReceiptPrinter for AnyPrinter<C, D> {
    async fn print_receipt(&self, receipt: &ReceiptDocument) -> PrintResult<()> {
        match self {
            Self::Ble(p) => p.print_receipt(receipt).await,
            Self::Html(p) => p.print_receipt(receipt).await,
        }
    }

    async fn is_ready(&self) -> bool {
        match self {
            Self::Ble(p) => p.is_ready().await,
            Self::Html(p) => p.is_ready().await,
        }
    }
}

/// Pick the printer once from what the platform offers
///
/// A native Bluetooth central selects the BLE printer; without one receipts
/// go to the print dialog.
pub fn select_printer<C: BleCentral, D: PrintDialog>(
    central: Option<C>,
    config: BleConfig,
    dialog: D,
) -> PrintResult<AnyPrinter<C, D>> {
    match central {
        Some(central) => {
            info!("Using Bluetooth thermal printer");
            let manager = BlePrinterManager::new(central, config)?;
            Ok(AnyPrinter::Ble(BleThermalPrinter::new(manager)))
        }
        None => {
            info!("No Bluetooth stack, using print dialog");
            Ok(AnyPrinter::Html(HtmlDialogPrinter::new(dialog)))
        }
    }
}
