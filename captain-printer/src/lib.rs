//! # captain-printer
//!
//! Receipt printing for the captain app.
//!
//! ## Scope
//!
//! - ESC/POS command building
//! - Receipt byte-stream rendering (58mm, 32 columns) and its HTML twin
//! - Bluetooth LE thermal printer discovery, connection and paced writes
//! - A single printer capability picked once at startup: BLE when a native
//!   Bluetooth stack exists, the OS print dialog otherwise
//!
//! ## Example
//!
//! ```ignore
//! use captain_printer::{BleConfig, BlePrinterManager, BleThermalPrinter, ReceiptPrinter};
//!
//! let manager = BlePrinterManager::new(central, BleConfig::default())?;
//! manager.scan().await?;
//! // ... let the user pick from manager.discovered_devices().await
//! manager.connect(&device).await?;
//!
//! let printer = BleThermalPrinter::new(manager);
//! printer.print_receipt(&receipt).await?;
//! ```

mod ble;
mod connection;
mod error;
mod escpos;
mod html;
mod layout;
mod printer;
mod receipt;

// Re-exports
pub use ble::{
    AdapterState, BleCentral, BleConfig, BleError, CharacteristicHandle, DiscoveredDevice,
    GattService, NoCentral, find_printer_characteristic,
};
pub use connection::{BlePrinterManager, ConnectionState};
pub use error::{PrintError, PrintResult};
pub use escpos::{Align, EscPosBuilder, TextSize};
pub use html::{generate_receipt_html, render_receipt_html};
pub use layout::{fit_left, wrap};
pub use printer::{
    AnyPrinter, BleThermalPrinter, FilePrintDialog, HtmlDialogPrinter, PrintDialog,
    ReceiptPrinter, select_printer,
};
pub use receipt::{
    ChargeRow, ReceiptRenderer, charge_rows, format_amount_line, format_print_datetime,
    generate_receipt_bytes, item_lines,
};
