//! Receipt Model
//!
//! A receipt is built fresh for every print request from the order that is
//! currently loaded and is never persisted.

use serde::{Deserialize, Serialize};

/// Terminal state of the order being printed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptStatus {
    #[default]
    Completed,
    Cancelled,
}

/// Outlet block printed at the top of the receipt
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutletHeader {
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub phone: Option<String>,
}

/// One item row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: u32,
    /// Unit rate in currency unit
    pub rate: f64,
    /// Line total in currency unit
    pub total: f64,
}

/// Charge breakdown, all amounts in currency unit
///
/// Components below 0.001 in magnitude are treated as zero and omitted
/// from printed output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeBreakdown {
    pub subtotal: f64,
    pub discount: f64,
    pub discount_percent: Option<f64>,
    pub special_discount: f64,
    pub extra_charges: f64,
    pub service_charge: f64,
    pub service_charge_percent: Option<f64>,
    pub tax: f64,
    pub tip: f64,
    pub grand_total: f64,
}

/// Everything needed to print one bill
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiptDocument {
    #[serde(default)]
    pub status: ReceiptStatus,
    pub outlet: OutletHeader,
    pub order_no: Option<String>,
    pub table: Option<String>,
    #[serde(default)]
    pub items: Vec<ReceiptLine>,
    #[serde(default)]
    pub charges: ChargeBreakdown,
    pub website: Option<String>,
}

impl ReceiptDocument {
    /// Whether the order ended in a cancelled state
    pub fn is_cancelled(&self) -> bool {
        self.status == ReceiptStatus::Cancelled
    }
}
