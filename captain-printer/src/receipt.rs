//! Receipt byte-stream rendering
//!
//! Layout for 58mm paper (32 columns):
//!
//! ```text
//!            CANCELLED              <- double width+height, cancelled only
//!           Spice Route             <- double height
//!           12 Main St
//!         Phone: 555-0101
//!
//! Bill No: 1042
//! Table: T4
//! Date: 05 MAR 2024 07:09 PM
//! --------------------------------
//! Item           Qt  Rate    Total
//! Paneer Tikka    2   249   498.00
//! --------------------------------
//! Subtotal                  498.00
//! Discount(10%)             -49.80
//! Tax                       +22.41
//! Grand Total               470.61
//! --------------------------------
//!          spiceroute.example
//! ```
//!
//! Rendering is pure: the same document and print time always produce the
//! same bytes.

use crate::escpos::{Align, EscPosBuilder, TextSize};
use crate::layout::{fit_left, wrap};
use chrono::{Local, NaiveDateTime};
use shared::{ChargeBreakdown, ReceiptDocument, ReceiptLine};

/// Characters per line on 58mm paper
pub const RECEIPT_WIDTH: usize = 32;

/// Right-hand amount column of a money line
pub const AMOUNT_WIDTH: usize = 12;

/// Item name column; longer names continue on following lines
pub const NAME_WIDTH: usize = 14;

/// Components at or below this magnitude are treated as zero
pub const ZERO_THRESHOLD: f64 = 0.001;

pub(crate) const CANCELLED_BANNER: &str = "CANCELLED";
pub(crate) const CANCELLED_NOTICE: &str = "Sorry, this order was cancelled";

/// Format the print time as `DD MON YYYY HH:MM AM/PM`
pub fn format_print_datetime(at: &NaiveDateTime) -> String {
    at.format("%d %b %Y %I:%M %p").to_string().to_uppercase()
}

/// Label left, signed amount right-justified in the last 12 columns
///
/// The result is exactly 32 characters unless the amount itself is wider
/// than its column; the newline is not included.
pub fn format_amount_line(label: &str, amount: f64, prefix: &str) -> String {
    let amount = format!("{}{:.2}", prefix, amount.abs());
    format!(
        "{}{:>width$}",
        fit_left(label, RECEIPT_WIDTH - AMOUNT_WIDTH),
        amount,
        width = AMOUNT_WIDTH
    )
}

/// Lines for one item row
///
/// The first line carries quantity, floored rate and total; a name longer
/// than 14 characters continues alone on the following lines.
pub fn item_lines(item: &ReceiptLine) -> Vec<String> {
    let mut pieces = wrap(&item.name, NAME_WIDTH).into_iter();
    let first = pieces.next().unwrap_or_default();

    let mut lines = vec![format!(
        "{:<14} {:>2} {:>5} {:>8}",
        first,
        item.quantity,
        item.rate.floor() as i64,
        format!("{:.2}", item.total)
    )];
    lines.extend(pieces);
    lines
}

/// One row of the totals block
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRow {
    pub label: String,
    pub amount: f64,
    /// `-` for deductions, `+` for additions, empty for totals
    pub prefix: &'static str,
}

impl ChargeRow {
    fn new(label: impl Into<String>, amount: f64, prefix: &'static str) -> Self {
        Self {
            label: label.into(),
            amount,
            prefix,
        }
    }
}

fn with_percent(label: &str, percent: Option<f64>) -> String {
    match percent {
        Some(p) if p.abs() > ZERO_THRESHOLD => {
            let p = format!("{:.2}", p);
            let p = p.trim_end_matches('0').trim_end_matches('.');
            format!("{label}({p}%)")
        }
        _ => label.to_string(),
    }
}

/// Totals block rows, zero components already dropped
pub fn charge_rows(charges: &ChargeBreakdown) -> Vec<ChargeRow> {
    let components = [
        ChargeRow::new(
            with_percent("Discount", charges.discount_percent),
            charges.discount,
            "-",
        ),
        ChargeRow::new("Special Discount", charges.special_discount, "-"),
        ChargeRow::new("Extra Charges", charges.extra_charges, "+"),
        ChargeRow::new(
            with_percent("Service Charge", charges.service_charge_percent),
            charges.service_charge,
            "+",
        ),
        ChargeRow::new("Tax", charges.tax, "+"),
        ChargeRow::new("Tip", charges.tip, "+"),
    ];

    let mut rows = vec![ChargeRow::new("Subtotal", charges.subtotal, "")];
    rows.extend(
        components
            .into_iter()
            .filter(|row| row.amount.abs() > ZERO_THRESHOLD),
    );
    rows.push(ChargeRow::new("Grand Total", charges.grand_total, ""));
    rows
}

/// Renders a [`ReceiptDocument`] into ESC/POS bytes
pub struct ReceiptRenderer<'a> {
    receipt: &'a ReceiptDocument,
}

impl<'a> ReceiptRenderer<'a> {
    pub fn new(receipt: &'a ReceiptDocument) -> Self {
        Self { receipt }
    }

    /// Render with an explicit print time
    pub fn render_at(&self, printed_at: &NaiveDateTime) -> Vec<u8> {
        let r = self.receipt;
        let mut b = EscPosBuilder::new(RECEIPT_WIDTH);

        // ── Header ──
        b.align(Align::Center);
        if r.is_cancelled() {
            b.sized_line(TextSize::Double, CANCELLED_BANNER);
        }
        b.sized_line(TextSize::DoubleHeight, &r.outlet.name);
        b.line(&r.outlet.address);
        if let Some(phone) = r.outlet.phone.as_deref().filter(|p| !p.is_empty()) {
            b.line(&format!("Phone: {}", phone));
        }
        b.feed(1);

        b.align(Align::Left);
        if let Some(order_no) = &r.order_no {
            b.line(&format!("Bill No: {}", order_no));
        }
        if let Some(table) = &r.table {
            b.line(&format!("Table: {}", table));
        }
        b.line(&format!("Date: {}", format_print_datetime(printed_at)));

        // ── Items ──
        b.separator();
        b.line(&format!(
            "{:<14} {:>2} {:>5} {:>8}",
            "Item", "Qt", "Rate", "Total"
        ));
        for item in &r.items {
            for line in item_lines(item) {
                b.line(&line);
            }
        }
        b.separator();

        // ── Totals ──
        for row in charge_rows(&r.charges) {
            b.line(&format_amount_line(&row.label, row.amount, row.prefix));
        }
        b.separator();

        // ── Footer ──
        b.align(Align::Center);
        if let Some(website) = &r.website {
            b.line(website);
        }
        if r.is_cancelled() {
            b.line(CANCELLED_NOTICE);
        }
        b.feed(3);
        b.cut();

        b.build()
    }

    /// Render stamped with the current local time
    pub fn render(&self) -> Vec<u8> {
        self.render_at(&Local::now().naive_local())
    }
}

/// ESC/POS bytes for a receipt, stamped with the current local time
pub fn generate_receipt_bytes(receipt: &ReceiptDocument) -> Vec<u8> {
    ReceiptRenderer::new(receipt).render()
}
