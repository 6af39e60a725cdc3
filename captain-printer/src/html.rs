//! HTML receipt for the OS print dialog
//!
//! Same content as the ESC/POS stream, laid out for a 58mm page.

use crate::receipt::{CANCELLED_BANNER, CANCELLED_NOTICE, charge_rows, format_print_datetime};
use chrono::{Local, NaiveDateTime};
use shared::ReceiptDocument;

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the receipt page with an explicit print time
pub fn render_receipt_html(receipt: &ReceiptDocument, printed_at: &NaiveDateTime) -> String {
    let mut header = String::new();
    if receipt.is_cancelled() {
        header.push_str(&format!(r#"<div class="banner">{CANCELLED_BANNER}</div>"#));
    }
    header.push_str(&format!(
        r#"<div class="outlet">{}</div><div>{}</div>"#,
        escape(&receipt.outlet.name),
        escape(&receipt.outlet.address)
    ));
    if let Some(phone) = receipt.outlet.phone.as_deref().filter(|p| !p.is_empty()) {
        header.push_str(&format!("<div>Phone: {}</div>", escape(phone)));
    }

    let meta: String = [
        receipt.order_no.as_deref().map(|n| format!("<div>Bill No: {}</div>", escape(n))),
        receipt.table.as_deref().map(|t| format!("<div>Table: {}</div>", escape(t))),
        Some(format!("<div>Date: {}</div>", format_print_datetime(printed_at))),
    ]
    .into_iter()
    .flatten()
    .collect();

    let items: String = receipt
        .items
        .iter()
        .map(|item| {
            format!(
                r#"<tr><td>{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{:.2}</td></tr>"#,
                escape(&item.name),
                item.quantity,
                item.rate.floor() as i64,
                item.total
            )
        })
        .collect();

    let totals: String = charge_rows(&receipt.charges)
        .iter()
        .map(|row| {
            format!(
                r#"<tr><td>{}</td><td class="num">{}{:.2}</td></tr>"#,
                escape(&row.label),
                row.prefix,
                row.amount.abs()
            )
        })
        .collect();

    let mut footer = String::new();
    if let Some(website) = &receipt.website {
        footer.push_str(&format!("<div>{}</div>", escape(website)));
    }
    if receipt.is_cancelled() {
        footer.push_str(&format!("<div>{CANCELLED_NOTICE}</div>"));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
@page {{ size: 58mm auto; margin: 0; }}
body {{ width: 58mm; font-family: monospace; font-size: 11px; margin: 0 auto; }}
.center {{ text-align: center; }}
.banner {{ font-size: 20px; font-weight: bold; }}
.outlet {{ font-size: 16px; font-weight: bold; }}
table {{ width: 100%; border-collapse: collapse; }}
.num {{ text-align: right; }}
hr {{ border: none; border-top: 1px dashed #000; }}
</style>
</head>
<body>
<div class="center">{header}</div>
<div>{meta}</div>
<hr>
<table>
<tr><th>Item</th><th class="num">Qt</th><th class="num">Rate</th><th class="num">Total</th></tr>
{items}
</table>
<hr>
<table>
{totals}
</table>
<hr>
<div class="center">{footer}</div>
</body>
</html>
"#
    )
}

/// HTML receipt stamped with the current local time
pub fn generate_receipt_html(receipt: &ReceiptDocument) -> String {
    render_receipt_html(receipt, &Local::now().naive_local())
}
