//! Shared types for the Captain workspace
//!
//! Wire envelope returned by the restaurant backend, the receipt
//! projection consumed by the printer crate, and small utilities.

pub mod models;
pub mod response;
pub mod util;

// Re-exports
pub use models::{ChargeBreakdown, OutletHeader, ReceiptDocument, ReceiptLine, ReceiptStatus};
pub use response::ApiEnvelope;
pub use serde::{Deserialize, Serialize};
