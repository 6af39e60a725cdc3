//! Data models
//!
//! Read-only projections of backend data used on the device.

pub mod receipt;

// Re-exports
pub use receipt::*;
