//! Backend response envelope
//!
//! Every endpoint of the restaurant backend answers with the same shape:
//! ```json
//! { "st": 1, "msg": "Success", "data": { ... } }
//! ```
//! `st == 1` means success; anything else is an application-level failure
//! carrying a human-readable `msg`.

use serde::{Deserialize, Serialize};

/// Status value the backend uses for a successful call
pub const ST_SUCCESS: i64 = 1;

/// Unified backend response structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T = serde_json::Value> {
    /// Status flag (1 = success)
    pub st: i64,
    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// Response payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Whether the backend reported success
    pub fn is_ok(&self) -> bool {
        self.st == ST_SUCCESS
    }

    /// Consume the envelope, returning the payload on success
    pub fn into_data(self) -> Option<T> {
        if self.is_ok() { self.data } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_success() {
        let env: ApiEnvelope =
            serde_json::from_value(json!({"st": 1, "msg": "ok", "data": [1, 2]})).unwrap();
        assert!(env.is_ok());
        assert_eq!(env.into_data(), Some(json!([1, 2])));
    }

    #[test]
    fn test_parse_failure_without_data() {
        let env: ApiEnvelope =
            serde_json::from_value(json!({"st": 0, "msg": "Invalid outlet"})).unwrap();
        assert!(!env.is_ok());
        assert_eq!(env.msg.as_deref(), Some("Invalid outlet"));
        assert_eq!(env.into_data(), None);
    }
}
