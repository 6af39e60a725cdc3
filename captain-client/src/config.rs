//! Client configuration

use serde_json::{Value, json};
use std::time::Duration;

/// Client configuration for connecting to the restaurant backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., "https://api.example.com/v1")
    pub base_url: String,

    /// Bearer token for authentication
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: 30,
        }
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

/// Response cache tuning
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Freshness window for ordinary endpoints
    pub fresh_ttl: Duration,
    /// Freshness window for live order listings
    pub realtime_ttl: Duration,
    /// Endpoint substrings marking an endpoint as realtime-critical
    pub realtime_markers: Vec<String>,
    /// Endpoint substrings whose empty placeholder is `{st:1, lists:[]}`
    pub list_markers: Vec<String>,
}

impl CacheConfig {
    /// Whether responses for this endpoint go stale within minutes
    pub fn is_realtime(&self, endpoint: &str) -> bool {
        self.realtime_markers.iter().any(|m| endpoint.contains(m.as_str()))
    }

    /// Freshness window applying to the endpoint
    pub fn ttl_for(&self, endpoint: &str) -> Duration {
        if self.is_realtime(endpoint) {
            self.realtime_ttl
        } else {
            self.fresh_ttl
        }
    }

    /// Empty-but-valid body shown while nothing is cached
    pub fn placeholder_for(&self, endpoint: &str) -> Value {
        if self.list_markers.iter().any(|m| endpoint.contains(m.as_str())) {
            json!({ "st": 1, "lists": [] })
        } else {
            json!({ "st": 1, "data": [] })
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fresh_ttl: Duration::from_secs(24 * 60 * 60),
            realtime_ttl: Duration::from_secs(5 * 60),
            realtime_markers: vec!["order_listview".to_string()],
            list_markers: vec!["list".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_classification() {
        let config = CacheConfig::default();
        assert!(config.is_realtime("/order_listview"));
        assert!(config.is_realtime("v2/order_listview?page=1"));
        assert!(!config.is_realtime("/menu_listview"));
        assert_eq!(config.ttl_for("/order_listview"), Duration::from_secs(300));
        assert_eq!(config.ttl_for("/get_outlet"), Duration::from_secs(86_400));
    }

    #[test]
    fn test_placeholder_shapes() {
        let config = CacheConfig::default();
        assert_eq!(
            config.placeholder_for("/order_listview"),
            json!({"st": 1, "lists": []})
        );
        assert_eq!(
            config.placeholder_for("/table_view"),
            json!({"st": 1, "data": []})
        );
    }

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::new("https://api.test")
            .with_token("abc")
            .with_timeout(5);
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.timeout, 5);
    }
}
