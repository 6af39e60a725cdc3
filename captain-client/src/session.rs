//! Login/device session store
//!
//! Owns the persisted session keys. The device token doubles as the cache
//! session id: when a login arrives with a device token different from the
//! stored one, every cached response is purged before the new token is
//! written, so no request can read another device session's data.

use crate::cache::purge_cache_entries;
use crate::storage::{KvStore, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub const DEVICE_TOKEN_KEY: &str = "device_token";
pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_ID_KEY: &str = "user_id";
pub const OWNER_DATA_KEY: &str = "owner_data";
pub const OUTLET_ID_KEY: &str = "outlet_id";
pub const OUTLET_NAME_KEY: &str = "outlet_name";
pub const OUTLET_CONFIG_KEY: &str = "outlet_config";
pub const APP_SETTINGS_KEY: &str = "app_settings";

/// Credentials returned by a successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginSession {
    pub device_token: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user_id: String,
    pub owner_data: Option<Value>,
}

/// What a login did to the stored session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    /// No device token was stored
    First,
    /// Same device token as before; cache kept
    Resumed,
    /// Different device token; all cached responses purged
    DeviceChanged,
}

/// Outlet the captain is currently working in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutletSelection {
    pub outlet_id: String,
    pub outlet_name: String,
    pub outlet_config: Option<Value>,
}

/// Device-local preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Id of the last printer connected to
    pub preferred_printer: Option<String>,
    /// Print through the OS dialog even when Bluetooth is available
    pub html_fallback: bool,
}

/// Session store over a [`KvStore`]
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn KvStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, key, "Session read failed");
                None
            }
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read(key).await?;
        serde_json::from_str(&raw)
            .map_err(|e| warn!(error = %e, key, "Session value is not valid JSON"))
            .ok()
    }

    /// Current device token, used as the cache session id
    pub async fn device_session_id(&self) -> Option<String> {
        self.read(DEVICE_TOKEN_KEY).await.filter(|t| !t.is_empty())
    }

    pub async fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY).await
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY).await
    }

    pub async fn user_id(&self) -> Option<String> {
        self.read(USER_ID_KEY).await
    }

    pub async fn owner_data(&self) -> Option<Value> {
        self.read_json(OWNER_DATA_KEY).await
    }

    /// Persist a fresh login
    ///
    /// A device token change purges every cached response before the new
    /// token becomes visible.
    pub async fn begin_session(&self, login: &LoginSession) -> StoreResult<SessionChange> {
        let change = match self.device_session_id().await {
            None => SessionChange::First,
            Some(previous) if previous == login.device_token => SessionChange::Resumed,
            Some(_) => {
                let removed = purge_cache_entries(self.store.as_ref(), |_| true).await;
                info!(removed, "Device token changed, cache purged");
                SessionChange::DeviceChanged
            }
        };

        self.store.set(DEVICE_TOKEN_KEY, &login.device_token).await?;
        self.store.set(ACCESS_TOKEN_KEY, &login.access_token).await?;
        match &login.refresh_token {
            Some(token) => self.store.set(REFRESH_TOKEN_KEY, token).await?,
            None => self.store.remove(REFRESH_TOKEN_KEY).await?,
        }
        self.store.set(USER_ID_KEY, &login.user_id).await?;
        match &login.owner_data {
            Some(owner) => {
                self.store
                    .set(OWNER_DATA_KEY, &serde_json::to_string(owner)?)
                    .await?
            }
            None => self.store.remove(OWNER_DATA_KEY).await?,
        }

        info!(user_id = %login.user_id, ?change, "Session started");
        Ok(change)
    }

    /// Remember the outlet the captain picked
    pub async fn select_outlet(&self, outlet: &OutletSelection) -> StoreResult<()> {
        self.store.set(OUTLET_ID_KEY, &outlet.outlet_id).await?;
        self.store.set(OUTLET_NAME_KEY, &outlet.outlet_name).await?;
        match &outlet.outlet_config {
            Some(config) => {
                self.store
                    .set(OUTLET_CONFIG_KEY, &serde_json::to_string(config)?)
                    .await
            }
            None => self.store.remove(OUTLET_CONFIG_KEY).await,
        }
    }

    pub async fn outlet(&self) -> Option<OutletSelection> {
        let outlet_id = self.read(OUTLET_ID_KEY).await?;
        let outlet_name = self.read(OUTLET_NAME_KEY).await.unwrap_or_default();
        let outlet_config = self.read_json(OUTLET_CONFIG_KEY).await;
        Some(OutletSelection {
            outlet_id,
            outlet_name,
            outlet_config,
        })
    }

    /// Stored settings, defaults when absent or unreadable
    pub async fn app_settings(&self) -> AppSettings {
        self.read_json(APP_SETTINGS_KEY).await.unwrap_or_default()
    }

    pub async fn save_app_settings(&self, settings: &AppSettings) -> StoreResult<()> {
        self.store
            .set(APP_SETTINGS_KEY, &serde_json::to_string(settings)?)
            .await
    }

    /// Forget credentials and outlet; the device token stays so the next
    /// login can detect a device change
    pub async fn end_session(&self) -> StoreResult<()> {
        let keys: Vec<String> = [
            ACCESS_TOKEN_KEY,
            REFRESH_TOKEN_KEY,
            USER_ID_KEY,
            OWNER_DATA_KEY,
            OUTLET_ID_KEY,
            OUTLET_NAME_KEY,
            OUTLET_CONFIG_KEY,
        ]
        .iter()
        .map(|k| k.to_string())
        .collect();
        self.store.multi_remove(&keys).await?;
        info!("Session ended");
        Ok(())
    }
}
