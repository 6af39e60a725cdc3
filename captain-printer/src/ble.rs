//! Bluetooth LE central abstraction
//!
//! The platform Bluetooth stack sits behind [`BleCentral`]; everything above
//! it (connection state, chunked writes, printer lookup) is platform-neutral.

use crate::error::{PrintError, PrintResult};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Power/permission state of the local adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    PoweredOn,
    PoweredOff,
    Unauthorized,
    Unsupported,
    Unknown,
}

/// An advertisement seen while scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub id: String,
    pub name: Option<String>,
}

impl DiscoveredDevice {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.map(str::to_string),
        }
    }

    /// Name for the device picker
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// A GATT service and the UUIDs of its characteristics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    pub uuid: String,
    pub characteristics: Vec<String>,
}

/// The characteristic print data is written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicHandle {
    pub device_id: String,
    pub service_uuid: String,
    pub characteristic_uuid: String,
}

/// Errors reported by the platform Bluetooth stack
#[derive(Debug, Error)]
pub enum BleError {
    #[error("Bluetooth permission denied")]
    PermissionDenied,

    #[error("Device disconnected")]
    Disconnected,

    #[error("Operation timed out")]
    Timeout,

    #[error("{0}")]
    Transport(String),
}

/// Platform Bluetooth LE central
///
/// Writes carry base64 payloads, the form native BLE bridges accept.
#[async_trait]
pub trait BleCentral: Send + Sync + 'static {
    async fn adapter_state(&self) -> AdapterState;

    /// Start scanning; advertisements arrive on the returned channel
    /// until [`stop_scan`](Self::stop_scan) is called.
    async fn start_scan(&self) -> Result<mpsc::Receiver<DiscoveredDevice>, BleError>;

    async fn stop_scan(&self);

    async fn connect(&self, device_id: &str) -> Result<(), BleError>;

    async fn discover_services(&self, device_id: &str) -> Result<Vec<GattService>, BleError>;

    async fn write_with_response(
        &self,
        handle: &CharacteristicHandle,
        payload_base64: &str,
    ) -> Result<(), BleError>;

    async fn disconnect(&self, device_id: &str) -> Result<(), BleError>;
}

/// Central for platforms without a Bluetooth stack
///
/// Has no values; `Option::<NoCentral>::None` selects the print dialog.
#[derive(Debug)]
pub enum NoCentral {}

#[async_trait]
impl BleCentral for NoCentral {
    async fn adapter_state(&self) -> AdapterState {
        match *self {}
    }

    async fn start_scan(&self) -> Result<mpsc::Receiver<DiscoveredDevice>, BleError> {
        match *self {}
    }

    async fn stop_scan(&self) {
        match *self {}
    }

    async fn connect(&self, _device_id: &str) -> Result<(), BleError> {
        match *self {}
    }

    async fn discover_services(&self, _device_id: &str) -> Result<Vec<GattService>, BleError> {
        match *self {}
    }

    async fn write_with_response(
        &self,
        _handle: &CharacteristicHandle,
        _payload_base64: &str,
    ) -> Result<(), BleError> {
        match *self {}
    }

    async fn disconnect(&self, _device_id: &str) -> Result<(), BleError> {
        match *self {}
    }
}

/// BLE printer configuration
#[derive(Debug, Clone)]
pub struct BleConfig {
    /// Bytes per characteristic write
    pub chunk_size: usize,
    /// Pause after each chunk so the printer buffer can drain
    pub chunk_delay: Duration,
    /// Scans stop on their own after this long
    pub scan_timeout: Duration,
    /// Upper bound on a single chunk write
    pub write_timeout: Duration,
    /// How long the automatic connect retry rescans for the device
    pub rescan_window: Duration,
    /// Known printer service UUIDs (substring match, any case)
    pub service_uuids: Vec<String>,
    /// Known write characteristic UUIDs (substring match, any case)
    pub characteristic_uuids: Vec<String>,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            chunk_delay: Duration::from_millis(200),
            scan_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(5),
            rescan_window: Duration::from_secs(5),
            service_uuids: [
                "18f0",
                "e7810a71-73ae-499d-8c15-faa9aef0c3f2",
                "49535343-fe7d-4ae5-8fa9-9fafd205e455",
                "ff00",
                "ffe0",
            ]
            .map(String::from)
            .to_vec(),
            characteristic_uuids: [
                "2af1",
                "bef8d6c9-9c21-4c9e-b632-bd58c1009f9f",
                "49535343-8841-43f4-a8d4-ecbe34729bb3",
                "ff02",
                "ffe1",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

fn matches_any(uuid: &str, known: &[String]) -> bool {
    let uuid = uuid.to_ascii_lowercase();
    known
        .iter()
        .any(|k| uuid.contains(k.to_ascii_lowercase().as_str()))
}

/// Locate the print characteristic among a device's services
///
/// Takes the first service matching a known printer service, then the first
/// of its characteristics matching a known write characteristic.
pub fn find_printer_characteristic(
    device_id: &str,
    services: &[GattService],
    config: &BleConfig,
) -> PrintResult<CharacteristicHandle> {
    let service = services
        .iter()
        .find(|s| matches_any(&s.uuid, &config.service_uuids))
        .ok_or_else(|| PrintError::ServiceNotFound(device_id.to_string()))?;

    let characteristic = service
        .characteristics
        .iter()
        .find(|c| matches_any(c, &config.characteristic_uuids))
        .ok_or_else(|| PrintError::CharacteristicNotFound(service.uuid.clone()))?;

    Ok(CharacteristicHandle {
        device_id: device_id.to_string(),
        service_uuid: service.uuid.clone(),
        characteristic_uuid: characteristic.clone(),
    })
}
