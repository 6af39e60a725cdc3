//! BLE printer connection manager
//!
//! ```text
//! Disconnected --scan--> Scanning --connect--> Connecting --ok--> Connected
//!                                                  |                |   ^
//!                                       fail (one rescan+retry)  print  | done/error
//!                                                  v                v   |
//!                                             Disconnected        Printing
//! ```
//!
//! One connection at a time. Print data is written in fixed-size chunks,
//! strictly in order, with a pause between chunks for the printer buffer.

use crate::ble::{
    AdapterState, BleCentral, BleConfig, BleError, CharacteristicHandle, DiscoveredDevice,
    find_printer_characteristic,
};
use crate::error::{PrintError, PrintResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Scanning,
    Connecting,
    Connected,
    Printing,
}

struct Inner {
    state: ConnectionState,
    discovered: Vec<DiscoveredDevice>,
    device: Option<DiscoveredDevice>,
    handle: Option<CharacteristicHandle>,
    scan_task: Option<JoinHandle<()>>,
}

impl Inner {
    fn remember(&mut self, device: DiscoveredDevice) {
        if !self.discovered.iter().any(|d| d.id == device.id) {
            debug!(device_id = %device.id, name = ?device.name, "Discovered device");
            self.discovered.push(device);
        }
    }

    fn reset_link(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.device = None;
        self.handle = None;
    }
}

fn link_error(err: BleError) -> PrintError {
    match err {
        BleError::PermissionDenied => PrintError::PermissionDenied,
        other => PrintError::Connection(other.to_string()),
    }
}

/// BLE thermal printer connection
///
/// Cloning yields another handle to the same connection.
pub struct BlePrinterManager<C: BleCentral> {
    central: Arc<C>,
    config: BleConfig,
    inner: Arc<Mutex<Inner>>,
}

impl<C: BleCentral> Clone for BlePrinterManager<C> {
    fn clone(&self) -> Self {
        Self {
            central: self.central.clone(),
            config: self.config.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<C: BleCentral> BlePrinterManager<C> {
    pub fn new(central: C, config: BleConfig) -> PrintResult<Self> {
        if config.chunk_size == 0 {
            return Err(PrintError::InvalidConfig(
                "chunk_size must be greater than zero".into(),
            ));
        }
        Ok(Self {
            central: Arc::new(central),
            config,
            inner: Arc::new(Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                discovered: Vec::new(),
                device: None,
                handle: None,
                scan_task: None,
            })),
        })
    }

    pub fn config(&self) -> &BleConfig {
        &self.config
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }

    /// Devices seen by the current or last scan, in discovery order
    pub async fn discovered_devices(&self) -> Vec<DiscoveredDevice> {
        self.inner.lock().await.discovered.clone()
    }

    pub async fn connected_device(&self) -> Option<DiscoveredDevice> {
        let inner = self.inner.lock().await;
        match inner.state {
            ConnectionState::Connected | ConnectionState::Printing => inner.device.clone(),
            _ => None,
        }
    }

    async fn ensure_adapter_ready(&self) -> PrintResult<()> {
        match self.central.adapter_state().await {
            AdapterState::PoweredOn => Ok(()),
            AdapterState::PoweredOff | AdapterState::Unknown => Err(PrintError::BluetoothOff),
            AdapterState::Unauthorized => Err(PrintError::PermissionDenied),
            AdapterState::Unsupported => Err(PrintError::BluetoothUnsupported),
        }
    }

    /// Start discovering printers
    ///
    /// Any previous scan is stopped first and the discovered list starts
    /// empty. Results accumulate in [`discovered_devices`](Self::discovered_devices)
    /// until [`stop_scan`](Self::stop_scan), [`connect`](Self::connect) or
    /// the configured scan timeout.
    #[instrument(skip(self))]
    pub async fn scan(&self) -> PrintResult<()> {
        self.stop_scan().await;

        match self.state().await {
            ConnectionState::Printing | ConnectionState::Connecting => {
                return Err(PrintError::Busy);
            }
            ConnectionState::Connected => self.disconnect().await,
            _ => {}
        }

        self.ensure_adapter_ready().await?;
        let rx = self.central.start_scan().await.map_err(link_error)?;

        let mut inner = self.inner.lock().await;
        inner.discovered.clear();
        inner.state = ConnectionState::Scanning;
        inner.scan_task = Some(tokio::spawn(Self::collect_advertisements(
            self.central.clone(),
            self.inner.clone(),
            rx,
            self.config.scan_timeout,
        )));
        info!("Scanning for printers");
        Ok(())
    }

    async fn collect_advertisements(
        central: Arc<C>,
        inner: Arc<Mutex<Inner>>,
        mut rx: mpsc::Receiver<DiscoveredDevice>,
        timeout: std::time::Duration,
    ) {
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    info!("Scan timed out");
                    break;
                }
                device = rx.recv() => match device {
                    Some(device) => inner.lock().await.remember(device),
                    None => break,
                },
            }
        }

        central.stop_scan().await;
        let mut inner = inner.lock().await;
        inner.scan_task = None;
        if inner.state == ConnectionState::Scanning {
            inner.state = ConnectionState::Disconnected;
        }
    }

    /// Stop an active scan; the discovered list is kept
    pub async fn stop_scan(&self) {
        let task = {
            let mut inner = self.inner.lock().await;
            let task = inner.scan_task.take();
            if task.is_none() && inner.state != ConnectionState::Scanning {
                return;
            }
            if inner.state == ConnectionState::Scanning {
                inner.state = ConnectionState::Disconnected;
            }
            task
        };

        if let Some(task) = task {
            task.abort();
        }
        self.central.stop_scan().await;
        debug!("Scan stopped");
    }

    /// Connect to a discovered printer and bind its write characteristic
    ///
    /// A failure to open the link is retried once after briefly rescanning
    /// for the device. Service and characteristic lookup failures are not
    /// retried.
    #[instrument(skip(self, device), fields(device_id = %device.id))]
    pub async fn connect(&self, device: &DiscoveredDevice) -> PrintResult<()> {
        self.stop_scan().await;

        {
            let inner = self.inner.lock().await;
            match inner.state {
                ConnectionState::Printing | ConnectionState::Connecting => {
                    return Err(PrintError::Busy);
                }
                ConnectionState::Connected
                    if inner.device.as_ref().is_some_and(|d| d.id == device.id) =>
                {
                    return Ok(());
                }
                _ => {}
            }
        }
        self.disconnect().await;
        self.ensure_adapter_ready().await?;

        {
            let mut inner = self.inner.lock().await;
            inner.state = ConnectionState::Connecting;
            inner.device = Some(device.clone());
        }

        let result = match self.try_connect(&device.id).await {
            Err(PrintError::Connection(reason)) => {
                warn!(%reason, "Connect failed, rescanning for one retry");
                self.rescan_for(&device.id).await;
                self.try_connect(&device.id).await
            }
            other => other,
        };

        let mut inner = self.inner.lock().await;
        match result {
            Ok(_) if inner.state != ConnectionState::Connecting => {
                // disconnect() ran while the link was being set up
                drop(inner);
                warn!("Connect cancelled by disconnect");
                self.close_link(&device.id).await;
                Err(PrintError::Disconnected(device.id.clone()))
            }
            Ok(handle) => {
                info!(
                    service = %handle.service_uuid,
                    characteristic = %handle.characteristic_uuid,
                    "Printer connected"
                );
                inner.state = ConnectionState::Connected;
                inner.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Printer connection failed");
                inner.reset_link();
                Err(e)
            }
        }
    }

    /// Open the link and bind the write characteristic
    ///
    /// A link that opened but failed lookup is closed before returning.
    async fn try_connect(&self, device_id: &str) -> PrintResult<CharacteristicHandle> {
        self.central.connect(device_id).await.map_err(link_error)?;

        let bound = match self.central.discover_services(device_id).await {
            Ok(services) => find_printer_characteristic(device_id, &services, &self.config),
            Err(e) => Err(link_error(e)),
        };
        if bound.is_err() {
            self.close_link(device_id).await;
        }
        bound
    }

    async fn close_link(&self, device_id: &str) {
        if let Err(e) = self.central.disconnect(device_id).await {
            warn!(device_id, error = %e, "Closing link failed");
        }
    }

    /// Scan until the device advertises again or the rescan window closes
    async fn rescan_for(&self, device_id: &str) {
        {
            let mut inner = self.inner.lock().await;
            if inner.state != ConnectionState::Connecting {
                return;
            }
            inner.state = ConnectionState::Scanning;
        }

        match self.central.start_scan().await {
            Ok(mut rx) => {
                let found = tokio::time::timeout(self.config.rescan_window, async {
                    while let Some(device) = rx.recv().await {
                        let hit = device.id == device_id;
                        self.inner.lock().await.remember(device);
                        if hit {
                            return true;
                        }
                    }
                    false
                })
                .await
                .unwrap_or(false);
                self.central.stop_scan().await;
                debug!(found, "Rescan finished");
            }
            Err(e) => warn!(error = %e, "Rescan could not start"),
        }

        let mut inner = self.inner.lock().await;
        if inner.state == ConnectionState::Scanning {
            inner.state = ConnectionState::Connecting;
        }
    }

    /// Write a receipt byte stream to the connected printer
    ///
    /// Chunks are base64-encoded and written one after another with
    /// `chunk_delay` between them. The first failing chunk aborts the job;
    /// a later print starts over from the first chunk.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let handle = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                ConnectionState::Connected => {}
                ConnectionState::Printing => return Err(PrintError::Busy),
                _ => return Err(PrintError::NotConnected),
            }
            let handle = inner.handle.clone().ok_or(PrintError::NotConnected)?;
            inner.state = ConnectionState::Printing;
            handle
        };

        let result = self.write_chunks(&handle, data).await;

        let mut inner = self.inner.lock().await;
        match &result {
            Err(PrintError::Disconnected(_)) => inner.reset_link(),
            _ if inner.state == ConnectionState::Printing => {
                inner.state = ConnectionState::Connected;
            }
            _ => {}
        }
        match &result {
            Ok(()) => info!("Print job sent"),
            Err(e) => warn!(error = %e, "Print job aborted"),
        }
        result
    }

    async fn write_chunks(&self, handle: &CharacteristicHandle, data: &[u8]) -> PrintResult<()> {
        let total = data.len().div_ceil(self.config.chunk_size);

        for (chunk, bytes) in data.chunks(self.config.chunk_size).enumerate() {
            if chunk > 0 {
                tokio::time::sleep(self.config.chunk_delay).await;
            }
            if self.state().await != ConnectionState::Printing {
                return Err(PrintError::Disconnected(handle.device_id.clone()));
            }

            let payload = STANDARD.encode(bytes);
            let write = self.central.write_with_response(handle, &payload);
            match tokio::time::timeout(self.config.write_timeout, write).await {
                Ok(Ok(())) => {}
                Ok(Err(BleError::Disconnected)) => {
                    return Err(PrintError::Disconnected(handle.device_id.clone()));
                }
                Ok(Err(BleError::Timeout)) | Err(_) => {
                    return Err(PrintError::WriteTimeout { chunk });
                }
                Ok(Err(e)) => {
                    return Err(PrintError::WriteFailed {
                        chunk,
                        reason: e.to_string(),
                    });
                }
            }
            debug!(chunk, total, len = bytes.len(), "Chunk written");
        }
        Ok(())
    }

    /// Drop the connection, stopping any scan; an in-flight print aborts
    #[instrument(skip(self))]
    pub async fn disconnect(&self) {
        self.stop_scan().await;

        let device = {
            let mut inner = self.inner.lock().await;
            let device = inner.device.take();
            inner.reset_link();
            device
        };

        if let Some(device) = device {
            match self.central.disconnect(&device.id).await {
                Ok(()) => info!(device_id = %device.id, "Printer disconnected"),
                Err(e) => warn!(device_id = %device.id, error = %e, "Disconnect failed"),
            }
        }
    }

    /// Release the printer when the app leaves the foreground
    pub async fn on_app_background(&self) {
        debug!("App backgrounded, releasing printer");
        self.disconnect().await;
    }
}
