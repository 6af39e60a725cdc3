//! Process wiring
//!
//! Builds the local store, the cached backend client and the printer from a
//! [`Config`], and holds them for the lifetime of the process.

use crate::config::Config;
use anyhow::Context;
use captain_client::{
    CachedClient, ClientConfig, ClientResult, HttpClient, KvStore, LoginSession, MemoryStore,
    RedbStore, RequestOptions, SessionChange, SessionManager, Transport,
};
use captain_printer::{
    AnyPrinter, BleCentral, BleConfig, FilePrintDialog, PrintResult, generate_receipt_bytes,
    generate_receipt_html, select_printer,
};
use serde_json::Value;
use shared::{ApiEnvelope, ReceiptDocument};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Output form of a rendered receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReceiptFormat {
    /// Raw ESC/POS bytes for a thermal printer
    Escpos,
    /// HTML page for a print dialog
    Html,
}

/// Open the on-disk store, falling back to memory when it is unavailable
///
/// Storage is best-effort: a broken database must not stop the app.
pub fn open_store(config: &Config) -> Arc<dyn KvStore> {
    let path = config.db_path();
    let opened = std::fs::create_dir_all(&config.data_dir)
        .map_err(|e| e.to_string())
        .and_then(|_| RedbStore::open(&path).map_err(|e| e.to_string()));

    match opened {
        Ok(store) => {
            info!(path = %path.display(), "Opened local store");
            Arc::new(store)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Local store unavailable, using memory");
            Arc::new(MemoryStore::new())
        }
    }
}

/// Read a receipt document from a JSON file
pub async fn load_receipt(path: &Path) -> anyhow::Result<ReceiptDocument> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Render a receipt in the requested form
pub fn render_receipt(receipt: &ReceiptDocument, format: ReceiptFormat) -> Vec<u8> {
    match format {
        ReceiptFormat::Escpos => generate_receipt_bytes(receipt),
        ReceiptFormat::Html => generate_receipt_html(receipt).into_bytes(),
    }
}

/// Long-lived application context
pub struct CaptainApp {
    config: Config,
    client: CachedClient,
}

impl CaptainApp {
    /// Wire the app against the configured backend
    ///
    /// The stored access token, if any, authenticates requests.
    pub async fn open(config: Config) -> anyhow::Result<Self> {
        let store = open_store(&config);
        let session = SessionManager::new(store.clone());

        let mut client_config =
            ClientConfig::new(&config.api_url).with_timeout(config.request_timeout_secs);
        if let Some(token) = session.access_token().await {
            client_config = client_config.with_token(token);
        }
        let http = HttpClient::new(&client_config).context("building HTTP client")?;

        Ok(Self::with_transport(config, store, Arc::new(http)))
    }

    /// Wire the app over an explicit transport and store
    pub fn with_transport(
        config: Config,
        store: Arc<dyn KvStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            client: CachedClient::new(transport, store),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &CachedClient {
        &self.client
    }

    pub fn session(&self) -> &SessionManager {
        self.client.session()
    }

    /// Store a fresh login; a new device token drops every cached response
    pub async fn login(&self, login: &LoginSession) -> anyhow::Result<SessionChange> {
        self.session()
            .begin_session(login)
            .await
            .context("saving login")
    }

    /// Forget the login and this session's cached responses
    pub async fn logout(&self) -> anyhow::Result<()> {
        let removed = self.client.clear_all_cache().await;
        self.session().end_session().await.context("clearing login")?;
        info!(removed, "Logged out");
        Ok(())
    }

    /// Cached POST; see [`CachedClient::request`]
    ///
    /// Application-level failures (`st != 1`) are logged but still returned
    /// as the body, since the backend reports them with HTTP 200.
    pub async fn fetch<F>(&self, endpoint: &str, payload: &Value, on_update: F) -> ClientResult<Value>
    where
        F: FnMut(&Value) + Send,
    {
        let body = self
            .client
            .request(endpoint, payload, &RequestOptions::default(), on_update)
            .await?;

        if let Ok(envelope) = serde_json::from_value::<ApiEnvelope>(body.clone())
            && !envelope.is_ok()
        {
            warn!(endpoint, st = envelope.st, msg = ?envelope.msg, "Backend reported failure");
        }
        Ok(body)
    }

    /// Pick the receipt printer for this process
    ///
    /// The saved `html_fallback` setting forces the print dialog even when a
    /// Bluetooth central is available.
    pub async fn printer<C: BleCentral>(
        &self,
        central: Option<C>,
    ) -> PrintResult<AnyPrinter<C, FilePrintDialog>> {
        let settings = self.session().app_settings().await;
        let central = central.filter(|_| !settings.html_fallback);
        select_printer(
            central,
            BleConfig::default(),
            FilePrintDialog::new(&self.config.print_dir),
        )
    }
}
