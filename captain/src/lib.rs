//! Captain app process: configuration, logging and wiring of the backend
//! cache and the receipt printer.

pub mod app;
pub mod common;
pub mod config;

pub use app::{CaptainApp, ReceiptFormat, load_receipt, open_store, render_receipt};
pub use common::{init_logger, init_logger_with_file};
pub use config::Config;

/// Load `.env`, read configuration and start logging
pub fn setup_environment() -> anyhow::Result<Config> {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    init_logger_with_file(&config.log_level, config.log_json, config.log_dir.as_deref())?;
    Ok(config)
}
