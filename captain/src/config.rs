use std::path::PathBuf;

/// Captain app configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | CAPTAIN_API_URL | http://localhost:8000/captain_api | backend base URL |
/// | CAPTAIN_DATA_DIR | ./captain_data | local database and spool root |
/// | CAPTAIN_LOG_LEVEL | info | default log filter when `RUST_LOG` is unset |
/// | CAPTAIN_LOG_JSON | false | JSON console logs |
/// | CAPTAIN_LOG_DIR | (unset) | enables daily rotating file logs |
/// | CAPTAIN_REQUEST_TIMEOUT_SECS | 30 | HTTP request timeout |
/// | CAPTAIN_PRINT_DIR | `<data dir>/print` | HTML print spool directory |
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub data_dir: PathBuf,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    pub request_timeout_secs: u64,
    pub print_dir: PathBuf,
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let data_dir: PathBuf = std::env::var("CAPTAIN_DATA_DIR")
            .unwrap_or_else(|_| "./captain_data".into())
            .into();

        Self {
            api_url: std::env::var("CAPTAIN_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000/captain_api".into()),
            log_level: std::env::var("CAPTAIN_LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("CAPTAIN_LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("CAPTAIN_LOG_DIR").ok().filter(|d| !d.is_empty()),
            request_timeout_secs: std::env::var("CAPTAIN_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            print_dir: std::env::var("CAPTAIN_PRINT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("print")),
            data_dir,
        }
    }

    /// Override the data directory; the print spool follows it
    ///
    /// Mostly used by tests.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self.print_dir = self.data_dir.join("print");
        self
    }

    /// Path of the local key-value database
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("captain.redb")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
