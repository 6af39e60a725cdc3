//! Error types for the printer library

use thiserror::Error;

/// Printer error types
///
/// Every variant is user-reportable; see [`PrintError::user_message`].
#[derive(Debug, Error)]
pub enum PrintError {
    /// Bluetooth adapter is powered off
    #[error("Bluetooth is powered off")]
    BluetoothOff,

    /// The app may not use Bluetooth
    #[error("Bluetooth permission denied")]
    PermissionDenied,

    /// No usable Bluetooth adapter
    #[error("Bluetooth unsupported")]
    BluetoothUnsupported,

    /// Could not open a connection to the device
    #[error("Connection failed: {0}")]
    Connection(String),

    /// None of the known printer services is offered by the device
    #[error("Printer service not found on device {0}")]
    ServiceNotFound(String),

    /// The printer service has no known write characteristic
    #[error("Printer characteristic not found in service {0}")]
    CharacteristicNotFound(String),

    /// Print requested without a connected printer
    #[error("Printer not connected")]
    NotConnected,

    /// Another print job is still writing to the printer
    #[error("Print already in progress")]
    Busy,

    /// A chunk write did not complete in time
    #[error("Write timeout at chunk {chunk}")]
    WriteTimeout { chunk: usize },

    /// A chunk write was rejected
    #[error("Write failed at chunk {chunk}: {reason}")]
    WriteFailed { chunk: usize, reason: String },

    /// The link dropped
    #[error("Printer disconnected: {0}")]
    Disconnected(String),

    /// The OS print dialog could not be opened
    #[error("Print dialog failed: {0}")]
    Dialog(String),

    /// IO error during printing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl PrintError {
    /// Text for the blocking alert shown to the user
    pub fn user_message(&self) -> String {
        match self {
            Self::BluetoothOff => "Please enable Bluetooth to connect to the printer.".into(),
            Self::PermissionDenied => {
                "Bluetooth permission is required to use the printer.".into()
            }
            Self::BluetoothUnsupported => "This device does not support Bluetooth printing.".into(),
            Self::Connection(_) => "Could not connect to the printer. Please try again.".into(),
            Self::ServiceNotFound(_) => {
                "This device does not look like a supported printer.".into()
            }
            Self::CharacteristicNotFound(_) => {
                "The printer does not accept print data. Try another printer.".into()
            }
            Self::NotConnected => "No printer connected. Please select a printer.".into(),
            Self::Busy => "A receipt is already printing. Please wait.".into(),
            Self::WriteTimeout { .. } => {
                "The printer stopped responding. Please print again.".into()
            }
            Self::WriteFailed { .. } => "Printing failed. Please print again.".into(),
            Self::Disconnected(_) => "The printer disconnected. Reconnect and try again.".into(),
            Self::Dialog(_) | Self::Io(_) => "Could not open the print dialog.".into(),
            Self::InvalidConfig(msg) => format!("Printer settings are invalid: {msg}"),
        }
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
