//! Error types for printer discovery, connection and printing

use thiserror::Error;

/// Everything that can go wrong between the caller and the paper
#[derive(Debug, Error)]
pub enum PrinterError {
    /// No usable Bluetooth adapter on this system
    #[error("Bluetooth is not available on this system")]
    BluetoothUnavailable,

    /// The device chooser was dismissed without a selection
    #[error("User cancelled the printer selection")]
    Cancelled,

    /// A filtered discovery found nothing advertising a printer service
    #[error("No devices matching the printer services were found")]
    NoMatchingDevices,

    /// A remembered printer did not show up during discovery
    #[error("Printer {0} was not found nearby")]
    PrinterNotFound(String),

    /// Reconnect was requested but nothing is saved
    #[error("No saved printer")]
    NoSavedPrinter,

    #[error("GATT is not available on this device: {0}")]
    GattUnavailable(String),

    #[error("No compatible printer service found")]
    NoCompatibleService,

    #[error("No writable characteristic found on printer")]
    NoWritableCharacteristic,

    /// Nothing is connected
    #[error("No printer connected")]
    NotConnected,

    /// A connection is held but the link is down
    #[error("Printer is disconnected")]
    Disconnected,

    /// The payload was only partly delivered; the receipt may be incomplete
    #[error("Print failed after {sent} of {total} bytes: {source}")]
    PrintInterrupted {
        sent: usize,
        total: usize,
        #[source]
        source: Box<PrinterError>,
    },

    #[error("Bluetooth error: {0}")]
    Ble(#[from] bluest::Error),

    /// Failure reported by a non-bluest platform backend
    #[error("Bluetooth platform error: {0}")]
    Platform(String),
}

impl PrinterError {
    /// The user backed out; callers should carry on without an error message
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The fix is to (re)connect a printer rather than check the hardware
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected | Self::Disconnected)
    }

    /// Bytes may already be on paper
    pub fn is_partial_print(&self) -> bool {
        matches!(self, Self::PrintInterrupted { sent, .. } if *sent > 0)
    }
}

pub type Result<T, E = PrinterError> = std::result::Result<T, E>;
