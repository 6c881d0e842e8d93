//! Bluetooth LE transport for thermal receipt printers
//! This module handles discovering a printer, negotiating a writable
//! characteristic and streaming ESC/POS data to it.

mod connection;
mod constants;
mod device;
mod manager;
mod negotiate;
mod platform;
mod scanner;
mod types;

// Re-export types that should be publicly accessible
pub use connection::{ConnectionManager, Negotiated};
pub use constants::*; // Re-export all constants
pub use device::{BluestDevice, BluestPlatform};
pub use manager::PrinterTransport;
pub use negotiate::first_match;
pub use platform::{BlePlatform, GattCharacteristic, GattService, PeripheralDevice};
pub use scanner::{AutoSelect, BluetoothScanner, DeviceSelector};
pub use types::{PrintReport, PrinterConnection, PrinterDevice, RequestOptions, WriteProperties};
