//! Core functionality for the receipt printer
//! ESC/POS encoding, receipt layouts and the Bluetooth transport.

pub mod bluetooth;
pub mod escpos;
pub mod receipt;

// Re-export commonly used types
pub use bluetooth::{PrinterDevice, PrinterTransport};
pub use escpos::{Align, EscPosEncoder, format_currency, truncate_text};
pub use receipt::{LineItem, SaleReceipt};
