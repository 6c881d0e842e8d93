//! Receipt printer library
//! ESC/POS receipt encoding and Bluetooth LE delivery to 58mm thermal printers.

// Module declarations
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod state;
pub mod storage;
pub mod utils;

pub use error::PrinterError;

/// Initialize logging, honouring `RUST_LOG`
pub fn setup_logging() {
    if logging::init(logging::DEFAULT_FILTER).is_ok() {
        log::info!("Logging initialized");
    }
}
