//! Printer commands
//! This module defines the operations invoked from the command line.

use chrono::Local;
use log::info;
use serde::Serialize;

use crate::core::bluetooth::{BlePlatform, PrintReport, PrinterDevice};
use crate::core::receipt::{SaleReceipt, format_receipt_date, test_page};
use crate::error::PrinterError;
use crate::state::AppState;
use crate::storage::{KeyValueStore, SavedPrinter};

/// Shop name printed on the test page
pub const SHOP_NAME: &str = "YSS Pondy";

/// Snapshot of the printer setup
#[derive(Debug, Clone, Serialize)]
pub struct PrinterStatus {
    pub bluetooth_available: bool,
    pub connected: Option<PrinterDevice>,
    pub saved: Option<SavedPrinter>,
}

/// Lets the user choose a printer. `None` when they cancel.
pub async fn scan_printers<P: BlePlatform, S: KeyValueStore>(
    app_state: &AppState<P, S>,
) -> Result<Option<PrinterDevice>, PrinterError> {
    match app_state.transport.scan_for_printers().await {
        Ok(device) => Ok(Some(PrinterDevice::of(&device))),
        Err(e) if e.is_cancellation() => {
            info!("Printer selection cancelled");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Scan, connect and remember the printer. `None` when the user cancels.
pub async fn connect_printer<P: BlePlatform, S: KeyValueStore>(
    app_state: &AppState<P, S>,
) -> anyhow::Result<Option<PrinterDevice>> {
    let device = match app_state.transport.scan_for_printers().await {
        Ok(device) => device,
        Err(e) if e.is_cancellation() => {
            info!("Printer selection cancelled");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let connection = app_state.transport.connect_to_printer(device).await?;
    let printer = connection.printer();
    app_state.storage.save_printer(&printer).await?;
    Ok(Some(printer))
}

/// Reconnect to the saved printer without prompting
pub async fn reconnect_saved<P: BlePlatform, S: KeyValueStore>(
    app_state: &AppState<P, S>,
) -> anyhow::Result<PrinterDevice> {
    let saved = app_state
        .storage
        .get_saved_printer()
        .await
        .ok_or(PrinterError::NoSavedPrinter)?;
    info!("Reconnecting to saved printer {} ({})", saved.name, saved.id);

    let device = app_state.transport.find_printer(&saved.id).await?;
    let connection = app_state.transport.connect_to_printer(device).await?;
    let printer = connection.printer();
    app_state.storage.save_printer(&printer).await?;
    Ok(printer)
}

/// Use the live connection, else the saved printer, else ask the user.
/// `None` when the user cancels the chooser.
pub async fn ensure_connected<P: BlePlatform, S: KeyValueStore>(
    app_state: &AppState<P, S>,
) -> anyhow::Result<Option<PrinterDevice>> {
    if app_state.transport.is_printer_connected().await {
        return Ok(app_state.transport.current_printer().await);
    }
    if app_state.storage.get_saved_printer().await.is_some() {
        match reconnect_saved(app_state).await {
            Ok(printer) => return Ok(Some(printer)),
            Err(e) => info!("Saved printer unavailable ({:#}), scanning instead", e),
        }
    }
    connect_printer(app_state).await
}

pub async fn printer_status<P: BlePlatform, S: KeyValueStore>(
    app_state: &AppState<P, S>,
) -> PrinterStatus {
    let connected = if app_state.transport.is_printer_connected().await {
        app_state.transport.current_printer().await
    } else {
        None
    };
    PrinterStatus {
        bluetooth_available: app_state.transport.is_bluetooth_available().await,
        connected,
        saved: app_state.storage.get_saved_printer().await,
    }
}

pub async fn disconnect_printer<P: BlePlatform, S: KeyValueStore>(
    app_state: &AppState<P, S>,
) -> Result<(), PrinterError> {
    app_state.transport.disconnect_printer().await
}

/// Disconnect and drop the saved printer
pub async fn forget_printer<P: BlePlatform, S: KeyValueStore>(
    app_state: &AppState<P, S>,
) -> anyhow::Result<()> {
    app_state.transport.disconnect_printer().await?;
    app_state.storage.remove_saved_printer().await
}

pub async fn print_test_page<P: BlePlatform, S: KeyValueStore>(
    app_state: &AppState<P, S>,
) -> Result<PrintReport, PrinterError> {
    let timestamp = Local::now().format("%d/%m/%Y, %H:%M:%S").to_string();
    app_state.transport.print(&test_page(SHOP_NAME, &timestamp)).await
}

/// Print a sale; an empty date is filled with the current local time
pub async fn print_sale_receipt<P: BlePlatform, S: KeyValueStore>(
    app_state: &AppState<P, S>,
    sale: &SaleReceipt,
) -> Result<PrintReport, PrinterError> {
    let bytes = if sale.date.is_empty() {
        let dated = SaleReceipt {
            date: format_receipt_date(&Local::now()),
            ..sale.clone()
        };
        dated.render()
    } else {
        sale.render()
    };
    app_state.transport.print(&bytes).await
}

/// Send bytes that are already ESC/POS encoded
pub async fn print_raw<P: BlePlatform, S: KeyValueStore>(
    app_state: &AppState<P, S>,
    data: &[u8],
) -> Result<PrintReport, PrinterError> {
    app_state.transport.print(data).await
}
