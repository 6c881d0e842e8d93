//! Printer transport
//! Owns the single printer connection and exposes connect, status and print.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{error, info, warn};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::printer_config::PrinterConfig;
use crate::core::bluetooth::connection::ConnectionManager;
use crate::core::bluetooth::constants::PRINTER_SERVICE_UUIDS;
use crate::core::bluetooth::platform::{BlePlatform, PeripheralDevice};
use crate::core::bluetooth::types::{PrintReport, PrinterConnection, PrinterDevice, RequestOptions};
use crate::error::{PrinterError, Result};

type ConnectionSlot<D> = Arc<Mutex<Option<PrinterConnection<D>>>>;

/// Clear the slot if it still holds `session`
async fn release_session<D: PeripheralDevice>(slot: &ConnectionSlot<D>, session: u64) {
    let mut guard = slot.lock().await;
    if !guard.as_ref().is_some_and(|c| c.session == session) {
        return;
    }
    if let Some(connection) = guard.take() {
        connection.watcher.cancel();
        info!("Printer {} disconnected", connection.device.id());
    }
}

/// Manages the connection to at most one printer.
///
/// Create one per process and share it; the held connection is cleared by
/// `disconnect_printer` or when the platform reports the link dropped.
pub struct PrinterTransport<P: BlePlatform> {
    platform: P,
    connection_manager: ConnectionManager,
    /// Currently connected printer
    connection: ConnectionSlot<P::Device>,
    next_session: AtomicU64,
}

impl<P: BlePlatform> PrinterTransport<P> {
    pub fn new(platform: P, config: &PrinterConfig) -> Self {
        Self {
            platform,
            connection_manager: ConnectionManager::new(config.chunk_size, config.chunk_delay_ms),
            connection: Arc::new(Mutex::new(None)),
            next_session: AtomicU64::new(1),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub async fn is_bluetooth_available(&self) -> bool {
        self.platform.is_available().await
    }

    /// Ask the user to choose a printer.
    ///
    /// Devices advertising a known printer service are offered first; when
    /// there are none the request is repeated for every device in range.
    pub async fn scan_for_printers(&self) -> Result<P::Device> {
        if !self.platform.is_available().await {
            return Err(PrinterError::BluetoothUnavailable);
        }

        let filtered = RequestOptions::Filtered(PRINTER_SERVICE_UUIDS.to_vec());
        match self.platform.request_device(&filtered).await {
            Err(PrinterError::NoMatchingDevices) => {
                warn!("No device advertises a printer service, offering all devices");
                self.platform.request_device(&RequestOptions::AcceptAll).await
            }
            other => other,
        }
    }

    /// Look up a remembered printer by id without prompting
    pub async fn find_printer(&self, id: &str) -> Result<P::Device> {
        if !self.platform.is_available().await {
            return Err(PrinterError::BluetoothUnavailable);
        }
        self.platform
            .request_device(&RequestOptions::Remembered(id.to_string()))
            .await
    }

    /// Connect and negotiate, replacing any connection held so far.
    ///
    /// The previous link is not closed.
    pub async fn connect_to_printer(&self, device: P::Device) -> Result<PrinterConnection<P::Device>> {
        let negotiated = match self.connection_manager.negotiate(&device).await {
            Ok(negotiated) => negotiated,
            Err(e) => {
                error!("Connecting to {} failed: {}", device.id(), e);
                return Err(e);
            }
        };

        let session = self.next_session.fetch_add(1, Ordering::Relaxed);
        let connection = PrinterConnection {
            session,
            device: device.clone(),
            service: negotiated.service,
            characteristic: negotiated.characteristic,
            properties: negotiated.properties,
            watcher: CancellationToken::new(),
        };

        {
            let mut guard = self.connection.lock().await;
            if let Some(previous) = guard.replace(connection.clone()) {
                warn!(
                    "Replacing connection to {} without closing its link",
                    previous.device.id()
                );
                previous.watcher.cancel();
            }
        }
        self.watch_disconnect(device, session, connection.watcher.clone());

        info!(
            "Printer {} connected (service {}, characteristic {})",
            connection.device.id(),
            connection.service_uuid(),
            connection.characteristic_uuid()
        );
        Ok(connection)
    }

    /// Clear the held connection when the platform reports the link dropped
    fn watch_disconnect(&self, device: P::Device, session: u64, cancel: CancellationToken) {
        let slot = self.connection.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = device.disconnected() => {
                    if let Err(e) = result {
                        warn!("Lost disconnect events for {}: {}", device.id(), e);
                        // status and print checks release the slot from here on
                        if device.is_connected().await {
                            return;
                        }
                    }
                    release_session(&slot, session).await;
                }
                _ = cancel.cancelled() => {}
            }
        });
    }

    /// Close the link and forget the connection. Safe to call when idle.
    pub async fn disconnect_printer(&self) -> Result<()> {
        let Some(connection) = self.connection.lock().await.take() else {
            info!("No printer connected");
            return Ok(());
        };
        connection.watcher.cancel();
        info!("Connected state cleared, releasing printer handles.");
        self.connection_manager.disconnect(&connection.device).await
    }

    /// True when a connection is held and its link is still up.
    ///
    /// A held connection whose link is down is released.
    pub async fn is_printer_connected(&self) -> bool {
        let Some(connection) = self.connection.lock().await.clone() else {
            return false;
        };
        if connection.device.is_connected().await {
            return true;
        }
        release_session(&self.connection, connection.session).await;
        false
    }

    pub async fn current_printer(&self) -> Option<PrinterDevice> {
        self.connection.lock().await.as_ref().map(PrinterConnection::printer)
    }

    /// Stream ESC/POS bytes to the connected printer.
    ///
    /// Calls must not overlap; chunks of two prints would interleave.
    pub async fn print(&self, data: &[u8]) -> Result<PrintReport> {
        let connection = self
            .connection
            .lock()
            .await
            .clone()
            .ok_or(PrinterError::NotConnected)?;

        if !connection.device.is_connected().await {
            release_session(&self.connection, connection.session).await;
            return Err(PrinterError::Disconnected);
        }

        info!(
            "Printing {} bytes to {} in chunks of {}",
            data.len(),
            connection.device.id(),
            self.connection_manager.chunk_size()
        );

        match self
            .connection_manager
            .write_chunked(&connection.characteristic, connection.properties, data)
            .await
        {
            Ok(chunks) => Ok(PrintReport {
                bytes: data.len(),
                chunks,
            }),
            Err((sent, e)) => {
                let source = if connection.device.is_connected().await {
                    e
                } else {
                    release_session(&self.connection, connection.session).await;
                    PrinterError::Disconnected
                };
                error!("Print failed after {} of {} bytes: {}", sent, data.len(), source);
                Err(PrinterError::PrintInterrupted {
                    sent,
                    total: data.len(),
                    source: Box::new(source),
                })
            }
        }
    }
}
