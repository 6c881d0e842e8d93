//! Bluetooth connection handling for thermal printers
//! This module negotiates the GATT endpoint and streams data to it.

use std::time::Duration;

use log::{debug, info, warn};

use crate::core::bluetooth::constants::{PRINTER_SERVICE_UUIDS, WRITE_CHARACTERISTIC_UUIDS};
use crate::core::bluetooth::negotiate::first_match;
use crate::core::bluetooth::platform::{GattCharacteristic, GattService, PeripheralDevice};
use crate::core::bluetooth::types::{CharacteristicOf, WriteProperties};
use crate::error::{PrinterError, Result};

/// Result of a successful negotiation
pub struct Negotiated<D: PeripheralDevice> {
    pub service: D::Service,
    pub characteristic: CharacteristicOf<D>,
    pub properties: WriteProperties,
}

/// Connection manager for the printer
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    chunk_size: usize,
    chunk_delay: Duration,
}

impl ConnectionManager {
    pub fn new(chunk_size: usize, chunk_delay_ms: u64) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_delay: Duration::from_millis(chunk_delay_ms),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Open GATT and locate a service plus a writable characteristic
    pub async fn negotiate<D: PeripheralDevice>(&self, device: &D) -> Result<Negotiated<D>> {
        info!(
            "Device details - ID: {}, Name: {:?}",
            device.id(),
            device.name()
        );

        if !device.is_connected().await {
            info!("Initiating connection to {}...", device.id());
            device
                .connect_gatt()
                .await
                .map_err(|e| PrinterError::GattUnavailable(e.to_string()))?;
        }

        info!("Connection successful, discovering services...");
        let service = self.find_service(device).await?;
        let characteristic = self.find_write_characteristic(&service).await?;

        let properties = match characteristic.properties().await {
            Ok(properties) => properties,
            Err(e) => {
                warn!(
                    "Could not read properties of {}, using acknowledged writes: {}",
                    characteristic.uuid(),
                    e
                );
                WriteProperties {
                    write: true,
                    write_without_response: false,
                }
            }
        };

        Ok(Negotiated {
            service,
            characteristic,
            properties,
        })
    }

    /// Known printer services first, then whatever the device offers first
    async fn find_service<D: PeripheralDevice>(&self, device: &D) -> Result<D::Service> {
        if let Some((uuid, service)) =
            first_match(&PRINTER_SERVICE_UUIDS, |uuid| device.primary_service(uuid)).await
        {
            info!("Found printer service: {}", uuid);
            return Ok(service);
        }

        let services = device.primary_services().await?;
        for service in &services {
            debug!("Available service: {}", service.uuid());
        }
        match services.into_iter().next() {
            Some(service) => {
                warn!("Using first available service: {}", service.uuid());
                Ok(service)
            }
            None => Err(PrinterError::NoCompatibleService),
        }
    }

    /// Known write characteristics first, then the first one accepting writes
    async fn find_write_characteristic<S: GattService>(
        &self,
        service: &S,
    ) -> Result<S::Characteristic> {
        if let Some((uuid, characteristic)) =
            first_match(&WRITE_CHARACTERISTIC_UUIDS, |uuid| service.characteristic(uuid)).await
        {
            info!("Found write characteristic: {}", uuid);
            return Ok(characteristic);
        }

        for characteristic in service.characteristics().await? {
            match characteristic.properties().await {
                Ok(properties) if properties.is_writable() => {
                    warn!("Using writable characteristic: {}", characteristic.uuid());
                    return Ok(characteristic);
                }
                Ok(_) => debug!("{} is not writable", characteristic.uuid()),
                Err(e) => debug!("Skipping {}: {}", characteristic.uuid(), e),
            }
        }

        Err(PrinterError::NoWritableCharacteristic)
    }

    /// Write `data` in order, one chunk at a time.
    ///
    /// Returns the number of chunks written. On failure returns how many
    /// bytes had already gone out along with the error.
    pub async fn write_chunked<C: GattCharacteristic>(
        &self,
        characteristic: &C,
        properties: WriteProperties,
        data: &[u8],
    ) -> std::result::Result<usize, (usize, PrinterError)> {
        let mut sent = 0;
        let mut chunks = 0;

        for chunk in data.chunks(self.chunk_size) {
            if chunks > 0 && !self.chunk_delay.is_zero() {
                tokio::time::sleep(self.chunk_delay).await;
            }

            let written = if properties.write_without_response {
                characteristic.write_without_response(chunk).await
            } else {
                characteristic.write(chunk).await
            };
            if let Err(e) = written {
                return Err((sent, e));
            }

            sent += chunk.len();
            chunks += 1;
            debug!("Wrote chunk {} ({} of {} bytes)", chunks, sent, data.len());
        }

        Ok(chunks)
    }

    /// Close the GATT link if it is still up
    pub async fn disconnect<D: PeripheralDevice>(&self, device: &D) -> Result<()> {
        if device.is_connected().await {
            info!("Disconnecting from device {}", device.id());
            device.disconnect().await?;
            info!("Successfully disconnected");
        } else {
            info!("Device {} not connected", device.id());
        }
        Ok(())
    }
}
