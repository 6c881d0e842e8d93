//! bluest implementation of the platform traits

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bluest::{Adapter, Characteristic, ConnectionEvent, Device, Service};
use futures_util::StreamExt;
use log::{info, warn};
use uuid::Uuid;

use crate::config::printer_config::PrinterConfig;
use crate::core::bluetooth::constants::BLUETOOTH_OPERATION_TIMEOUT_SECS;
use crate::core::bluetooth::platform::{BlePlatform, GattCharacteristic, GattService, PeripheralDevice};
use crate::core::bluetooth::scanner::{BluetoothScanner, DeviceSelector};
use crate::core::bluetooth::types::{PrinterDevice, RequestOptions, WriteProperties};
use crate::error::{PrinterError, Result};

/// Host Bluetooth adapter plus a chooser for discovered devices.
///
/// Without an adapter the platform still answers availability probes
/// (with `false`); every device request fails with `BluetoothUnavailable`.
pub struct BluestPlatform {
    radio: Option<Radio>,
    selector: Arc<dyn DeviceSelector>,
}

struct Radio {
    adapter: Adapter,
    scanner: BluetoothScanner,
}

impl Radio {
    fn wrap(&self, device: Device) -> BluestDevice {
        BluestDevice {
            adapter: self.adapter.clone(),
            device,
        }
    }
}

impl BluestPlatform {
    /// Opens the default adapter and waits briefly for it to power up
    pub async fn new(config: &PrinterConfig, selector: Arc<dyn DeviceSelector>) -> Self {
        let Some(adapter) = Adapter::default().await else {
            warn!("No Bluetooth adapter found");
            return Self::without_adapter(selector);
        };

        let wait = Duration::from_secs(BLUETOOTH_OPERATION_TIMEOUT_SECS);
        match tokio::time::timeout(wait, adapter.wait_available()).await {
            Ok(Ok(())) => info!("Bluetooth adapter is available."),
            Ok(Err(e)) => warn!("Bluetooth adapter reported an error: {}", e),
            Err(_) => warn!("Bluetooth adapter not available after {:?}", wait),
        }

        let scanner = BluetoothScanner::new(
            adapter.clone(),
            config.scan_duration_secs,
            config.min_rssi,
        );
        Self {
            radio: Some(Radio { adapter, scanner }),
            selector,
        }
    }

    /// A platform for hosts with no Bluetooth adapter
    pub fn without_adapter(selector: Arc<dyn DeviceSelector>) -> Self {
        Self {
            radio: None,
            selector,
        }
    }

    fn radio(&self) -> Result<&Radio> {
        self.radio.as_ref().ok_or(PrinterError::BluetoothUnavailable)
    }

    /// Scan and hand the candidates to the selector
    async fn choose(&self, services: &[Uuid]) -> Result<Option<BluestDevice>> {
        let radio = self.radio()?;
        let found = radio.scanner.discover(services).await?;
        if found.is_empty() {
            return Ok(None);
        }
        let candidates: Vec<PrinterDevice> = found.iter().map(|(p, _)| p.clone()).collect();
        let chosen = self.selector.select(&candidates).and_then(|i| found.into_iter().nth(i));
        match chosen {
            Some((printer, device)) => {
                info!("Selected device: {} ({})", printer.name, printer.id);
                Ok(Some(radio.wrap(device)))
            }
            None => Err(PrinterError::Cancelled),
        }
    }
}

#[async_trait]
impl BlePlatform for BluestPlatform {
    type Device = BluestDevice;

    async fn is_available(&self) -> bool {
        match &self.radio {
            Some(radio) => radio.adapter.is_available().await.unwrap_or(false),
            None => false,
        }
    }

    async fn request_device(&self, options: &RequestOptions) -> Result<BluestDevice> {
        match options {
            RequestOptions::Filtered(services) => self
                .choose(services)
                .await?
                .ok_or(PrinterError::NoMatchingDevices),
            // an empty chooser can only be dismissed
            RequestOptions::AcceptAll => self.choose(&[]).await?.ok_or(PrinterError::Cancelled),
            RequestOptions::Remembered(id) => {
                let radio = self.radio()?;
                radio
                    .scanner
                    .discover(&[])
                    .await?
                    .into_iter()
                    .find(|(printer, _)| &printer.id == id)
                    .map(|(_, device)| radio.wrap(device))
                    .ok_or_else(|| PrinterError::PrinterNotFound(id.clone()))
            }
        }
    }
}

/// A bluest device together with the adapter that connects it
#[derive(Clone)]
pub struct BluestDevice {
    adapter: Adapter,
    device: Device,
}

#[async_trait]
impl PeripheralDevice for BluestDevice {
    type Service = Service;

    fn id(&self) -> String {
        self.device.id().to_string()
    }

    fn name(&self) -> Option<String> {
        self.device.name().ok()
    }

    async fn connect_gatt(&self) -> Result<()> {
        self.adapter.connect_device(&self.device).await?;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.device.is_connected().await
    }

    async fn disconnect(&self) -> Result<()> {
        self.adapter.disconnect_device(&self.device).await?;
        Ok(())
    }

    async fn primary_service(&self, uuid: Uuid) -> Result<Option<Service>> {
        let services = self.device.discover_services_with_uuid(uuid).await?;
        Ok(services.into_iter().next())
    }

    async fn primary_services(&self) -> Result<Vec<Service>> {
        Ok(self.device.discover_services().await?)
    }

    async fn disconnected(&self) -> Result<()> {
        // events only report changes, so check the state once subscribed
        let mut events = self.adapter.device_connection_events(&self.device).await?;
        if !self.device.is_connected().await {
            return Ok(());
        }
        while let Some(event) = events.next().await {
            if matches!(event, ConnectionEvent::Disconnected) {
                return Ok(());
            }
        }
        // the adapter went away, which also ends the link
        Ok(())
    }
}

#[async_trait]
impl GattService for Service {
    type Characteristic = Characteristic;

    fn uuid(&self) -> Uuid {
        Service::uuid(self)
    }

    async fn characteristic(&self, uuid: Uuid) -> Result<Option<Characteristic>> {
        let characteristics = self.discover_characteristics_with_uuid(uuid).await?;
        Ok(characteristics.into_iter().next())
    }

    async fn characteristics(&self) -> Result<Vec<Characteristic>> {
        Ok(self.discover_characteristics().await?)
    }
}

#[async_trait]
impl GattCharacteristic for Characteristic {
    fn uuid(&self) -> Uuid {
        Characteristic::uuid(self)
    }

    async fn properties(&self) -> Result<WriteProperties> {
        let properties = Characteristic::properties(self).await?;
        Ok(WriteProperties {
            write: properties.write,
            write_without_response: properties.write_without_response,
        })
    }

    async fn write(&self, data: &[u8]) -> Result<()> {
        Characteristic::write(self, data).await?;
        Ok(())
    }

    async fn write_without_response(&self, data: &[u8]) -> Result<()> {
        Characteristic::write_without_response(self, data).await?;
        Ok(())
    }
}
