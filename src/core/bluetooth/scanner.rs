use std::collections::HashSet;
use std::time::Duration;

use bluest::{Adapter, Device};
use futures_util::StreamExt;
use log::{debug, info};
use tokio::time::{Instant, sleep_until};
use uuid::Uuid;

use crate::core::bluetooth::types::PrinterDevice;
use crate::error::Result;

/// Chooses one device out of the discovered candidates.
///
/// This stands in for the platform's device chooser; `None` means the user
/// declined.
pub trait DeviceSelector: Send + Sync {
    fn select(&self, candidates: &[PrinterDevice]) -> Option<usize>;
}

/// Picks the first candidate, optionally only among names containing a filter
#[derive(Debug, Clone, Default)]
pub struct AutoSelect {
    name_filter: Option<String>,
}

impl AutoSelect {
    pub fn new(name_filter: Option<String>) -> Self {
        Self {
            name_filter: name_filter.map(|f| f.to_lowercase()),
        }
    }
}

impl DeviceSelector for AutoSelect {
    fn select(&self, candidates: &[PrinterDevice]) -> Option<usize> {
        candidates.iter().position(|candidate| match &self.name_filter {
            Some(filter) => candidate.name.to_lowercase().contains(filter),
            None => true,
        })
    }
}

/// Collects nearby devices for a fixed scan window
pub struct BluetoothScanner {
    adapter: Adapter,
    scan_duration: Duration,
    min_rssi: Option<i16>,
}

impl BluetoothScanner {
    pub fn new(adapter: Adapter, scan_duration_secs: u64, min_rssi: Option<i16>) -> Self {
        Self {
            adapter,
            scan_duration: Duration::from_secs(scan_duration_secs),
            min_rssi,
        }
    }

    /// Devices advertising any of `services`, or every device when empty.
    ///
    /// Already-connected matches are listed first, then scan results in the
    /// order they were seen.
    pub async fn discover(&self, services: &[Uuid]) -> Result<Vec<(PrinterDevice, Device)>> {
        let mut found: Vec<(PrinterDevice, Device)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        info!("Checking for connected devices");
        let connected = if services.is_empty() {
            self.adapter.connected_devices().await?
        } else {
            self.adapter.connected_devices_with_services(services).await?
        };
        for device in connected {
            let printer = PrinterDevice::new(device.id().to_string(), device.name().ok());
            debug!("Already connected: {:?}", printer);
            seen.insert(printer.id.clone());
            found.push((printer, device));
        }

        info!("Starting bluetooth scan for {:?}", self.scan_duration);
        let mut scan_stream = self.adapter.scan(services).await?;
        let deadline = Instant::now() + self.scan_duration;

        loop {
            tokio::select! {
                result = scan_stream.next() => {
                    let Some(discovered) = result else {
                        info!("Bluetooth scan stream has ended.");
                        break;
                    };
                    debug!("Found device - Device: {:?}, RSSI: {:?}", discovered.device, discovered.rssi);

                    if let (Some(min), Some(rssi)) = (self.min_rssi, discovered.rssi) {
                        if rssi < min {
                            continue;
                        }
                    }

                    let id = discovered.device.id().to_string();
                    if seen.contains(&id) {
                        continue;
                    }
                    let name = discovered
                        .device
                        .name()
                        .ok()
                        .or(discovered.adv_data.local_name);
                    let printer = PrinterDevice::new(id.clone(), name);
                    info!("Discovered {} ({})", printer.name, printer.id);
                    seen.insert(id);
                    found.push((printer, discovered.device));
                }
                _ = sleep_until(deadline) => {
                    break;
                }
            }
        }

        info!("Scan complete, {} device(s) found", found.len());
        Ok(found)
    }
}
