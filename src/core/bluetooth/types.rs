//! Defines shared data structures for the Bluetooth module.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::bluetooth::constants::UNKNOWN_PRINTER_NAME;
use crate::core::bluetooth::platform::{GattCharacteristic, GattService, PeripheralDevice};

/// A discovered or remembered printer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterDevice {
    /// Platform-specific unique identifier for the device
    pub id: String,
    /// The advertised name, or a placeholder when the device has none
    pub name: String,
}

impl PrinterDevice {
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNKNOWN_PRINTER_NAME.to_string()),
        }
    }

    /// Describes a platform device handle
    pub fn of<D: PeripheralDevice>(device: &D) -> Self {
        Self::new(device.id(), device.name())
    }
}

/// The write-related subset of GATT characteristic properties
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteProperties {
    pub write: bool,
    pub write_without_response: bool,
}

impl WriteProperties {
    pub fn is_writable(&self) -> bool {
        self.write || self.write_without_response
    }
}

/// What the platform device chooser should offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOptions {
    /// Only devices advertising one of these services
    Filtered(Vec<Uuid>),
    /// Every device in range
    AcceptAll,
    /// The device with this id, without asking the user
    Remembered(String),
}

/// Outcome of a completed print
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintReport {
    pub bytes: usize,
    pub chunks: usize,
}

pub(crate) type CharacteristicOf<D> =
    <<D as PeripheralDevice>::Service as GattService>::Characteristic;

/// A live session with one printer.
///
/// Holds the handles needed to write: the device (which doubles as the GATT
/// server on every backend), the negotiated service and the characteristic.
#[derive(Clone)]
pub struct PrinterConnection<D: PeripheralDevice> {
    pub(crate) session: u64,
    pub(crate) device: D,
    pub(crate) service: D::Service,
    pub(crate) characteristic: CharacteristicOf<D>,
    pub(crate) properties: WriteProperties,
    /// Stops the disconnect watcher for this session
    pub(crate) watcher: CancellationToken,
}

impl<D: PeripheralDevice> PrinterConnection<D> {
    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn printer(&self) -> PrinterDevice {
        PrinterDevice::of(&self.device)
    }

    pub fn service_uuid(&self) -> Uuid {
        self.service.uuid()
    }

    pub fn characteristic_uuid(&self) -> Uuid {
        self.characteristic.uuid()
    }

    /// Whether chunks go out as write-without-response
    pub fn writes_without_response(&self) -> bool {
        self.properties.write_without_response
    }
}

impl<D: PeripheralDevice> std::fmt::Debug for PrinterConnection<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrinterConnection")
            .field("session", &self.session)
            .field("device", &self.device.id())
            .field("service", &self.service_uuid())
            .field("characteristic", &self.characteristic_uuid())
            .field("properties", &self.properties)
            .finish()
    }
}
