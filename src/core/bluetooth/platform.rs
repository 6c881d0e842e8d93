//! Platform Bluetooth capability consumed by the transport
//! The bluest backend implements these traits; tests provide scripted doubles.

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::bluetooth::types::{RequestOptions, WriteProperties};
use crate::error::Result;

/// Entry point to the host's Bluetooth stack
#[async_trait]
pub trait BlePlatform: Send + Sync {
    type Device: PeripheralDevice;

    /// Capability probe, no side effects
    async fn is_available(&self) -> bool;

    /// Let the user pick a device.
    ///
    /// Fails with `Cancelled` when nothing is chosen and with
    /// `NoMatchingDevices` when a filtered request has no candidates.
    async fn request_device(&self, options: &RequestOptions) -> Result<Self::Device>;
}

/// A peripheral and its GATT server
#[async_trait]
pub trait PeripheralDevice: Clone + Send + Sync + 'static {
    type Service: GattService;

    fn id(&self) -> String;

    fn name(&self) -> Option<String>;

    /// Open the GATT connection
    async fn connect_gatt(&self) -> Result<()>;

    async fn is_connected(&self) -> bool;

    async fn disconnect(&self) -> Result<()>;

    /// The primary service with this UUID, if the device has it
    async fn primary_service(&self, uuid: Uuid) -> Result<Option<Self::Service>>;

    async fn primary_services(&self) -> Result<Vec<Self::Service>>;

    /// Resolves once the link drops.
    ///
    /// Resolves at once when the link is already down at the time of the
    /// call; implementations must not rely on seeing a change event for it.
    async fn disconnected(&self) -> Result<()>;
}

#[async_trait]
pub trait GattService: Clone + Send + Sync + 'static {
    type Characteristic: GattCharacteristic;

    fn uuid(&self) -> Uuid;

    async fn characteristic(&self, uuid: Uuid) -> Result<Option<Self::Characteristic>>;

    async fn characteristics(&self) -> Result<Vec<Self::Characteristic>>;
}

#[async_trait]
pub trait GattCharacteristic: Clone + Send + Sync + 'static {
    fn uuid(&self) -> Uuid;

    async fn properties(&self) -> Result<WriteProperties>;

    /// Acknowledged write
    async fn write(&self, data: &[u8]) -> Result<()>;

    async fn write_without_response(&self, data: &[u8]) -> Result<()>;
}
