//! Scripted in-memory BLE platform for transport tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use receipt_printer_lib::PrinterError;
use receipt_printer_lib::config::printer_config::PrinterConfig;
use receipt_printer_lib::core::bluetooth::{
    BlePlatform, GattCharacteristic, GattService, PeripheralDevice, RequestOptions,
    WriteProperties,
};

pub const WRITE_ONLY: WriteProperties = WriteProperties {
    write: true,
    write_without_response: false,
};
pub const WRITE_NO_RESPONSE: WriteProperties = WriteProperties {
    write: true,
    write_without_response: true,
};
pub const READ_ONLY: WriteProperties = WriteProperties {
    write: false,
    write_without_response: false,
};

/// Config without inter-chunk delay so tests run fast
pub fn fast_config() -> PrinterConfig {
    PrinterConfig {
        chunk_delay_ms: 0,
        ..PrinterConfig::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    WithResponse,
    WithoutResponse,
}

/// The radio link shared by a device and its characteristics
pub struct Link {
    connected: watch::Sender<bool>,
    writes: Mutex<Vec<(WriteMode, Vec<u8>)>>,
    /// Successful writes left before the link drops
    drop_after: Mutex<Option<usize>>,
    disconnect_calls: Mutex<usize>,
}

impl Default for Link {
    fn default() -> Self {
        Self {
            connected: watch::Sender::new(false),
            writes: Mutex::new(Vec::new()),
            drop_after: Mutex::new(None),
            disconnect_calls: Mutex::new(0),
        }
    }
}

impl Link {
    pub fn is_up(&self) -> bool {
        *self.connected.borrow()
    }

    fn set(&self, up: bool) {
        self.connected.send_replace(up);
    }

    fn record(&self, mode: WriteMode, data: &[u8]) -> Result<(), PrinterError> {
        if !self.is_up() {
            return Err(PrinterError::Platform("GATT server is disconnected".into()));
        }
        {
            let mut drop_after = self.drop_after.lock().unwrap();
            if let Some(left) = drop_after.as_mut() {
                if *left == 0 {
                    drop(drop_after);
                    self.set(false);
                    return Err(PrinterError::Platform("GATT operation failed".into()));
                }
                *left -= 1;
            }
        }
        self.writes.lock().unwrap().push((mode, data.to_vec()));
        Ok(())
    }
}

#[derive(Clone)]
pub struct MockCharacteristic {
    uuid: Uuid,
    properties: WriteProperties,
    link: Arc<Link>,
}

impl MockCharacteristic {
    pub fn new(uuid: Uuid, properties: WriteProperties) -> Self {
        Self {
            uuid,
            properties,
            link: Arc::new(Link::default()),
        }
    }
}

#[async_trait]
impl GattCharacteristic for MockCharacteristic {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    async fn properties(&self) -> Result<WriteProperties, PrinterError> {
        Ok(self.properties)
    }

    async fn write(&self, data: &[u8]) -> Result<(), PrinterError> {
        self.link.record(WriteMode::WithResponse, data)
    }

    async fn write_without_response(&self, data: &[u8]) -> Result<(), PrinterError> {
        self.link.record(WriteMode::WithoutResponse, data)
    }
}

#[derive(Clone)]
pub struct MockService {
    uuid: Uuid,
    characteristics: Vec<MockCharacteristic>,
}

impl MockService {
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            characteristics: Vec::new(),
        }
    }

    pub fn with_characteristic(mut self, uuid: Uuid, properties: WriteProperties) -> Self {
        self.characteristics.push(MockCharacteristic::new(uuid, properties));
        self
    }
}

#[async_trait]
impl GattService for MockService {
    type Characteristic = MockCharacteristic;

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    async fn characteristic(&self, uuid: Uuid) -> Result<Option<MockCharacteristic>, PrinterError> {
        Ok(self.characteristics.iter().find(|c| c.uuid == uuid).cloned())
    }

    async fn characteristics(&self) -> Result<Vec<MockCharacteristic>, PrinterError> {
        Ok(self.characteristics.clone())
    }
}

#[derive(Clone)]
pub struct MockDevice {
    id: String,
    name: Option<String>,
    has_gatt: bool,
    /// `disconnected()` only sees drops that happen after it subscribes
    changes_only: bool,
    services: Vec<MockService>,
    pub link: Arc<Link>,
}

impl MockDevice {
    pub fn new(id: &str, name: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.map(str::to_string),
            has_gatt: true,
            changes_only: false,
            services: Vec::new(),
            link: Arc::new(Link::default()),
        }
    }

    pub fn without_gatt(mut self) -> Self {
        self.has_gatt = false;
        self
    }

    /// Disconnect events report changes only, like a host stack that
    /// emits nothing for a link that was already down when subscribing
    pub fn reporting_changes_only(mut self) -> Self {
        self.changes_only = true;
        self
    }

    /// Adds a service; its characteristics share this device's link
    pub fn with_service(mut self, mut service: MockService) -> Self {
        for characteristic in &mut service.characteristics {
            characteristic.link = self.link.clone();
        }
        self.services.push(service);
        self
    }

    /// The link drops on the write after `writes` successful ones
    pub fn drop_after_writes(self, writes: usize) -> Self {
        *self.link.drop_after.lock().unwrap() = Some(writes);
        self
    }

    /// Simulates the peripheral going away
    pub fn drop_link(&self) {
        self.link.set(false);
    }

    pub fn writes(&self) -> Vec<(WriteMode, Vec<u8>)> {
        self.link.writes.lock().unwrap().clone()
    }

    pub fn written_bytes(&self) -> Vec<u8> {
        self.writes().into_iter().flat_map(|(_, data)| data).collect()
    }

    pub fn disconnect_calls(&self) -> usize {
        *self.link.disconnect_calls.lock().unwrap()
    }
}

impl std::fmt::Debug for MockDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDevice")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("connected", &self.link.is_up())
            .finish()
    }
}

#[async_trait]
impl PeripheralDevice for MockDevice {
    type Service = MockService;

    fn id(&self) -> String {
        self.id.clone()
    }

    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    async fn connect_gatt(&self) -> Result<(), PrinterError> {
        if !self.has_gatt {
            return Err(PrinterError::Platform("device has no GATT server".into()));
        }
        self.link.set(true);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.link.is_up()
    }

    async fn disconnect(&self) -> Result<(), PrinterError> {
        *self.link.disconnect_calls.lock().unwrap() += 1;
        self.link.set(false);
        Ok(())
    }

    async fn primary_service(&self, uuid: Uuid) -> Result<Option<MockService>, PrinterError> {
        Ok(self.services.iter().find(|s| s.uuid == uuid).cloned())
    }

    async fn primary_services(&self) -> Result<Vec<MockService>, PrinterError> {
        Ok(self.services.clone())
    }

    async fn disconnected(&self) -> Result<(), PrinterError> {
        let mut rx = self.link.connected.subscribe();
        // a change-only stream cannot tell that the link is already down
        let mut up = self.changes_only || *rx.borrow_and_update();
        while up {
            rx.changed()
                .await
                .map_err(|_| PrinterError::Platform("link closed".into()))?;
            up = *rx.borrow_and_update();
        }
        Ok(())
    }
}

/// Answers device requests from a script, recording every request
pub struct MockPlatform {
    available: bool,
    responses: Mutex<VecDeque<Result<MockDevice, PrinterError>>>,
    requests: Mutex<Vec<RequestOptions>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            available: true,
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn then_device(self, device: MockDevice) -> Self {
        self.responses.lock().unwrap().push_back(Ok(device));
        self
    }

    pub fn then_error(self, error: PrinterError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<RequestOptions> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlePlatform for MockPlatform {
    type Device = MockDevice;

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn request_device(&self, options: &RequestOptions) -> Result<MockDevice, PrinterError> {
        self.requests.lock().unwrap().push(options.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(PrinterError::Cancelled))
    }
}
