//! Constants used throughout the printer transport
//! UUIDs of common BLE thermal printer profiles, packet sizes and timeouts.

use uuid::Uuid;

/// Name reported for devices that do not advertise one
pub const UNKNOWN_PRINTER_NAME: &str = "Unknown Printer";

/// Common thermal printer service
pub const UUID_THERMAL_PRINTER_SERVICE: Uuid = Uuid::from_u128(0x000018f0_0000_1000_8000_00805f9b34fb);
/// Microchip serial port service (ISSC transparent UART)
pub const UUID_SERIAL_PORT_SERVICE: Uuid = Uuid::from_u128(0x49535343_fe7d_4ae5_8fa9_9fafd205e455);
/// Alternate thermal printer service
pub const UUID_ALT_PRINTER_SERVICE: Uuid = Uuid::from_u128(0xe7810a71_73ae_499d_8c15_faa9aef0c3f2);

/// Common thermal printer write characteristic
pub const UUID_THERMAL_PRINTER_WRITE_CHAR: Uuid = Uuid::from_u128(0x00002af1_0000_1000_8000_00805f9b34fb);
/// Serial port write characteristic
pub const UUID_SERIAL_PORT_WRITE_CHAR: Uuid = Uuid::from_u128(0x49535343_8841_43f4_a8d4_ecbe34729bb3);
/// Alternate write characteristic
pub const UUID_ALT_PRINTER_WRITE_CHAR: Uuid = Uuid::from_u128(0xbef8d6c9_9c21_4c9e_b632_bd58c1009f9f);

/// Printer services, in the order they are tried
pub const PRINTER_SERVICE_UUIDS: [Uuid; 3] = [
    UUID_THERMAL_PRINTER_SERVICE,
    UUID_SERIAL_PORT_SERVICE,
    UUID_ALT_PRINTER_SERVICE,
];

/// Write characteristics, in the order they are tried
pub const WRITE_CHARACTERISTIC_UUIDS: [Uuid; 3] = [
    UUID_THERMAL_PRINTER_WRITE_CHAR,
    UUID_SERIAL_PORT_WRITE_CHAR,
    UUID_ALT_PRINTER_WRITE_CHAR,
];

/// Bytes per GATT write; the BLE 4.0 default payload ceiling
pub const DEFAULT_CHUNK_SIZE: usize = 20;

/// Delay between chunk writes in milliseconds
pub const DEFAULT_CHUNK_DELAY_MS: u64 = 20;

/// Scan duration in seconds
pub const DEFAULT_SCAN_DURATION_SECS: u64 = 5;

/// How long to wait for the adapter to power up, in seconds
pub const BLUETOOTH_OPERATION_TIMEOUT_SECS: u64 = 10;
