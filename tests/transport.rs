mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;
use uuid::Uuid;

use common::{
    MockDevice, MockPlatform, MockService, READ_ONLY, WRITE_NO_RESPONSE, WRITE_ONLY, WriteMode,
    fast_config,
};
use receipt_printer_lib::PrinterError;
use receipt_printer_lib::config::printer_config::PrinterConfig;
use receipt_printer_lib::core::bluetooth::{
    PRINTER_SERVICE_UUIDS, PrintReport, PrinterTransport, RequestOptions,
    UUID_ALT_PRINTER_SERVICE, UUID_SERIAL_PORT_SERVICE, UUID_SERIAL_PORT_WRITE_CHAR,
    UUID_THERMAL_PRINTER_SERVICE, UUID_THERMAL_PRINTER_WRITE_CHAR, WriteProperties,
};

const VENDOR_SERVICE: Uuid = Uuid::from_u128(0x0000ff00_0000_1000_8000_00805f9b34fb);
const VENDOR_NOTIFY: Uuid = Uuid::from_u128(0x0000ff01_0000_1000_8000_00805f9b34fb);
const VENDOR_WRITE: Uuid = Uuid::from_u128(0x0000ff02_0000_1000_8000_00805f9b34fb);

fn standard_printer(props: WriteProperties) -> MockDevice {
    MockDevice::new("AA:BB:CC:DD:EE:FF", Some("MTP-II")).with_service(
        MockService::new(UUID_THERMAL_PRINTER_SERVICE)
            .with_characteristic(UUID_THERMAL_PRINTER_WRITE_CHAR, props),
    )
}

fn transport(platform: MockPlatform) -> PrinterTransport<MockPlatform> {
    PrinterTransport::new(platform, &fast_config())
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Lets the disconnect watcher observe the dropped link
async fn wait_until_released(transport: &PrinterTransport<MockPlatform>) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while transport.current_printer().await.is_some() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("connection was not released");
}

#[tokio::test]
async fn print_splits_into_ordered_chunks() {
    for len in [1usize, 19, 20, 21, 40, 41, 100, 333] {
        let device = standard_printer(WRITE_NO_RESPONSE);
        let transport = transport(MockPlatform::new());
        transport.connect_to_printer(device.clone()).await.unwrap();

        let data = payload(len);
        let report = transport.print(&data).await.unwrap();

        let expected_chunks = len.div_ceil(20);
        assert_eq!(report, PrintReport { bytes: len, chunks: expected_chunks });
        let writes = device.writes();
        assert_eq!(writes.len(), expected_chunks, "len {len}");
        assert!(writes.iter().all(|(_, chunk)| !chunk.is_empty() && chunk.len() <= 20));
        assert_eq!(device.written_bytes(), data);
    }
}

#[tokio::test]
async fn empty_print_sends_nothing() {
    let device = standard_printer(WRITE_ONLY);
    let transport = transport(MockPlatform::new());
    transport.connect_to_printer(device.clone()).await.unwrap();

    let report = transport.print(&[]).await.unwrap();
    assert_eq!(report, PrintReport { bytes: 0, chunks: 0 });
    assert!(device.writes().is_empty());
}

#[tokio::test]
async fn chunk_size_follows_config() {
    let device = standard_printer(WRITE_ONLY);
    let config = PrinterConfig {
        chunk_size: 50,
        chunk_delay_ms: 0,
        ..PrinterConfig::default()
    };
    let transport = PrinterTransport::new(MockPlatform::new(), &config);
    transport.connect_to_printer(device.clone()).await.unwrap();

    transport.print(&payload(120)).await.unwrap();
    let sizes: Vec<usize> = device.writes().iter().map(|(_, c)| c.len()).collect();
    assert_eq!(sizes, vec![50, 50, 20]);
}

#[tokio::test]
async fn chunks_are_paced_by_the_configured_delay() {
    let device = standard_printer(WRITE_ONLY);
    let config = PrinterConfig {
        chunk_delay_ms: 10,
        ..PrinterConfig::default()
    };
    let transport = PrinterTransport::new(MockPlatform::new(), &config);
    transport.connect_to_printer(device.clone()).await.unwrap();

    let started = tokio::time::Instant::now();
    transport.print(&payload(60)).await.unwrap();
    // three chunks, two gaps
    assert!(started.elapsed() >= Duration::from_millis(20));
}

#[tokio::test]
async fn write_mode_follows_characteristic_properties() {
    let fast = standard_printer(WRITE_NO_RESPONSE);
    let transport_a = transport(MockPlatform::new());
    let connection = transport_a.connect_to_printer(fast.clone()).await.unwrap();
    assert!(connection.writes_without_response());
    transport_a.print(&payload(30)).await.unwrap();
    assert!(fast.writes().iter().all(|(mode, _)| *mode == WriteMode::WithoutResponse));

    let acked = standard_printer(WRITE_ONLY);
    let transport_b = transport(MockPlatform::new());
    let connection = transport_b.connect_to_printer(acked.clone()).await.unwrap();
    assert!(!connection.writes_without_response());
    transport_b.print(&payload(30)).await.unwrap();
    assert!(acked.writes().iter().all(|(mode, _)| *mode == WriteMode::WithResponse));
}

#[tokio::test]
async fn known_services_are_tried_in_priority_order() {
    let device = MockDevice::new("dev", Some("Printer"))
        .with_service(
            MockService::new(UUID_ALT_PRINTER_SERVICE)
                .with_characteristic(UUID_SERIAL_PORT_WRITE_CHAR, WRITE_ONLY),
        )
        .with_service(
            MockService::new(UUID_SERIAL_PORT_SERVICE)
                .with_characteristic(UUID_SERIAL_PORT_WRITE_CHAR, WRITE_ONLY),
        );
    let transport = transport(MockPlatform::new());

    let connection = transport.connect_to_printer(device).await.unwrap();
    assert_eq!(connection.service_uuid(), UUID_SERIAL_PORT_SERVICE);
    assert_eq!(connection.characteristic_uuid(), UUID_SERIAL_PORT_WRITE_CHAR);
}

#[tokio::test]
async fn unknown_service_falls_back_to_first_writable_characteristic() {
    let device = MockDevice::new("dev", Some("Generic")).with_service(
        MockService::new(VENDOR_SERVICE)
            .with_characteristic(VENDOR_NOTIFY, READ_ONLY)
            .with_characteristic(VENDOR_WRITE, WRITE_NO_RESPONSE),
    );
    let transport = transport(MockPlatform::new());

    let connection = transport.connect_to_printer(device.clone()).await.unwrap();
    assert_eq!(connection.service_uuid(), VENDOR_SERVICE);
    assert_eq!(connection.characteristic_uuid(), VENDOR_WRITE);

    transport.print(b"hello").await.unwrap();
    assert_eq!(device.written_bytes(), b"hello");
}

#[tokio::test]
async fn device_without_services_reports_no_compatible_service() {
    let device = MockDevice::new("dev", None);
    let transport = transport(MockPlatform::new());

    let err = transport.connect_to_printer(device).await.unwrap_err();
    assert!(matches!(err, PrinterError::NoCompatibleService), "{err:?}");
    assert_eq!(transport.current_printer().await, None);
}

#[tokio::test]
async fn read_only_service_reports_no_writable_characteristic() {
    let device = MockDevice::new("dev", None).with_service(
        MockService::new(UUID_THERMAL_PRINTER_SERVICE).with_characteristic(VENDOR_NOTIFY, READ_ONLY),
    );
    let transport = transport(MockPlatform::new());

    let err = transport.connect_to_printer(device).await.unwrap_err();
    assert!(matches!(err, PrinterError::NoWritableCharacteristic), "{err:?}");
}

#[tokio::test]
async fn gatt_failure_reports_gatt_unavailable() {
    let device = standard_printer(WRITE_ONLY).without_gatt();
    let transport = transport(MockPlatform::new());

    let err = transport.connect_to_printer(device).await.unwrap_err();
    assert!(matches!(err, PrinterError::GattUnavailable(_)), "{err:?}");
    assert!(!transport.is_printer_connected().await);
}

#[tokio::test]
async fn print_without_connection_is_not_connected() {
    let transport = transport(MockPlatform::new());
    let err = transport.print(b"data").await.unwrap_err();
    assert!(matches!(err, PrinterError::NotConnected), "{err:?}");
}

#[tokio::test]
async fn unsolicited_disconnect_clears_the_connection() {
    let device = standard_printer(WRITE_ONLY);
    let transport = transport(MockPlatform::new());
    transport.connect_to_printer(device.clone()).await.unwrap();
    assert!(transport.is_printer_connected().await);

    device.drop_link();
    // released by the watcher alone
    wait_until_released(&transport).await;
    assert!(!transport.is_printer_connected().await);

    let err = transport.print(b"data").await.unwrap_err();
    assert!(matches!(err, PrinterError::NotConnected), "{err:?}");
    assert!(device.writes().is_empty());
}

#[tokio::test]
async fn print_right_after_link_drop_fails_as_not_connected() {
    let device = standard_printer(WRITE_ONLY);
    let transport = transport(MockPlatform::new());
    transport.connect_to_printer(device.clone()).await.unwrap();

    device.drop_link();
    // either the watcher already cleared the slot or the link check catches it
    let err = transport.print(b"data").await.unwrap_err();
    assert!(err.is_not_connected(), "{err:?}");
    assert!(device.writes().is_empty());
}

/// Runs the spawned watcher up to the point where it waits for events
async fn let_watcher_subscribe() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn drop_before_watcher_subscribes_is_released_by_status_check() {
    let device = standard_printer(WRITE_ONLY).reporting_changes_only();
    let transport = transport(MockPlatform::new());
    transport.connect_to_printer(device.clone()).await.unwrap();

    // the watcher has not run yet, so it never sees this change
    device.drop_link();
    let_watcher_subscribe().await;

    assert!(!transport.is_printer_connected().await);
    assert_eq!(transport.current_printer().await, None);
    let err = transport.print(b"data").await.unwrap_err();
    assert!(matches!(err, PrinterError::NotConnected), "{err:?}");
}

#[tokio::test]
async fn drop_before_watcher_subscribes_is_released_by_print() {
    let device = standard_printer(WRITE_ONLY).reporting_changes_only();
    let transport = transport(MockPlatform::new());
    transport.connect_to_printer(device.clone()).await.unwrap();

    device.drop_link();
    let_watcher_subscribe().await;

    let err = transport.print(b"data").await.unwrap_err();
    assert!(matches!(err, PrinterError::Disconnected), "{err:?}");
    assert_eq!(transport.current_printer().await, None);

    let err = transport.print(b"data").await.unwrap_err();
    assert!(matches!(err, PrinterError::NotConnected), "{err:?}");
    assert!(device.writes().is_empty());
}

#[tokio::test]
async fn failed_write_on_dropped_link_releases_connection() {
    let device = standard_printer(WRITE_ONLY)
        .reporting_changes_only()
        .drop_after_writes(1);
    let transport = transport(MockPlatform::new());
    transport.connect_to_printer(device.clone()).await.unwrap();

    let err = transport.print(&payload(50)).await.unwrap_err();
    assert!(err.is_partial_print(), "{err:?}");
    assert_eq!(transport.current_printer().await, None);
}

#[tokio::test]
async fn mid_stream_disconnect_reports_partial_print() {
    let device = standard_printer(WRITE_ONLY).drop_after_writes(2);
    let transport = transport(MockPlatform::new());
    transport.connect_to_printer(device.clone()).await.unwrap();

    let err = transport.print(&payload(100)).await.unwrap_err();
    assert!(err.is_partial_print());
    match err {
        PrinterError::PrintInterrupted { sent, total, source } => {
            assert_eq!(sent, 40);
            assert_eq!(total, 100);
            assert!(matches!(*source, PrinterError::Disconnected), "{source:?}");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(device.written_bytes(), payload(40));

    wait_until_released(&transport).await;
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let device = standard_printer(WRITE_ONLY);
    let transport = transport(MockPlatform::new());

    transport.disconnect_printer().await.unwrap();

    transport.connect_to_printer(device.clone()).await.unwrap();
    transport.disconnect_printer().await.unwrap();
    transport.disconnect_printer().await.unwrap();

    assert_eq!(device.disconnect_calls(), 1);
    assert!(!device.link.is_up());
    assert!(!transport.is_printer_connected().await);
    assert_eq!(transport.current_printer().await, None);

    let err = transport.print(b"x").await.unwrap_err();
    assert!(matches!(err, PrinterError::NotConnected), "{err:?}");
}

#[tokio::test]
async fn reconnect_replaces_connection_without_closing_previous_link() {
    let first = MockDevice::new("first", Some("Old")).with_service(
        MockService::new(UUID_THERMAL_PRINTER_SERVICE)
            .with_characteristic(UUID_THERMAL_PRINTER_WRITE_CHAR, WRITE_ONLY),
    );
    let second = MockDevice::new("second", Some("New")).with_service(
        MockService::new(UUID_THERMAL_PRINTER_SERVICE)
            .with_characteristic(UUID_THERMAL_PRINTER_WRITE_CHAR, WRITE_ONLY),
    );
    let transport = transport(MockPlatform::new());

    transport.connect_to_printer(first.clone()).await.unwrap();
    transport.connect_to_printer(second.clone()).await.unwrap();

    assert_eq!(first.disconnect_calls(), 0);
    assert!(first.link.is_up());
    assert_eq!(transport.current_printer().await.map(|p| p.id), Some("second".to_string()));

    // the old link dropping must not clear the new connection
    first.drop_link();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(transport.is_printer_connected().await);

    transport.print(b"receipt").await.unwrap();
    assert_eq!(second.written_bytes(), b"receipt");
    assert!(first.writes().is_empty());
}

#[tokio::test]
async fn scan_offers_printer_services_first() {
    let platform = MockPlatform::new().then_device(standard_printer(WRITE_ONLY));
    let transport = transport(platform);

    let device = transport.scan_for_printers().await.unwrap();
    assert!(!device.link.is_up());
    assert_eq!(
        transport.platform().requests(),
        vec![RequestOptions::Filtered(PRINTER_SERVICE_UUIDS.to_vec())]
    );
}

#[tokio::test]
async fn scan_falls_back_to_all_devices() {
    let platform = MockPlatform::new()
        .then_error(PrinterError::NoMatchingDevices)
        .then_device(MockDevice::new("generic", None));
    let transport = transport(platform);

    let device = transport.scan_for_printers().await.unwrap();
    assert_eq!(
        receipt_printer_lib::core::PrinterDevice::of(&device).name,
        "Unknown Printer"
    );
    assert_eq!(
        transport.platform().requests(),
        vec![
            RequestOptions::Filtered(PRINTER_SERVICE_UUIDS.to_vec()),
            RequestOptions::AcceptAll,
        ]
    );
}

#[tokio::test]
async fn cancelled_scan_is_distinguishable() {
    let transport = transport(MockPlatform::new().then_error(PrinterError::Cancelled));
    let err = transport.scan_for_printers().await.unwrap_err();
    assert!(err.is_cancellation());
    assert_eq!(transport.platform().requests().len(), 1);
}

#[tokio::test]
async fn scan_without_bluetooth_is_unavailable() {
    let transport = transport(MockPlatform::unavailable());
    assert!(!transport.is_bluetooth_available().await);

    let err = transport.scan_for_printers().await.unwrap_err();
    assert!(matches!(err, PrinterError::BluetoothUnavailable), "{err:?}");
    assert!(transport.platform().requests().is_empty());
}

#[tokio::test]
async fn find_printer_asks_for_the_remembered_id() {
    let platform = MockPlatform::new().then_device(standard_printer(WRITE_ONLY));
    let transport = transport(platform);

    transport.find_printer("AA:BB:CC:DD:EE:FF").await.unwrap();
    assert_eq!(
        transport.platform().requests(),
        vec![RequestOptions::Remembered("AA:BB:CC:DD:EE:FF".to_string())]
    );
}
