//! End-to-end tests for lumen-core against the mock transport.
//!
//! These walk the same path a user does: scan, bind a light, reopen the
//! saved bindings and drive the light. No hardware is needed.

use std::sync::Arc;

use lumen_core::mock::{MockPeripheral, MockTransport};
use lumen_core::{
    AdapterState, Controller, DeviceDirectory, FailureKind, ScanOptions, SetupFlow, SetupState,
    scan_into,
};
use lumen_store::{FileStorage, MemoryStorage, PersistentBindings};
use lumen_types::{EndpointRole, Rgb, ServiceEndpoint};

fn transport() -> Arc<MockTransport> {
    Arc::new(
        MockTransport::new()
            .with_peripheral(MockPeripheral::led_controller("AA:BB:CC:DD:EE:01", "Desk lamp"))
            .with_peripheral(MockPeripheral::led_controller("AA:BB:CC:DD:EE:02", "Shelf strip")),
    )
}

async fn bind<S: lumen_store::KeyValueStorage>(
    transport: &MockTransport,
    bindings: &mut PersistentBindings<S>,
    device_id: &str,
) {
    let mut directory = DeviceDirectory::new();
    scan_into(transport, &mut directory, &ScanOptions::new())
        .await
        .unwrap();
    let record = directory.get(device_id).cloned().unwrap();

    let mut flow = SetupFlow::new(transport);
    flow.select_device(record).await.unwrap();
    flow.assign(EndpointRole::TurnOff, &ServiceEndpoint::new("180F", "2A19"))
        .unwrap();
    flow.assign(EndpointRole::SetColor, &ServiceEndpoint::new("FFE0", "FFE1"))
        .unwrap();
    flow.commit(bindings).await.unwrap();
    assert_eq!(flow.state(), SetupState::Complete);
}

#[tokio::test]
async fn test_bind_then_control() {
    let transport = transport();
    let mut bindings = PersistentBindings::open(MemoryStorage::new()).unwrap();

    bind(&transport, &mut bindings, "AA:BB:CC:DD:EE:01").await;
    assert!(!transport.is_connected("AA:BB:CC:DD:EE:01").await);

    let binding = bindings.store().current_binding().cloned().unwrap();
    let controller = Controller::new(Arc::clone(&transport));
    controller.activate(&binding.device_id).await.unwrap();
    controller.send_color(&binding, Rgb::new(0, 128, 255)).await.unwrap();
    controller.send_off(&binding).await.unwrap();
    bindings.set_color(Rgb::new(0, 128, 255)).unwrap();

    let writes = transport.writes().await;
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].payload, vec![0, 128, 255]);
    assert_eq!(writes[1].payload, vec![1]);
    assert_eq!(
        bindings.store().current_binding().unwrap().color,
        "#0080ff"
    );
}

#[tokio::test]
async fn test_bindings_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let transport = transport();

    {
        let mut bindings = PersistentBindings::open(FileStorage::new(dir.path())).unwrap();
        bind(&transport, &mut bindings, "AA:BB:CC:DD:EE:01").await;
        bind(&transport, &mut bindings, "AA:BB:CC:DD:EE:02").await;
        assert!(bindings.set_current("AA:BB:CC:DD:EE:02").unwrap());
    }

    let bindings = PersistentBindings::open(FileStorage::new(dir.path())).unwrap();
    assert_eq!(bindings.store().len(), 2);
    assert_eq!(bindings.store().current_device_id(), "AA:BB:CC:DD:EE:02");
    let binding = bindings.store().current_binding().unwrap();
    assert_eq!(binding.display_name.as_deref(), Some("Shelf strip"));
}

#[tokio::test]
async fn test_saved_binding_connects_from_fresh_transport() {
    let dir = tempfile::tempdir().unwrap();
    {
        let transport = transport();
        let mut bindings = PersistentBindings::open(FileStorage::new(dir.path())).unwrap();
        bind(&transport, &mut bindings, "AA:BB:CC:DD:EE:01").await;
    }

    // A new process starts with an empty adapter cache.
    let transport = transport();
    let bindings = PersistentBindings::open(FileStorage::new(dir.path())).unwrap();
    let binding = bindings.store().current_binding().cloned().unwrap();

    let controller = Controller::new(Arc::clone(&transport));
    controller.activate(&binding.device_id).await.unwrap();
    controller.send_color(&binding, Rgb::new(10, 20, 30)).await.unwrap();

    assert_eq!(transport.lookup_scans(), 1);
    assert_eq!(transport.writes().await[0].payload, vec![10, 20, 30]);
}

#[tokio::test]
async fn test_saved_binding_out_of_range() {
    let mut bindings = PersistentBindings::open(MemoryStorage::new()).unwrap();
    bind(&transport(), &mut bindings, "AA:BB:CC:DD:EE:01").await;

    let transport = Arc::new(MockTransport::new().with_peripheral(
        MockPeripheral::led_controller("AA:BB:CC:DD:EE:01", "Desk lamp").silent(),
    ));
    let controller = Controller::new(Arc::clone(&transport));
    let err = controller
        .activate(bindings.store().current_device_id())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::ConnectionFailure);
    assert!(controller.active_device().await.is_none());
    assert_eq!(transport.lookup_scans(), 1);
}

#[tokio::test]
async fn test_switching_devices_keeps_one_session() {
    let transport = transport();
    let mut bindings = PersistentBindings::open(MemoryStorage::new()).unwrap();
    bind(&transport, &mut bindings, "AA:BB:CC:DD:EE:01").await;
    bind(&transport, &mut bindings, "AA:BB:CC:DD:EE:02").await;

    let controller = Controller::new(Arc::clone(&transport));
    for id in ["AA:BB:CC:DD:EE:01", "AA:BB:CC:DD:EE:02"] {
        controller.activate(id).await.unwrap();
        let binding = bindings.store().get_binding(id).unwrap();
        controller.send_color(binding, Rgb::GREEN).await.unwrap();
    }

    assert!(!transport.is_connected("AA:BB:CC:DD:EE:01").await);
    assert!(transport.is_connected("AA:BB:CC:DD:EE:02").await);
    assert_eq!(
        controller.active_device().await.as_deref(),
        Some("AA:BB:CC:DD:EE:02")
    );
}

#[tokio::test]
async fn test_write_to_inactive_device_is_not_connected() {
    let transport = transport();
    let mut bindings = PersistentBindings::open(MemoryStorage::new()).unwrap();
    bind(&transport, &mut bindings, "AA:BB:CC:DD:EE:01").await;
    bind(&transport, &mut bindings, "AA:BB:CC:DD:EE:02").await;

    let controller = Controller::new(Arc::clone(&transport));
    controller.activate("AA:BB:CC:DD:EE:01").await.unwrap();

    let other = bindings.store().get_binding("AA:BB:CC:DD:EE:02").unwrap();
    let err = controller.send_off(other).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::NotConnected);
    assert!(transport.writes().await.is_empty());
}

#[tokio::test]
async fn test_adapter_off_blocks_every_step() {
    let transport = transport();
    transport.set_adapter_state(AdapterState::PoweredOff).await;

    let mut directory = DeviceDirectory::new();
    let err = scan_into(transport.as_ref(), &mut directory, &ScanOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::TransportOff);

    let controller = Controller::new(Arc::clone(&transport));
    let err = controller.activate("AA:BB:CC:DD:EE:01").await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::TransportOff);
    assert!(controller.active_device().await.is_none());
}
