//! End-to-end engine scenarios over a simulated bus.
//!
//! Each test builds an in-memory configuration store, wires the engine's
//! transport factory to mock transports answered by a slave simulator, and
//! observes behavior through the event stream, the cache, and the store.
//! Paused tokio time drives the stagger and poll cadences deterministically.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc::Receiver;
use tokio::time::timeout;

use acqsrv::core::Engine;
use acqsrv::modbus::simulator::SlaveSimulator;
use acqsrv::transport::{
    FnTransportFactory, MockHandle, MockTransport, Transport, TransportError,
};
use gridlink_model::{
    AccessMode, ConnectionNode, ConnectionStatus, DataType, Device, Event, Parity, RegisterKind,
    ScalarValue, Tag,
};
use gridlink_store::{MemoryStore, StoreAdapter, SETTING_ARCHIVE_INTERVAL};

const BUSY_PORT: &str = "/dev/ttyBUSY";

struct Rig {
    store: Arc<MemoryStore>,
    engine: Arc<Engine>,
    sim: SlaveSimulator,
    handles: Arc<Mutex<HashMap<String, MockHandle>>>,
}

impl Rig {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let sim = SlaveSimulator::new();
        let handles: Arc<Mutex<HashMap<String, MockHandle>>> = Arc::new(Mutex::new(HashMap::new()));

        let factory = {
            let sim = sim.clone();
            let handles = Arc::clone(&handles);
            move |node: &ConnectionNode| -> Result<Box<dyn Transport>, TransportError> {
                let transport = MockTransport::with_responder(sim.responder());
                let handle = transport.handle();
                if node.com_port == BUSY_PORT {
                    handle.fail_connect("Access denied: port is in use");
                }
                handles.lock().insert(node.com_port.clone(), handle);
                Ok(Box::new(transport))
            }
        };

        let engine = Arc::new(Engine::new(
            Arc::clone(&store) as Arc<dyn StoreAdapter>,
            Arc::new(FnTransportFactory(factory)),
        ));
        Self {
            store,
            engine,
            sim,
            handles,
        }
    }

    fn add_node(&self, com_port: &str) -> i64 {
        self.store.add_node(ConnectionNode {
            id: 0,
            name: format!("bus {com_port}"),
            com_port: com_port.to_string(),
            baud_rate: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            enabled: true,
            connection_status: ConnectionStatus::Disconnected,
            last_error: None,
        })
    }

    fn add_device(&self, node_id: i64, address: u8) -> i64 {
        self.store.add_device(Device {
            id: 0,
            node_id,
            name: format!("device {address}"),
            address,
            response_timeout_ms: 1000,
            poll_interval_ms: 1000,
            enabled: true,
            last_poll_time: None,
        })
    }

    fn add_tag(
        &self,
        device_id: i64,
        address: u16,
        kind: RegisterKind,
        device_type: DataType,
        server_type: DataType,
    ) -> i64 {
        self.store.add_tag(Tag {
            id: 0,
            device_id,
            name: format!("tag {address}"),
            address,
            register_kind: kind,
            device_data_type: device_type,
            server_data_type: server_type,
            access: AccessMode::ReadWrite,
            enabled: true,
        })
    }
}

async fn wait_event(rx: &mut Receiver<Event>, mut pred: impl FnMut(&Event) -> bool) -> Event {
    timeout(Duration::from_secs(60), async {
        loop {
            let event = rx.recv().await.expect("event stream closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("expected event did not arrive")
}

fn tag_values_for(device_id: i64) -> impl FnMut(&Event) -> bool {
    move |event| matches!(event, Event::TagValues { device_id: d, .. } if *d == device_id)
}

fn values_of(event: &Event) -> &HashMap<i64, gridlink_model::TagValue> {
    match event {
        Event::TagValues { data, .. } => data,
        other => panic!("expected tagValues, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn happy_poll_cycle_reads_typed_value() {
    let rig = Rig::new();
    let node_id = rig.add_node("/dev/ttyUSB0");
    let device_id = rig.add_device(node_id, 17);
    let tag_id = rig.add_tag(
        device_id,
        1,
        RegisterKind::HoldingRegister,
        DataType::I16,
        DataType::I32,
    );
    rig.sim.set_holding(17, 1, 0x002A);

    let (_, mut rx) = rig.engine.subscribe().await;
    rig.engine.start().await.unwrap();

    let event = wait_event(&mut rx, tag_values_for(device_id)).await;
    let values = values_of(&event);
    assert_eq!(values[&tag_id].value, Some(ScalarValue::Integer(42)));
    assert!(values[&tag_id].error.is_none());

    let cached = rig.engine.cache().get(device_id, tag_id).unwrap();
    assert_eq!(cached.value, Some(ScalarValue::Integer(42)));
    assert!(rig.store.device_last_poll(device_id).is_some());
    assert_eq!(
        rig.store.node_status(node_id).unwrap().0,
        ConnectionStatus::Connected
    );

    // request frames actually went over the (mock) wire
    let frames = rig.handles.lock()["/dev/ttyUSB0"].sent_count();
    assert!(frames >= 1, "no frames transmitted");

    rig.engine.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn float_assembly_from_two_registers() {
    let rig = Rig::new();
    let node_id = rig.add_node("/dev/ttyUSB0");
    let device_id = rig.add_device(node_id, 17);
    let tag_id = rig.add_tag(
        device_id,
        10,
        RegisterKind::HoldingRegister,
        DataType::F32,
        DataType::F32,
    );
    rig.sim.set_holding(17, 10, 0x4049);
    rig.sim.set_holding(17, 11, 0x0FDB);

    let (_, mut rx) = rig.engine.subscribe().await;
    rig.engine.start().await.unwrap();

    let event = wait_event(&mut rx, tag_values_for(device_id)).await;
    match values_of(&event)[&tag_id].value {
        Some(ScalarValue::Float(v)) => assert!((v - 3.141_592_7).abs() < 1e-6),
        other => panic!("expected float sample, got {other:?}"),
    }

    rig.engine.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn all_timeouts_halt_device_polling() {
    let rig = Rig::new();
    let node_id = rig.add_node("/dev/ttyUSB0");
    let device_id = rig.add_device(node_id, 17);
    let t1 = rig.add_tag(
        device_id,
        1,
        RegisterKind::HoldingRegister,
        DataType::U16,
        DataType::U16,
    );
    let t2 = rig.add_tag(
        device_id,
        2,
        RegisterKind::HoldingRegister,
        DataType::U16,
        DataType::U16,
    );
    rig.sim.set_holding(17, 1, 5);
    rig.sim.set_holding(17, 2, 6);
    rig.sim.set_offline(17, true);

    let (_, mut rx) = rig.engine.subscribe().await;
    rig.engine.start().await.unwrap();

    let event = wait_event(&mut rx, tag_values_for(device_id)).await;
    let values = values_of(&event);
    for id in [t1, t2] {
        assert!(values[&id].value.is_none());
        assert!(values[&id].error.as_deref().unwrap().contains("timeout"));
    }

    // the halt is announced with a state snapshot
    wait_event(&mut rx, |e| matches!(e, Event::State { .. })).await;

    // no further poll happens for the halted device
    tokio::time::sleep(Duration::from_secs(5)).await;
    while let Ok(event) = rx.try_recv() {
        assert!(
            !matches!(event, Event::TagValues { device_id: d, .. } if d == device_id),
            "device kept polling after halting"
        );
    }

    // node status is unchanged: the bus itself is fine
    assert_eq!(
        rig.store.node_status(node_id).unwrap().0,
        ConnectionStatus::Connected
    );

    rig.engine.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn write_takes_precedence_and_reads_back() {
    let rig = Rig::new();
    let node_id = rig.add_node("/dev/ttyUSB0");
    let device_id = rig.add_device(node_id, 17);
    let tag_id = rig.add_tag(
        device_id,
        1,
        RegisterKind::HoldingRegister,
        DataType::I16,
        DataType::I32,
    );
    rig.sim.set_holding(17, 1, 0x002A);

    let (_, mut rx) = rig.engine.subscribe().await;
    rig.engine.start().await.unwrap();

    // let polling establish itself first
    wait_event(&mut rx, tag_values_for(device_id)).await;

    let confirmed = rig.engine.write_tag(tag_id, &json!(100)).await.unwrap();
    assert_eq!(confirmed, ScalarValue::Integer(100));
    assert_eq!(rig.sim.holding(17, 1), Some(100));

    // the write path publishes exactly the written tag
    let event = wait_event(&mut rx, |e| {
        matches!(e, Event::TagValues { device_id: d, data, .. }
            if *d == device_id && data.get(&tag_id).and_then(|v| v.value)
                == Some(ScalarValue::Integer(100)))
    })
    .await;
    assert_eq!(values_of(&event).len(), 1);

    let cached = rig.engine.cache().get(device_id, tag_id).unwrap();
    assert_eq!(cached.value, Some(ScalarValue::Integer(100)));

    // polling resumes after the guard window
    wait_event(&mut rx, tag_values_for(device_id)).await;

    rig.engine.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn fc16_rejection_falls_back_to_single_register_write() {
    let rig = Rig::new();
    let node_id = rig.add_node("/dev/ttyUSB0");
    let device_id = rig.add_device(node_id, 17);
    let tag_id = rig.add_tag(
        device_id,
        1,
        RegisterKind::HoldingRegister,
        DataType::U16,
        DataType::U16,
    );
    rig.sim.set_holding(17, 1, 0);
    rig.sim.reject_write_multiple(17);

    rig.engine.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let confirmed = rig.engine.write_tag(tag_id, &json!(7)).await.unwrap();
    assert_eq!(confirmed, ScalarValue::Integer(7));
    assert_eq!(rig.sim.holding(17, 1), Some(7));

    rig.engine.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn coil_write_reads_back_bit() {
    let rig = Rig::new();
    let node_id = rig.add_node("/dev/ttyUSB0");
    let device_id = rig.add_device(node_id, 9);
    let tag_id = rig.add_tag(
        device_id,
        3,
        RegisterKind::Coil,
        DataType::U16,
        DataType::U16,
    );
    rig.sim.set_coil(9, 3, false);

    rig.engine.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let confirmed = rig.engine.write_tag(tag_id, &json!(1)).await.unwrap();
    assert_eq!(confirmed, ScalarValue::Integer(1));
    assert_eq!(rig.sim.coil(9, 3), Some(true));

    rig.engine.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn read_only_tag_rejects_writes() {
    let rig = Rig::new();
    let node_id = rig.add_node("/dev/ttyUSB0");
    let device_id = rig.add_device(node_id, 17);
    let tag_id = rig.store.add_tag(Tag {
        id: 0,
        device_id,
        name: "ro".to_string(),
        address: 1,
        register_kind: RegisterKind::InputRegister,
        device_data_type: DataType::U16,
        server_data_type: DataType::U16,
        access: AccessMode::ReadOnly,
        enabled: true,
    });
    rig.sim.set_input(17, 1, 4);

    rig.engine.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let err = rig.engine.write_tag(tag_id, &json!(1)).await.unwrap_err();
    assert!(matches!(err, acqsrv::AcqError::NotWritable(_)));

    rig.engine.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn busy_port_is_contained_to_its_node() {
    let rig = Rig::new();
    let good_node = rig.add_node("/dev/ttyUSB0");
    let good_device = rig.add_device(good_node, 17);
    let good_tag = rig.add_tag(
        good_device,
        1,
        RegisterKind::HoldingRegister,
        DataType::U16,
        DataType::U16,
    );
    rig.sim.set_holding(17, 1, 11);

    let busy_node = rig.add_node(BUSY_PORT);
    let busy_device = rig.add_device(busy_node, 5);
    rig.add_tag(
        busy_device,
        1,
        RegisterKind::HoldingRegister,
        DataType::U16,
        DataType::U16,
    );

    let (_, mut rx) = rig.engine.subscribe().await;
    rig.engine.start().await.unwrap();

    // the failing node reports an operator-visible error message
    wait_event(&mut rx, |e| {
        matches!(e, Event::Message { data, .. }
            if data.message_type == gridlink_model::MessageLevel::Error
                && data.text.description.contains("Access denied"))
    })
    .await;

    // the healthy node keeps polling
    let event = wait_event(&mut rx, tag_values_for(good_device)).await;
    assert_eq!(
        values_of(&event)[&good_tag].value,
        Some(ScalarValue::Integer(11))
    );

    let (status, last_error) = rig.store.node_status(busy_node).unwrap();
    assert_eq!(status, ConnectionStatus::ErrorOpen);
    assert!(last_error.unwrap().contains("Access denied"));

    rig.engine.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn archiver_appends_on_cadence() {
    let rig = Rig::new();
    let node_id = rig.add_node("/dev/ttyUSB0");
    let device_id = rig.add_device(node_id, 17);
    let tag_id = rig.add_tag(
        device_id,
        1,
        RegisterKind::HoldingRegister,
        DataType::I16,
        DataType::I32,
    );
    rig.sim.set_holding(17, 1, 0x002A);
    rig.store
        .set_setting(SETTING_ARCHIVE_INTERVAL, "1000")
        .await
        .unwrap();

    rig.engine.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(3500)).await;
    rig.engine.stop().await.unwrap();

    let rows = rig.store.history_for(tag_id);
    assert!(rows.len() >= 2, "expected >=2 history rows, got {}", rows.len());
    assert!(rows.iter().all(|r| r.value == "42"));
}

#[tokio::test(start_paused = true)]
async fn start_and_stop_are_idempotent() {
    let rig = Rig::new();
    let node_id = rig.add_node("/dev/ttyUSB0");
    let device_id = rig.add_device(node_id, 17);
    rig.add_tag(
        device_id,
        1,
        RegisterKind::HoldingRegister,
        DataType::U16,
        DataType::U16,
    );
    rig.sim.set_holding(17, 1, 3);

    rig.engine.start().await.unwrap();
    rig.engine.start().await.unwrap();
    assert!(rig.engine.is_running());

    tokio::time::sleep(Duration::from_secs(1)).await;

    rig.engine.stop().await.unwrap();
    rig.engine.stop().await.unwrap();
    assert!(!rig.engine.is_running());
    assert_eq!(
        rig.store.node_status(node_id).unwrap().0,
        ConnectionStatus::Disconnected
    );

    // no polls continue after stop
    let (_, mut rx) = rig.engine.subscribe().await;
    tokio::time::sleep(Duration::from_secs(3)).await;
    while let Ok(event) = rx.try_recv() {
        assert!(!matches!(event, Event::TagValues { .. }));
    }
}

#[tokio::test(start_paused = true)]
async fn reconnect_restarts_a_halted_device() {
    let rig = Rig::new();
    let node_id = rig.add_node("/dev/ttyUSB0");
    let device_id = rig.add_device(node_id, 17);
    let tag_id = rig.add_tag(
        device_id,
        1,
        RegisterKind::HoldingRegister,
        DataType::U16,
        DataType::U16,
    );
    rig.sim.set_holding(17, 1, 9);
    rig.sim.set_offline(17, true);

    let (_, mut rx) = rig.engine.subscribe().await;
    rig.engine.start().await.unwrap();

    // first cycle times out and halts the device
    wait_event(&mut rx, tag_values_for(device_id)).await;
    wait_event(&mut rx, |e| matches!(e, Event::State { .. })).await;

    rig.sim.set_offline(17, false);
    rig.engine.reconnect_device(device_id).await.unwrap();

    let event = wait_event(&mut rx, |e| {
        matches!(e, Event::TagValues { device_id: d, data, .. }
            if *d == device_id && data.get(&tag_id).and_then(|v| v.value)
                == Some(ScalarValue::Integer(9)))
    })
    .await;
    assert!(values_of(&event)[&tag_id].error.is_none());

    rig.engine.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn reload_node_picks_up_configuration_changes() {
    let rig = Rig::new();
    let node_id = rig.add_node("/dev/ttyUSB0");
    let device_id = rig.add_device(node_id, 17);
    let tag_id = rig.add_tag(
        device_id,
        1,
        RegisterKind::HoldingRegister,
        DataType::U16,
        DataType::U16,
    );
    rig.sim.set_holding(17, 1, 9);

    let (_, mut rx) = rig.engine.subscribe().await;
    rig.engine.start().await.unwrap();
    wait_event(&mut rx, tag_values_for(device_id)).await;

    // disable the device externally, then reload the node
    rig.store.set_device_enabled(device_id, false);
    rig.engine.reload_node(node_id).await.unwrap();

    // drain whatever was in flight, then confirm silence
    tokio::time::sleep(Duration::from_secs(3)).await;
    while rx.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_secs(3)).await;
    while let Ok(event) = rx.try_recv() {
        assert!(
            !matches!(event, Event::TagValues { device_id: d, .. } if d == device_id),
            "disabled device still polling after reload"
        );
    }
    assert!(rig.engine.cache().get(device_id, tag_id).is_none());

    rig.engine.stop().await.unwrap();
}
