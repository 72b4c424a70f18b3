//! Per-node bus session.
//!
//! One long-lived task per connection node owns the serial transport and
//! serializes every bus operation. Commands (writes, device reconnects,
//! shutdown) arrive on one channel, poll ticks on another; a biased select
//! prefers commands, which is what gives writes precedence over polling.
//!
//! Per device, a three-flag state machine (`poll_pending`, `write_locked`,
//! `halted`) suppresses tick production: a tick is dropped, never queued,
//! while a poll is pending, a write is in flight or inside its guard
//! window, or the device has been halted.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use gridlink_model::{
    state_event, ConnectionNode, ConnectionStatus, DataType, Device, Event, MessageLevel,
    NodeWithChildren, RegisterKind, Sample, ScalarValue, Tag,
};
use gridlink_rtdb::ValueCache;
use gridlink_store::StoreAdapter;

use crate::core::broadcaster::Broadcaster;
use crate::error::{AcqError, Result};
use crate::modbus::{codec, ModbusMaster};
use crate::transport::TransportFactory;

/// Settle time after the port opens, before the first transmission.
const PORT_SETTLE: Duration = Duration::from_millis(500);
/// Lead time before the first device's first poll.
const FIRST_DEVICE_LEAD: Duration = Duration::from_millis(200);
/// Extra stagger before each subsequent device starts polling.
const DEVICE_STAGGER: Duration = Duration::from_millis(300);
/// Gap between consecutive tag reads within one poll cycle.
const INTER_TAG_DELAY: Duration = Duration::from_millis(50);
/// Wait between a write and its confirming read-back.
const WRITE_SETTLE: Duration = Duration::from_millis(100);
/// Guard window after a write completes before polling resumes.
const WRITE_GUARD: Duration = Duration::from_millis(200);
/// Stabilization delay before a reconnected device polls again.
const RECONNECT_DELAY: Duration = Duration::from_millis(300);
/// Gap between the two single-register writes of a float value.
const FLOAT_WRITE_GAP: Duration = Duration::from_millis(50);
/// Write timeout floor; the override is max(2 x response timeout, this).
const WRITE_TIMEOUT_FLOOR_MS: u64 = 3000;
/// Session default when no enabled device provides a response timeout.
const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Live connection status per node, kept alongside the persisted copy so
/// snapshots stay correct when status persistence fails.
#[derive(Debug, Default)]
pub struct StatusBoard {
    nodes: DashMap<i64, (ConnectionStatus, Option<String>)>,
}

impl StatusBoard {
    pub fn set(&self, node_id: i64, status: ConnectionStatus, last_error: Option<String>) {
        self.nodes.insert(node_id, (status, last_error));
    }

    pub fn get(&self, node_id: i64) -> Option<(ConnectionStatus, Option<String>)> {
        self.nodes.get(&node_id).map(|e| e.value().clone())
    }

    /// Replace persisted status fields with live ones where known.
    pub fn overlay(&self, nodes: &mut [NodeWithChildren]) {
        for entry in nodes.iter_mut() {
            if let Some((status, last_error)) = self.get(entry.node.id) {
                entry.node.connection_status = status;
                entry.node.last_error = last_error;
            }
        }
    }
}

/// Dependencies a session shares with the engine.
#[derive(Clone)]
pub struct SessionContext {
    pub store: Arc<dyn StoreAdapter>,
    pub cache: Arc<ValueCache>,
    pub broadcaster: Arc<Broadcaster>,
    pub status: Arc<StatusBoard>,
    pub transports: Arc<dyn TransportFactory>,
    pub running: Arc<AtomicBool>,
}

impl SessionContext {
    /// Broadcast a full state snapshot built from the store plus the live
    /// status board.
    pub async fn publish_state(&self) {
        match self.store.list_nodes_with_children().await {
            Ok(mut nodes) => {
                self.status.overlay(&mut nodes);
                self.broadcaster
                    .publish(state_event(self.running.load(Ordering::Relaxed), &nodes));
            },
            Err(e) => warn!("state snapshot skipped, store unavailable: {e}"),
        }
    }
}

pub(crate) enum SessionCommand {
    WriteTag {
        tag_id: i64,
        value: f64,
        reply: oneshot::Sender<Result<ScalarValue>>,
    },
    ReconnectDevice {
        device_id: i64,
        reply: oneshot::Sender<Result<()>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle the engine keeps per running session.
pub struct SessionHandle {
    node_id: i64,
    cmd_tx: mpsc::Sender<SessionCommand>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn node_id(&self) -> i64 {
        self.node_id
    }

    /// Cheap command-channel client, so callers need not keep the handle
    /// (and the engine's session map) locked across bus I/O.
    pub fn client(&self) -> SessionClient {
        SessionClient {
            cmd_tx: self.cmd_tx.clone(),
        }
    }

    /// Stop the session: cancel tickers, let any in-flight operation
    /// finish, close the transport.
    pub async fn shutdown(self) {
        let (reply, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(SessionCommand::Shutdown {
                reply,
            })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
        let _ = self.task.await;
    }
}

/// Clonable sender for a session's command channel.
#[derive(Clone)]
pub struct SessionClient {
    cmd_tx: mpsc::Sender<SessionCommand>,
}

impl SessionClient {
    pub async fn write_tag(&self, tag_id: i64, value: f64) -> Result<ScalarValue> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::WriteTag {
                tag_id,
                value,
                reply,
            })
            .await
            .map_err(|_| AcqError::NotConnected("bus session is not running".to_string()))?;
        rx.await
            .map_err(|_| AcqError::NotConnected("bus session terminated".to_string()))?
    }

    pub async fn reconnect_device(&self, device_id: i64) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::ReconnectDevice {
                device_id,
                reply,
            })
            .await
            .map_err(|_| AcqError::NotConnected("bus session is not running".to_string()))?;
        rx.await
            .map_err(|_| AcqError::NotConnected("bus session terminated".to_string()))?
    }
}

/// Start a session for one node. The returned handle is live immediately;
/// port opening and scheduling happen inside the task.
pub(crate) fn spawn(tree: NodeWithChildren, ctx: SessionContext) -> SessionHandle {
    let node_id = tree.node.id;
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (tick_tx, tick_rx) = mpsc::channel(32);

    let task = tokio::spawn(async move {
        let session = BusSession {
            node: tree.node.clone(),
            ctx,
            master: None,
            devices: HashMap::new(),
            tick_tx,
        };
        session.run(tree, cmd_rx, tick_rx).await;
    });

    SessionHandle {
        node_id,
        cmd_tx,
        task,
    }
}

#[derive(Debug, Default)]
struct DeviceFlags {
    poll_pending: AtomicBool,
    write_locked: AtomicBool,
    halted: AtomicBool,
}

struct DeviceRuntime {
    device: Device,
    flags: Arc<DeviceFlags>,
    ticker: Option<JoinHandle<()>>,
}

struct BusSession {
    node: ConnectionNode,
    ctx: SessionContext,
    master: Option<ModbusMaster>,
    devices: HashMap<i64, DeviceRuntime>,
    tick_tx: mpsc::Sender<i64>,
}

impl BusSession {
    async fn run(
        mut self,
        tree: NodeWithChildren,
        mut cmd_rx: mpsc::Receiver<SessionCommand>,
        mut tick_rx: mpsc::Receiver<i64>,
    ) {
        if self.open_bus(&tree).await {
            self.schedule_devices(&tree);
        }
        self.ctx.publish_state().await;

        loop {
            tokio::select! {
                biased;
                cmd = cmd_rx.recv() => match cmd {
                    Some(SessionCommand::WriteTag { tag_id, value, reply }) => {
                        let result = self.handle_write(tag_id, value).await;
                        let _ = reply.send(result);
                    },
                    Some(SessionCommand::ReconnectDevice { device_id, reply }) => {
                        let result = self.handle_reconnect(device_id).await;
                        let _ = reply.send(result);
                    },
                    Some(SessionCommand::Shutdown { reply }) => {
                        self.teardown().await;
                        let _ = reply.send(());
                        return;
                    },
                    None => {
                        self.teardown().await;
                        return;
                    },
                },
                Some(device_id) = tick_rx.recv() => {
                    self.poll_device(device_id).await;
                },
            }
        }
    }

    /// Open the serial port and bring the node to Connected, or record the
    /// open failure. With the port open but unusable later, the session
    /// degrades to ErrorBus via [`fail_bus`].
    async fn open_bus(&mut self, tree: &NodeWithChildren) -> bool {
        self.set_status(ConnectionStatus::Connecting, None).await;

        let transport = match self.ctx.transports.create(&self.node) {
            Ok(t) => t,
            Err(e) => {
                self.fail_open(e.to_string()).await;
                return false;
            },
        };

        // lowest enabled response timeout bounds every poll on this bus
        let default_timeout = tree
            .devices
            .iter()
            .filter(|d| d.device.enabled)
            .map(|d| d.device.response_timeout_ms.max(100))
            .min()
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_RESPONSE_TIMEOUT);

        let mut master = ModbusMaster::new(transport, default_timeout);
        if let Err(e) = master.connect().await {
            self.fail_open(e.to_string()).await;
            return false;
        }

        // let adapter buffers settle before the first request
        sleep(PORT_SETTLE).await;

        self.master = Some(master);
        self.set_status(ConnectionStatus::Connected, None).await;
        info!(
            node = %self.node.name,
            port = %self.node.com_port,
            timeout_ms = default_timeout.as_millis() as u64,
            "bus connected"
        );
        true
    }

    async fn fail_open(&mut self, reason: String) {
        error!(node = %self.node.name, port = %self.node.com_port, "open failed: {reason}");
        self.set_status(ConnectionStatus::ErrorOpen, Some(reason.clone()))
            .await;
        self.ctx.broadcaster.publish(Event::message(
            MessageLevel::Error,
            format!("Failed to open {}", self.node.name),
            reason,
        ));
    }

    /// Terminal bus fault: polls stop, the port closes, writes answer
    /// NotConnected until the node is reloaded.
    async fn fail_bus(&mut self, err: AcqError) {
        error!(node = %self.node.name, "bus failure: {err}");
        for runtime in self.devices.values_mut() {
            runtime.flags.halted.store(true, Ordering::Release);
            if let Some(ticker) = runtime.ticker.take() {
                ticker.abort();
            }
        }
        if let Some(mut master) = self.master.take() {
            master.close().await;
        }
        self.set_status(ConnectionStatus::ErrorBus, Some(err.to_string()))
            .await;
        self.ctx.broadcaster.publish(Event::message(
            MessageLevel::Error,
            format!("Bus failure on {}", self.node.name),
            err.operator_message(),
        ));
        self.ctx.publish_state().await;
    }

    fn schedule_devices(&mut self, tree: &NodeWithChildren) {
        let mut scheduled = 0u32;
        for entry in &tree.devices {
            if !entry.device.enabled || entry.enabled_tags().next().is_none() {
                continue;
            }
            if let Err(e) = entry.device.validate() {
                warn!(device = %entry.device.name, "not scheduling: {e}");
                continue;
            }
            let initial = FIRST_DEVICE_LEAD + DEVICE_STAGGER * scheduled;
            self.start_ticker(entry.device.clone(), initial);
            scheduled += 1;
        }
        debug!(node = %self.node.name, devices = scheduled, "polling scheduled");
    }

    fn start_ticker(&mut self, device: Device, initial_delay: Duration) {
        let device_id = device.id;
        let poll_interval = Duration::from_millis(device.poll_interval_ms.max(100));
        let flags = Arc::new(DeviceFlags::default());
        let ticker = spawn_ticker(
            device_id,
            poll_interval,
            initial_delay,
            Arc::clone(&flags),
            self.tick_tx.clone(),
        );
        self.devices.insert(
            device_id,
            DeviceRuntime {
                device,
                flags,
                ticker: Some(ticker),
            },
        );
    }

    fn halt_device(&mut self, device_id: i64, reason: &str) {
        if let Some(runtime) = self.devices.get_mut(&device_id) {
            runtime.flags.halted.store(true, Ordering::Release);
            if let Some(ticker) = runtime.ticker.take() {
                ticker.abort();
            }
            info!(device = %runtime.device.name, "polling halted: {reason}");
        }
    }

    async fn poll_device(&mut self, device_id: i64) {
        let outcome = self.poll_cycle(device_id).await;
        if let Some(runtime) = self.devices.get(&device_id) {
            runtime.flags.poll_pending.store(false, Ordering::Release);
        }
        if let Err(fatal) = outcome {
            self.fail_bus(fatal).await;
        }
    }

    /// One poll cycle for one device. `Err` means a fatal bus fault; all
    /// per-tag errors are confined to their samples.
    async fn poll_cycle(&mut self, device_id: i64) -> Result<()> {
        let Some(runtime) = self.devices.get(&device_id) else {
            return Ok(());
        };
        if runtime.flags.halted.load(Ordering::Acquire)
            || runtime.flags.write_locked.load(Ordering::Acquire)
        {
            return Ok(());
        }

        // the store is the source of truth for the tag list of this cycle
        let device = match self.ctx.store.get_device(device_id).await {
            Ok(d) => d,
            Err(e) => {
                warn!(device_id, "poll skipped, device reload failed: {e}");
                return Ok(());
            },
        };
        let tags = match self.ctx.store.list_device_tags(device_id, true).await {
            Ok(t) => t,
            Err(e) => {
                warn!(device_id, "poll skipped, tag reload failed: {e}");
                return Ok(());
            },
        };

        if !device.enabled || tags.is_empty() {
            self.halt_device(device_id, "device disabled or no enabled tags");
            self.ctx.publish_state().await;
            return Ok(());
        }

        let keep: HashSet<i64> = tags.iter().map(|t| t.id).collect();
        self.ctx.cache.retain_tags(device_id, &keep);

        let Some(master) = self.master.as_mut() else {
            return Ok(());
        };

        let unit = device.address;
        let mut samples: Vec<(String, Sample)> = Vec::with_capacity(tags.len());
        let mut timeouts = 0usize;
        let mut fatal = None;

        for (i, tag) in tags.iter().enumerate() {
            if i > 0 {
                sleep(INTER_TAG_DELAY).await;
            }
            match read_tag(master, unit, tag).await {
                Ok(value) => {
                    samples.push((tag.name.clone(), Sample::ok(tag.id, device_id, value)));
                },
                Err(e) => {
                    if e == AcqError::TransactionTimedOut {
                        timeouts += 1;
                    }
                    samples.push((
                        tag.name.clone(),
                        Sample::failed(tag.id, device_id, e.to_string()),
                    ));
                    if let AcqError::TransportError(_) = e {
                        fatal = Some(e);
                        break;
                    }
                },
            }
        }

        for (_, sample) in &samples {
            self.ctx.cache.upsert(sample.clone());
        }

        if let Err(e) = self
            .ctx
            .store
            .set_device_last_poll_time(device_id, chrono::Utc::now())
            .await
        {
            warn!(device = %device.name, "last poll time not persisted: {e}");
        }

        self.ctx.broadcaster.publish(Event::tag_values(
            device_id,
            samples.iter().map(|(name, sample)| (name.as_str(), sample)),
        ));

        if let Some(fatal) = fatal {
            return Err(fatal);
        }

        // every tag timing out in one cycle means the device is offline
        if timeouts == tags.len() {
            self.halt_device(device_id, "all tags timed out, device presumed offline");
            self.ctx.publish_state().await;
        }

        Ok(())
    }

    /// Synchronous write: validate, pause the device's polling, write with
    /// the expanded timeout, read back the authoritative value, resume
    /// polling after the guard window.
    async fn handle_write(&mut self, tag_id: i64, value: f64) -> Result<ScalarValue> {
        let outcome = self.write_sequence(tag_id, value).await;

        match outcome {
            Ok((device_id, tag_name, sample_value)) => {
                let sample = Sample::ok(tag_id, device_id, sample_value);
                self.ctx.cache.upsert(sample.clone());
                self.ctx.broadcaster.publish(Event::tag_values(
                    device_id,
                    [(tag_name.as_str(), &sample)],
                ));
                Ok(sample_value)
            },
            Err(e) => {
                self.ctx.broadcaster.publish(Event::message(
                    MessageLevel::Error,
                    "Write failed",
                    e.operator_message(),
                ));
                if matches!(e, AcqError::TransportError(_)) {
                    self.fail_bus(e.clone()).await;
                }
                Err(e)
            },
        }
    }

    async fn write_sequence(
        &mut self,
        tag_id: i64,
        value: f64,
    ) -> Result<(i64, String, ScalarValue)> {
        let tag = self.ctx.store.get_tag(tag_id).await?;
        let device = self.ctx.store.get_device(tag.device_id).await?;

        if !tag.is_writable() {
            return Err(AcqError::NotWritable(format!(
                "tag {} does not accept writes",
                tag.name
            )));
        }
        if !tag.enabled {
            return Err(AcqError::NotWritable(format!("tag {} is disabled", tag.name)));
        }
        if !device.enabled {
            return Err(AcqError::NotWritable(format!(
                "device {} is disabled",
                device.name
            )));
        }

        let flags = self.devices.get(&device.id).map(|r| Arc::clone(&r.flags));
        let master = self.master.as_mut().ok_or_else(|| {
            AcqError::NotConnected(format!("bus {} is not connected", self.node.name))
        })?;

        // any in-flight poll has already drained: this loop is serial.
        // pausing the ticker keeps new polls away for the whole sequence.
        if let Some(flags) = &flags {
            flags.write_locked.store(true, Ordering::Release);
        }

        let saved_timeout = master.timeout();
        let write_timeout = Duration::from_millis(
            (2 * device.response_timeout_ms).max(WRITE_TIMEOUT_FLOOR_MS),
        );
        master.set_timeout(write_timeout);

        let written = perform_write(master, &device, &tag, value).await;
        let outcome = match written {
            Ok(()) => {
                sleep(WRITE_SETTLE).await;
                read_back(master, &device, &tag).await
            },
            Err(e) => Err(e),
        };

        master.set_timeout(saved_timeout);

        // resume polling once the guard window passes
        if let Some(flags) = flags {
            tokio::spawn(async move {
                sleep(WRITE_GUARD).await;
                flags.write_locked.store(false, Ordering::Release);
            });
        }

        outcome.map(|confirmed| (device.id, tag.name, confirmed))
    }

    /// Restart polling for one device from fresh store state.
    async fn handle_reconnect(&mut self, device_id: i64) -> Result<()> {
        let device = self.ctx.store.get_device(device_id).await?;
        if device.node_id != self.node.id {
            return Err(AcqError::NotFound {
                entity: "device",
                id: device_id,
            });
        }

        self.halt_device(device_id, "reconnect requested");
        self.devices.remove(&device_id);

        if self.master.is_none() {
            return Err(AcqError::NotConnected(format!(
                "bus {} is not connected",
                self.node.name
            )));
        }
        if !device.enabled {
            debug!(device = %device.name, "reconnect: device disabled, polling not restarted");
            return Ok(());
        }
        let tags = self.ctx.store.list_device_tags(device_id, true).await?;
        if tags.is_empty() {
            debug!(device = %device.name, "reconnect: no enabled tags, polling not restarted");
            return Ok(());
        }
        device.validate().map_err(AcqError::ConfigError)?;

        self.start_ticker(device, RECONNECT_DELAY);
        info!(device_id, "device polling restarted");
        Ok(())
    }

    async fn teardown(&mut self) {
        for runtime in self.devices.values_mut() {
            if let Some(ticker) = runtime.ticker.take() {
                ticker.abort();
            }
        }
        if let Some(mut master) = self.master.take() {
            master.close().await;
        }
        // only a Connected node becomes Disconnected; error states persist
        // so the operator can still see why the bus went down
        let current = self
            .ctx
            .status
            .get(self.node.id)
            .map(|(status, _)| status)
            .unwrap_or(self.node.connection_status);
        if matches!(
            current,
            ConnectionStatus::Connected | ConnectionStatus::Connecting
        ) {
            self.set_status(ConnectionStatus::Disconnected, None).await;
        }
        info!(node = %self.node.name, "bus session stopped");
    }

    /// Update the live status board, then persist best-effort.
    async fn set_status(&mut self, status: ConnectionStatus, last_error: Option<String>) {
        self.node.connection_status = status;
        self.node.last_error = last_error.clone();
        self.ctx
            .status
            .set(self.node.id, status, last_error.clone());
        if let Err(e) = self
            .ctx
            .store
            .set_node_connection_status(self.node.id, status, last_error.as_deref())
            .await
        {
            warn!(node = %self.node.name, "status not persisted: {e}");
        }
    }
}

fn spawn_ticker(
    device_id: i64,
    poll_interval: Duration,
    initial_delay: Duration,
    flags: Arc<DeviceFlags>,
    tick_tx: mpsc::Sender<i64>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        sleep(initial_delay).await;
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            // first tick fires immediately: the initial read
            ticker.tick().await;
            if flags.halted.load(Ordering::Acquire) || flags.write_locked.load(Ordering::Acquire)
            {
                continue;
            }
            // at most one outstanding poll per device; extra ticks are dropped
            if flags.poll_pending.swap(true, Ordering::AcqRel) {
                continue;
            }
            if tick_tx.send(device_id).await.is_err() {
                return;
            }
        }
    })
}

async fn read_tag(master: &mut ModbusMaster, unit: u8, tag: &Tag) -> Result<ScalarValue> {
    match tag.register_kind {
        RegisterKind::Coil => {
            let bits = master.read_coils(unit, tag.address, 1).await?;
            Ok(codec::decode_bit(bits[0]))
        },
        RegisterKind::DiscreteInput => {
            let bits = master.read_discrete_inputs(unit, tag.address, 1).await?;
            Ok(codec::decode_bit(bits[0]))
        },
        RegisterKind::HoldingRegister => {
            let count = tag.device_data_type.register_count();
            let words = master
                .read_holding_registers(unit, tag.address, count)
                .await?;
            codec::decode_registers(&words, tag.device_data_type, tag.server_data_type)
        },
        RegisterKind::InputRegister => {
            let count = tag.device_data_type.register_count();
            let words = master.read_input_registers(unit, tag.address, count).await?;
            codec::decode_registers(&words, tag.device_data_type, tag.server_data_type)
        },
    }
}

async fn perform_write(
    master: &mut ModbusMaster,
    device: &Device,
    tag: &Tag,
    value: f64,
) -> Result<()> {
    let unit = device.address;
    match tag.register_kind {
        RegisterKind::Coil => {
            let on = codec::encode_coil(value)?;
            master.write_single_coil(unit, tag.address, on).await
        },
        RegisterKind::HoldingRegister => {
            let words = codec::encode_value(value, tag.device_data_type)?;
            if tag.device_data_type == DataType::F32 {
                // two separate single-register writes, high word first
                master.write_single_register(unit, tag.address, words[0]).await?;
                sleep(FLOAT_WRITE_GAP).await;
                master
                    .write_single_register(unit, tag.address + 1, words[1])
                    .await
            } else if words.len() == 1 {
                match master
                    .write_multiple_registers(unit, tag.address, &words)
                    .await
                {
                    // older devices lack FC16 for single registers
                    Err(AcqError::ModbusException(1)) => {
                        master.write_single_register(unit, tag.address, words[0]).await
                    },
                    other => other,
                }
            } else {
                master.write_multiple_registers(unit, tag.address, &words).await
            }
        },
        RegisterKind::InputRegister | RegisterKind::DiscreteInput => Err(AcqError::NotWritable(
            format!("register kind {} is read-only", tag.register_kind),
        )),
    }
}

/// Read the written address(es) back; the device's view is authoritative.
async fn read_back(master: &mut ModbusMaster, device: &Device, tag: &Tag) -> Result<ScalarValue> {
    read_tag(master, device.address, tag).await
}
