//! Device lifecycle state machine and command operations.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use bytes::Bytes;
use gds_proto::{
    CrcRequest, GatData, GdsMessage, MessageKind, MessageRegistry, MAX_DATA_CHUNK,
};
use gds_transport::{CancelToken, Communicator, DeviceIdentity, TransportObserver};
use tracing::{debug, info, trace, warn};

use crate::config::DeviceConfig;
use crate::correlation::PendingReports;
use crate::error::{DeviceError, Result};
use crate::events::DeviceEvent;
use crate::handshake::{BasicHandshake, DeviceHandshake};
use crate::router::ReportRouter;

type EventHandler = Arc<dyn Fn(DeviceEvent) + Send + Sync>;

/// One GDS peripheral: lifecycle flags, report routing, command
/// correlation and the reconnect controller, bound to an abstract
/// [`Communicator`].
///
/// Constructed once per physical peripheral and shared behind an `Arc`.
/// Command operations (`enable`, `disable`, `calculate_crc`,
/// `request_gat_report`) block their caller up to a configured timeout and
/// must run off the transport's receive path and off any UI event loop.
pub struct GdsDevice {
    registry: Arc<MessageRegistry>,
    config: DeviceConfig,
    handshake: Arc<dyn DeviceHandshake>,
    router: ReportRouter,
    pending: PendingReports,
    transport: Mutex<Option<Arc<dyn Communicator>>>,
    /// Serializes open/close so two concurrent opens cannot both run the
    /// reset handshake.
    open_lock: Mutex<()>,
    abandon: Mutex<CancelToken>,
    handlers: Mutex<Vec<EventHandler>>,
    wired: AtomicBool,
    connected: AtomicBool,
    initialized: AtomicBool,
    enabled: AtomicBool,
    external_power: AtomicBool,
    requires_reset: AtomicBool,
    crc: AtomicU32,
}

impl GdsDevice {
    /// Create a device using the default [`BasicHandshake`].
    pub fn new(registry: Arc<MessageRegistry>, config: DeviceConfig) -> Arc<Self> {
        Self::with_handshake(registry, config, Arc::new(BasicHandshake::new()))
    }

    /// Create a device with a family-specific handshake.
    pub fn with_handshake(
        registry: Arc<MessageRegistry>,
        config: DeviceConfig,
        handshake: Arc<dyn DeviceHandshake>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            config,
            handshake,
            router: ReportRouter::new(),
            pending: PendingReports::new(),
            transport: Mutex::new(None),
            open_lock: Mutex::new(()),
            abandon: Mutex::new(CancelToken::new()),
            handlers: Mutex::new(Vec::new()),
            wired: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            enabled: AtomicBool::new(false),
            external_power: AtomicBool::new(false),
            requires_reset: AtomicBool::new(false),
            crc: AtomicU32::new(0),
        })
    }

    /// Bind a transport, wire the attach/detach/frame subscriptions and
    /// attempt the first open through the reconnect controller.
    ///
    /// Returns — and records as the Initialized flag — whether the device
    /// came up; a failed attempt raises [`DeviceEvent::InitializationFailed`].
    pub fn initialize(self: &Arc<Self>, transport: Arc<dyn Communicator>) -> bool {
        {
            let mut slot = self.transport.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(old) = slot.take() {
                old.clear_observer();
                old.close();
            }
            *slot = Some(transport.clone());
        }
        transport.set_observer(Arc::new(DeviceObserver {
            device: Arc::downgrade(self),
        }));
        self.wire_builtin_callbacks();
        *self.abandon.lock().unwrap_or_else(PoisonError::into_inner) = CancelToken::new();

        let opened = self.try_open();
        if opened {
            if !self.initialized.swap(true, Ordering::SeqCst) {
                self.emit(DeviceEvent::Initialized);
            }
        } else {
            self.initialized.store(false, Ordering::SeqCst);
            self.emit(DeviceEvent::InitializationFailed);
        }
        opened
    }

    /// Open the transport and run the reset handshake.
    ///
    /// Trivially succeeds when already connected. Otherwise any half-open
    /// channel is closed first; Connected becomes true iff the handshake
    /// succeeds.
    pub fn open(&self) -> bool {
        let _serialized = self.open_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(transport) = self.transport_handle() else {
            return false;
        };
        if self.is_connected() && transport.is_open() {
            return true;
        }

        transport.close();
        if !transport.open() {
            self.set_connected(false);
            return false;
        }

        let handshake = self.handshake.clone();
        let reset_ok = handshake.reset(self);
        self.emit(if reset_ok {
            DeviceEvent::ResetSucceeded
        } else {
            DeviceEvent::ResetFailed
        });
        self.set_connected(reset_ok);
        reset_ok
    }

    /// Close the transport. Idempotent.
    pub fn close(&self) -> bool {
        let _serialized = self.open_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(transport) = self.transport_handle() else {
            return false;
        };
        let closed = transport.close();
        self.set_connected(false);
        closed
    }

    /// Send the Enable command and wait for the device-state report.
    ///
    /// Returns the report's effective enabled flag (disabled wins a tie);
    /// `false` when no report arrives within the command timeout — a normal,
    /// retryable outcome.
    pub fn enable(&self) -> bool {
        self.pending.clear_stale(MessageKind::DeviceState);
        if self.send_report(&GdsMessage::Enable).is_err() {
            return false;
        }
        match self.wait_for_report(
            MessageKind::DeviceState,
            self.config.command_timeout,
            &CancelToken::new(),
        ) {
            Some(GdsMessage::DeviceState(state)) => state.effective_enabled(),
            _ => false,
        }
    }

    /// Send the Disable command and wait for the device-state report.
    /// Returns the report's disabled flag; `false` when nothing arrives.
    pub fn disable(&self) -> bool {
        self.pending.clear_stale(MessageKind::DeviceState);
        if self.send_report(&GdsMessage::Disable).is_err() {
            return false;
        }
        match self.wait_for_report(
            MessageKind::DeviceState,
            self.config.command_timeout,
            &CancelToken::new(),
        ) {
            Some(GdsMessage::DeviceState(state)) => state.disabled,
            _ => false,
        }
    }

    /// Run the family-specific self test.
    pub fn self_test(&self, nvm: bool) -> bool {
        let handshake = self.handshake.clone();
        handshake.self_test(self, nvm)
    }

    /// Request a firmware CRC over the given seed.
    ///
    /// CRC is only meaningful on a quiesced device: while Enabled this
    /// returns 0 immediately without touching the transport. With seed 0 the
    /// computed result becomes the new cached CRC; a non-zero seed verifies
    /// without overwriting the cache. Returns 0 when the device never
    /// answers.
    pub fn calculate_crc(&self, seed: u32) -> u32 {
        if self.is_enabled() {
            debug!(seed, "crc request ignored while enabled");
            return 0;
        }
        self.pending.clear_stale(MessageKind::CrcData);
        if self
            .send_report(&GdsMessage::CrcRequest(CrcRequest { seed }))
            .is_err()
        {
            return 0;
        }
        match self.wait_for_report(
            MessageKind::CrcData,
            self.config.crc_timeout,
            &CancelToken::new(),
        ) {
            Some(GdsMessage::CrcData(data)) => {
                if seed == 0 {
                    self.crc.store(data.result, Ordering::SeqCst);
                }
                data.result
            }
            _ => 0,
        }
    }

    /// Retrieve the device's GAT report, assembling the multi-packet
    /// Index/Length/Data chunks into one ASCII payload.
    ///
    /// Forbidden while Enabled (returns "" without touching the transport).
    /// A chunk shorter than [`MAX_DATA_CHUNK`] terminates the transfer;
    /// `timeout` bounds the whole exchange. Returns "" when the device never
    /// answers.
    pub fn request_gat_report(&self, timeout: Duration) -> String {
        if self.is_enabled() {
            debug!("gat report request ignored while enabled");
            return String::new();
        }
        self.pending.clear_stale(MessageKind::GatData);
        let request = GdsMessage::GatData(GatData {
            index: 0,
            data: String::new(),
        });
        if self.send_report(&request).is_err() {
            return String::new();
        }

        let deadline = Instant::now() + timeout;
        let mut report = String::new();
        let mut expected_index = 0u8;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.wait_for_report(MessageKind::GatData, deadline - now, &CancelToken::new()) {
                Some(GdsMessage::GatData(chunk)) => {
                    trace!(index = chunk.index, len = chunk.data.len(), "gat chunk");
                    if chunk.index != expected_index {
                        warn!(
                            index = chunk.index,
                            expected = expected_index,
                            "gat chunk out of sequence; discarding report"
                        );
                        return String::new();
                    }
                    expected_index = expected_index.wrapping_add(1);
                    let last = chunk.data.len() < MAX_DATA_CHUNK;
                    report.push_str(&chunk.data);
                    if last {
                        break;
                    }
                }
                _ => break,
            }
        }
        report
    }

    /// Encode and submit one message to the transport.
    pub fn send_report(&self, message: &GdsMessage) -> Result<()> {
        let transport = self.transport_handle().ok_or(DeviceError::NotInitialized)?;
        let frame = gds_proto::encode(message)?;
        trace!(report_id = frame[0], len = frame.len(), "sending frame");
        transport.send_frame(frame)?;
        Ok(())
    }

    /// Block for the next non-expired report of `kind` (see
    /// [`PendingReports::wait_for`] semantics).
    pub fn wait_for_report(
        &self,
        kind: MessageKind,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Option<GdsMessage> {
        self.pending.wait_for(kind, timeout, cancel)
    }

    /// Drop any queued reports of `kind`.
    pub fn clear_stale_reports(&self, kind: MessageKind) {
        self.pending.clear_stale(kind);
    }

    /// Register an additional report callback. Callbacks for one kind run in
    /// registration order on the transport's receive path and must not block.
    pub fn register_report_callback<F>(&self, kind: MessageKind, callback: F)
    where
        F: Fn(&GdsMessage) + Send + Sync + 'static,
    {
        self.router.register(kind, callback);
    }

    /// Register a lifecycle event handler.
    pub fn register_event_handler<F>(&self, handler: F)
    where
        F: Fn(DeviceEvent) + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// The cached firmware CRC (0 until a seed-0 calculation completes).
    pub fn crc(&self) -> u32 {
        self.crc.load(Ordering::SeqCst)
    }

    pub fn external_power(&self) -> bool {
        self.external_power.load(Ordering::SeqCst)
    }

    pub fn requires_reset(&self) -> bool {
        self.requires_reset.load(Ordering::SeqCst)
    }

    /// Identity snapshot from the bound transport, if any.
    pub fn identity(&self) -> Option<DeviceIdentity> {
        self.transport_handle().map(|t| t.identity())
    }

    /// The registry this device decodes against.
    pub fn registry(&self) -> &MessageRegistry {
        &self.registry
    }

    pub(crate) fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub(crate) fn abandon_token(&self) -> CancelToken {
        self.abandon
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn transport_handle(&self) -> Option<Arc<dyn Communicator>> {
        self.transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn wire_builtin_callbacks(self: &Arc<Self>) {
        if self.wired.swap(true, Ordering::SeqCst) {
            return;
        }

        let weak = Arc::downgrade(self);
        self.router.register(MessageKind::DeviceState, move |message| {
            let Some(device) = weak.upgrade() else { return };
            if let GdsMessage::DeviceState(state) = message {
                device.set_enabled(state.effective_enabled());
            }
        });

        let weak = Arc::downgrade(self);
        self.router.register(MessageKind::PowerStatus, move |message| {
            let Some(device) = weak.upgrade() else { return };
            if let GdsMessage::PowerStatus(status) = message {
                device
                    .external_power
                    .store(status.external_power, Ordering::SeqCst);
                device
                    .requires_reset
                    .store(status.requires_reset, Ordering::SeqCst);
                if status.requires_reset {
                    info!("device requires reset; resetting connection");
                    if let Some(transport) = device.transport_handle() {
                        transport.reset_connection();
                    }
                }
            }
        });
    }

    fn handle_frame(&self, frame: Bytes) {
        let message = match gds_proto::decode(&self.registry, &frame) {
            Ok(message) => message,
            Err(err) => {
                warn!(%err, "dropping malformed frame");
                return;
            }
        };
        self.router.dispatch(&message);
        // Unknown envelopes are visible to diagnostic callbacks but carry no
        // shape worth correlating.
        if let GdsMessage::Unknown { .. } = message {
            return;
        }
        let ttl = match message.kind() {
            MessageKind::CrcData => self.config.crc_timeout,
            _ => self.config.command_timeout,
        };
        self.pending.publish(message, ttl);
    }

    fn handle_attach(self: Arc<Self>) {
        info!("transport attached");
        let token = CancelToken::new();
        *self.abandon.lock().unwrap_or_else(PoisonError::into_inner) = token.clone();
        let policy = self.config.reconnect.clone();
        let spawned = std::thread::Builder::new()
            .name("gds-reconnect".into())
            .spawn(move || {
                self.try_open_with(&policy, &token);
            });
        if let Err(err) = spawned {
            warn!(%err, "failed to spawn reconnect thread");
        }
    }

    fn handle_detach(&self) {
        info!("transport detached");
        self.abandon
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
        if let Some(transport) = self.transport_handle() {
            transport.close();
        }
        self.set_connected(false);
    }

    fn set_connected(&self, value: bool) {
        if self.connected.swap(value, Ordering::SeqCst) != value {
            self.emit(if value {
                DeviceEvent::Connected
            } else {
                DeviceEvent::Disconnected
            });
        }
    }

    fn set_enabled(&self, value: bool) {
        if self.enabled.swap(value, Ordering::SeqCst) != value {
            self.emit(if value {
                DeviceEvent::Enabled
            } else {
                DeviceEvent::Disabled
            });
        }
    }

    fn emit(&self, event: DeviceEvent) {
        debug!(?event, "device event");
        let handlers = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in handlers {
            handler(event);
        }
    }
}

impl Drop for GdsDevice {
    fn drop(&mut self) {
        self.abandon
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
        let transport = self
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(transport) = transport {
            transport.clear_observer();
            transport.close();
        }
        self.router.clear();
        self.pending.clear_all();
    }
}

/// Bridges transport notifications into the device. Holds a weak reference
/// so a transport that outlives the device cannot keep it alive.
struct DeviceObserver {
    device: Weak<GdsDevice>,
}

impl TransportObserver for DeviceObserver {
    fn attached(&self) {
        if let Some(device) = self.device.upgrade() {
            device.handle_attach();
        }
    }

    fn detached(&self) {
        if let Some(device) = self.device.upgrade() {
            device.handle_detach();
        }
    }

    fn frame_received(&self, frame: Bytes) {
        if let Some(device) = self.device.upgrade() {
            device.handle_frame(frame);
        }
    }
}
