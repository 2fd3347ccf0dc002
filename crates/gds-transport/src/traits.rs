use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;
use crate::identity::DeviceIdentity;

/// Sink for transport notifications.
///
/// All three calls arrive on the transport's receive path. Implementations
/// must return quickly — deserialize, update state, hand slow work off —
/// and must never block on a correlation wait.
pub trait TransportObserver: Send + Sync {
    /// The physical device appeared on the channel.
    fn attached(&self);

    /// The physical device went away.
    fn detached(&self);

    /// A raw frame arrived (report ID byte plus body).
    fn frame_received(&self, frame: Bytes);
}

/// The physical-channel abstraction the protocol engine is built on.
///
/// Implemented per physical layer (USB HID, serial) outside this workspace;
/// the engine only calls these operations and subscribes to notifications.
/// It never inspects transport internals.
pub trait Communicator: Send + Sync {
    /// Open the channel. Returns `false` on failure; the engine's reconnect
    /// controller owns retrying.
    fn open(&self) -> bool;

    /// Close the channel. Idempotent.
    fn close(&self) -> bool;

    fn is_open(&self) -> bool;

    /// Submit one wire frame.
    fn send_frame(&self, frame: Bytes) -> Result<()>;

    /// Corrective reset of the underlying connection, requested when a
    /// peripheral reports that it requires one. Not a lifecycle failure.
    fn reset_connection(&self);

    /// Identity snapshot for the attached peripheral.
    fn identity(&self) -> DeviceIdentity;

    /// Install the observer receiving attach/detach/frame notifications.
    /// A transport carries at most one observer; installing replaces it.
    fn set_observer(&self, observer: Arc<dyn TransportObserver>);

    /// Remove the observer. Safe to call with none installed.
    fn clear_observer(&self);
}
