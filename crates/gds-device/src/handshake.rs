//! Protocol-specific handshake hooks.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use gds_proto::{Ack, GdsMessage, MessageKind, SelfTest};
use gds_transport::CancelToken;
use tracing::{debug, info};

use crate::device::GdsDevice;

/// Per-family protocol hooks invoked by the lifecycle machine.
///
/// `reset` runs after the transport opens and decides whether the device
/// counts as connected; each peripheral family implements its own
/// handshake (note acceptors re-negotiate note tables, printers re-sync
/// their transaction window, and so on). `self_test` backs
/// [`GdsDevice::self_test`].
pub trait DeviceHandshake: Send + Sync {
    fn reset(&self, device: &GdsDevice) -> bool;

    fn self_test(&self, device: &GdsDevice, nvm: bool) -> bool;
}

/// Minimal handshake shared by families without extra reset requirements:
/// realign transaction tracking with a resync Ack and expect the device to
/// acknowledge in turn.
pub struct BasicHandshake {
    transaction_id: AtomicU8,
    /// How long to wait for the device's answering Ack.
    pub ack_timeout: Duration,
}

impl BasicHandshake {
    pub fn new() -> Self {
        Self {
            transaction_id: AtomicU8::new(0),
            ack_timeout: Duration::from_secs(2),
        }
    }

    fn next_transaction_id(&self) -> u8 {
        self.transaction_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for BasicHandshake {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceHandshake for BasicHandshake {
    fn reset(&self, device: &GdsDevice) -> bool {
        let transaction_id = self.next_transaction_id();
        device.clear_stale_reports(MessageKind::Ack);
        let sent = device.send_report(&GdsMessage::Ack(Ack {
            resync: true,
            transaction_id,
        }));
        if sent.is_err() {
            debug!(transaction_id, "resync ack send failed");
            return false;
        }

        match device.wait_for_report(MessageKind::Ack, self.ack_timeout, &CancelToken::new()) {
            Some(GdsMessage::Ack(ack)) => {
                info!(
                    transaction_id,
                    device_transaction_id = ack.transaction_id,
                    "device acknowledged resync"
                );
                true
            }
            _ => {
                debug!(transaction_id, "no ack for resync");
                false
            }
        }
    }

    fn self_test(&self, device: &GdsDevice, nvm: bool) -> bool {
        device
            .send_report(&GdsMessage::SelfTest(SelfTest { nvm }))
            .is_ok()
    }
}
