//! Lifecycle engine for GDS peripherals.
//!
//! This is the layer every peripheral family shares: it turns an unreliable,
//! half-duplex report transport into blocking command operations with
//! correct timeout, retry, resync and reconnection semantics, while
//! demultiplexing unsolicited reports to any number of subscribers.
//!
//! The wire model lives in `gds-proto`; the physical channel is an external
//! [`gds_transport::Communicator`]. Higher protocol layers (SAS, G2S device
//! adapters) consume [`GdsDevice`] through its open/close/enable/disable
//! surface and its lifecycle events.

pub mod config;
pub mod correlation;
pub mod device;
pub mod error;
pub mod events;
pub mod handshake;
pub mod retry;
pub mod router;

pub use config::{DeviceConfig, ReconnectPolicy};
pub use correlation::PendingReports;
pub use device::GdsDevice;
pub use error::{DeviceError, Result};
pub use events::DeviceEvent;
pub use handshake::{BasicHandshake, DeviceHandshake};
pub use router::ReportRouter;
