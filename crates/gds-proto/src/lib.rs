//! Bit-exact message model and codec for the GDS peripheral protocol.
//!
//! GDS is the shared report-ID-discriminated binary protocol spoken by the
//! platform's peripheral families (note acceptors, printers, card readers,
//! reel controllers). This crate owns the wire layer only:
//! - The closed message set with per-shape bit layouts
//! - The frame encoder/decoder
//! - The report-ID registry, including the device-variant resolution of the
//!   one documented report-ID collision
//!
//! Connection lifecycle, report routing and command correlation live in
//! `gds-device`.

pub mod codec;
pub mod error;
pub mod message;
pub mod registry;
pub mod report;

pub use codec::{decode, encode};
pub use error::{FramingError, Result};
pub use message::{
    Ack, CardData, CrcData, CrcRequest, DeviceState, GatData, GdsMessage, PowerStatus, SelfTest,
    MAX_DATA_CHUNK,
};
pub use registry::{DeviceVariant, MessageKind, MessageRegistry};
