//! Report-ID registry.
//!
//! Maps each report ID to the concrete message shape decoded for it. The
//! table is built once, up front, from the closed message set — there is no
//! runtime type discovery and no parse-time disambiguation. The single
//! documented collision (0x07: GAT data vs. card data) is resolved by the
//! device variant supplied at construction.

use std::sync::OnceLock;

use crate::message::GdsMessage;
use crate::report;

/// Which device family's message table to build.
///
/// `CardReader` selects the card-data shape for report ID 0x07; everything
/// else is identical between the variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceVariant {
    #[default]
    Standard,
    CardReader,
}

/// Tag identifying a message shape. Used to key the router callback table
/// and the per-shape correlation queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum MessageKind {
    Ack,
    Enable,
    Disable,
    SelfTest,
    PowerStatus,
    GatData,
    CardData,
    CrcRequest,
    CrcData,
    DeviceState,
    Unknown,
}

impl MessageKind {
    /// Number of distinct tags, `Unknown` included.
    pub const COUNT: usize = 11;

    /// Stable index for fixed-size per-kind tables.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl GdsMessage {
    /// The shape tag for this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            GdsMessage::Ack(_) => MessageKind::Ack,
            GdsMessage::Enable => MessageKind::Enable,
            GdsMessage::Disable => MessageKind::Disable,
            GdsMessage::SelfTest(_) => MessageKind::SelfTest,
            GdsMessage::PowerStatus(_) => MessageKind::PowerStatus,
            GdsMessage::GatData(_) => MessageKind::GatData,
            GdsMessage::CardData(_) => MessageKind::CardData,
            GdsMessage::CrcRequest(_) => MessageKind::CrcRequest,
            GdsMessage::CrcData(_) => MessageKind::CrcData,
            GdsMessage::DeviceState(_) => MessageKind::DeviceState,
            GdsMessage::Unknown { .. } => MessageKind::Unknown,
        }
    }
}

/// Immutable report-ID → message-shape table.
pub struct MessageRegistry {
    table: [MessageKind; 256],
    variant: DeviceVariant,
}

impl MessageRegistry {
    /// Build the table for the given device variant.
    pub fn new(variant: DeviceVariant) -> Self {
        let mut table = [MessageKind::Unknown; 256];
        table[report::ACK as usize] = MessageKind::Ack;
        table[report::ENABLE as usize] = MessageKind::Enable;
        table[report::DISABLE as usize] = MessageKind::Disable;
        table[report::SELF_TEST as usize] = MessageKind::SelfTest;
        table[report::POWER_STATUS as usize] = MessageKind::PowerStatus;
        table[report::CRC_REQUEST as usize] = MessageKind::CrcRequest;
        table[report::CRC_DATA as usize] = MessageKind::CrcData;
        table[report::DEVICE_STATE as usize] = MessageKind::DeviceState;
        table[report::GAT_DATA as usize] = match variant {
            DeviceVariant::Standard => MessageKind::GatData,
            DeviceVariant::CardReader => MessageKind::CardData,
        };
        Self { table, variant }
    }

    /// The process-wide registry, built on first call. Later calls return
    /// the existing table unchanged, whatever variant they pass.
    pub fn global(variant: DeviceVariant) -> &'static MessageRegistry {
        static GLOBAL: OnceLock<MessageRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| MessageRegistry::new(variant))
    }

    /// Resolve a report ID to its registered shape.
    ///
    /// Unregistered IDs resolve to `MessageKind::Unknown`.
    pub fn resolve(&self, report_id: u8) -> MessageKind {
        self.table[report_id as usize]
    }

    /// The variant this table was built for.
    pub fn variant(&self) -> DeviceVariant {
        self.variant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_variant_maps_gat_data() {
        let registry = MessageRegistry::new(DeviceVariant::Standard);
        assert_eq!(registry.resolve(report::GAT_DATA), MessageKind::GatData);
    }

    #[test]
    fn card_reader_variant_maps_card_data() {
        let registry = MessageRegistry::new(DeviceVariant::CardReader);
        assert_eq!(registry.resolve(report::GAT_DATA), MessageKind::CardData);
    }

    #[test]
    fn unregistered_id_resolves_to_unknown() {
        let registry = MessageRegistry::new(DeviceVariant::Standard);
        assert_eq!(registry.resolve(0xF0), MessageKind::Unknown);
        assert_eq!(registry.resolve(0x00), MessageKind::Unknown);
    }

    #[test]
    fn rebuilding_yields_identical_table() {
        let a = MessageRegistry::new(DeviceVariant::Standard);
        let b = MessageRegistry::new(DeviceVariant::Standard);
        for id in 0..=u8::MAX {
            assert_eq!(a.resolve(id), b.resolve(id));
        }
    }

    #[test]
    fn global_registration_is_idempotent() {
        let first = MessageRegistry::global(DeviceVariant::Standard);
        let second = MessageRegistry::global(DeviceVariant::CardReader);
        assert!(std::ptr::eq(first, second));
        assert_eq!(second.variant(), DeviceVariant::Standard);
    }
}
