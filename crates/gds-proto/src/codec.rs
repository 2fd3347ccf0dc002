//! Top-level frame encode/decode.
//!
//! Wire format: byte 0 is the report ID, the remainder is the message body
//! in the shape registered for that ID.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::{FramingError, Result};
use crate::message::{
    Ack, CardData, CrcData, CrcRequest, DeviceState, GatData, GdsMessage, PowerStatus, SelfTest,
};
use crate::registry::{MessageKind, MessageRegistry};
use crate::report;

/// Encode a message into its wire frame.
///
/// Fails with [`FramingError::PayloadTooLarge`] when a data payload does not
/// fit its one-byte Length field; a corrupt frame is never emitted.
pub fn encode(message: &GdsMessage) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    buf.put_u8(message.report_id());
    message.encode_body(&mut buf)?;
    Ok(buf.freeze())
}

/// Decode a wire frame into a typed message.
///
/// Frames carrying a report ID with no registered shape decode to
/// [`GdsMessage::Unknown`]; that is a normal condition, not an error.
/// Malformed bodies for a *known* report ID fail with [`FramingError`].
pub fn decode(registry: &MessageRegistry, frame: &[u8]) -> Result<GdsMessage> {
    let (&report_id, body) = frame.split_first().ok_or(FramingError::Empty)?;

    let message = match registry.resolve(report_id) {
        MessageKind::Ack => GdsMessage::Ack(Ack::decode(body)?),
        MessageKind::Enable => GdsMessage::Enable,
        MessageKind::Disable => GdsMessage::Disable,
        MessageKind::SelfTest => GdsMessage::SelfTest(SelfTest::decode(body)?),
        MessageKind::PowerStatus => GdsMessage::PowerStatus(PowerStatus::decode(body)?),
        MessageKind::GatData => GdsMessage::GatData(GatData::decode(body)?),
        MessageKind::CardData => GdsMessage::CardData(CardData::decode(body)?),
        MessageKind::CrcRequest => GdsMessage::CrcRequest(CrcRequest::decode(body)?),
        MessageKind::CrcData => GdsMessage::CrcData(CrcData::decode(body)?),
        MessageKind::DeviceState => GdsMessage::DeviceState(DeviceState::decode(body)?),
        MessageKind::Unknown => {
            debug!(
                report_id,
                name = report::report_name(report_id),
                "unregistered report ID"
            );
            GdsMessage::Unknown { report_id }
        }
    };
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DeviceVariant;

    fn registry() -> MessageRegistry {
        MessageRegistry::new(DeviceVariant::Standard)
    }

    fn roundtrip(message: GdsMessage) {
        let frame = encode(&message).unwrap();
        let decoded = decode(&registry(), &frame).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn roundtrip_every_registered_shape() {
        roundtrip(GdsMessage::Ack(Ack {
            resync: true,
            transaction_id: 0xFE,
        }));
        roundtrip(GdsMessage::Enable);
        roundtrip(GdsMessage::Disable);
        roundtrip(GdsMessage::SelfTest(SelfTest { nvm: true }));
        roundtrip(GdsMessage::PowerStatus(PowerStatus {
            battery_failed: false,
            requires_reset: true,
            external_power: true,
        }));
        roundtrip(GdsMessage::GatData(GatData {
            index: 3,
            data: "GAT-REPORT chunk".to_string(),
        }));
        roundtrip(GdsMessage::CrcRequest(CrcRequest { seed: 0xDEAD_BEEF }));
        roundtrip(GdsMessage::CrcData(CrcData { result: 0xABCD }));
        roundtrip(GdsMessage::DeviceState(DeviceState {
            disabled: false,
            enabled: true,
        }));
    }

    #[test]
    fn roundtrip_card_data_on_card_reader_variant() {
        let registry = MessageRegistry::new(DeviceVariant::CardReader);
        let message = GdsMessage::CardData(CardData {
            track: 2,
            data: ";1234567890?".to_string(),
        });
        let frame = encode(&message).unwrap();
        assert_eq!(frame[0], report::GAT_DATA);
        assert_eq!(decode(&registry, &frame).unwrap(), message);
    }

    #[test]
    fn oversized_data_chunk_fails_to_encode() {
        let oversized = "A".repeat(crate::MAX_DATA_CHUNK + 45);
        let result = encode(&GdsMessage::GatData(GatData {
            index: 0,
            data: oversized.clone(),
        }));
        assert!(matches!(
            result,
            Err(FramingError::PayloadTooLarge { size: 300, max: 255, .. })
        ));

        let result = encode(&GdsMessage::CardData(CardData {
            track: 1,
            data: oversized,
        }));
        assert!(matches!(result, Err(FramingError::PayloadTooLarge { .. })));

        // The largest chunk that does fit still round-trips.
        roundtrip(GdsMessage::GatData(GatData {
            index: 0,
            data: "B".repeat(crate::MAX_DATA_CHUNK),
        }));
    }

    #[test]
    fn unknown_report_id_yields_minimal_envelope() {
        let decoded = decode(&registry(), &[0x7F, 1, 2, 3]).unwrap();
        assert_eq!(decoded, GdsMessage::Unknown { report_id: 0x7F });
    }

    #[test]
    fn empty_frame_is_a_framing_error() {
        assert!(matches!(decode(&registry(), &[]), Err(FramingError::Empty)));
    }

    #[test]
    fn truncated_known_report_is_a_framing_error() {
        // CrcData needs a 4-byte body.
        let result = decode(&registry(), &[report::CRC_DATA, 0xAB]);
        assert!(matches!(result, Err(FramingError::Truncated { .. })));
    }

    #[test]
    fn reserved_bits_are_ignored_on_decode() {
        // High reserved bits set; only the flag bits should be read.
        let decoded = decode(&registry(), &[report::DEVICE_STATE, 0b1111_1101]).unwrap();
        assert_eq!(
            decoded,
            GdsMessage::DeviceState(DeviceState {
                disabled: false,
                enabled: true,
            })
        );
    }
}
