//! Typed GDS messages and their per-shape wire layouts.
//!
//! Every message is a fixed, report-ID-discriminated record. Bit fields pack
//! into the minimum number of bytes with reserved bits filling from the most
//! significant end, so the declared flag fields always land in the low bits:
//!
//! ```text
//! DeviceState (0x0A):  ┌──────────────┬──────────┬─────────┐
//!                      │ Reserved(6b) │ Disabled │ Enabled │
//!                      │ bits 7..2    │ bit 1    │ bit 0   │
//!                      └──────────────┴──────────┴─────────┘
//! ```
//!
//! Multi-byte numeric fields (CRC seed/result) are little-endian. Data
//! payloads are ASCII, length-prefixed by a companion `Length` byte.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{FramingError, Result};
use crate::report;

/// Maximum bytes a single GAT/card data chunk can carry (`Length` is one byte).
pub const MAX_DATA_CHUNK: usize = 255;

/// Transaction acknowledge. `resync` asks the device to re-send its last
/// pending report because host-side transaction tracking must be realigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub resync: bool,
    pub transaction_id: u8,
}

/// Self-test command; `nvm` selects the non-volatile-memory test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfTest {
    pub nvm: bool,
}

/// Unsolicited power status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerStatus {
    pub battery_failed: bool,
    pub requires_reset: bool,
    pub external_power: bool,
}

/// One chunk of a multi-packet GAT transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatData {
    pub index: u8,
    pub data: String,
}

/// Card data report — the card-reader-variant shape sharing report ID 0x07.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardData {
    pub track: u8,
    pub data: String,
}

/// CRC calculation request with a little-endian 32-bit seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrcRequest {
    pub seed: u32,
}

/// CRC calculation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrcData {
    pub result: u32,
}

/// Enabled/disabled state report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceState {
    pub disabled: bool,
    pub enabled: bool,
}

impl DeviceState {
    /// The effective enabled state. When a device reports both bits set the
    /// disabled bit wins.
    pub fn effective_enabled(&self) -> bool {
        self.enabled && !self.disabled
    }
}

/// The closed set of GDS messages this engine understands.
///
/// `Unknown` is the minimal envelope produced for report IDs with no
/// registered shape; it exposes only the discriminator and is never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GdsMessage {
    Ack(Ack),
    Enable,
    Disable,
    SelfTest(SelfTest),
    PowerStatus(PowerStatus),
    GatData(GatData),
    CardData(CardData),
    CrcRequest(CrcRequest),
    CrcData(CrcData),
    DeviceState(DeviceState),
    Unknown { report_id: u8 },
}

impl GdsMessage {
    /// The wire discriminator for this message.
    pub fn report_id(&self) -> u8 {
        match self {
            GdsMessage::Ack(_) => report::ACK,
            GdsMessage::Enable => report::ENABLE,
            GdsMessage::Disable => report::DISABLE,
            GdsMessage::SelfTest(_) => report::SELF_TEST,
            GdsMessage::PowerStatus(_) => report::POWER_STATUS,
            GdsMessage::GatData(_) => report::GAT_DATA,
            GdsMessage::CardData(_) => report::GAT_DATA,
            GdsMessage::CrcRequest(_) => report::CRC_REQUEST,
            GdsMessage::CrcData(_) => report::CRC_DATA,
            GdsMessage::DeviceState(_) => report::DEVICE_STATE,
            GdsMessage::Unknown { report_id } => *report_id,
        }
    }

    pub(crate) fn encode_body(&self, dst: &mut BytesMut) -> Result<()> {
        match self {
            GdsMessage::Ack(m) => {
                dst.put_u8(m.resync as u8);
                dst.put_u8(m.transaction_id);
            }
            GdsMessage::Enable | GdsMessage::Disable | GdsMessage::Unknown { .. } => {}
            GdsMessage::SelfTest(m) => dst.put_u8(m.nvm as u8),
            GdsMessage::PowerStatus(m) => {
                dst.put_u8(
                    ((m.battery_failed as u8) << 2)
                        | ((m.requires_reset as u8) << 1)
                        | (m.external_power as u8),
                );
            }
            GdsMessage::GatData(m) => encode_text(self.report_id(), m.index, &m.data, dst)?,
            GdsMessage::CardData(m) => encode_text(self.report_id(), m.track, &m.data, dst)?,
            GdsMessage::CrcRequest(m) => dst.put_u32_le(m.seed),
            GdsMessage::CrcData(m) => dst.put_u32_le(m.result),
            GdsMessage::DeviceState(m) => {
                dst.put_u8(((m.disabled as u8) << 1) | (m.enabled as u8));
            }
        }
        Ok(())
    }
}

fn encode_text(report_id: u8, head: u8, data: &str, dst: &mut BytesMut) -> Result<()> {
    if data.len() > MAX_DATA_CHUNK {
        return Err(FramingError::PayloadTooLarge {
            report_id,
            size: data.len(),
            max: MAX_DATA_CHUNK,
        });
    }
    dst.put_u8(head);
    dst.put_u8(data.len() as u8);
    dst.put_slice(data.as_bytes());
    Ok(())
}

fn need(report_id: u8, body: &[u8], expected: usize) -> Result<()> {
    if body.len() < expected {
        return Err(FramingError::Truncated {
            report_id,
            expected,
            actual: body.len(),
        });
    }
    Ok(())
}

fn decode_text(report_id: u8, body: &[u8]) -> Result<(u8, String)> {
    need(report_id, body, 2)?;
    let head = body[0];
    let len = body[1] as usize;
    let payload = &body[2..];
    need(report_id, payload, len).map_err(|_| FramingError::Truncated {
        report_id,
        expected: 2 + len,
        actual: body.len(),
    })?;
    let payload = &payload[..len];
    if !payload.is_ascii() {
        return Err(FramingError::NonAscii { report_id });
    }
    Ok((head, String::from_utf8_lossy(payload).into_owned()))
}

impl Ack {
    pub(crate) fn decode(body: &[u8]) -> Result<Self> {
        need(report::ACK, body, 2)?;
        Ok(Self {
            resync: body[0] & 0x01 != 0,
            transaction_id: body[1],
        })
    }
}

impl SelfTest {
    pub(crate) fn decode(body: &[u8]) -> Result<Self> {
        need(report::SELF_TEST, body, 1)?;
        Ok(Self {
            nvm: body[0] & 0x01 != 0,
        })
    }
}

impl PowerStatus {
    pub(crate) fn decode(body: &[u8]) -> Result<Self> {
        need(report::POWER_STATUS, body, 1)?;
        Ok(Self {
            battery_failed: body[0] & 0x04 != 0,
            requires_reset: body[0] & 0x02 != 0,
            external_power: body[0] & 0x01 != 0,
        })
    }
}

impl GatData {
    pub(crate) fn decode(body: &[u8]) -> Result<Self> {
        let (index, data) = decode_text(report::GAT_DATA, body)?;
        Ok(Self { index, data })
    }
}

impl CardData {
    pub(crate) fn decode(body: &[u8]) -> Result<Self> {
        let (track, data) = decode_text(report::GAT_DATA, body)?;
        Ok(Self { track, data })
    }
}

impl CrcRequest {
    pub(crate) fn decode(mut body: &[u8]) -> Result<Self> {
        need(report::CRC_REQUEST, body, 4)?;
        Ok(Self {
            seed: body.get_u32_le(),
        })
    }
}

impl CrcData {
    pub(crate) fn decode(mut body: &[u8]) -> Result<Self> {
        need(report::CRC_DATA, body, 4)?;
        Ok(Self {
            result: body.get_u32_le(),
        })
    }
}

impl DeviceState {
    pub(crate) fn decode(body: &[u8]) -> Result<Self> {
        need(report::DEVICE_STATE, body, 1)?;
        Ok(Self {
            disabled: body[0] & 0x02 != 0,
            enabled: body[0] & 0x01 != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_state_tie_break_disabled_wins() {
        let both = DeviceState {
            disabled: true,
            enabled: true,
        };
        assert!(!both.effective_enabled());

        let enabled = DeviceState {
            disabled: false,
            enabled: true,
        };
        assert!(enabled.effective_enabled());
    }

    #[test]
    fn ack_layout() {
        let mut buf = BytesMut::new();
        GdsMessage::Ack(Ack {
            resync: true,
            transaction_id: 0x5A,
        })
        .encode_body(&mut buf)
        .unwrap();
        assert_eq!(buf.as_ref(), &[0x01, 0x5A]);
    }

    #[test]
    fn power_status_layout() {
        let mut buf = BytesMut::new();
        GdsMessage::PowerStatus(PowerStatus {
            battery_failed: true,
            requires_reset: false,
            external_power: true,
        })
        .encode_body(&mut buf)
        .unwrap();
        assert_eq!(buf.as_ref(), &[0b0000_0101]);
    }

    #[test]
    fn crc_fields_are_little_endian() {
        let mut buf = BytesMut::new();
        GdsMessage::CrcRequest(CrcRequest { seed: 0x1122_3344 })
            .encode_body(&mut buf)
            .unwrap();
        assert_eq!(buf.as_ref(), &[0x44, 0x33, 0x22, 0x11]);
    }

    #[test]
    fn gat_data_rejects_non_ascii() {
        let err = GatData::decode(&[0, 2, 0xC3, 0xA9]).unwrap_err();
        assert!(matches!(err, FramingError::NonAscii { .. }));
    }

    #[test]
    fn gat_data_truncated_payload() {
        let err = GatData::decode(&[0, 5, b'a', b'b']).unwrap_err();
        assert!(matches!(
            err,
            FramingError::Truncated {
                expected: 7,
                actual: 4,
                ..
            }
        ));
    }
}
