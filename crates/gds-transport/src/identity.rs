/// Read-only identity snapshot for an attached peripheral.
///
/// Sourced entirely from the transport (USB descriptors, GAT identity
/// exchange, or whatever the physical layer provides); the protocol engine
/// surfaces these fields and never writes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    /// Protocol family name, e.g. `"GDS"`.
    pub protocol: String,
    pub firmware_id: String,
    pub firmware_revision: String,
    pub firmware_crc: u32,
    pub boot_version: String,
    pub variant_name: String,
    pub variant_version: String,
}
