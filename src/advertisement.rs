//! Raw BLE advertisement event, as delivered by the scanning subsystem.

use crate::mac_address::MacAddress;

/// One advertisement as received over the air.
///
/// Transient: one per radio event, dropped after routing. The manufacturer
/// data is the full AD structure value with the company id included, so the
/// decode offsets in [`crate::decode`] apply directly.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAdvertisement {
    /// Device-reported local name; absent for many non-sensor devices.
    pub name: Option<String>,
    /// Manufacturer-specific data bytes (company id included).
    pub manufacturer_data: Vec<u8>,
    /// Received signal strength in dBm.
    pub rssi: i16,
    /// Originating hardware address.
    pub address: MacAddress,
}
