//! Shared fixtures for unit tests.

use crate::mac_address::MacAddress;
use crate::reading::{Reading, SCHEMA_VERSION};
use crate::registry::{DeviceEntry, DeviceRegistry};

/// A stable hardware address for unit tests.
pub const TEST_MAC: MacAddress = MacAddress([0xA4, 0xC1, 0x38, 0x00, 0xAB, 0xCD]);

/// Registry with a single known device, `GVH5075_ABCD` -> "Living Room".
pub fn test_registry() -> DeviceRegistry {
    let mut registry = DeviceRegistry::new();
    registry.insert(
        "GVH5075_ABCD".to_string(),
        DeviceEntry {
            name: "Living Room".to_string(),
            trv_id: Some("trv-7".to_string()),
        },
    );
    registry
}

/// A fully-populated reading for sink and serialization tests.
pub fn sample_reading() -> Reading {
    Reading {
        version: SCHEMA_VERSION.to_string(),
        ts: 1_700_000_000.5,
        battery: 90,
        ble_address: TEST_MAC.to_string(),
        ble_name: "GVH5075_ABCD".to_string(),
        config_name: "Living Room".to_string(),
        humidity: 61.0,
        packet: 215_610,
        rssi: -61,
        received_by: "receiver-1".to_string(),
        temperature: 21.56,
        trv_id: None,
    }
}
