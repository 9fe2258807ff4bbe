//! Canonical reading record published to every sink.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wire schema version stamped into every reading.
pub const SCHEMA_VERSION: &str = "1.3";

/// A decoded, corrected hygrometer reading with capture metadata.
///
/// Created once per accepted advertisement and handed to all enabled sinks;
/// never persisted by the core itself. Temperature and humidity are always
/// derived together from the same packet integer, with the humidity
/// correction already applied. Field names are the wire contract for the
/// MQTT payload and the memcached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Schema version, [`SCHEMA_VERSION`].
    pub version: String,
    /// Capture timestamp, seconds since the Unix epoch.
    pub ts: f64,
    /// Battery level byte, nominally 0-100.
    pub battery: u8,
    /// Originating hardware address, "AA:BB:.." form.
    pub ble_address: String,
    /// Advertised device name, e.g. "GVH5075_ABCD".
    pub ble_name: String,
    /// Friendly name resolved from the device registry.
    pub config_name: String,
    /// Relative humidity in percent, one decimal place.
    pub humidity: f64,
    /// The raw 24-bit packet integer the values were decoded from.
    pub packet: u32,
    /// Signal strength at the receiver in dBm.
    pub rssi: i16,
    /// Hostname of the receiving instance.
    pub received_by: String,
    /// Temperature in Celsius.
    pub temperature: f64,
    /// Optional external correlation id from the registry entry.
    pub trv_id: Option<String>,
}

/// Current time as fractional seconds since the Unix epoch.
pub fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_reading;

    #[test]
    fn test_json_field_set_matches_wire_contract() {
        let json = serde_json::to_value(sample_reading()).unwrap();
        let obj = json.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "battery",
                "ble_address",
                "ble_name",
                "config_name",
                "humidity",
                "packet",
                "received_by",
                "rssi",
                "temperature",
                "trv_id",
                "ts",
                "version",
            ]
        );
        assert_eq!(obj["version"], "1.3");
        assert_eq!(obj["trv_id"], serde_json::Value::Null);
    }

    #[test]
    fn test_json_round_trip() {
        let reading = sample_reading();
        let json = serde_json::to_string(&reading).unwrap();
        let back: Reading = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reading);
    }

    #[test]
    fn test_epoch_seconds_is_recent() {
        // Some time after 2023, well before the heat death of the universe.
        let ts = epoch_seconds();
        assert!(ts > 1.6e9);
    }
}
