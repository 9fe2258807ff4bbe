//! Advertisement routing: filter by advertised name and assemble readings.

use crate::advertisement::RawAdvertisement;
use crate::decode::{
    DecodeError, apply_humidity_correction, decode_humidity, decode_temperature, read_packet,
};
use crate::reading::{Reading, SCHEMA_VERSION, epoch_seconds};
use crate::registry::{DeviceEntry, DeviceRegistry};

/// Advertised-name prefix of the vendor's hygrometer family.
///
/// Unregistered devices with this prefix are plausible sensors the operator
/// may want to add, so they get an advisory warning instead of silence.
pub const VENDOR_PREFIX: &str = "GVH";

/// Outcome of the pure filtering step.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision<'a> {
    /// Advertised name is registered; decode and publish.
    Accept {
        advertised_name: &'a str,
        entry: &'a DeviceEntry,
    },
    /// Nameless or unregistered device; drop silently.
    Ignore,
    /// Unregistered device whose name carries the vendor prefix; the caller
    /// should emit an advisory warning.
    UnknownVendor(&'a str),
}

/// Decide whether an advertisement belongs to a registered device.
///
/// Pure with respect to its inputs: the same (advertisement, registry) pair
/// always reaches the same decision.
pub fn route<'a>(
    advertisement: &'a RawAdvertisement,
    registry: &'a DeviceRegistry,
) -> RouteDecision<'a> {
    let Some(name) = advertisement.name.as_deref() else {
        return RouteDecision::Ignore;
    };
    match registry.get(name) {
        Some(entry) => RouteDecision::Accept {
            advertised_name: name,
            entry,
        },
        None if name.starts_with(VENDOR_PREFIX) => RouteDecision::UnknownVendor(name),
        None => RouteDecision::Ignore,
    }
}

/// Decode an accepted advertisement into a canonical [`Reading`].
///
/// Temperature and humidity come from the same packet integer; the humidity
/// correction is applied here, once, before any sink sees the value.
pub fn build_reading(
    advertisement: &RawAdvertisement,
    advertised_name: &str,
    entry: &DeviceEntry,
    hostname: &str,
) -> Result<Reading, DecodeError> {
    let (packet, battery) = read_packet(&advertisement.manufacturer_data)?;
    let temperature = decode_temperature(packet);
    let humidity = apply_humidity_correction(temperature, decode_humidity(packet));

    Ok(Reading {
        version: SCHEMA_VERSION.to_string(),
        ts: epoch_seconds(),
        battery,
        ble_address: advertisement.address.to_string(),
        ble_name: advertised_name.to_string(),
        config_name: entry.name.clone(),
        humidity,
        packet,
        rssi: advertisement.rssi,
        received_by: hostname.to_string(),
        temperature,
        trv_id: entry.trv_id.clone(),
    })
}
